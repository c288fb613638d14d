use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use md2anki::SyncConfig;

/// Config file path: `~/.config/md2anki/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("md2anki").join("config.toml"))
}

/// Load config from an explicit path. Missing or invalid files are errors.
pub fn load_from(path: &Path) -> Result<SyncConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    parse(&contents).with_context(|| format!("failed to parse config at {}", path.display()))
}

/// Load config from the default location, falling back to defaults if
/// the file is missing or unparsable.
pub fn load_default() -> SyncConfig {
    if let Some(path) = config_path()
        && let Ok(contents) = std::fs::read_to_string(&path)
    {
        match parse(&contents) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config file");
                eprintln!(
                    "warning: failed to parse config at {}, using defaults",
                    path.display()
                );
            }
        }
    }

    SyncConfig::default()
}

pub fn parse(contents: &str) -> Result<SyncConfig, toml::de::Error> {
    toml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn overrides_endpoint_and_service() {
        let toml_str = r#"
endpoint = "http://127.0.0.1:9999"

[service]
process = "anki-custom"
launch = ["flatpak", "run", "net.ankiweb.Anki"]
startup_timeout_secs = 5
"#;
        let config = parse(toml_str).unwrap();

        assert_eq!(config.endpoint, "http://127.0.0.1:9999");
        assert_eq!(config.service.process, "anki-custom");
        assert_eq!(
            config.service.launch,
            vec!["flatpak", "run", "net.ankiweb.Anki"]
        );
        assert_eq!(config.service.startup_timeout_secs, 5);
        assert!(config.service.auto_launch);
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(parse("api_version = \"six\"").is_err());
    }

    #[test]
    fn load_from_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("md2anki.toml");
        std::fs::write(&path, "deck = \"Networking\"\n").unwrap();

        let config = load_from(&path).unwrap();
        assert_eq!(config.deck, "Networking");
    }

    #[test]
    fn load_from_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from(&dir.path().join("absent.toml")).unwrap_err();

        assert!(err.to_string().starts_with("failed to read config"));
    }
}
