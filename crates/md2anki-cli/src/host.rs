use std::process::Stdio;

use md2anki::{LifecycleError, ServiceConfig, ServiceHost};
use tokio::process::Command;

/// Finds the note application with `pgrep -f` and starts it with the
/// configured launch command.
pub struct ProcessHost {
    process: String,
    launch: Vec<String>,
}

impl ProcessHost {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            process: config.process.clone(),
            launch: config.launch.clone(),
        }
    }

    fn check_error(&self, detail: impl Into<String>) -> LifecycleError {
        LifecycleError::Check {
            process: self.process.clone(),
            detail: detail.into(),
        }
    }

    fn launch_error(&self, detail: impl Into<String>) -> LifecycleError {
        LifecycleError::Launch {
            process: self.process.clone(),
            detail: detail.into(),
        }
    }
}

#[async_trait::async_trait]
impl ServiceHost for ProcessHost {
    fn process(&self) -> &str {
        &self.process
    }

    async fn is_running(&self) -> Result<bool, LifecycleError> {
        let output = Command::new("pgrep")
            .arg("-f")
            .arg(&self.process)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.check_error(format!("pgrep: {e}")))?;

        // pgrep exits 1 when nothing matched, 2+ on real errors.
        match output.status.code() {
            Some(0) => Ok(has_other_pid(&String::from_utf8_lossy(&output.stdout))),
            Some(1) => Ok(false),
            _ => Err(self.check_error(format!(
                "pgrep failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }

    async fn launch(&self) -> Result<(), LifecycleError> {
        let Some((program, args)) = self.launch.split_first() else {
            return Err(self.launch_error("no launch command configured"));
        };

        tracing::debug!(program, ?args, "launching service");

        // The child is left running; only the spawn itself is checked.
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|e| self.launch_error(format!("{program}: {e}")))
    }
}

/// Whether pgrep output lists any process other than this one. A pattern
/// like `anki` would otherwise match our own command line.
fn has_other_pid(pgrep_output: &str) -> bool {
    let own = std::process::id();
    pgrep_output
        .split_whitespace()
        .filter_map(|pid| pid.parse::<u32>().ok())
        .any(|pid| pid != own)
}
