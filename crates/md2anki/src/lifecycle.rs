//! Making sure the note service is up before a sync is attempted.
//!
//! The check is advisory. A service that passes here can still be gone by
//! the time the store is called, and the store reports that on its own.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::store::SyncError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("could not check whether {process} is running: {detail}")]
    Check { process: String, detail: String },

    #[error("failed to launch {process}: {detail}")]
    Launch { process: String, detail: String },

    #[error("{process} is not running; start it and retry")]
    NotRunning { process: String },

    #[error("service did not become ready within {waited:?}: {last_error}")]
    NotReady { waited: Duration, last_error: String },
}

/// OS-level control over the application hosting the note service.
#[async_trait::async_trait]
pub trait ServiceHost: Send + Sync {
    /// Identifier used to match the running process.
    fn process(&self) -> &str;

    async fn is_running(&self) -> Result<bool, LifecycleError>;

    /// Start the application without waiting for it to be ready.
    async fn launch(&self) -> Result<(), LifecycleError>;
}

/// A cheap request that succeeds once the service accepts calls.
#[async_trait::async_trait]
pub trait ReadinessCheck: Send + Sync {
    async fn check_ready(&self) -> Result<(), SyncError>;
}

/// Matches `anki` as a whole program name, bare or at the end of a path.
pub const LINUX_PROCESS_PATTERN: &str = "(^|/)anki( |$)";

/// How to bring the service up when it is not running.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// `pgrep -f` pattern (extended regex) matched against the full
    /// command line of the running application.
    pub process: String,
    /// Program and arguments used to start the application.
    pub launch: Vec<String>,
    /// Launch the application when it is not running, instead of aborting.
    pub auto_launch: bool,
    pub poll_interval_ms: u64,
    pub startup_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let (process, launch) = if cfg!(target_os = "macos") {
            (
                "/Applications/Anki.app/Contents/MacOS/anki",
                vec!["open".to_owned(), "/Applications/Anki.app".to_owned()],
            )
        } else {
            // A bare `anki` would also match `md2anki` or an editor open on
            // `anki-notes.md`, and a false positive skips the launch.
            (LINUX_PROCESS_PATTERN, vec!["anki".to_owned()])
        };

        Self {
            process: process.to_owned(),
            launch,
            auto_launch: true,
            poll_interval_ms: 500,
            startup_timeout_secs: 30,
        }
    }
}

impl ServiceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

/// Polling bounds used after a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupPolicy {
    pub auto_launch: bool,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl From<&ServiceConfig> for StartupPolicy {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            auto_launch: config.auto_launch,
            poll_interval: config.poll_interval(),
            timeout: config.startup_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    AlreadyRunning,
    /// Launched by us; `attempts` is the number of readiness requests made.
    Launched { attempts: u32 },
}

/// Ensure the service is reachable, launching it if allowed.
///
/// A running process is trusted without a readiness request. After a launch
/// the check is retried every `poll_interval` until it succeeds or `timeout`
/// passes. A single check that hangs is cut off at the same deadline.
pub async fn ensure_ready(
    host: &dyn ServiceHost,
    readiness_check: &dyn ReadinessCheck,
    policy: StartupPolicy,
) -> Result<Readiness, LifecycleError> {
    if host.is_running().await? {
        tracing::debug!(process = host.process(), "service already running");
        return Ok(Readiness::AlreadyRunning);
    }

    if !policy.auto_launch {
        return Err(LifecycleError::NotRunning {
            process: host.process().to_owned(),
        });
    }

    tracing::info!(process = host.process(), "service not running, launching it");
    host.launch().await?;

    let started = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let remaining = policy.timeout.saturating_sub(started.elapsed());
        let last_error = match tokio::time::timeout(remaining, readiness_check.check_ready()).await
        {
            Ok(Ok(())) => {
                tracing::info!(attempts, elapsed = ?started.elapsed(), "service is ready");
                return Ok(Readiness::Launched { attempts });
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => "readiness request timed out".to_owned(),
        };

        let waited = started.elapsed();
        if waited + policy.poll_interval > policy.timeout {
            return Err(LifecycleError::NotReady { waited, last_error });
        }

        tracing::debug!(attempts, error = %last_error, "service not ready yet");
        tokio::time::sleep(policy.poll_interval).await;
    }
}
