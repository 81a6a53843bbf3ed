//! Making the consuming service pick up the new material.

use crate::error::ConfigError;
use crate::error::ReloadError;
use std::fmt;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;
use tracing::debug;
use tracing::info;

/// Replaced by the service name in a reload command.
pub const SERVICE_PLACEHOLDER: &str = "{}";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn default_reload_command() -> Vec<String> {
    vec!["/bin/systemctl".into(), "restart".into(), SERVICE_PLACEHOLDER.into()]
}

/// An external command restarting or reloading the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReloadAction {
    exec: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ReloadAction {
    /// Build the action from a command line, `{}` being replaced with the service name.
    pub fn try_new(
        command: &[String],
        service: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let command = command
            .iter()
            .map(|arg| match (arg.as_str(), service) {
                (SERVICE_PLACEHOLDER, Some(service)) => Ok(service.to_string()),
                (SERVICE_PLACEHOLDER, None) => Err(ConfigError::Invalid {
                    reason: format!(
                        "reload.command uses the {SERVICE_PLACEHOLDER} placeholder but no reload.service is set"
                    ),
                }),
                _ => Ok(arg.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        match command.split_first() {
            Some((exec, args)) => Ok(ReloadAction {
                exec: exec.to_string(),
                args: args.to_vec(),
                timeout,
            }),
            None => Err(ConfigError::Invalid {
                reason: "reload.command requires 1 or more arguments".into(),
            }),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the command and wait for it to complete.
    ///
    /// No retry. A command still running after the timeout is killed.
    pub fn fire(&self) -> Result<(), ReloadError> {
        info!("Running reload command <{self}>");
        let mut child = Command::new(&self.exec)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| ReloadError::SpawnFailed {
                command: self.to_string(),
                source,
            })?;

        // A timeout beyond the clock range never expires
        let deadline = Instant::now().checked_add(self.timeout);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if deadline.is_some_and(|deadline| Instant::now() >= deadline) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ReloadError::TimedOut {
                        command: self.to_string(),
                        timeout: self.timeout,
                    });
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(ReloadError::SpawnFailed {
                        command: self.to_string(),
                        source,
                    })
                }
            }
        };

        self.must_succeed(status)
    }

    fn must_succeed(&self, status: ExitStatus) -> Result<(), ReloadError> {
        if status.success() {
            debug!("Reload command <{self}> succeeded");
            Ok(())
        } else {
            Err(ReloadError::ActionFailed {
                command: self.to_string(),
                code: status.code(),
            })
        }
    }
}

impl fmt::Display for ReloadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.exec)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn command(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    fn action(args: &[&str]) -> ReloadAction {
        ReloadAction::try_new(&command(args), None, Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn service_name_replaces_the_placeholder() {
        let action = ReloadAction::try_new(
            &default_reload_command(),
            Some("nginx"),
            Duration::from_secs(60),
        )
        .unwrap();
        assert_eq!(action.to_string(), "/bin/systemctl restart nginx");
    }

    #[test]
    fn placeholder_without_service_is_rejected() {
        let err =
            ReloadAction::try_new(&default_reload_command(), None, Duration::from_secs(60))
                .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { .. });
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = ReloadAction::try_new(&[], None, Duration::from_secs(60)).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { .. });
    }

    #[test]
    fn successful_command() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("reloaded");
        let script = format!("echo reloaded >> {}", marker.display());

        action(&["sh", "-c", &script]).fire().unwrap();

        assert_eq!(std::fs::read_to_string(marker).unwrap(), "reloaded\n");
    }

    #[test]
    fn exit_code_is_reported() {
        let err = action(&["sh", "-c", "exit 3"]).fire().unwrap_err();
        assert_matches!(err, ReloadError::ActionFailed { code: Some(3), .. });
    }

    #[test]
    fn unknown_program_cannot_be_spawned() {
        let err = action(&["/does/not/exist/reload"]).fire().unwrap_err();
        assert_matches!(err, ReloadError::SpawnFailed { .. });
    }

    #[test]
    fn timeout_beyond_the_clock_range_does_not_overflow() {
        let action = ReloadAction::try_new(&command(&["true"]), None, Duration::MAX).unwrap();
        action.fire().unwrap();
    }

    #[test]
    fn hanging_command_is_killed() {
        let action =
            ReloadAction::try_new(&command(&["sleep", "30"]), None, Duration::from_millis(200))
                .unwrap();

        let started = Instant::now();
        let err = action.fire().unwrap_err();

        assert_matches!(err, ReloadError::TimedOut { .. });
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
