use std::{path::PathBuf, process::Command};

use thiserror::Error;
use tracing::{debug, warn};

/// Outcome of a failed poll tick.
///
/// `Unavailable` means the player query itself failed (no active session,
/// `playerctl` missing, non-zero exit) and the shell falls back to the idle
/// display. `Malformed` means the player answered but with output we could
/// not interpret; the previous display is kept for that tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("no active player session")]
    Unavailable,
    #[error("player returned malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Previous,
    PlayPause,
    Next,
}

impl TransportCommand {
    pub fn as_arg(self) -> &'static str {
        match self {
            TransportCommand::Previous => "previous",
            TransportCommand::PlayPause => "play-pause",
            TransportCommand::Next => "next",
        }
    }
}

/// Read access to the player. Seam for the poller tests.
pub trait PlayerSource {
    fn metadata(&self, field: &str) -> Result<String, PollError>;
    fn position(&self) -> Result<String, PollError>;
}

/// Queries and controls one fixed player instance by shelling out to
/// `playerctl --player <target> ...`.
pub struct PlayerClient {
    program: PathBuf,
    target: String,
}

impl PlayerClient {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from("playerctl"),
            target: target.into(),
        }
    }

    /// Points the client at a different control binary. The tests use this
    /// to run against a stub script.
    #[allow(dead_code)]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn query(&self, args: &[&str]) -> Result<String, PollError> {
        let output = Command::new(&self.program)
            .arg("--player")
            .arg(&self.target)
            .args(args)
            .output()
            .map_err(|_| PollError::Unavailable)?;
        if !output.status.success() {
            return Err(PollError::Unavailable);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Fire-and-forget transport command. The result is not validated; the
    /// next poll tick reflects whatever the player actually did.
    pub fn transport(&self, command: TransportCommand) {
        debug!(command = command.as_arg(), target = %self.target, "transport command");
        let status = Command::new(&self.program)
            .arg("--player")
            .arg(&self.target)
            .arg(command.as_arg())
            .status();
        if let Err(err) = status {
            warn!(command = command.as_arg(), error = %err, "transport command failed to launch");
        }
    }
}

impl PlayerSource for PlayerClient {
    fn metadata(&self, field: &str) -> Result<String, PollError> {
        self.query(&["metadata", field])
    }

    fn position(&self) -> Result<String, PollError> {
        self.query(&["position"])
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::{fs, os::unix::fs::PermissionsExt, path::Path};

    fn stub_playerctl(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("playerctl");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn metadata_returns_trimmed_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_playerctl(
            dir.path(),
            r#"case "$4" in
  title) echo "  Blink  " ;;
  artist) echo "Chameleon Circuit" ;;
  *) exit 1 ;;
esac"#,
        );
        let client = PlayerClient::new("chromium.instance7682").with_program(&stub);
        assert_eq!(client.metadata("title").unwrap(), "Blink");
        assert_eq!(client.metadata("artist").unwrap(), "Chameleon Circuit");
    }

    #[test]
    fn position_is_queried_without_the_metadata_subcommand() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_playerctl(
            dir.path(),
            r#"case "$3" in
  position) echo "125.503" ;;
  *) exit 1 ;;
esac"#,
        );
        let client = PlayerClient::new("chromium.instance7682").with_program(&stub);
        assert_eq!(client.position().unwrap(), "125.503");
    }

    #[test]
    fn failing_process_maps_to_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_playerctl(dir.path(), "exit 1");
        let client = PlayerClient::new("chromium.instance7682").with_program(&stub);
        assert_eq!(client.metadata("title"), Err(PollError::Unavailable));
    }

    #[test]
    fn missing_binary_maps_to_unavailable() {
        let client =
            PlayerClient::new("chromium.instance7682").with_program("/nonexistent/playerctl");
        assert_eq!(client.position(), Err(PollError::Unavailable));
    }

    #[test]
    fn transport_passes_the_command_through() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("commands.log");
        let stub = stub_playerctl(dir.path(), &format!(r#"echo "$2 $3" >> "{}""#, log.display()));
        let client = PlayerClient::new("chromium.instance7682").with_program(&stub);

        client.transport(TransportCommand::PlayPause);
        client.transport(TransportCommand::Next);

        let recorded = fs::read_to_string(&log).unwrap();
        assert_eq!(
            recorded,
            "chromium.instance7682 play-pause\nchromium.instance7682 next\n"
        );
    }
}
