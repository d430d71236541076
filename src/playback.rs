/// Audio playback through an external player process

use std::path::Path;
use std::process::Command;

use crate::config::PLAY_CMD_PLACEHOLDER;
use crate::error::PlaybackError;

/// Plays a resolved sound file, blocking until playback is over
pub trait Player: Send + Sync {
    fn play(&self, file: &Path) -> Result<(), PlaybackError>;
}

/// Runs a shell command template with `%s` replaced by the file path
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    template: String,
}

impl CommandPlayer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the command line for a file
    pub fn command_line(&self, file: &Path) -> String {
        self.template
            .replace(PLAY_CMD_PLACEHOLDER, &file.display().to_string())
    }
}

impl Player for CommandPlayer {
    fn play(&self, file: &Path) -> Result<(), PlaybackError> {
        let command = self.command_line(file);
        tracing::debug!("exec: {}", command);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .spawn()
            .map_err(|source| PlaybackError::Spawn {
                command: command.clone(),
                source,
            })?;

        let status = child.wait().map_err(|source| PlaybackError::Wait {
            command: command.clone(),
            source,
        })?;

        if !status.success() {
            tracing::warn!("Player exited with {}: {}", status, command);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_command_line_substitutes_path() {
        let player = CommandPlayer::new("mpg123 -q '%s'");
        assert_eq!(
            player.command_line(Path::new("/srv/sounds/beep.mp3")),
            "mpg123 -q '/srv/sounds/beep.mp3'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_play_waits_for_process() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("played.txt");
        let player = CommandPlayer::new(format!("echo %s > '{}'", out.display()));

        player.play(Path::new("beep.mp3")).unwrap();

        // The process has exited, so its output is already on disk
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "beep.mp3");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_player_is_not_an_error() {
        let player = CommandPlayer::new("exit 3 # %s");
        assert!(player.play(Path::new("beep.mp3")).is_ok());
    }
}
