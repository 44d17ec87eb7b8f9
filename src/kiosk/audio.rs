use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Result, TourError};

/// Narration output. Playback is an enhancement: the player logs failures
/// and keeps going.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, url: &str) -> Result<()>;

    async fn stop(&self);
}

/// No audio device configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentAudio;

#[async_trait]
impl AudioOutput for SilentAudio {
    async fn play(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) {}
}

/// Plays each track with an external command, e.g. `mpv --no-video`.
///
/// The URL is appended as the last argument. Only one track runs at a
/// time; starting a new one kills the previous process.
pub struct CommandAudio {
    program: String,
    args: Vec<String>,
    child: Mutex<Option<tokio::process::Child>>,
}

impl CommandAudio {
    /// Parse a whitespace-separated command line. `None` when blank.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            child: Mutex::new(None),
        })
    }
}

#[async_trait]
impl AudioOutput for CommandAudio {
    async fn play(&self, url: &str) -> Result<()> {
        let mut guard = self.child.lock().await;
        if let Some(mut previous) = guard.take() {
            let _ = previous.kill().await;
        }

        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TourError::Custom(format!("Failed to start {}: {e}", self.program)))?;
        *guard = Some(child);
        Ok(())
    }

    async fn stop(&self) {
        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            let _ = child.kill().await;
        }
    }
}
