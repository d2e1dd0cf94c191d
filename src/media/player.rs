use crate::error::VocablyError;
use bytes::Bytes;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

pub type PlaybackEventSender = mpsc::UnboundedSender<PlaybackEvent>;
pub type PlaybackEventReceiver = mpsc::UnboundedReceiver<PlaybackEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEventKind {
    Ended,
    Failed(String),
}

/// Reported by a player once a playback finishes on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackEvent {
    pub playback_id: u64,
    pub kind: PlaybackEventKind,
}

impl PlaybackEvent {
    pub fn ended(playback_id: u64) -> Self {
        Self {
            playback_id,
            kind: PlaybackEventKind::Ended,
        }
    }

    pub fn failed(playback_id: u64, reason: impl Into<String>) -> Self {
        Self {
            playback_id,
            kind: PlaybackEventKind::Failed(reason.into()),
        }
    }
}

/// Output device abstraction.
///
/// `play` returns once playback has started; natural completion and late
/// failures arrive on the player's event channel. `stop` halts the current
/// playback without emitting an event.
pub trait AudioPlayer: Send {
    fn play(&mut self, playback_id: u64, audio: Bytes) -> Result<(), VocablyError>;
    fn stop(&mut self);
}

/// Plays nothing and reports every playback as finished straight away.
pub struct SilentPlayer {
    events: PlaybackEventSender,
}

impl SilentPlayer {
    pub fn new(events: PlaybackEventSender) -> Self {
        Self { events }
    }
}

impl AudioPlayer for SilentPlayer {
    fn play(&mut self, playback_id: u64, audio: Bytes) -> Result<(), VocablyError> {
        debug!(playback_id, bytes = audio.len(), "silent playback");
        self.events.send(PlaybackEvent::ended(playback_id)).ok();
        Ok(())
    }

    fn stop(&mut self) {}
}

#[cfg(target_os = "macos")]
const DEFAULT_PLAYER_COMMAND: &str = "afplay";
#[cfg(not(target_os = "macos"))]
const DEFAULT_PLAYER_COMMAND: &str = "aplay -q";

/// Plays WAV data through an external command line player.
pub struct SystemPlayer {
    program: String,
    args: Vec<String>,
    temp_dir: PathBuf,
    events: PlaybackEventSender,
    current: Option<CancellationToken>,
}

impl SystemPlayer {
    /// `command` is split on whitespace; the audio file path is appended last.
    pub fn new(command: Option<&str>, events: PlaybackEventSender) -> Self {
        let command = command
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_PLAYER_COMMAND);
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
            temp_dir: std::env::temp_dir(),
            events,
            current: None,
        }
    }

    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = dir;
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl AudioPlayer for SystemPlayer {
    fn play(&mut self, playback_id: u64, audio: Bytes) -> Result<(), VocablyError> {
        self.stop();

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(VocablyError::Playback("no async runtime".to_string()));
        }

        let path = self
            .temp_dir
            .join(format!("vocably-{}.wav", Uuid::new_v4().simple()));
        std::fs::write(&path, &audio).map_err(|e| VocablyError::Playback(e.to_string()))?;

        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                std::fs::remove_file(&path).ok();
                warn!(program = %self.program, "failed to start audio player: {}", e);
                return Err(VocablyError::Playback(e.to_string()));
            }
        };

        let token = CancellationToken::new();
        self.current = Some(token.clone());
        let events = self.events.clone();
        debug!(playback_id, path = %path.display(), "playback started");

        tokio::spawn(async move {
            select! {
                status = child.wait() => {
                    let event = match status {
                        Ok(status) if status.success() => PlaybackEvent::ended(playback_id),
                        Ok(status) => PlaybackEvent::failed(playback_id, format!("player exited with {}", status)),
                        Err(e) => PlaybackEvent::failed(playback_id, e.to_string()),
                    };
                    events.send(event).ok();
                }
                _ = token.cancelled() => {
                    child.kill().await.ok();
                    debug!(playback_id, "playback stopped");
                }
            }
            tokio::fs::remove_file(&path).await.ok();
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

impl Drop for SystemPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
