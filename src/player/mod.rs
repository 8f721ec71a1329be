//! Playback control.
//!
//! The UI talks to a [`PlayerHandle`], which only forwards commands to a
//! background task. That task owns the [`session::PlaybackSession`], the queue
//! and the single external player process, and reports every change back as a
//! [`PlayerEvent`].

pub mod process;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::Track;
use crate::player::process::PlayerLauncher;
use crate::player::session::PlaybackSession;

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error(
        "Player `{0}` not found. Install FFmpeg (it provides ffplay) or set player.command in the config"
    )]
    PlayerNotFound(String),
    #[error(
        "Failed to start `{command}`: {source}. Check that it is installed and executable, or set player.command in the config"
    )]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Track '{0}' has no playable media")]
    NoStreamLocator(String),
    #[error("Failed to signal player process: {0}")]
    Signal(#[source] std::io::Error),
    #[error("Pausing the player is not supported on this platform")]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// What the UI needs to draw the now-playing bar.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlayerState,
    pub index: Option<usize>,
    pub queue_len: usize,
    pub current: Option<Arc<Track>>,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            state: PlayerState::Idle,
            index: None,
            queue_len: 0,
            current: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PlayerCommand {
    /// Replace the queue and start playing at `start`.
    SetQueue {
        tracks: Vec<Arc<Track>>,
        start: usize,
    },
    /// Play a track; if it is not in the queue it becomes the whole queue.
    Play(Arc<Track>),
    Pause,
    Resume,
    Stop,
    Next,
    Previous,
    Shuffle,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    State(PlaybackSnapshot),
    /// The player exited without finishing the track.
    ProcessLost {
        track: Option<Arc<Track>>,
        reason: String,
    },
    Error(String),
}

/// Foreground side of the playback controller.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    /// Spawns the controller task. Commands are applied one at a time, in the
    /// order they were sent.
    pub fn spawn<L: PlayerLauncher + 'static>(
        launcher: L,
        terminate_grace: Duration,
        events: mpsc::UnboundedSender<PlayerEvent>,
    ) -> (Self, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let session = PlaybackSession::new(launcher, terminate_grace, events);
        let task = tokio::spawn(session.run(command_rx));
        (Self { commands }, task)
    }

    /// A handle with no controller behind it; tests read the commands directly.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<PlayerCommand>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        (Self { commands }, command_rx)
    }

    pub fn send(&self, command: PlayerCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Playback controller has stopped, dropping command");
        }
    }

    pub fn set_queue(&self, tracks: Vec<Arc<Track>>, start: usize) {
        self.send(PlayerCommand::SetQueue { tracks, start });
    }

    pub fn play(&self, track: Arc<Track>) {
        self.send(PlayerCommand::Play(track));
    }

    pub fn pause(&self) {
        self.send(PlayerCommand::Pause);
    }

    pub fn resume(&self) {
        self.send(PlayerCommand::Resume);
    }

    pub fn stop(&self) {
        self.send(PlayerCommand::Stop);
    }

    pub fn next(&self) {
        self.send(PlayerCommand::Next);
    }

    pub fn previous(&self) {
        self.send(PlayerCommand::Previous);
    }

    pub fn shuffle(&self) {
        self.send(PlayerCommand::Shuffle);
    }

    pub fn shutdown(&self) {
        self.send(PlayerCommand::Shutdown);
    }
}
