use std::sync::Arc;
use std::time::Duration;

use rand::{rng, seq::SliceRandom};
use tokio::sync::mpsc;

use crate::model::Track;
use crate::player::process::{PlayerLauncher, PlayerProcess, ProcessExit};
use crate::player::{PlaybackSnapshot, PlayerCommand, PlayerError, PlayerEvent, PlayerState};

enum Step {
    Command(Option<PlayerCommand>),
    Exited(ProcessExit),
}

/// Queue, position and the one player process. Lives on the controller task,
/// so every transition runs to completion before the next one starts.
pub struct PlaybackSession<L: PlayerLauncher> {
    launcher: L,
    terminate_grace: Duration,
    queue: Vec<Arc<Track>>,
    index: Option<usize>,
    state: PlayerState,
    process: Option<Box<dyn PlayerProcess>>,
    events: mpsc::UnboundedSender<PlayerEvent>,
}

impl<L: PlayerLauncher> PlaybackSession<L> {
    pub fn new(
        launcher: L,
        terminate_grace: Duration,
        events: mpsc::UnboundedSender<PlayerEvent>,
    ) -> Self {
        Self {
            launcher,
            terminate_grace,
            queue: Vec::new(),
            index: None,
            state: PlayerState::Idle,
            process: None,
            events,
        }
    }

    /// Applies commands until `Shutdown` or until every handle is dropped,
    /// advancing the queue whenever the player exits by itself.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<PlayerCommand>) {
        loop {
            let step = tokio::select! {
                biased;
                command = commands.recv() => Step::Command(command),
                exit = wait_for_exit(&mut self.process) => Step::Exited(exit),
            };

            match step {
                Step::Command(Some(PlayerCommand::Shutdown)) | Step::Command(None) => break,
                Step::Command(Some(command)) => self.apply(command).await,
                Step::Exited(exit) => self.on_process_exit(exit).await,
            }
        }

        self.release().await;
        tracing::debug!("Playback controller stopped");
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            index: self.index,
            queue_len: self.queue.len(),
            current: self.index.and_then(|i| self.queue.get(i)).cloned(),
        }
    }

    async fn apply(&mut self, command: PlayerCommand) {
        tracing::trace!(?command, "Player command");
        match command {
            PlayerCommand::SetQueue { tracks, start } => self.set_queue(tracks, start).await,
            PlayerCommand::Play(track) => self.play(track).await,
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::Resume => self.resume(),
            PlayerCommand::Stop => self.stop().await,
            PlayerCommand::Next => self.next().await,
            PlayerCommand::Previous => self.previous().await,
            PlayerCommand::Shuffle => self.shuffle(),
            PlayerCommand::Shutdown => self.release().await,
        }
    }

    async fn set_queue(&mut self, tracks: Vec<Arc<Track>>, start: usize) {
        self.release().await;
        self.queue = tracks;
        self.index = None;

        if start < self.queue.len() {
            self.play_index(start).await;
        } else {
            self.state = PlayerState::Stopped;
            self.emit_state();
        }
    }

    async fn play(&mut self, track: Arc<Track>) {
        let index = match self.queue.iter().position(|queued| queued.id == track.id) {
            Some(index) => index,
            None => {
                self.queue = vec![track];
                0
            }
        };
        self.play_index(index).await;
    }

    /// Terminates whatever is running, then starts the track at `index`.
    async fn play_index(&mut self, index: usize) {
        self.release().await;

        let Some(track) = self.queue.get(index).cloned() else {
            return;
        };
        self.index = Some(index);

        let spawned = match track.stream_locator.as_deref() {
            Some(locator) => self.launcher.spawn(locator),
            None => Err(PlayerError::NoStreamLocator(track.title.clone())),
        };

        match spawned {
            Ok(process) => {
                tracing::info!(track_id = %track.id, "Playing {}", track.display_name());
                self.process = Some(process);
                self.state = PlayerState::Playing;
            }
            Err(e) => {
                tracing::error!(track_id = %track.id, "Could not start playback: {}", e);
                self.state = PlayerState::Stopped;
                self.emit(PlayerEvent::Error(e.to_string()));
            }
        }
        self.emit_state();
    }

    fn pause(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }
        let Some(process) = self.process.as_mut() else {
            return;
        };

        match process.suspend() {
            Ok(()) => {
                self.state = PlayerState::Paused;
                self.emit_state();
            }
            Err(e) => self.emit(PlayerEvent::Error(e.to_string())),
        }
    }

    fn resume(&mut self) {
        if self.state != PlayerState::Paused {
            return;
        }
        let Some(process) = self.process.as_mut() else {
            return;
        };

        match process.resume() {
            Ok(()) => {
                self.state = PlayerState::Playing;
                self.emit_state();
            }
            Err(e) => self.emit(PlayerEvent::Error(e.to_string())),
        }
    }

    /// Keeps the queue and position so playback can pick up from here.
    async fn stop(&mut self) {
        if !matches!(self.state, PlayerState::Playing | PlayerState::Paused) {
            return;
        }
        self.release().await;
        self.state = PlayerState::Stopped;
        self.emit_state();
    }

    async fn next(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let next = self.index.map_or(0, |i| i + 1);

        if next < self.queue.len() {
            self.play_index(next).await;
        } else {
            tracing::debug!("End of queue");
            self.release().await;
            self.state = PlayerState::Stopped;
            self.emit_state();
        }
    }

    async fn previous(&mut self) {
        match self.index {
            Some(i) if i > 0 => self.play_index(i - 1).await,
            _ => {}
        }
    }

    /// Shuffles the queue in place. The track at the current position stays put.
    fn shuffle(&mut self) {
        if self.queue.len() < 2 {
            return;
        }

        match self.index.filter(|&i| i < self.queue.len()) {
            Some(i) => {
                let current = self.queue.remove(i);
                self.queue.shuffle(&mut rng());
                self.queue.insert(i, current);
            }
            None => self.queue.shuffle(&mut rng()),
        }
        self.emit_state();
    }

    async fn on_process_exit(&mut self, exit: ProcessExit) {
        self.process = None;

        match exit {
            ProcessExit::Finished => tracing::debug!("Track finished"),
            ProcessExit::Lost(reason) => {
                tracing::warn!("Player process lost: {}", reason);
                let track = self.index.and_then(|i| self.queue.get(i)).cloned();
                self.emit(PlayerEvent::ProcessLost { track, reason });
            }
        }

        self.next().await;
    }

    /// Terminates the running process, if any.
    async fn release(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };
        if let Err(e) = process.terminate(self.terminate_grace).await {
            tracing::warn!("Failed to terminate player: {}", e);
        }
    }

    fn emit_state(&self) {
        self.emit(PlayerEvent::State(self.snapshot()));
    }

    fn emit(&self, event: PlayerEvent) {
        // The UI may already be gone during shutdown.
        let _ = self.events.send(event);
    }
}

async fn wait_for_exit(process: &mut Option<Box<dyn PlayerProcess>>) -> ProcessExit {
    match process {
        Some(process) => process.wait().await,
        None => std::future::pending().await,
    }
}
