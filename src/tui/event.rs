/// Event plumbing in the style of https://github.com/ratatui/templates/blob/main/event-driven/template/src/event.rs
use std::sync::Arc;
use std::{thread, time::Duration};

use color_eyre::Result;
use color_eyre::eyre::{Context, OptionExt};
use ratatui::crossterm::event::{self, Event as CrosstermEvent};
use tokio::sync::mpsc;

use crate::model::{CollectionSummary, Track};
use crate::player::PlayerEvent;
use crate::ports::plex::PlexClient;
use crate::services::playlist_loader::{LoadError, LoadOutcome, PlaylistLoader};

const TIMEOUT: Duration = Duration::from_millis(250);

/// Representation of all possible events.
#[derive(Debug)]
pub enum Event {
    /// Crossterm events.
    ///
    /// These events are emitted by the terminal thread.
    Crossterm(CrosstermEvent),
    /// Application events, queued by the app for its next loop iteration.
    App(AppEvent),
    /// Results of background requests.
    Background(BackgroundEvent),
    /// Events from the playback controller.
    Player(PlayerEvent),
}

/// Application events.
///
/// Emitted by the key handlers, acted on by the app.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Load the playlist selected in the sidebar.
    LoadSelected { reload: bool },
    StartSearch(String),
    /// Queue the visible tracks and play the selected one.
    PlaySelected,
}

/// Background events.
///
/// Every result carries the id of the request that produced it.
#[derive(Debug)]
pub enum BackgroundEvent {
    PlaylistsLoaded(Result<Vec<CollectionSummary>, LoadError>),
    CollectionLoaded {
        request_id: u64,
        summary: CollectionSummary,
        result: Result<LoadOutcome, LoadError>,
    },
    SearchCompleted {
        request_id: u64,
        query: String,
        result: Result<Vec<Arc<Track>>, LoadError>,
    },
}

#[derive(Debug, Clone)]
pub enum BackgroundRequest {
    Playlists,
    Load {
        request_id: u64,
        summary: CollectionSummary,
        /// Drop the cached copy first.
        reload: bool,
    },
    Search {
        request_id: u64,
        query: String,
    },
}

/// Event handler shared by the terminal thread, background tasks and the player.
pub struct EventHandler<C: PlexClient> {
    /// Event sender channel.
    sender: mpsc::UnboundedSender<Event>,
    /// Event receiver channel.
    receiver: mpsc::UnboundedReceiver<Event>,
    loader: Arc<PlaylistLoader<C>>,
}

impl<C: PlexClient + 'static> EventHandler<C> {
    /// Constructs a new [`EventHandler`] and starts forwarding player events.
    pub fn new(
        loader: Arc<PlaylistLoader<C>>,
        mut player_events: mpsc::UnboundedReceiver<PlayerEvent>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        let player_sender = sender.clone();
        tokio::spawn(async move {
            while let Some(event) = player_events.recv().await {
                if player_sender.send(Event::Player(event)).is_err() {
                    break;
                }
            }
        });

        Self {
            sender,
            receiver,
            loader,
        }
    }

    /// Spawns the thread that reads terminal input.
    pub fn start_terminal_events(&self) {
        let actor = CrosstermEventThread::new(self.sender.clone());
        thread::spawn(move || {
            if let Err(e) = actor.run() {
                tracing::error!("Terminal event thread failed: {:?}", e);
            }
        });
    }

    /// Receives the next event, waiting until one arrives.
    pub async fn next(&mut self) -> Result<Event> {
        self.receiver
            .recv()
            .await
            .ok_or_eyre("failed to receive event")
    }

    /// Queue an app event to be handled by the next iteration of the event loop.
    pub fn send(&self, app_event: AppEvent) {
        // The receiver lives in this struct, so this cannot fail.
        let _ = self.sender.send(Event::App(app_event));
    }

    /// Runs a background request on its own task, so a newer load is never
    /// queued behind an older one.
    pub fn send_background_request(&self, request: BackgroundRequest) {
        let loader = self.loader.clone();
        let sender = self.sender.clone();

        tokio::spawn(async move {
            let event = match request {
                BackgroundRequest::Playlists => {
                    BackgroundEvent::PlaylistsLoaded(loader.get_playlists().await)
                }
                BackgroundRequest::Load {
                    request_id,
                    summary,
                    reload,
                } => {
                    let result = if reload {
                        loader.reload(&summary).await
                    } else {
                        loader.load(&summary).await
                    };
                    BackgroundEvent::CollectionLoaded {
                        request_id,
                        summary,
                        result,
                    }
                }
                BackgroundRequest::Search { request_id, query } => {
                    let result = loader.search(&query).await;
                    BackgroundEvent::SearchCompleted {
                        request_id,
                        query,
                        result,
                    }
                }
            };
            // The app may have quit while the request was in flight.
            let _ = sender.send(Event::Background(event));
        });
    }
}

/// A thread that handles reading crossterm events
struct CrosstermEventThread {
    sender: mpsc::UnboundedSender<Event>,
}

impl CrosstermEventThread {
    fn new(sender: mpsc::UnboundedSender<Event>) -> Self {
        Self { sender }
    }

    /// Polls for crossterm events until the app drops its receiver.
    fn run(self) -> Result<()> {
        loop {
            if event::poll(TIMEOUT).wrap_err("failed to poll for crossterm events")? {
                let event = event::read().wrap_err("failed to read crossterm event")?;
                if self.sender.send(Event::Crossterm(event)).is_err() {
                    return Ok(());
                }
            } else if self.sender.is_closed() {
                return Ok(());
            }
        }
    }
}
