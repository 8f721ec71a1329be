use std::sync::Arc;

use chrono::Utc;
use color_eyre::Result;
use rand::{rng, seq::SliceRandom};
use ratatui::DefaultTerminal;

use crate::model::{Collection, CollectionSummary, Track};
use crate::player::{PlaybackSnapshot, PlayerEvent, PlayerHandle, PlayerState};
use crate::ports::plex::PlexClient;
use crate::services::playlist_loader::LoadError;
use crate::tui::event::{AppEvent, BackgroundEvent, BackgroundRequest, Event, EventHandler};
use crate::tui::input::handle_key_event;

/// Playlists started with Space that are longer than this play shuffled.
const AUTOPLAY_SHUFFLE_THRESHOLD: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Playlists,
    Tracks,
}

/// What the track pane is listing.
#[derive(Debug, Clone)]
pub enum TrackView {
    Empty,
    Collection(Arc<Collection>),
    SearchResults { query: String, tracks: Vec<Arc<Track>> },
}

pub struct App<C: PlexClient> {
    pub running: bool,
    pub focus: Pane,
    /// Text being typed into the search box, `None` when it is closed.
    pub search_input: Option<String>,

    pub playlists: Vec<CollectionSummary>,
    pub selected_playlist: usize,
    pub view: TrackView,
    pub selected_track: usize,
    /// Collection currently being fetched.
    pub loading: Option<CollectionSummary>,

    pub playback: PlaybackSnapshot,
    pub status_message: Option<String>,
    pub error_message: Option<String>,

    next_request_id: u64,
    pending_load: Option<u64>,
    pending_search: Option<u64>,
    /// Load started by Space with nothing listed; plays once it arrives.
    autoplay_load: Option<u64>,

    pub events: EventHandler<C>,
    pub player: PlayerHandle,
}

impl<C: PlexClient + 'static> App<C> {
    pub fn new(events: EventHandler<C>, player: PlayerHandle) -> Self {
        Self {
            running: true,
            focus: Pane::Playlists,
            search_input: None,
            playlists: Vec::new(),
            selected_playlist: 0,
            view: TrackView::Empty,
            selected_track: 0,
            loading: None,
            playback: PlaybackSnapshot::default(),
            status_message: Some("Loading playlists...".to_string()),
            error_message: None,
            next_request_id: 0,
            pending_load: None,
            pending_search: None,
            autoplay_load: None,
            events,
            player,
        }
    }

    pub async fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.events
            .send_background_request(BackgroundRequest::Playlists);

        while self.running {
            terminal.draw(|f| crate::tui::ui::render(f, self))?;
            let event = self.events.next().await?;
            self.handle_event(event)?;
        }

        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Crossterm(event) => match event {
                crossterm::event::Event::Key(key_event)
                    if key_event.kind == crossterm::event::KeyEventKind::Press =>
                {
                    handle_key_event(self, key_event)?
                }
                _ => {}
            },
            Event::App(app_event) => match app_event {
                AppEvent::LoadSelected { reload } => {
                    self.load_selected(reload);
                }
                AppEvent::StartSearch(query) => self.start_search(query),
                AppEvent::PlaySelected => self.play_selected(),
            },
            Event::Background(background_event) => self.on_background_event(background_event),
            Event::Player(player_event) => self.on_player_event(player_event),
        }
        Ok(())
    }

    fn request_id(&mut self) -> u64 {
        self.next_request_id += 1;
        self.next_request_id
    }

    fn load_selected(&mut self, reload: bool) -> Option<u64> {
        let summary = self.playlists.get(self.selected_playlist).cloned()?;
        self.autoplay_load = None;

        // Switching playlists ends whatever was playing.
        if matches!(
            self.playback.state,
            PlayerState::Playing | PlayerState::Paused
        ) {
            self.player.stop();
        }

        let request_id = self.request_id();
        self.pending_load = Some(request_id);
        self.status_message = Some(format!("Loading {}...", summary.title));
        self.loading = Some(summary.clone());
        self.events.send_background_request(BackgroundRequest::Load {
            request_id,
            summary,
            reload,
        });
        Some(request_id)
    }

    fn start_search(&mut self, query: String) {
        let request_id = self.request_id();
        self.pending_search = Some(request_id);
        self.status_message = Some(format!("Searching for '{}'...", query));
        self.events
            .send_background_request(BackgroundRequest::Search { request_id, query });
    }

    /// Tracks listed in the track pane.
    pub fn visible_tracks(&self) -> &[Arc<Track>] {
        match &self.view {
            TrackView::Empty => &[],
            TrackView::Collection(collection) => &collection.tracks,
            TrackView::SearchResults { tracks, .. } => tracks,
        }
    }

    fn play_selected(&mut self) {
        let tracks = self.visible_tracks().to_vec();
        if self.selected_track < tracks.len() {
            self.player.set_queue(tracks, self.selected_track);
        }
    }

    /// Space: pause or resume. When stopped, picks up where the queue left off
    /// if that track is still listed, otherwise starts the visible list. With
    /// nothing listed, loads the highlighted playlist and plays it on arrival.
    pub fn toggle_playback(&mut self) {
        let resumable = self.playback.current.clone().filter(|current| {
            self.visible_tracks()
                .iter()
                .any(|track| track.id == current.id)
        });

        match (self.playback.state, resumable) {
            (PlayerState::Playing, _) => self.player.pause(),
            (PlayerState::Paused, _) => self.player.resume(),
            (PlayerState::Stopped, Some(current)) => self.player.play(current),
            (PlayerState::Idle | PlayerState::Stopped, _) => {
                let tracks = self.visible_tracks().to_vec();
                if !tracks.is_empty() {
                    self.player.set_queue(tracks, 0);
                } else if self.loading.is_none() {
                    self.autoplay_load = self.load_selected(false);
                }
            }
        }
    }

    fn autoplay(&mut self, collection: &Collection) {
        let mut tracks = collection.tracks.clone();
        if tracks.is_empty() {
            return;
        }
        if tracks.len() > AUTOPLAY_SHUFFLE_THRESHOLD {
            tracks.shuffle(&mut rng());
            self.status_message = Some(format!("Shuffled {} tracks", tracks.len()));
        }
        self.player.set_queue(tracks, 0);
    }

    fn on_background_event(&mut self, event: BackgroundEvent) {
        match event {
            BackgroundEvent::PlaylistsLoaded(result) => match result {
                Ok(playlists) => {
                    self.status_message = Some(format!("{} playlists", playlists.len()));
                    self.playlists = playlists;
                    self.selected_playlist = 0;
                }
                Err(e) => {
                    tracing::error!("Failed to load playlists: {}", e);
                    self.error_message = Some(e.to_string());
                }
            },
            BackgroundEvent::CollectionLoaded {
                request_id,
                summary,
                result,
            } => {
                if self.pending_load != Some(request_id) {
                    tracing::debug!(request_id, "Dropping stale load of {}", summary.id);
                    return;
                }
                self.pending_load = None;
                self.loading = None;
                let autoplay = self.autoplay_load.take() == Some(request_id);

                match result {
                    Ok(outcome) => {
                        let cached = outcome.from_cache();
                        let collection = outcome.collection;
                        let mut status = format!("{}: {}", collection.title, collection.count_label());
                        if collection.partial {
                            status.push_str(" - showing a partial list");
                        }
                        if cached {
                            status.push_str(" (cached)");
                        }
                        self.status_message = Some(status);
                        self.show(TrackView::Collection(collection.clone()));
                        if autoplay {
                            self.autoplay(&collection);
                        }
                    }
                    Err(LoadError::Superseded(_)) => {}
                    Err(e) => {
                        tracing::error!("Failed to load {}: {}", summary.id, e);
                        self.error_message = Some(e.to_string());
                        if let LoadError::LoadFailed { loaded, .. } = e
                            && !loaded.is_empty()
                        {
                            self.show(TrackView::Collection(Arc::new(Collection {
                                id: summary.id,
                                title: summary.title,
                                declared_count: summary.declared_count,
                                tracks: loaded,
                                partial: true,
                                loaded_at: Utc::now(),
                                generation: 0,
                            })));
                        }
                    }
                }
            }
            BackgroundEvent::SearchCompleted {
                request_id,
                query,
                result,
            } => {
                if self.pending_search != Some(request_id) {
                    tracing::debug!(request_id, "Dropping stale search results");
                    return;
                }
                self.pending_search = None;

                match result {
                    Ok(tracks) => {
                        self.status_message =
                            Some(format!("{} results for '{}'", tracks.len(), query));
                        self.show(TrackView::SearchResults { query, tracks });
                    }
                    Err(e) => {
                        tracing::error!("Search failed: {}", e);
                        self.error_message = Some(e.to_string());
                    }
                }
            }
        }
    }

    fn on_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::State(snapshot) => self.playback = snapshot,
            PlayerEvent::ProcessLost { track, reason } => {
                let name = track
                    .map(|track| track.display_name())
                    .unwrap_or_else(|| "track".to_string());
                self.status_message = Some(format!("Playback of {} stopped: {}", name, reason));
            }
            PlayerEvent::Error(message) => self.error_message = Some(message),
        }
    }

    fn show(&mut self, view: TrackView) {
        self.view = view;
        self.selected_track = 0;
        self.focus = Pane::Tracks;
    }

    pub fn quit(&mut self) {
        self.running = false;
        self.player.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::LoadingConfig;
    use crate::model::test_support::{collection, track};
    use crate::player::PlayerCommand;
    use crate::ports::plex::MockPlexClient;
    use crate::services::playlist_loader::{LoadOutcome, LoadStrategy, PlaylistLoader};

    fn app() -> (
        App<MockPlexClient>,
        mpsc::UnboundedReceiver<PlayerCommand>,
    ) {
        let (app, commands, _loader) = app_with_loader();
        (app, commands)
    }

    fn app_with_loader() -> (
        App<MockPlexClient>,
        mpsc::UnboundedReceiver<PlayerCommand>,
        Arc<PlaylistLoader<MockPlexClient>>,
    ) {
        let loader = Arc::new(PlaylistLoader::new(
            Arc::new(MockPlexClient::new()),
            LoadingConfig::default(),
        ));
        let (_player_tx, player_rx) = mpsc::unbounded_channel();
        let events = EventHandler::new(loader.clone(), player_rx);
        let (player, commands) = PlayerHandle::detached();
        (App::new(events, player), commands, loader)
    }

    fn snapshot(state: PlayerState, current: &str) -> Event {
        Event::Player(PlayerEvent::State(PlaybackSnapshot {
            state,
            index: Some(0),
            queue_len: 1,
            current: Some(track(current)),
        }))
    }

    fn summary(id: &str) -> CollectionSummary {
        CollectionSummary {
            id: id.to_string(),
            title: format!("Playlist {}", id),
            declared_count: None,
            kind: crate::model::CollectionKind::Playlist,
        }
    }

    fn loaded(request_id: u64, id: &str, tracks: Vec<Arc<Track>>) -> Event {
        let collection = collection(id, tracks);
        Event::Background(BackgroundEvent::CollectionLoaded {
            request_id,
            summary: CollectionSummary {
                id: id.to_string(),
                title: collection.title.clone(),
                declared_count: collection.declared_count,
                kind: crate::model::CollectionKind::Playlist,
            },
            result: Ok(LoadOutcome {
                collection: Arc::new(collection),
                strategy: LoadStrategy::Paged,
            }),
        })
    }

    #[tokio::test]
    async fn test_stale_load_is_dropped() {
        let (mut app, _commands) = app();
        app.pending_load = Some(2);

        app.handle_event(loaded(1, "old", vec![track("a")])).unwrap();
        assert!(matches!(app.view, TrackView::Empty));

        app.handle_event(loaded(2, "new", vec![track("b")])).unwrap();
        assert_eq!(app.visible_tracks()[0].id, "b");
        assert_eq!(app.focus, Pane::Tracks);
    }

    #[tokio::test]
    async fn test_failed_load_shows_accumulated_tracks() {
        let (mut app, _commands) = app();
        app.pending_load = Some(1);

        app.handle_event(Event::Background(BackgroundEvent::CollectionLoaded {
            request_id: 1,
            summary: CollectionSummary {
                id: "5".to_string(),
                title: "Mix".to_string(),
                declared_count: Some(80),
                kind: crate::model::CollectionKind::Playlist,
            },
            result: Err(LoadError::LoadFailed {
                collection_id: "5".to_string(),
                loaded: vec![track("a"), track("b")],
                reason: "502".to_string(),
            }),
        }))
        .unwrap();

        assert_eq!(app.visible_tracks().len(), 2);
        assert!(app.error_message.is_some());
        match &app.view {
            TrackView::Collection(collection) => {
                assert!(collection.partial);
                assert_eq!(collection.count_label(), "2 loaded (of 80 total)");
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_play_selected_queues_visible_tracks() {
        let (mut app, mut commands) = app();
        app.pending_load = Some(1);
        app.handle_event(loaded(1, "1", vec![track("a"), track("b"), track("c")]))
            .unwrap();
        app.selected_track = 1;

        app.handle_event(Event::App(AppEvent::PlaySelected)).unwrap();

        match commands.try_recv().unwrap() {
            PlayerCommand::SetQueue { tracks, start } => {
                assert_eq!(tracks.len(), 3);
                assert_eq!(start, 1);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_space_when_idle_starts_list() {
        let (mut app, mut commands) = app();
        app.pending_load = Some(1);
        app.handle_event(loaded(1, "1", vec![track("a"), track("b")]))
            .unwrap();

        app.toggle_playback();

        assert!(matches!(
            commands.try_recv().unwrap(),
            PlayerCommand::SetQueue { start: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_space_while_playing_pauses() {
        let (mut app, mut commands) = app();
        app.handle_event(snapshot(PlayerState::Playing, "a")).unwrap();

        app.toggle_playback();

        assert!(matches!(commands.try_recv().unwrap(), PlayerCommand::Pause));
    }

    #[tokio::test]
    async fn test_space_while_paused_resumes() {
        let (mut app, mut commands) = app();
        app.handle_event(snapshot(PlayerState::Paused, "a")).unwrap();

        app.toggle_playback();

        assert!(matches!(commands.try_recv().unwrap(), PlayerCommand::Resume));
    }

    #[tokio::test]
    async fn test_space_when_stopped_replays_listed_track() {
        let (mut app, mut commands) = app();
        app.pending_load = Some(1);
        app.handle_event(loaded(1, "1", vec![track("a"), track("b")]))
            .unwrap();
        app.handle_event(snapshot(PlayerState::Stopped, "b")).unwrap();

        app.toggle_playback();

        match commands.try_recv().unwrap() {
            PlayerCommand::Play(track) => assert_eq!(track.id, "b"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_space_with_nothing_listed_loads_and_plays() {
        let (mut app, mut commands, loader) = app_with_loader();
        // Served from the cache so the background load makes no server calls.
        loader.cache().put("7", collection("7", vec![track("a")]));
        app.playlists = vec![summary("7")];

        app.toggle_playback();
        assert!(commands.try_recv().is_err());
        let request_id = app.pending_load.unwrap();

        app.handle_event(loaded(request_id, "7", vec![track("a"), track("b")]))
            .unwrap();

        match commands.try_recv().unwrap() {
            PlayerCommand::SetQueue { tracks, start } => {
                assert_eq!(start, 0);
                assert_eq!(tracks[0].id, "a");
                assert_eq!(tracks[1].id, "b");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_space_autoplay_shuffles_long_playlists() {
        let (mut app, mut commands, loader) = app_with_loader();
        loader.cache().put("big", collection("big", vec![track("a")]));
        app.playlists = vec![summary("big")];
        let tracks: Vec<_> = (0..60).map(|i| track(&i.to_string())).collect();

        app.toggle_playback();
        let request_id = app.pending_load.unwrap();
        app.handle_event(loaded(request_id, "big", tracks)).unwrap();

        match commands.try_recv().unwrap() {
            PlayerCommand::SetQueue { tracks, start } => {
                assert_eq!(start, 0);
                let mut ids: Vec<u32> = tracks.iter().map(|t| t.id.parse().unwrap()).collect();
                ids.sort();
                assert_eq!(ids, (0..60).collect::<Vec<_>>());
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(app.status_message.as_deref(), Some("Shuffled 60 tracks"));
    }

    #[tokio::test]
    async fn test_enter_load_does_not_autoplay() {
        let (mut app, mut commands, loader) = app_with_loader();
        loader.cache().put("7", collection("7", vec![track("a")]));
        app.playlists = vec![summary("7")];

        app.handle_event(Event::App(AppEvent::LoadSelected { reload: false }))
            .unwrap();
        let request_id = app.pending_load.unwrap();
        app.handle_event(loaded(request_id, "7", vec![track("a")]))
            .unwrap();

        assert!(commands.try_recv().is_err());
        assert_eq!(app.visible_tracks().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_search_is_dropped() {
        let (mut app, _commands) = app();
        app.pending_search = Some(3);

        app.handle_event(Event::Background(BackgroundEvent::SearchCompleted {
            request_id: 2,
            query: "old".to_string(),
            result: Ok(vec![track("a")]),
        }))
        .unwrap();

        assert!(matches!(app.view, TrackView::Empty));
    }

    #[tokio::test]
    async fn test_player_error_is_shown() {
        let (mut app, _commands) = app();

        app.handle_event(Event::Player(PlayerEvent::Error(
            "Player `ffplay` not found".to_string(),
        )))
        .unwrap();

        assert_eq!(
            app.error_message.as_deref(),
            Some("Player `ffplay` not found")
        );
    }
}
