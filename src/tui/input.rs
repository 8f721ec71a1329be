use crate::ports::plex::PlexClient;
use crate::tui::{
    app::{App, Pane, TrackView},
    event::AppEvent,
};
use color_eyre::Result;
use crossterm::event::KeyEvent;

pub fn handle_key_event<C: PlexClient + 'static>(
    app: &mut App<C>,
    key: crossterm::event::KeyEvent,
) -> Result<()> {
    use crossterm::event::{KeyCode, KeyModifiers};

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return Ok(());
    }

    // Any key dismisses the last error.
    app.error_message = None;

    if app.search_input.is_some() {
        handle_search_input(app, key)
    } else {
        handle_normal_input(app, key)
    }
}

fn handle_search_input<C: PlexClient + 'static>(app: &mut App<C>, key: KeyEvent) -> Result<()> {
    use crossterm::event::KeyCode;

    let Some(input) = app.search_input.as_mut() else {
        return Ok(());
    };

    match key.code {
        KeyCode::Esc => {
            app.search_input = None;
        }
        KeyCode::Enter => {
            let query = input.trim().to_string();
            app.search_input = None;
            if !query.is_empty() {
                app.events.send(AppEvent::StartSearch(query));
            }
        }
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Char(c) => {
            input.push(c);
        }
        _ => {}
    }
    Ok(())
}

fn handle_normal_input<C: PlexClient + 'static>(app: &mut App<C>, key: KeyEvent) -> Result<()> {
    use crossterm::event::KeyCode;

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('/') | KeyCode::Char('s') => {
            app.search_input = Some(String::new());
        }
        KeyCode::Tab | KeyCode::BackTab => {
            app.focus = match app.focus {
                Pane::Playlists => Pane::Tracks,
                Pane::Tracks => Pane::Playlists,
            };
        }
        KeyCode::Up | KeyCode::Char('k') => move_selection(app, -1),
        KeyCode::Down | KeyCode::Char('j') => move_selection(app, 1),
        KeyCode::PageUp => move_selection(app, -10),
        KeyCode::PageDown => move_selection(app, 10),
        KeyCode::Enter => match app.focus {
            Pane::Playlists => app.events.send(AppEvent::LoadSelected { reload: false }),
            Pane::Tracks => app.events.send(AppEvent::PlaySelected),
        },
        KeyCode::Esc => {
            // Back from search results to the sidebar.
            if matches!(app.view, TrackView::SearchResults { .. }) {
                app.view = TrackView::Empty;
                app.selected_track = 0;
                app.focus = Pane::Playlists;
            }
        }
        KeyCode::Char(' ') => app.toggle_playback(),
        KeyCode::Char('n') => app.player.next(),
        KeyCode::Char('p') => app.player.previous(),
        KeyCode::Char('r') => app.player.shuffle(),
        KeyCode::Char('x') => app.player.stop(),
        KeyCode::Char('R') => app.events.send(AppEvent::LoadSelected { reload: true }),
        _ => {}
    }
    Ok(())
}

fn move_selection<C: PlexClient + 'static>(app: &mut App<C>, delta: isize) {
    let (selected, len) = match app.focus {
        Pane::Playlists => (&mut app.selected_playlist, app.playlists.len()),
        Pane::Tracks => {
            let len = app.visible_tracks().len();
            (&mut app.selected_track, len)
        }
    };
    if len == 0 {
        return;
    }
    *selected = selected.saturating_add_signed(delta).min(len - 1);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::{KeyCode, KeyModifiers};
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::LoadingConfig;
    use crate::model::CollectionSummary;
    use crate::player::{PlayerCommand, PlayerHandle};
    use crate::ports::plex::MockPlexClient;
    use crate::services::playlist_loader::PlaylistLoader;
    use crate::tui::event::{Event, EventHandler};

    fn app() -> (
        App<MockPlexClient>,
        mpsc::UnboundedReceiver<PlayerCommand>,
    ) {
        let loader = Arc::new(PlaylistLoader::new(
            Arc::new(MockPlexClient::new()),
            LoadingConfig::default(),
        ));
        let (_player_tx, player_rx) = mpsc::unbounded_channel();
        let (player, commands) = PlayerHandle::detached();
        (App::new(EventHandler::new(loader, player_rx), player), commands)
    }

    fn press(app: &mut App<MockPlexClient>, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
    }

    fn type_text(app: &mut App<MockPlexClient>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[tokio::test]
    async fn test_search_box_queues_search() {
        let (mut app, _commands) = app();

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "bonobos");
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Enter);

        assert!(app.search_input.is_none());
        match app.events.next().await.unwrap() {
            Event::App(AppEvent::StartSearch(query)) => assert_eq!(query, "bonobo"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_keys_typed_into_search_are_not_commands() {
        let (mut app, mut commands) = app();

        press(&mut app, KeyCode::Char('s'));
        type_text(&mut app, "nqx");

        assert_eq!(app.search_input.as_deref(), Some("nqx"));
        assert!(app.running);
        assert!(commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_playback_keys() {
        let (mut app, mut commands) = app();

        for key in ['n', 'p', 'r', 'x'] {
            press(&mut app, KeyCode::Char(key));
        }

        let sent: Vec<_> = std::iter::from_fn(|| commands.try_recv().ok()).collect();
        assert!(matches!(
            sent.as_slice(),
            [
                PlayerCommand::Next,
                PlayerCommand::Previous,
                PlayerCommand::Shuffle,
                PlayerCommand::Stop
            ]
        ));
    }

    #[tokio::test]
    async fn test_selection_stays_in_bounds() {
        let (mut app, _commands) = app();
        app.playlists = vec![
            CollectionSummary::recently_added(),
            CollectionSummary::recently_added(),
        ];

        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.selected_playlist, 0);
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_playlist, 1);
    }

    #[tokio::test]
    async fn test_quit_shuts_player_down() {
        let (mut app, mut commands) = app();

        press(&mut app, KeyCode::Char('q'));

        assert!(!app.running);
        assert!(matches!(
            commands.try_recv().unwrap(),
            PlayerCommand::Shutdown
        ));
    }
}
