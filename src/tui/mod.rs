pub mod app;
pub mod event;
pub mod input;
pub mod ui;
pub mod widgets;

use std::sync::Arc;

use color_eyre::Result;
use tokio::sync::mpsc;

use crate::player::{PlayerEvent, PlayerHandle};
use crate::ports::plex::PlexClient;
use crate::services::playlist_loader::PlaylistLoader;

/// Main entry point for the TUI
pub async fn run<C: PlexClient + 'static>(
    loader: Arc<PlaylistLoader<C>>,
    player: PlayerHandle,
    player_events: mpsc::UnboundedReceiver<PlayerEvent>,
) -> Result<()> {
    use crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::prelude::*;
    use std::io;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create and run app
    let events = event::EventHandler::new(loader, player_events);
    events.start_terminal_events();
    let mut app = app::App::new(events, player);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}
