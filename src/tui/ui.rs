use crate::player::PlayerState;
use crate::ports::plex::PlexClient;
use crate::tui::app::{App, Pane, TrackView};
use crate::tui::widgets;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListState, Paragraph},
};

pub fn render<C: PlexClient + 'static>(frame: &mut Frame, app: &App<C>) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search box
            Constraint::Min(0),    // Sidebar + tracks
            Constraint::Length(3), // Now playing
            Constraint::Length(1), // Status line
        ])
        .split(area);

    render_search_box(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[1]);

    render_playlists(frame, app, body[0]);
    render_tracks(frame, app, body[1]);
    render_now_playing(frame, app, chunks[2]);
    render_status(frame, app, chunks[3]);
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        })
}

fn render_search_box<C: PlexClient + 'static>(frame: &mut Frame, app: &App<C>, area: Rect) {
    let (text, style) = match &app.search_input {
        Some(input) => (format!("{}_", input), Style::default().fg(Color::Yellow)),
        None => (
            "Press / to search".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    };

    let search = Paragraph::new(text)
        .style(style)
        .block(pane_block("Search".to_string(), app.search_input.is_some()));
    frame.render_widget(search, area);
}

fn render_playlists<C: PlexClient + 'static>(frame: &mut Frame, app: &App<C>, area: Rect) {
    let focused = app.focus == Pane::Playlists && app.search_input.is_none();

    let items: Vec<_> = app
        .playlists
        .iter()
        .enumerate()
        .map(|(idx, summary)| {
            widgets::playlist_item(summary, idx == app.selected_playlist, focused)
        })
        .collect();

    let list = List::new(items).block(pane_block("Playlists".to_string(), focused));
    let mut state = ListState::default().with_selected(Some(app.selected_playlist));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_tracks<C: PlexClient + 'static>(frame: &mut Frame, app: &App<C>, area: Rect) {
    let focused = app.focus == Pane::Tracks && app.search_input.is_none();

    let title = match (&app.loading, &app.view) {
        (Some(summary), _) => format!("{} (loading...)", summary.title),
        (None, TrackView::Empty) => "Tracks".to_string(),
        (None, TrackView::Collection(collection)) => {
            let mut title = format!("{} - {}", collection.title, collection.count_label());
            if collection.partial {
                title.push_str(" [partial]");
            }
            title
        }
        (None, TrackView::SearchResults { query, tracks }) => {
            format!("Search '{}' - {} results (Esc: back)", query, tracks.len())
        }
    };

    let tracks = app.visible_tracks();
    if tracks.is_empty() {
        let empty = Paragraph::new("No tracks. Select a playlist and press Enter.")
            .block(pane_block(title, focused))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let playing_id = app.playback.current.as_ref().map(|track| track.id.as_str());
    let items: Vec<_> = tracks
        .iter()
        .enumerate()
        .map(|(idx, track)| {
            widgets::track_item(
                idx,
                track,
                idx == app.selected_track,
                Some(track.id.as_str()) == playing_id,
                focused,
            )
        })
        .collect();

    let list = List::new(items).block(pane_block(title, focused));
    let mut state = ListState::default().with_selected(Some(app.selected_track));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_now_playing<C: PlexClient + 'static>(frame: &mut Frame, app: &App<C>, area: Rect) {
    let playback = &app.playback;
    let (label, color) = match playback.state {
        PlayerState::Idle => ("Idle", Color::DarkGray),
        PlayerState::Playing => ("Playing", Color::Green),
        PlayerState::Paused => ("Paused", Color::Yellow),
        PlayerState::Stopped => ("Stopped", Color::Red),
    };

    let mut spans = vec![Span::styled(
        format!("{} ", label),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    if let Some(track) = &playback.current {
        spans.push(Span::raw(track.display_name()));
        if let Some(duration) = track.duration {
            spans.push(Span::styled(
                format!(" ({})", widgets::format_duration(duration)),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    if let Some(index) = playback.index {
        spans.push(Span::styled(
            format!("  [{}/{}]", index + 1, playback.queue_len),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let now_playing =
        Paragraph::new(Line::from(spans)).block(Block::bordered().title("Now Playing"));
    frame.render_widget(now_playing, area);
}

fn render_status<C: PlexClient + 'static>(frame: &mut Frame, app: &App<C>, area: Rect) {
    let status = match (&app.error_message, &app.status_message) {
        (Some(error), _) => Paragraph::new(format!("Error: {}", error))
            .style(Style::default().fg(Color::Red)),
        (None, status) => Paragraph::new(format!(
            "{}  [Enter: Load/Play] [Space: Play/Pause] [n/p: Next/Prev] [r: Shuffle] [x: Stop] [R: Reload] [/: Search] [q: Quit]",
            status.as_deref().unwrap_or("Ready")
        ))
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(status, area);
}
