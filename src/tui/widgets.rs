use std::time::Duration;

use ratatui::{prelude::*, widgets::ListItem};

use crate::model::{CollectionKind, CollectionSummary, Track};

/// Format a duration as M:SS, or H:MM:SS past the hour
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn selection_style(is_selected: bool, focused: bool) -> Style {
    match (is_selected, focused) {
        (true, true) => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        (true, false) => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    }
}

/// Render a sidebar entry
pub fn playlist_item(summary: &CollectionSummary, is_selected: bool, focused: bool) -> ListItem<'_> {
    let prefix = if is_selected { "> " } else { "  " };
    let style = selection_style(is_selected, focused);

    let count = match (summary.kind, summary.declared_count) {
        (CollectionKind::RecentlyAdded, _) => String::new(),
        (_, Some(count)) => format!(" ({})", count),
        (_, None) => String::new(),
    };

    ListItem::new(Line::from(vec![
        Span::styled(prefix, style),
        Span::styled(summary.title.as_str(), style),
        Span::styled(count, Style::default().fg(Color::DarkGray)),
    ]))
}

/// Render a track row: position, artist - title, then album and length when known
pub fn track_item(
    position: usize,
    track: &Track,
    is_selected: bool,
    is_playing: bool,
    focused: bool,
) -> ListItem<'_> {
    let marker = if is_playing {
        "♪ "
    } else if is_selected {
        "> "
    } else {
        "  "
    };
    let style = if is_playing {
        Style::default().fg(Color::Green)
    } else {
        selection_style(is_selected, focused)
    };

    let mut spans = vec![
        Span::styled(marker, style),
        Span::styled(format!("{:>4}. ", position + 1), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{} - {}", track.artist, track.title), style),
    ];

    let mut details = vec![];
    if let Some(album) = &track.album {
        details.push(album.clone());
    }
    if let Some(duration) = track.duration {
        details.push(format_duration(duration));
    }
    if !details.is_empty() {
        spans.push(Span::styled(
            format!("  {}", details.join(" | ")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    ListItem::new(Line::from(spans))
}
