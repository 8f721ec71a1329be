use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::plex_rs::playlist::PlexPlaylist;

/// Artist shown when every resolution strategy came up empty.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Cache key of the synthetic "Recently Added" collection.
pub const RECENTLY_ADDED_ID: &str = "recently-added";

/// A playable track. Built once by the loader, then shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    /// URL handed to the external player. `None` when the server listed no media part.
    pub stream_locator: Option<String>,
}

impl Track {
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Playlist,
    RecentlyAdded,
}

/// What the sidebar knows about a collection before it is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub id: String,
    pub title: String,
    /// Item count as reported by the catalog. Only used to pick a loading strategy.
    pub declared_count: Option<u32>,
    pub kind: CollectionKind,
}

impl CollectionSummary {
    pub fn recently_added() -> Self {
        Self {
            id: RECENTLY_ADDED_ID.to_string(),
            title: "Recently Added".to_string(),
            declared_count: None,
            kind: CollectionKind::RecentlyAdded,
        }
    }
}

impl From<PlexPlaylist> for CollectionSummary {
    fn from(playlist: PlexPlaylist) -> Self {
        Self {
            id: playlist.rating_key,
            title: playlist.title,
            declared_count: playlist.leaf_count,
            kind: CollectionKind::Playlist,
        }
    }
}

/// A loaded collection. `tracks` is in catalog order and may be a prefix of the
/// remote collection, in which case `partial` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub declared_count: Option<u32>,
    pub tracks: Vec<Arc<Track>>,
    pub partial: bool,
    pub loaded_at: DateTime<Utc>,
    /// Loader generation that produced this collection.
    pub generation: u64,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// "12 loaded (of 64,000 total)" style description used by the track pane.
    pub fn count_label(&self) -> String {
        match self.declared_count {
            Some(total) if self.partial || total as usize != self.len() => {
                format!("{} loaded (of {} total)", self.len(), group_thousands(total))
            }
            _ => format!("{} loaded", self.len()),
        }
    }
}

fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn track(id: &str) -> Arc<Track> {
        Arc::new(Track {
            id: id.to_string(),
            title: format!("Title {}", id),
            artist: "Artist".to_string(),
            album: None,
            duration: Some(Duration::from_secs(180)),
            stream_locator: Some(format!("http://plex.local/library/parts/{}/file.mp3", id)),
        })
    }

    pub fn collection(id: &str, tracks: Vec<Arc<Track>>) -> Collection {
        Collection {
            id: id.to_string(),
            title: format!("Playlist {}", id),
            declared_count: Some(tracks.len() as u32),
            tracks,
            partial: false,
            loaded_at: Utc::now(),
            generation: 1,
        }
    }
}
