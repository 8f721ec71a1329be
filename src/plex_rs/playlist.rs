use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::plex_rs::track::PlexTrack;
use crate::plex_rs::{
    PlexApiError, PlexMediaContainer, PlexResponse, send_json, with_container_window,
};

/* ---------- Playlists ---------- */

#[derive(Debug, Clone, Deserialize)]
pub struct PlexPlaylist {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,

    pub title: String,

    #[serde(rename = "playlistType", default)]
    pub playlist_type: String,

    #[serde(rename = "leafCount", default)]
    pub leaf_count: Option<u32>,
}

pub async fn get_playlists(
    client: &Client,
    base_url: &Url,
    user_token: &str,
) -> Result<Vec<PlexPlaylist>, PlexApiError> {
    let url = base_url.join("playlists?type=15")?;

    let res: PlexResponse<PlexPlaylist> = send_json(client.get(url), user_token).await?;

    Ok(res.media_container.metadata)
}

/// Fetch a single playlist, mostly to learn its `leafCount`.
///
/// Endpoint
/// - `GET /playlists/{id}`
pub async fn get_playlist(
    client: &Client,
    base_url: &Url,
    user_token: &str,
    playlist_id: &str,
) -> Result<PlexPlaylist, PlexApiError> {
    let url = base_url.join(&format!("playlists/{}", playlist_id))?;

    let res: PlexResponse<PlexPlaylist> = send_json(client.get(url), user_token).await?;

    res.media_container
        .metadata
        .into_iter()
        .next()
        .ok_or_else(|| PlexApiError::MissingMetadata(format!("playlist {}", playlist_id)))
}

/* ---------- Playlist items (tracks) ---------- */

/// Fetch one page of playlist items in playlist order.
///
/// Pagination
/// - `start` is the offset (`X-Plex-Container-Start`).
/// - `size` is the page size (`X-Plex-Container-Size`).
///
/// Endpoint
/// - `GET /playlists/{id}/items`
pub async fn get_playlist_items_page(
    client: &Client,
    base_url: &Url,
    user_token: &str,
    playlist_id: &str,
    start: u32,
    size: u32,
) -> Result<PlexMediaContainer<PlexTrack>, PlexApiError> {
    let url = base_url.join(&format!("playlists/{}/items", playlist_id))?;

    let res: PlexResponse<PlexTrack> =
        send_json(with_container_window(client.get(url), start, size), user_token).await?;

    Ok(res.media_container)
}

pub fn is_music_playlist(p: &PlexPlaylist) -> bool {
    p.playlist_type == "audio"
}
