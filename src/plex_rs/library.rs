use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::plex_rs::track::PlexTrack;
use crate::plex_rs::{PlexApiError, PlexResponse, send_json, with_container_window};

/// Plex item type for music tracks.
const TRACK_TYPE: &str = "10";

/* ---------- Library sections ---------- */

/// Response type for `/library/sections`.
#[derive(Debug, Deserialize)]
pub struct PlexLibrarySectionsResponse {
    #[serde(rename = "MediaContainer")]
    pub media_container: PlexLibrarySectionsContainer,
}

/// `MediaContainer` for `/library/sections` which returns a `Directory` list.
#[derive(Debug, Deserialize)]
pub struct PlexLibrarySectionsContainer {
    #[serde(rename = "Directory", default)]
    pub directories: Vec<PlexLibrarySection>,
}

/// A Plex library section.
///
/// Notes
/// - `key` is the library section id.
/// - `section_type` is commonly `movie`, `show`, or for music libraries `artist`.
#[derive(Debug, Deserialize)]
pub struct PlexLibrarySection {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: String,
}

/// Fetch all Plex library sections.
///
/// Endpoint
/// - `GET /library/sections`
pub async fn get_library_sections(
    client: &Client,
    base_url: &Url,
    user_token: &str,
) -> Result<Vec<PlexLibrarySection>, PlexApiError> {
    let url = base_url.join("library/sections")?;

    let res: PlexLibrarySectionsResponse = send_json(client.get(url), user_token).await?;

    Ok(res.media_container.directories)
}

/// Find the first music library section id.
pub fn find_music_section_id(sections: &[PlexLibrarySection]) -> Option<&str> {
    sections
        .iter()
        .find(|s| s.section_type == "artist")
        .map(|s| s.key.as_str())
}

/* ---------- Tracks ---------- */

/// Search the tracks of one library section, capped server side.
///
/// An empty `query` lists the section's tracks in library order, which is how
/// large playlists get a quick prefix without walking the playlist itself.
/// `sort` is passed through as the server sort key, e.g. `addedAt:desc`.
///
/// Endpoint
/// - `GET /library/sections/{id}/all?type=10[&title=query][&sort=..]`
pub async fn search_section_tracks(
    client: &Client,
    base_url: &Url,
    user_token: &str,
    section_id: &str,
    query: &str,
    sort: Option<&str>,
    limit: u32,
) -> Result<Vec<PlexTrack>, PlexApiError> {
    let url = section_tracks_url(base_url, section_id, query, sort)?;

    let res: PlexResponse<PlexTrack> =
        send_json(with_container_window(client.get(url), 0, limit), user_token).await?;

    Ok(res.media_container.metadata)
}

fn section_tracks_url(
    base_url: &Url,
    section_id: &str,
    query: &str,
    sort: Option<&str>,
) -> Result<Url, PlexApiError> {
    let mut url = base_url.join(&format!("library/sections/{}/all", section_id))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("type", TRACK_TYPE);
        if !query.is_empty() {
            pairs.append_pair("title", query);
        }
        if let Some(sort) = sort {
            pairs.append_pair("sort", sort);
        }
    }
    Ok(url)
}

/// Most recently added tracks of a section, newest first.
///
/// Endpoint
/// - `GET /library/sections/{id}/recentlyAdded?type=10`
pub async fn get_recently_added(
    client: &Client,
    base_url: &Url,
    user_token: &str,
    section_id: &str,
    limit: u32,
) -> Result<Vec<PlexTrack>, PlexApiError> {
    let mut url = base_url.join(&format!("library/sections/{}/recentlyAdded", section_id))?;
    url.query_pairs_mut().append_pair("type", TRACK_TYPE);

    let res: PlexResponse<PlexTrack> =
        send_json(with_container_window(client.get(url), 0, limit), user_token).await?;

    Ok(res.media_container.metadata)
}

/// Full metadata for one item.
///
/// Endpoint
/// - `GET /library/metadata/{id}`
pub async fn get_metadata(
    client: &Client,
    base_url: &Url,
    user_token: &str,
    rating_key: &str,
) -> Result<PlexTrack, PlexApiError> {
    let url = base_url.join(&format!("library/metadata/{}", rating_key))?;

    let res: PlexResponse<PlexTrack> = send_json(client.get(url), user_token).await?;

    res.media_container
        .metadata
        .into_iter()
        .next()
        .ok_or_else(|| PlexApiError::MissingMetadata(format!("track {}", rating_key)))
}

/// Free text track search across every library on the server.
///
/// Endpoint
/// - `GET /search?query=..&type=10&limit=..`
pub async fn search_tracks(
    client: &Client,
    base_url: &Url,
    user_token: &str,
    query: &str,
    limit: u32,
) -> Result<Vec<PlexTrack>, PlexApiError> {
    let mut url = base_url.join("search")?;
    url.query_pairs_mut()
        .append_pair("query", query)
        .append_pair("type", TRACK_TYPE)
        .append_pair("limit", &limit.to_string());

    let res: PlexResponse<PlexTrack> = send_json(client.get(url), user_token).await?;

    Ok(res.media_container.metadata)
}
