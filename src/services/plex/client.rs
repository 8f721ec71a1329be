use reqwest::Client;
use url::Url;

use crate::plex_rs::PlexApiError;
use crate::plex_rs::library::{
    find_music_section_id, get_library_sections, get_metadata, get_recently_added,
    search_section_tracks, search_tracks,
};
use crate::plex_rs::playlist::{
    PlexPlaylist, get_playlist, get_playlist_items_page, get_playlists, is_music_playlist,
};
use crate::plex_rs::track::PlexTrack;
use crate::ports::plex::PlexClient;

pub struct PlexHttpAdapter {
    client: Client,
    server_url: Url,
    token: String,
}

impl PlexHttpAdapter {
    pub fn new(server_url: Url, token: String) -> Self {
        Self {
            client: Client::new(),
            server_url,
            token,
        }
    }
}

#[async_trait::async_trait]
impl PlexClient for PlexHttpAdapter {
    async fn get_playlists(&self) -> Result<Vec<PlexPlaylist>, PlexApiError> {
        let playlists = get_playlists(&self.client, &self.server_url, &self.token).await?;
        Ok(playlists.into_iter().filter(is_music_playlist).collect())
    }

    async fn get_collection(&self, collection_id: &str) -> Result<PlexPlaylist, PlexApiError> {
        get_playlist(&self.client, &self.server_url, &self.token, collection_id).await
    }

    async fn get_collection_items_page(
        &self,
        collection_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<PlexTrack>, PlexApiError> {
        let container = get_playlist_items_page(
            &self.client,
            &self.server_url,
            &self.token,
            collection_id,
            offset,
            limit,
        )
        .await?;
        Ok(container.metadata)
    }

    async fn get_music_section_id(&self) -> Result<Option<String>, PlexApiError> {
        let sections = get_library_sections(&self.client, &self.server_url, &self.token).await?;
        Ok(find_music_section_id(&sections).map(str::to_string))
    }

    async fn search_library(
        &self,
        container_id: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<PlexTrack>, PlexApiError> {
        search_section_tracks(
            &self.client,
            &self.server_url,
            &self.token,
            container_id,
            query,
            None,
            limit,
        )
        .await
    }

    async fn get_library_sorted(
        &self,
        container_id: &str,
        sort: &str,
        limit: u32,
    ) -> Result<Vec<PlexTrack>, PlexApiError> {
        search_section_tracks(
            &self.client,
            &self.server_url,
            &self.token,
            container_id,
            "",
            Some(sort),
            limit,
        )
        .await
    }

    async fn get_recently_added(
        &self,
        container_id: &str,
        limit: u32,
    ) -> Result<Vec<PlexTrack>, PlexApiError> {
        get_recently_added(
            &self.client,
            &self.server_url,
            &self.token,
            container_id,
            limit,
        )
        .await
    }

    async fn get_track_metadata(&self, track_id: &str) -> Result<PlexTrack, PlexApiError> {
        get_metadata(&self.client, &self.server_url, &self.token, track_id).await
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<PlexTrack>, PlexApiError> {
        search_tracks(&self.client, &self.server_url, &self.token, query, limit).await
    }

    fn stream_url(&self, part_key: &str) -> Option<String> {
        let mut url = self
            .server_url
            .join(part_key.trim_start_matches('/'))
            .ok()?;
        url.query_pairs_mut().append_pair("X-Plex-Token", &self.token);
        Some(url.to_string())
    }
}
