use crate::plex_rs::PlexApiError;
use crate::plex_rs::playlist::PlexPlaylist;
use crate::plex_rs::track::PlexTrack;

/// Port trait wrapping the Plex API capabilities used by the loader and resolver.
///
/// Implementations live in `services::plex::client` (production) or test mocks.
/// The implementation knows the server URL and token, so callers only deal in ids.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlexClient: Send + Sync {
    async fn get_playlists(&self) -> Result<Vec<PlexPlaylist>, PlexApiError>;

    /// The collection itself, used as the dedicated count query (`leafCount`).
    async fn get_collection(&self, collection_id: &str) -> Result<PlexPlaylist, PlexApiError>;

    async fn get_collection_items_page(
        &self,
        collection_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<PlexTrack>, PlexApiError>;

    async fn get_music_section_id(&self) -> Result<Option<String>, PlexApiError>;

    async fn search_library(
        &self,
        container_id: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<PlexTrack>, PlexApiError>;

    /// Tracks of a section in server sort order, e.g. `addedAt:desc`.
    async fn get_library_sorted(
        &self,
        container_id: &str,
        sort: &str,
        limit: u32,
    ) -> Result<Vec<PlexTrack>, PlexApiError>;

    async fn get_recently_added(
        &self,
        container_id: &str,
        limit: u32,
    ) -> Result<Vec<PlexTrack>, PlexApiError>;

    async fn get_track_metadata(&self, track_id: &str) -> Result<PlexTrack, PlexApiError>;

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<PlexTrack>, PlexApiError>;

    /// Absolute, token-bearing URL the external player can stream `part_key` from.
    fn stream_url(&self, part_key: &str) -> Option<String>;
}
