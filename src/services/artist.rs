use std::sync::Arc;

use crate::model::UNKNOWN_ARTIST;
use crate::plex_rs::track::PlexTrack;
use crate::ports::plex::PlexClient;

/// Raw payload fields that can stand in for the artist, best first.
/// `grandparentTitle` is already the direct field, so it never lands here.
/// `parentTitle` is the album, which beats showing nothing.
const EMBEDDED_ARTIST_FIELDS: [&str; 2] = ["originalTitle", "parentTitle"];

/// One way of finding a track's artist. Returning `None` hands over to the next strategy.
#[async_trait::async_trait]
pub trait ArtistStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Strategies that cost a round trip are skipped for bulk loads.
    fn needs_network(&self) -> bool {
        false
    }

    async fn resolve(&self, record: &PlexTrack) -> Option<String>;
}

/// `grandparentTitle` on the record itself.
pub struct DirectField;

#[async_trait::async_trait]
impl ArtistStrategy for DirectField {
    fn name(&self) -> &'static str {
        "direct-field"
    }

    async fn resolve(&self, record: &PlexTrack) -> Option<String> {
        direct_artist(record)
    }
}

/// The rest of the payload that came with the record.
pub struct EmbeddedMetadata;

#[async_trait::async_trait]
impl ArtistStrategy for EmbeddedMetadata {
    fn name(&self) -> &'static str {
        "embedded-metadata"
    }

    async fn resolve(&self, record: &PlexTrack) -> Option<String> {
        embedded_artist(record)
    }
}

/// Re-fetches the full metadata for the track and looks again.
pub struct RemoteLookup<C: PlexClient> {
    client: Arc<C>,
}

impl<C: PlexClient> RemoteLookup<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl<C: PlexClient> ArtistStrategy for RemoteLookup<C> {
    fn name(&self) -> &'static str {
        "remote-lookup"
    }

    fn needs_network(&self) -> bool {
        true
    }

    async fn resolve(&self, record: &PlexTrack) -> Option<String> {
        match self.client.get_track_metadata(&record.rating_key).await {
            Ok(full) => direct_artist(&full).or_else(|| embedded_artist(&full)),
            Err(e) => {
                tracing::debug!(
                    track_id = %record.rating_key,
                    "Metadata lookup for artist failed: {}",
                    e
                );
                None
            }
        }
    }
}

fn direct_artist(record: &PlexTrack) -> Option<String> {
    record
        .artist
        .as_deref()
        .map(str::trim)
        .filter(|artist| !artist.is_empty())
        .map(str::to_string)
}

fn embedded_artist(record: &PlexTrack) -> Option<String> {
    EMBEDDED_ARTIST_FIELDS
        .iter()
        .find_map(|field| record.raw_str(field))
        .map(str::to_string)
}

/// Ordered fallback chain producing a display artist for a track record.
pub struct ArtistResolver {
    strategies: Vec<Box<dyn ArtistStrategy>>,
}

impl ArtistResolver {
    pub fn new(strategies: Vec<Box<dyn ArtistStrategy>>) -> Self {
        Self { strategies }
    }

    /// Direct field, then embedded metadata, then a metadata lookup through `client`.
    pub fn with_client<C: PlexClient + 'static>(client: Arc<C>) -> Self {
        Self::new(vec![
            Box::new(DirectField),
            Box::new(EmbeddedMetadata),
            Box::new(RemoteLookup::new(client)),
        ])
    }

    /// Runs the strategies in order and stops at the first answer.
    /// Never fails: an exhausted chain yields [`UNKNOWN_ARTIST`].
    pub async fn resolve(&self, record: &PlexTrack, allow_remote: bool) -> String {
        for strategy in &self.strategies {
            if strategy.needs_network() && !allow_remote {
                continue;
            }
            if let Some(artist) = strategy.resolve(record).await {
                tracing::trace!(
                    track_id = %record.rating_key,
                    strategy = strategy.name(),
                    "Resolved artist"
                );
                return artist;
            }
        }

        tracing::debug!(
            track_id = %record.rating_key,
            "No artist found for track, using sentinel"
        );
        UNKNOWN_ARTIST.to_string()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::plex_rs::PlexApiError;
    use crate::plex_rs::track::test_support::record;
    use crate::ports::plex::MockPlexClient;

    #[tokio::test]
    async fn test_direct_field_skips_network() {
        // No expectations: any call on the mock panics.
        let client = Arc::new(MockPlexClient::new());
        let resolver = ArtistResolver::with_client(client);

        let artist = resolver
            .resolve(&record("1", Some("Boards of Canada"), json!({})), true)
            .await;

        assert_eq!(artist, "Boards of Canada");
    }

    #[tokio::test]
    async fn test_embedded_metadata_used_when_field_missing() {
        let client = Arc::new(MockPlexClient::new());
        let resolver = ArtistResolver::with_client(client);

        let artist = resolver
            .resolve(&record("1", None, json!({"originalTitle": "X"})), true)
            .await;

        assert_eq!(artist, "X");
    }

    #[tokio::test]
    async fn test_grandparent_title_is_read_as_the_direct_field() {
        let client = Arc::new(MockPlexClient::new());
        let resolver = ArtistResolver::with_client(client);
        let record: PlexTrack =
            serde_json::from_value(json!({"ratingKey": "1", "grandparentTitle": "Direct"}))
                .unwrap();

        assert!(!record.raw.contains_key("grandparentTitle"));
        assert_eq!(resolver.resolve(&record, false).await, "Direct");
    }

    #[tokio::test]
    async fn test_blank_direct_field_falls_through() {
        let client = Arc::new(MockPlexClient::new());
        let resolver = ArtistResolver::with_client(client);

        let artist = resolver
            .resolve(&record("1", Some("   "), json!({"parentTitle": "Album Name"})), true)
            .await;

        assert_eq!(artist, "Album Name");
    }

    #[tokio::test]
    async fn test_remote_lookup_as_last_resort() {
        let mut client = MockPlexClient::new();
        client
            .expect_get_track_metadata()
            .withf(|id| id == "7")
            .times(1)
            .returning(|id| Ok(record(id, Some("Remote Artist"), json!({}))));
        let resolver = ArtistResolver::with_client(Arc::new(client));

        let artist = resolver.resolve(&record("7", None, json!({})), true).await;

        assert_eq!(artist, "Remote Artist");
    }

    #[tokio::test]
    async fn test_remote_lookup_skipped_when_disallowed() {
        let client = Arc::new(MockPlexClient::new());
        let resolver = ArtistResolver::with_client(client);

        let artist = resolver.resolve(&record("7", None, json!({})), false).await;

        assert_eq!(artist, UNKNOWN_ARTIST);
    }

    #[tokio::test]
    async fn test_remote_failure_yields_sentinel() {
        let mut client = MockPlexClient::new();
        client
            .expect_get_track_metadata()
            .times(1)
            .returning(|_| Err(PlexApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        let resolver = ArtistResolver::with_client(Arc::new(client));

        let artist = resolver.resolve(&record("7", None, json!({})), true).await;

        assert_eq!(artist, UNKNOWN_ARTIST);
    }

    #[tokio::test]
    async fn test_remote_record_embedded_metadata() {
        let mut client = MockPlexClient::new();
        client
            .expect_get_track_metadata()
            .times(1)
            .returning(|id| Ok(record(id, None, json!({"originalTitle": "Featured"}))));
        let resolver = ArtistResolver::with_client(Arc::new(client));

        let artist = resolver.resolve(&record("7", None, json!({})), true).await;

        assert_eq!(artist, "Featured");
    }
}
