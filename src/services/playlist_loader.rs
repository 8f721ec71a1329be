use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::{StreamExt, stream};
use tokio::sync::OnceCell;

use crate::config::LoadingConfig;
use crate::model::{Collection, CollectionKind, CollectionSummary, Track};
use crate::plex_rs::PlexApiError;
use crate::plex_rs::track::PlexTrack;
use crate::ports::plex::PlexClient;
use crate::services::artist::ArtistResolver;
use crate::services::collection_cache::CollectionCache;

/// Server sort key for the newest tracks first.
const RECENTLY_ADDED_SORT: &str = "addedAt:desc";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Plex server unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("Loading {collection_id} failed after {} tracks: {reason}", .loaded.len())]
    LoadFailed {
        collection_id: String,
        /// Tracks accumulated before the failure, in catalog order.
        loaded: Vec<Arc<Track>>,
        reason: String,
    },
    #[error("Search failed: {0}")]
    SearchFailed(String),
    #[error("Load of {0} was superseded by a newer request")]
    Superseded(String),
}

/// How a collection ended up being fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    Cache,
    /// Native paged playlist items.
    Paged,
    /// Capped library search, for playlists above the large threshold.
    LibrarySearch,
    RecentlyAdded,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub collection: Arc<Collection>,
    pub strategy: LoadStrategy,
}

impl LoadOutcome {
    pub fn from_cache(&self) -> bool {
        self.strategy == LoadStrategy::Cache
    }
}

/// Records fetched for one collection before artist resolution.
struct Fetched {
    records: Vec<PlexTrack>,
    declared_count: Option<u32>,
    partial: bool,
    strategy: LoadStrategy,
    allow_remote_artists: bool,
}

/// Loads collections through the Plex port, consulting and filling the cache.
pub struct PlaylistLoader<C: PlexClient> {
    client: Arc<C>,
    cache: CollectionCache,
    resolver: ArtistResolver,
    settings: LoadingConfig,
    /// Ticket of the newest load. Publishing to the cache happens under this lock.
    latest: Mutex<u64>,
    music_section: OnceCell<String>,
}

impl<C: PlexClient + 'static> PlaylistLoader<C> {
    pub fn new(client: Arc<C>, settings: LoadingConfig) -> Self {
        Self {
            resolver: ArtistResolver::with_client(client.clone()),
            client,
            cache: CollectionCache::new(),
            settings,
            latest: Mutex::new(0),
            music_section: OnceCell::new(),
        }
    }
}

impl<C: PlexClient> PlaylistLoader<C> {
    pub fn cache(&self) -> &CollectionCache {
        &self.cache
    }

    pub async fn get_playlists(&self) -> Result<Vec<CollectionSummary>, LoadError> {
        let playlists = self
            .client
            .get_playlists()
            .await
            .map_err(|e| LoadError::CatalogUnavailable(e.to_string()))?;

        let mut summaries = vec![CollectionSummary::recently_added()];
        summaries.extend(playlists.into_iter().map(CollectionSummary::from));
        Ok(summaries)
    }

    /// Loads a collection, serving it from the cache when possible.
    ///
    /// Starting a load supersedes every load started before it: those finish
    /// with [`LoadError::Superseded`] and leave the cache alone.
    #[tracing::instrument(skip_all, fields(collection_id = %summary.id))]
    pub async fn load(&self, summary: &CollectionSummary) -> Result<LoadOutcome, LoadError> {
        let ticket = self.next_ticket();
        self.load_with_ticket(summary, ticket).await
    }

    /// Drops any cached copy and loads again.
    pub async fn reload(&self, summary: &CollectionSummary) -> Result<LoadOutcome, LoadError> {
        self.cache.invalidate(&summary.id);
        self.load(summary).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Arc<Track>>, LoadError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let records = self
            .client
            .search(query, self.settings.search_limit)
            .await
            .map_err(|e| {
                if e.is_unavailable() {
                    LoadError::CatalogUnavailable(e.to_string())
                } else {
                    LoadError::SearchFailed(e.to_string())
                }
            })?;

        tracing::debug!("Search '{}' returned {} tracks", query, records.len());
        Ok(self
            .assemble(records, self.settings.resolve_remote_artists)
            .await)
    }

    fn next_ticket(&self) -> u64 {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest += 1;
        *latest
    }

    async fn load_with_ticket(
        &self,
        summary: &CollectionSummary,
        ticket: u64,
    ) -> Result<LoadOutcome, LoadError> {
        if let Some(collection) = self.cache.get(&summary.id) {
            tracing::debug!("Using cached tracks ({} loaded)", collection.len());
            return Ok(LoadOutcome {
                collection,
                strategy: LoadStrategy::Cache,
            });
        }

        let started = Instant::now();
        let fetched = match summary.kind {
            CollectionKind::RecentlyAdded => self.fetch_recently_added(&summary.id).await?,
            CollectionKind::Playlist => self.fetch_playlist(summary).await?,
        };
        let fetch_time = started.elapsed();

        let tracks = self
            .assemble(fetched.records, fetched.allow_remote_artists)
            .await;

        let collection = Collection {
            id: summary.id.clone(),
            title: summary.title.clone(),
            declared_count: fetched.declared_count,
            tracks,
            partial: fetched.partial,
            loaded_at: Utc::now(),
            generation: ticket,
        };

        tracing::info!(
            strategy = ?fetched.strategy,
            partial = collection.partial,
            "Loaded {} tracks{} ({:.2}s: fetch={:.2}s)",
            collection.len(),
            collection
                .declared_count
                .map(|count| format!(" (of {})", count))
                .unwrap_or_default(),
            started.elapsed().as_secs_f64(),
            fetch_time.as_secs_f64(),
        );

        let collection = self.publish(&summary.id, collection, ticket)?;
        Ok(LoadOutcome {
            collection,
            strategy: fetched.strategy,
        })
    }

    fn publish(
        &self,
        id: &str,
        collection: Collection,
        ticket: u64,
    ) -> Result<Arc<Collection>, LoadError> {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if *latest != ticket {
            tracing::debug!("Load superseded (ticket {} < {}), not caching", ticket, *latest);
            return Err(LoadError::Superseded(id.to_string()));
        }
        let collection = self.cache.put(id, collection);
        tracing::debug!("Cached {} ({} collections cached)", id, self.cache.len());
        Ok(collection)
    }

    async fn fetch_playlist(&self, summary: &CollectionSummary) -> Result<Fetched, LoadError> {
        let settings = &self.settings;
        let regular_limit = settings.regular_playlist_limit.min(settings.max_api_results);

        let Some(declared) = summary.declared_count.filter(|count| *count > 0) else {
            // Unknown size: ask for the count, then take the regular path regardless.
            let probed = self
                .client
                .get_collection(&summary.id)
                .await
                .map_err(|e| self.failure(&summary.id, e, Vec::new()))?
                .leaf_count;
            tracing::debug!("Declared size unknown, count query returned {:?}", probed);
            return self.fetch_paged(&summary.id, probed, regular_limit).await;
        };

        if declared > settings.large_playlist_threshold {
            tracing::info!(
                "Large playlist detected ({} tracks), loading {}",
                declared,
                settings.large_playlist_limit
            );
            self.fetch_library_search(&summary.id, declared).await
        } else {
            self.fetch_paged(&summary.id, Some(declared), regular_limit).await
        }
    }

    /// Playlist items in catalog order, up to `limit` or the declared count.
    async fn fetch_paged(
        &self,
        id: &str,
        count: Option<u32>,
        limit: u32,
    ) -> Result<Fetched, LoadError> {
        let settings = &self.settings;
        let page_size = settings.page_size.min(settings.max_api_results).max(1);
        let target = count
            .filter(|count| *count > 0)
            .map_or(limit, |count| count.min(limit));

        let mut records: Vec<PlexTrack> = Vec::new();
        let mut reached_end = false;

        while (records.len() as u32) < target {
            let offset = records.len() as u32;
            let size = page_size.min(target - offset);

            let page = match self.client.get_collection_items_page(id, offset, size).await {
                Ok(page) => page,
                Err(e) => {
                    let loaded = self.assemble(records, false).await;
                    return Err(self.failure(id, e, loaded));
                }
            };

            let page_len = page.len() as u32;
            records.extend(page.into_iter().take(size as usize));
            if page_len < size {
                reached_end = true;
                break;
            }
        }

        let loaded = records.len() as u32;
        let partial = match count {
            Some(count) => loaded < count,
            None => !reached_end,
        };

        Ok(Fetched {
            records,
            declared_count: count,
            partial,
            strategy: LoadStrategy::Paged,
            allow_remote_artists: settings.resolve_remote_artists,
        })
    }

    /// Large path: one capped search in the music section. Falls back to the
    /// playlist's own items, with the same cap, when the search fails.
    async fn fetch_library_search(&self, id: &str, declared: u32) -> Result<Fetched, LoadError> {
        let cap = self.large_cap();

        let searched = match self.music_section().await {
            Ok(section) => self
                .client
                .search_library(&section, "", cap)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match searched {
            Ok(mut records) => {
                records.truncate(cap as usize);
                Ok(Fetched {
                    partial: (records.len() as u32) < declared,
                    records,
                    declared_count: Some(declared),
                    strategy: LoadStrategy::LibrarySearch,
                    allow_remote_artists: false,
                })
            }
            Err(reason) => {
                tracing::warn!(
                    "Library search for {} failed ({}), loading playlist items instead",
                    id,
                    reason
                );
                let mut fetched = self.fetch_paged(id, Some(declared), cap).await?;
                fetched.allow_remote_artists = false;
                Ok(fetched)
            }
        }
    }

    /// Newest tracks of the music section. Falls back to the section listing
    /// sorted by date added when the recency endpoint fails.
    async fn fetch_recently_added(&self, id: &str) -> Result<Fetched, LoadError> {
        let section = self.music_section().await?;
        let cap = self.large_cap();

        let mut records = match self.client.get_recently_added(&section, cap).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "Recently added lookup failed ({}), sorting the library by date added",
                    e
                );
                self.client
                    .get_library_sorted(&section, RECENTLY_ADDED_SORT, cap)
                    .await
                    .map_err(|e| self.failure(id, e, Vec::new()))?
            }
        };
        records.truncate(cap as usize);

        Ok(Fetched {
            partial: records.len() as u32 >= cap,
            records,
            declared_count: None,
            strategy: LoadStrategy::RecentlyAdded,
            allow_remote_artists: false,
        })
    }

    fn large_cap(&self) -> u32 {
        self.settings
            .large_playlist_limit
            .min(self.settings.regular_playlist_limit)
            .min(self.settings.max_api_results)
    }

    async fn music_section(&self) -> Result<String, LoadError> {
        self.music_section
            .get_or_try_init(|| async {
                match self.client.get_music_section_id().await {
                    Ok(Some(id)) => Ok(id),
                    Ok(None) => Err(LoadError::CatalogUnavailable(
                        "No music library section found on Plex server".to_string(),
                    )),
                    Err(e) => Err(LoadError::CatalogUnavailable(e.to_string())),
                }
            })
            .await
            .cloned()
    }

    fn failure(&self, id: &str, error: PlexApiError, loaded: Vec<Arc<Track>>) -> LoadError {
        tracing::warn!("Loading {} failed after {} tracks: {}", id, loaded.len(), error);
        if error.is_unavailable() && loaded.is_empty() {
            LoadError::CatalogUnavailable(error.to_string())
        } else {
            LoadError::LoadFailed {
                collection_id: id.to_string(),
                loaded,
                reason: error.to_string(),
            }
        }
    }

    /// Turns records into tracks, resolving artists with bounded concurrency.
    /// Output order matches input order.
    async fn assemble(&self, records: Vec<PlexTrack>, allow_remote: bool) -> Vec<Arc<Track>> {
        let concurrency = self.settings.artist_lookup_concurrency.max(1);
        stream::iter(records)
            .map(|record| self.build_track(record, allow_remote))
            .buffered(concurrency)
            .collect()
            .await
    }

    async fn build_track(&self, record: PlexTrack, allow_remote: bool) -> Arc<Track> {
        let artist = self.resolver.resolve(&record, allow_remote).await;
        let stream_locator = record
            .part_key()
            .and_then(|part_key| self.client.stream_url(part_key));
        let title = match record.title.trim() {
            "" => "Unknown".to_string(),
            title => title.to_string(),
        };

        Arc::new(Track {
            album: record.album().map(str::to_string),
            duration: record.duration.map(Duration::from_millis),
            id: record.rating_key,
            title,
            artist,
            stream_locator,
        })
    }
}
