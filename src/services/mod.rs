pub mod artist;
pub mod collection_cache;
pub mod playlist_loader;
pub mod plex;
