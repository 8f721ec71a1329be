use serde::Deserialize;
use serde_json::{Map, Value};

/// A music track as returned by playlist item, library and search endpoints.
///
/// Only the fields the client relies on are modelled. Everything else the server
/// sends is kept in `raw`, which is where secondary artist information
/// (`originalTitle`, `parentTitle`, ...) lives.
#[derive(Debug, Clone, Deserialize)]
pub struct PlexTrack {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub duration: Option<u64>,

    #[serde(rename = "grandparentTitle", default)]
    pub artist: Option<String>,

    #[serde(rename = "Media", default)]
    pub media: Vec<PlexMedia>,

    #[serde(flatten)]
    pub raw: Map<String, Value>,
}

/// Media element containing Part information
#[derive(Debug, Clone, Deserialize)]
pub struct PlexMedia {
    #[serde(rename = "Part", default)]
    pub parts: Vec<PlexPart>,
}

/// Part element; `key` is the server path the audio can be streamed from.
#[derive(Debug, Clone, Deserialize)]
pub struct PlexPart {
    #[serde(default)]
    pub key: Option<String>,
}

impl PlexTrack {
    /// Key of the first streamable part, if the track has one.
    pub fn part_key(&self) -> Option<&str> {
        self.media
            .iter()
            .flat_map(|media| media.parts.iter())
            .find_map(|part| part.key.as_deref())
    }

    /// Album title, taken from the raw payload.
    pub fn album(&self) -> Option<&str> {
        self.raw_str("parentTitle")
    }

    /// Non-blank string field from the raw payload.
    pub fn raw_str(&self, field: &str) -> Option<&str> {
        self.raw
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
