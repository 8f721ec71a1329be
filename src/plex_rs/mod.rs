use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub mod library;
pub mod playlist;
pub mod track;

/// Docs:
/// https://developer.plex.tv/pms/#section/API-Info/Authenticating-with-Plex
#[derive(Debug, thiserror::Error)]
pub enum PlexApiError {
    #[error("Failed to reach Plex server: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Plex server rejected the access token ({0})")]
    Unauthorized(StatusCode),
    #[error("Plex server responded with {0}")]
    Status(StatusCode),
    #[error("Failed to parse Plex response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("Invalid Plex URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Plex response had no Metadata for {0}")]
    MissingMetadata(String),
}

impl PlexApiError {
    /// True when the server could not be reached or refused our credentials.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PlexApiError::Request(_) | PlexApiError::Unauthorized(_))
    }
}

/* ---------- Core response envelope ---------- */

/// Plex responses are wrapped in a top level `MediaContainer`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlexResponse<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: PlexMediaContainer<T>,
}

/// The inner Plex MediaContainer payload.
///
/// Notes
/// - `size`, `totalSize`, and `offset` commonly appear on list endpoints.
/// - `metadata` defaults to an empty vec when missing (Plex omits it for empty pages).
#[derive(Debug, Clone, Deserialize)]
pub struct PlexMediaContainer<T> {
    #[serde(default)]
    pub size: Option<u32>,

    #[serde(rename = "totalSize", default)]
    pub total_size: Option<u32>,

    #[serde(default)]
    pub offset: Option<u32>,

    #[serde(rename = "Metadata", default = "Vec::new")]
    pub metadata: Vec<T>,
}

/// Sends a request with the Plex headers and decodes the JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    user_token: &str,
) -> Result<T, PlexApiError> {
    let response = request
        .header("Accept", "application/json")
        .header("X-Plex-Token", user_token)
        .send()
        .await
        .map_err(PlexApiError::Request)?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PlexApiError::Unauthorized(status));
    }
    if !status.is_success() {
        return Err(PlexApiError::Status(status));
    }

    response.json::<T>().await.map_err(PlexApiError::Decode)
}

/// Adds the paging headers Plex understands on list endpoints.
pub(crate) fn with_container_window(request: RequestBuilder, start: u32, size: u32) -> RequestBuilder {
    request
        .header("X-Plex-Container-Start", start.to_string())
        .header("X-Plex-Container-Size", size.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_without_metadata_is_empty() {
        let json = r#"{"MediaContainer":{"size":0,"totalSize":12}}"#;
        let parsed: PlexResponse<serde_json::Value> = serde_json::from_str(json).unwrap();

        assert!(parsed.media_container.metadata.is_empty());
        assert_eq!(parsed.media_container.total_size, Some(12));
    }

    #[test]
    fn test_unauthorized_counts_as_unavailable() {
        assert!(PlexApiError::Unauthorized(StatusCode::UNAUTHORIZED).is_unavailable());
        assert!(!PlexApiError::Status(StatusCode::INTERNAL_SERVER_ERROR).is_unavailable());
        assert!(!PlexApiError::MissingMetadata("42".into()).is_unavailable());
    }
}
