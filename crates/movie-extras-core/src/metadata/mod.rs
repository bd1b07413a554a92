pub mod resolver;
pub mod tmdb;

use serde::Deserialize;

use crate::error::Error;
use crate::storage::models::MediaType;

pub use resolver::MetadataResolver;
pub use tmdb::TmdbClient;

/// A search hit or details payload. Movie and TV payloads name their fields
/// differently; the aliases fold both into one shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaInfo {
    pub id: u64,
    #[serde(alias = "name")]
    pub title: Option<String>,
    #[serde(alias = "original_name")]
    pub original_title: Option<String>,
    #[serde(alias = "first_air_date")]
    pub release_date: Option<String>,
}

impl MediaInfo {
    /// Year from a `YYYY-MM-DD` release date.
    pub fn release_year(&self) -> Option<i32> {
        let date = self.release_date.as_deref()?;
        date.get(..4)?.parse().ok()
    }

    pub fn release_month(&self) -> Option<u32> {
        let date = self.release_date.as_deref()?;
        date.get(5..7)?.parse().ok()
    }
}

/// A video the metadata service links to an item, e.g. `{type: "Trailer", key: "abc"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkedVideo {
    #[serde(rename = "type")]
    pub video_type: String,
    pub key: String,
    #[serde(default)]
    pub site: Option<String>,
}

/// Read-only movie/TV database.
pub trait MetadataService {
    fn search(&self, query: &str, media_type: MediaType) -> Result<Vec<MediaInfo>, Error>;

    fn details(&self, id: u64, media_type: MediaType) -> Result<MediaInfo, Error>;

    fn linked_videos(&self, id: u64, media_type: MediaType) -> Result<Vec<LinkedVideo>, Error>;
}
