use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{LinkedVideo, MediaInfo, MetadataService};
use crate::error::Error;
use crate::retry::RetryPolicy;
use crate::storage::models::MediaType;

const MASK: &str = "[masked]";

/// Blocking client for the TMDB v3 API.
pub struct TmdbClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MediaInfo>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    results: Vec<LinkedVideo>,
}

impl TmdbClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(10))
            .build();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry: RetryPolicy::metadata_default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Keep the API key out of anything that gets logged.
    fn mask(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.api_key, MASK)
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        page_name: &str,
    ) -> Result<T, Error> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Browsing {}: {}?api_key={}", page_name, url, MASK);

        let mut last_failure = String::new();
        for attempt in 1..=self.retry.attempts {
            let mut request = self
                .agent
                .get(&url)
                .query("api_key", &self.api_key)
                .query("language", "en-US");
            for (key, value) in params {
                request = request.query(key, value);
            }

            match request.call() {
                Ok(response) => {
                    return response.into_json::<T>().map_err(|e| {
                        Error::MetadataNotFound(format!("unreadable {}: {}", page_name, e))
                    });
                }
                Err(ureq::Error::Status(404, _)) => {
                    return Err(Error::MetadataNotFound(format!("{} not found", page_name)));
                }
                Err(ureq::Error::Status(code, _)) if code == 429 || code >= 500 => {
                    last_failure = format!("HTTP {}", code);
                }
                Err(ureq::Error::Status(code, _)) => {
                    return Err(Error::MetadataNotFound(format!(
                        "{} returned HTTP {}",
                        page_name, code
                    )));
                }
                Err(ureq::Error::Transport(transport)) => {
                    last_failure = self.mask(&transport.to_string());
                }
            }

            warn!(
                "Failed to download {} (attempt {}/{}): {}",
                page_name, attempt, self.retry.attempts, last_failure
            );
            if attempt < self.retry.attempts {
                self.retry.pause();
            }
        }

        Err(Error::ServiceUnavailable(format!(
            "{}: {}; you might have lost your internet connection",
            page_name, last_failure
        )))
    }
}

impl MetadataService for TmdbClient {
    fn search(&self, query: &str, media_type: MediaType) -> Result<Vec<MediaInfo>, Error> {
        let path = format!("/search/{}", media_type.as_str());
        let response: SearchResponse = self.get_json(
            &path,
            &[("query", query), ("page", "1"), ("include_adult", "false")],
            "tmdb search page",
        )?;
        Ok(response.results)
    }

    fn details(&self, id: u64, media_type: MediaType) -> Result<MediaInfo, Error> {
        let path = format!("/{}/{}", media_type.as_str(), id);
        self.get_json(&path, &[], "tmdb media details")
    }

    fn linked_videos(&self, id: u64, media_type: MediaType) -> Result<Vec<LinkedVideo>, Error> {
        let path = format!("/{}/{}/videos", media_type.as_str(), id);
        let response: VideosResponse = self.get_json(&path, &[], "tmdb media videos")?;
        Ok(response.results)
    }
}
