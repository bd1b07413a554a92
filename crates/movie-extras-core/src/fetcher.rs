use chrono::NaiveDate;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::candidate::Candidate;
use crate::error::Error;
use crate::extra_config::{ExtraTypeConfig, SearchSource, SearchTemplate};
use crate::metadata::MetadataService;
use crate::retriever::{RetrievalKind, VideoMetadata, VideoRetriever};
use crate::retry::RetryPolicy;
use crate::storage::models::{ExtraType, FolderRecord};
use crate::text;

const WATCH_URL_MARKER: &str = "youtube.com/watch?v=";
const LINKED_VIDEO_SITE: &str = "YouTube";

/// Candidates for one extra-type config. Official trailers appear in both lists.
#[derive(Debug, Default)]
pub struct FetchResult {
    pub candidates: Vec<Candidate>,
    pub play_trailers: Vec<Candidate>,
}

/// Collects links from every search template of a config and resolves them
/// into candidates. Owns the pacing of platform searches across folders.
pub struct CandidateFetcher<'a> {
    metadata: &'a dyn MetadataService,
    retriever: &'a dyn VideoRetriever,
    retry: RetryPolicy,
    search_interval: Duration,
    last_search: Option<Instant>,
}

impl<'a> CandidateFetcher<'a> {
    pub fn new(
        metadata: &'a dyn MetadataService,
        retriever: &'a dyn VideoRetriever,
        search_interval: Duration,
    ) -> Self {
        Self {
            metadata,
            retriever,
            retry: RetryPolicy::resolve_default(),
            search_interval,
            last_search: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn fetch(
        &mut self,
        record: &FolderRecord,
        config: &ExtraTypeConfig,
        today: NaiveDate,
    ) -> Result<FetchResult, Error> {
        let mut links = Vec::new();
        for search in &config.searches {
            let found = match search.source {
                SearchSource::Tmdb => self.linked_video_links(record, config.extra_type, search)?,
                SearchSource::Ytsearch => self.platform_search_links(record, search)?,
            };
            debug!("Search '{}' found {} links", search.query, found.len());
            links.extend(found);
        }

        let links = dedup_links(links);
        info!(
            "Resolving {} unique links for {}",
            links.len(),
            config.extra_type
        );

        let mut result = FetchResult::default();
        for url in links {
            let Some(metadata) = self.resolve_with_retry(&url)? else {
                continue;
            };
            let candidate = Candidate::from_metadata(metadata, config.extra_type, today);
            debug!(
                "Candidate {}: duration={:?} views={} adjusted_rating={:.3} resolution={} views_per_day={:.2}",
                candidate.url,
                candidate.duration,
                candidate.view_count,
                candidate.adjusted_rating,
                candidate.resolution,
                candidate.views_per_day
            );
            if candidate.is_official_trailer() {
                result.play_trailers.push(candidate.clone());
            }
            result.candidates.push(candidate);
        }

        Ok(result)
    }

    fn linked_video_links(
        &self,
        record: &FolderRecord,
        extra_type: ExtraType,
        search: &SearchTemplate,
    ) -> Result<Vec<String>, Error> {
        let Some(id) = record.tmdb_id else {
            error!("No metadata id for '{}', skipping linked videos", record.name);
            return Ok(Vec::new());
        };

        let videos = match self.metadata.linked_videos(id, record.media_type) {
            Ok(videos) => videos,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("No linked videos for '{}': {}", record.name, e);
                return Ok(Vec::new());
            }
        };

        Ok(videos
            .into_iter()
            .filter(|video| {
                debug!("Found: type={} key={}", video.video_type, video.key);
                ExtraType::from_linked_video_type(&video.video_type) == Some(extra_type)
            })
            .filter(|video| {
                video
                    .site
                    .as_deref()
                    .map_or(true, |site| site.eq_ignore_ascii_case(LINKED_VIDEO_SITE))
            })
            .map(|video| format!("https://www.youtube.com/watch?v={}", video.key))
            .take(search.limit)
            .collect())
    }

    fn platform_search_links(
        &mut self,
        record: &FolderRecord,
        search: &SearchTemplate,
    ) -> Result<Vec<String>, Error> {
        let query = text::apply_query_template(&search.query, &record.template_values());

        for attempt in 1..=self.retry.attempts {
            self.wait_for_search_slot();
            match self.retriever.search(&query, search.limit) {
                Ok(mut urls) => {
                    urls.truncate(search.limit);
                    return Ok(urls);
                }
                Err(e) if e.kind == RetrievalKind::Transient => {
                    warn!(
                        "Search for '{}' failed (attempt {}/{}): {}",
                        query, attempt, self.retry.attempts, e.message
                    );
                    if attempt < self.retry.attempts {
                        self.retry.pause();
                    }
                }
                Err(e) => {
                    warn!("Search for '{}' failed: {}", query, e.message);
                    return Ok(Vec::new());
                }
            }
        }

        Err(Error::ServiceUnavailable(format!(
            "video search for '{}' kept failing",
            query
        )))
    }

    /// Block until `search_interval` has passed since the previous platform search.
    fn wait_for_search_slot(&mut self) {
        if let Some(last) = self.last_search {
            let elapsed = last.elapsed();
            if elapsed < self.search_interval {
                thread::sleep(self.search_interval - elapsed);
            }
        }
        self.last_search = Some(Instant::now());
    }

    /// `Ok(None)` drops the candidate; exhausting retries on transient errors
    /// ends the run.
    fn resolve_with_retry(&self, url: &str) -> Result<Option<VideoMetadata>, Error> {
        for attempt in 1..=self.retry.attempts {
            match self.retriever.resolve(url) {
                Ok(metadata) => return Ok(Some(metadata)),
                Err(e) if e.kind == RetrievalKind::Transient => {
                    warn!(
                        "Failed to get video data for {} (attempt {}/{}): {}",
                        url, attempt, self.retry.attempts, e.message
                    );
                    if attempt < self.retry.attempts {
                        self.retry.pause();
                    }
                }
                Err(e) => {
                    warn!("Dropping {}: {}", url, e.message);
                    return Ok(None);
                }
            }
        }

        Err(Error::ServiceUnavailable(format!(
            "video data for {} kept failing",
            url
        )))
    }
}

/// Keep watch urls only, dropping any url that contains or is contained in
/// one already kept.
pub fn dedup_links(links: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for link in links {
        if !link.contains(WATCH_URL_MARKER) {
            continue;
        }
        let seen = unique
            .iter()
            .any(|kept| kept.contains(link.as_str()) || link.contains(kept.as_str()));
        if !seen {
            unique.push(link);
        }
    }
    unique
}
