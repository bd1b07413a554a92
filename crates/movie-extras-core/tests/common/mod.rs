#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use movie_extras_core::extra_config::{load_extra_config, ExtraTypeConfig};
use movie_extras_core::metadata::{LinkedVideo, MediaInfo, MetadataService};
use movie_extras_core::retriever::{
    DownloadOptions, RetrievalError, RetrievalKind, VideoMetadata, VideoRetriever,
};
use movie_extras_core::{AppConfig, Error, MediaType};

pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

pub fn watch_url(id: &str) -> String {
    format!("{}{}", WATCH_URL, id)
}

pub fn media_info(id: u64, title: &str, date: &str) -> MediaInfo {
    MediaInfo {
        id,
        title: Some(title.to_string()),
        original_title: Some(title.to_string()),
        release_date: Some(date.to_string()),
    }
}

/// Metadata service answering from fixed tables.
#[derive(Default)]
pub struct FakeMetadata {
    pub search_results: Vec<MediaInfo>,
    pub linked: Vec<LinkedVideo>,
    /// Queries that find nothing.
    pub no_match: Vec<String>,
    pub unavailable: bool,
}

impl FakeMetadata {
    pub fn with_movie(info: MediaInfo) -> Self {
        Self {
            search_results: vec![info],
            ..Self::default()
        }
    }

    pub fn link(mut self, video_type: &str, key: &str) -> Self {
        self.linked.push(LinkedVideo {
            video_type: video_type.to_string(),
            key: key.to_string(),
            site: Some("YouTube".to_string()),
        });
        self
    }
}

impl MetadataService for FakeMetadata {
    fn search(&self, query: &str, _media_type: MediaType) -> Result<Vec<MediaInfo>, Error> {
        if self.unavailable {
            return Err(Error::ServiceUnavailable("offline".to_string()));
        }
        if self.no_match.iter().any(|q| q == query) {
            return Ok(Vec::new());
        }
        Ok(self.search_results.clone())
    }

    fn details(&self, id: u64, _media_type: MediaType) -> Result<MediaInfo, Error> {
        self.search_results
            .iter()
            .find(|info| info.id == id)
            .cloned()
            .ok_or_else(|| Error::MetadataNotFound(format!("id {}", id)))
    }

    fn linked_videos(&self, _id: u64, _media_type: MediaType) -> Result<Vec<LinkedVideo>, Error> {
        if self.unavailable {
            return Err(Error::ServiceUnavailable("offline".to_string()));
        }
        Ok(self.linked.clone())
    }
}

pub struct FakeVideo {
    pub metadata: VideoMetadata,
    /// File name and content of everything one download writes.
    pub files: Vec<(String, Vec<u8>)>,
}

/// Retrieval tool backed by in-memory videos. Downloads write `<id>.mp4`
/// with the video's content into the destination directory, unless the
/// video was added with explicit files.
#[derive(Default)]
pub struct FakeRetriever {
    videos: HashMap<String, FakeVideo>,
    pub search_hits: Vec<String>,
    failures: RefCell<HashMap<String, VecDeque<RetrievalError>>>,
    pub downloaded: RefCell<Vec<String>>,
    pub searches: RefCell<Vec<String>>,
}

impl FakeRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, metadata: VideoMetadata, content: &[u8]) {
        let file_name = format!("{}.mp4", metadata.id);
        self.add_files(metadata, &[(file_name.as_str(), content)]);
    }

    pub fn add_files(&mut self, metadata: VideoMetadata, files: &[(&str, &[u8])]) {
        self.videos.insert(
            watch_url(&metadata.id),
            FakeVideo {
                metadata,
                files: files
                    .iter()
                    .map(|(name, content)| (name.to_string(), content.to_vec()))
                    .collect(),
            },
        );
    }

    /// Queue failures returned by the next downloads of `id`, in order.
    pub fn fail_download(&self, id: &str, kind: RetrievalKind, times: usize) {
        let mut failures = self.failures.borrow_mut();
        let queue = failures.entry(watch_url(id)).or_default();
        for _ in 0..times {
            queue.push_back(RetrievalError::new(kind, format!("ERROR: {:?} for {}", kind, id)));
        }
    }

    pub fn downloaded_ids(&self) -> Vec<String> {
        self.downloaded
            .borrow()
            .iter()
            .map(|url| url.trim_start_matches(WATCH_URL).to_string())
            .collect()
    }
}

impl VideoRetriever for FakeRetriever {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, RetrievalError> {
        self.searches.borrow_mut().push(query.to_string());
        Ok(self.search_hits.iter().take(limit).cloned().collect())
    }

    fn resolve(&self, url: &str) -> Result<VideoMetadata, RetrievalError> {
        self.videos
            .get(url)
            .map(|video| video.metadata.clone())
            .ok_or_else(|| RetrievalError::new(RetrievalKind::Unavailable, "Video unavailable"))
    }

    fn download(
        &self,
        url: &str,
        _options: &DownloadOptions,
        dest: &Path,
    ) -> Result<(), RetrievalError> {
        if let Some(error) = self
            .failures
            .borrow_mut()
            .get_mut(url)
            .and_then(|queue| queue.pop_front())
        {
            return Err(error);
        }
        let video = self
            .videos
            .get(url)
            .ok_or_else(|| RetrievalError::new(RetrievalKind::Unavailable, "Video unavailable"))?;
        for (name, content) in &video.files {
            fs::write(dest.join(name), content)
                .map_err(|e| RetrievalError::new(RetrievalKind::Other, e.to_string()))?;
        }
        self.downloaded.borrow_mut().push(url.to_string());
        Ok(())
    }
}

pub fn video(id: &str, title: &str, duration: f64, uploader: &str, views: u64) -> VideoMetadata {
    VideoMetadata {
        id: id.to_string(),
        webpage_url: Some(watch_url(id)),
        title: Some(title.to_string()),
        duration: Some(duration),
        uploader: Some(uploader.to_string()),
        view_count: Some(views),
        average_rating: Some(4.5),
        width: Some(1920),
        height: Some(1080),
        upload_date: Some("20100510".to_string()),
        tags: Some(Vec::new()),
        categories: Some(vec!["Film & Animation".to_string()]),
        format: Some("137 - 1920x1080".to_string()),
    }
}

pub fn app_config(root: &Path) -> AppConfig {
    AppConfig {
        tmdb_api_key: "test-key".to_string(),
        tmdb_api_url: "http://127.0.0.1:9".to_string(),
        records_dir: root.join("records"),
        scratch_dir: root.join("tmp"),
        extra_configs_dir: root.join("extra_configs"),
        yt_dlp_path: PathBuf::from("yt-dlp"),
        search_interval_secs: 0,
    }
}

pub const TRAILERS_CONFIG: &str = r#"
extra_type = "trailers"
config_id = "trailers-v1"

[[searches]]
query = "{title} {year} trailer"
limit = 10

[filtering]
required_phrases = ["trailer"]
banned_channels = ["SpamClips"]

[priority_rules]
order = "highest_view_count"
"#;

/// Write `document` into `dir` and load it the way the CLI does.
pub fn extra_config(dir: &Path, file_name: &str, document: &str) -> ExtraTypeConfig {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(file_name);
    fs::write(&path, document).unwrap();
    load_extra_config(&path).unwrap()
}

pub fn zero_delay(attempts: u32) -> movie_extras_core::retry::RetryPolicy {
    movie_extras_core::retry::RetryPolicy::new(attempts, Duration::ZERO)
}
