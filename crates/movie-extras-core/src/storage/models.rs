use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of library item a folder holds; selects the metadata service endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of supplementary video. The serialized name doubles as the
/// subdirectory the files land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExtraType {
    #[serde(rename = "trailers")]
    Trailers,
    #[serde(rename = "behind the scenes")]
    BehindTheScenes,
    #[serde(rename = "featurettes")]
    Featurettes,
    #[serde(rename = "scenes")]
    Scenes,
    #[serde(rename = "others")]
    Others,
    #[serde(rename = "theme-music")]
    ThemeMusic,
}

impl ExtraType {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ExtraType::Trailers => "trailers",
            ExtraType::BehindTheScenes => "behind the scenes",
            ExtraType::Featurettes => "featurettes",
            ExtraType::Scenes => "scenes",
            ExtraType::Others => "others",
            ExtraType::ThemeMusic => "theme-music",
        }
    }

    /// Map the metadata service's video type vocabulary onto extra types.
    pub fn from_linked_video_type(video_type: &str) -> Option<ExtraType> {
        match video_type {
            "Trailer" | "Teaser" => Some(ExtraType::Trailers),
            "Behind the Scenes" => Some(ExtraType::BehindTheScenes),
            "Featurette" => Some(ExtraType::Featurettes),
            "Clip" => Some(ExtraType::Scenes),
            "Bloopers" => Some(ExtraType::Others),
            _ => None,
        }
    }
}

impl fmt::Display for ExtraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One file placed into a media folder by a previous pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub hash: String,
    /// Relative to the media folder.
    pub file_path: PathBuf,
    pub file_name: String,
    pub source_id: String,
    pub extra_type: ExtraType,
}

/// Everything known about one media folder across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub name: String,
    pub full_path: PathBuf,
    pub media_type: MediaType,
    pub tmdb_id: Option<u64>,
    pub title: String,
    pub original_title: Option<String>,
    pub release_year: Option<i32>,
    #[serde(default)]
    pub title_keywords: BTreeSet<String>,
    #[serde(default)]
    pub original_title_keywords: BTreeSet<String>,
    #[serde(default)]
    pub banned_years: Vec<i32>,
    #[serde(default)]
    pub banned_title_keywords: Vec<String>,
    #[serde(default)]
    pub banned_source_ids: Vec<String>,
    #[serde(default)]
    pub trailer_source_id: Option<String>,
    #[serde(default)]
    pub completed_configs: Vec<String>,
    #[serde(default)]
    pub downloads: Vec<DownloadRecord>,
}

impl FolderRecord {
    pub fn new(full_path: &Path, media_type: MediaType) -> Self {
        let name = full_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            title: name.clone(),
            name,
            full_path: full_path.to_path_buf(),
            media_type,
            tmdb_id: None,
            original_title: None,
            release_year: None,
            title_keywords: BTreeSet::new(),
            original_title_keywords: BTreeSet::new(),
            banned_years: Vec::new(),
            banned_title_keywords: Vec::new(),
            banned_source_ids: Vec::new(),
            trailer_source_id: None,
            completed_configs: Vec::new(),
            downloads: Vec::new(),
        }
    }

    pub fn is_completed(&self, config_id: &str) -> bool {
        self.completed_configs.iter().any(|id| id == config_id)
    }

    pub fn mark_completed(&mut self, config_id: &str) {
        if !self.is_completed(config_id) {
            self.completed_configs.push(config_id.to_string());
        }
    }

    pub fn is_banned_source(&self, source_id: &str) -> bool {
        self.banned_source_ids.iter().any(|id| id == source_id)
    }

    pub fn ban_source(&mut self, source_id: &str) {
        if !self.is_banned_source(source_id) {
            self.banned_source_ids.push(source_id.to_string());
        }
    }

    pub fn has_download_hash(&self, hash: &str) -> bool {
        self.downloads.iter().any(|record| record.hash == hash)
    }

    pub fn has_download_source(&self, source_id: &str) -> bool {
        self.downloads.iter().any(|record| record.source_id == source_id)
    }

    /// Drop the download records of one extra type ahead of a forced re-run.
    pub fn reset_downloads(&mut self, extra_type: ExtraType) -> usize {
        let before = self.downloads.len();
        self.downloads.retain(|record| record.extra_type != extra_type);
        before - self.downloads.len()
    }

    /// Placeholder values available to search query templates.
    pub fn template_values(&self) -> BTreeMap<&'static str, String> {
        let mut values = BTreeMap::new();
        values.insert("name", self.name.clone());
        values.insert("title", self.title.clone());
        values.insert(
            "original_title",
            self.original_title.clone().unwrap_or_default(),
        );
        values.insert(
            "year",
            self.release_year.map(|y| y.to_string()).unwrap_or_default(),
        );
        values
    }
}
