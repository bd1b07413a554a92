pub mod ytdlp;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub use ytdlp::YtDlp;

/// How a failed retrieval should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalKind {
    /// Network hiccup or rate limit; worth retrying.
    Transient,
    /// Removed, private or geo-blocked; retrying will not help.
    Unavailable,
    /// The stream delivered nothing; the whole pass is aborted.
    NoData,
    Other,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind:?}: {message}")]
pub struct RetrievalError {
    pub kind: RetrievalKind,
    pub message: String,
}

const NO_DATA_MARKERS: &[&str] = &["Did not get any data blocks"];

const TRANSIENT_MARKERS: &[&str] = &[
    "Unable to download webpage",
    "timed out",
    "HTTP Error 429",
    "HTTP Error 500",
    "HTTP Error 502",
    "HTTP Error 503",
    "Connection reset",
    "Temporary failure in name resolution",
];

const UNAVAILABLE_MARKERS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "not available in your country",
    "has been removed",
    "blocked it",
    "members-only",
    "Sign in to confirm your age",
];

impl RetrievalError {
    pub fn new(kind: RetrievalKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a failure from the tool's error output.
    pub fn from_output(output: &str) -> Self {
        let kind = if NO_DATA_MARKERS.iter().any(|m| output.contains(m)) {
            RetrievalKind::NoData
        } else if TRANSIENT_MARKERS.iter().any(|m| output.contains(m)) {
            RetrievalKind::Transient
        } else if UNAVAILABLE_MARKERS.iter().any(|m| output.contains(m)) {
            RetrievalKind::Unavailable
        } else {
            RetrievalKind::Other
        };
        let message = output
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or(output)
            .trim()
            .to_string();
        Self::new(kind, message)
    }
}

/// Metadata the retrieval tool reports for one video. Every field may be
/// absent on old or region-limited uploads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub id: String,
    pub webpage_url: Option<String>,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub average_rating: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `YYYYMMDD`
    pub upload_date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub format: Option<String>,
}

/// Value of one entry in an extra config's argument bag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub output_template: String,
    pub arguments: BTreeMap<String, ArgValue>,
}

impl DownloadOptions {
    /// Render the argument bag as command-line flags. `false`, `"false"` and
    /// `"no"` drop the flag entirely.
    pub fn to_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        for (key, value) in &self.arguments {
            let flag = format!("--{}", key.replace('_', "-"));
            match value {
                ArgValue::Bool(true) => flags.push(flag),
                ArgValue::Bool(false) => {}
                ArgValue::Text(text)
                    if text.eq_ignore_ascii_case("false") || text.eq_ignore_ascii_case("no") => {}
                ArgValue::Text(text) => {
                    flags.push(flag);
                    flags.push(text.clone());
                }
                ArgValue::Int(n) => {
                    flags.push(flag);
                    flags.push(n.to_string());
                }
                ArgValue::Float(n) => {
                    flags.push(flag);
                    flags.push(n.to_string());
                }
            }
        }
        flags
    }
}

/// The external tool that searches, describes and downloads platform videos.
pub trait VideoRetriever {
    /// Page urls of the first `limit` platform search hits for `query`.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, RetrievalError>;

    fn resolve(&self, url: &str) -> Result<VideoMetadata, RetrievalError>;

    /// Download `url` into `dest`, which the caller owns and inspects afterwards.
    fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        dest: &Path,
    ) -> Result<(), RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tool_output() {
        let err = RetrievalError::from_output(
            "WARNING: something\nERROR: Unable to download webpage: <urlopen error>\n",
        );
        assert_eq!(err.kind, RetrievalKind::Transient);
        assert_eq!(err.message, "ERROR: Unable to download webpage: <urlopen error>");

        let err = RetrievalError::from_output("ERROR: [youtube] abc: Private video");
        assert_eq!(err.kind, RetrievalKind::Unavailable);

        let err = RetrievalError::from_output("ERROR: Did not get any data blocks");
        assert_eq!(err.kind, RetrievalKind::NoData);

        let err = RetrievalError::from_output("ERROR: postprocessing failed");
        assert_eq!(err.kind, RetrievalKind::Other);
    }

    #[test]
    fn test_argument_bag_to_flags() {
        let mut arguments = BTreeMap::new();
        arguments.insert("format".to_string(), ArgValue::Text("best".to_string()));
        arguments.insert("write_subs".to_string(), ArgValue::Bool(true));
        arguments.insert("embed_thumbnail".to_string(), ArgValue::Text("no".to_string()));
        arguments.insert("keep_video".to_string(), ArgValue::Bool(false));
        arguments.insert("retries".to_string(), ArgValue::Int(3));
        let options = DownloadOptions {
            output_template: "%(title)s.%(ext)s".to_string(),
            arguments,
        };

        assert_eq!(
            options.to_flags(),
            vec!["--format", "best", "--retries", "3", "--write-subs"]
        );
    }
}
