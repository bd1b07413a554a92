use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace};

use super::{DownloadOptions, RetrievalError, RetrievalKind, VideoMetadata, VideoRetriever};

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// `yt-dlp` driven as a subprocess.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    socket_timeout_secs: u32,
}

#[derive(Debug, Deserialize)]
struct SearchPlaylist {
    #[serde(default)]
    entries: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Option<String>,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            socket_timeout_secs: 3,
        }
    }

    /// Runs `<program> --version` so a missing tool fails before any folder is touched.
    pub fn ensure_available(&self) -> Result<String, RetrievalError> {
        let version = self.run(&["--version".to_string()])?;
        Ok(version.trim().to_string())
    }

    fn run(&self, args: &[String]) -> Result<String, RetrievalError> {
        trace!("{} {}", self.program.display(), args.join(" "));
        let output = Command::new(&self.program).args(args).output().map_err(|e| {
            RetrievalError::new(
                RetrievalKind::Other,
                format!("failed to run {}: {}", self.program.display(), e),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RetrievalError::from_output(&stderr));
        }

        String::from_utf8(output.stdout).map_err(|e| {
            RetrievalError::new(RetrievalKind::Other, format!("non UTF-8 output: {}", e))
        })
    }
}

impl VideoRetriever for YtDlp {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, RetrievalError> {
        let raw = self.run(&[
            "--flat-playlist".to_string(),
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            format!("ytsearch{}:{}", limit, query),
        ])?;
        let playlist: SearchPlaylist = serde_json::from_str(&raw).map_err(|e| {
            RetrievalError::new(RetrievalKind::Other, format!("bad search JSON: {}", e))
        })?;

        let urls: Vec<String> = playlist
            .entries
            .into_iter()
            .filter_map(|entry| entry.id)
            .map(|id| format!("{}{}", WATCH_URL_PREFIX, id))
            .take(limit)
            .collect();
        debug!("Search '{}' returned {} urls", query, urls.len());
        Ok(urls)
    }

    fn resolve(&self, url: &str) -> Result<VideoMetadata, RetrievalError> {
        let raw = self.run(&[
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs.to_string(),
            url.to_string(),
        ])?;
        let mut metadata: VideoMetadata = serde_json::from_str(&raw).map_err(|e| {
            RetrievalError::new(RetrievalKind::Other, format!("bad metadata JSON: {}", e))
        })?;
        if metadata.webpage_url.is_none() {
            metadata.webpage_url = Some(url.to_string());
        }
        Ok(metadata)
    }

    fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        dest: &Path,
    ) -> Result<(), RetrievalError> {
        let mut args = options.to_flags();
        args.extend([
            "--no-progress".to_string(),
            "--quiet".to_string(),
            "--no-playlist".to_string(),
            "--encoding".to_string(),
            "utf-8".to_string(),
            "--paths".to_string(),
            dest.to_string_lossy().into_owned(),
            "--output".to_string(),
            options.output_template.clone(),
            url.to_string(),
        ]);
        self.run(&args)?;
        Ok(())
    }
}
