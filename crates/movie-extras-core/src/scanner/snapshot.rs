use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, error};
use walkdir::WalkDir;

use crate::hasher;

const TRAILER_SUFFIXES: &[&str] = &["trailer.mp4", "trailer.mkv"];
const TRAILER_EXTENSIONS: &[&str] = &[".mp4", ".mkv"];
const THEME_SUFFIXES: &[&str] = &["theme.mp3", "theme.wma", "theme.flac"];
const THEME_EXTENSIONS: &[&str] = &[".mp3", ".wma", ".flac"];

/// How a freshly downloaded file clashes with what is already in the folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    /// An entry with the same file name exists.
    Name,
    /// Different name, identical content.
    Hash,
}

/// File name to content hash for a media folder and its direct subdirectories.
/// Rebuilt for every pass and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSystemSnapshot {
    pub content: BTreeMap<String, String>,
    pub subdirectories: BTreeMap<String, BTreeMap<String, String>>,
}

impl FileSystemSnapshot {
    /// Hash every regular file at depth one and two below `folder`. Unreadable
    /// files are logged and left out.
    pub fn capture(folder: &Path) -> io::Result<Self> {
        let mut snapshot = Self::default();

        for entry in WalkDir::new(folder).min_depth(1).max_depth(2).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type().is_dir() {
                if entry.depth() == 1 {
                    snapshot
                        .subdirectories
                        .entry(file_name(path))
                        .or_default();
                }
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let hash = match hasher::hash_file(path) {
                Ok(hash) => hash,
                Err(e) => {
                    error!("Error hashing '{}': {}", path.display(), e);
                    continue;
                }
            };

            if entry.depth() == 1 {
                snapshot.content.insert(file_name(path), hash);
            } else if let Some(parent) = path.parent() {
                snapshot
                    .subdirectories
                    .entry(file_name(parent))
                    .or_default()
                    .insert(file_name(path), hash);
            }
        }

        debug!(
            "Snapshot of {}: {} files, {} subdirectories",
            folder.display(),
            snapshot.content.len(),
            snapshot.subdirectories.len()
        );
        Ok(snapshot)
    }

    /// Top-level files are checked before subdirectories. Within each entry a
    /// name match is reported ahead of a hash match.
    pub fn collision(&self, name: &str, hash: &str) -> Option<Collision> {
        let top_level = std::iter::once(&self.content);
        for files in top_level.chain(self.subdirectories.values()) {
            for (existing_name, existing_hash) in files {
                if existing_name == name {
                    return Some(Collision::Name);
                }
                if existing_hash == hash {
                    return Some(Collision::Hash);
                }
            }
        }
        None
    }

    /// Record a file placed into the folder, at the top level when `subdirectory` is `None`.
    pub fn insert(&mut self, subdirectory: Option<&str>, name: &str, hash: &str) {
        let files = match subdirectory {
            Some(dir) => self.subdirectories.entry(dir.to_string()).or_default(),
            None => &mut self.content,
        };
        files.insert(name.to_string(), hash.to_string());
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A `*trailer.mp4`/`*trailer.mkv` next to the media, or any video in `trailers/`.
pub fn has_existing_trailer(folder: &Path) -> io::Result<bool> {
    has_existing(folder, TRAILER_SUFFIXES, "trailers", TRAILER_EXTENSIONS)
}

/// A `*theme.mp3|wma|flac` next to the media, or any such file in `theme-music/`.
pub fn has_existing_theme(folder: &Path) -> io::Result<bool> {
    has_existing(folder, THEME_SUFFIXES, "theme-music", THEME_EXTENSIONS)
}

fn has_existing(
    folder: &Path,
    suffixes: &[&str],
    subdirectory: &str,
    extensions: &[&str],
) -> io::Result<bool> {
    if any_file_ends_with(folder, suffixes)? {
        return Ok(true);
    }
    let subdirectory = folder.join(subdirectory);
    if subdirectory.is_dir() {
        return any_file_ends_with(&subdirectory, extensions);
    }
    Ok(false)
}

fn any_file_ends_with(dir: &Path, endings: &[&str]) -> io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().to_lowercase();
        if endings.iter().any(|ending| name.ends_with(ending)) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_folder(root: &Path) {
        fs::write(root.join("Inception.mkv"), b"main feature").unwrap();
        fs::create_dir(root.join("trailers")).unwrap();
        fs::write(root.join("trailers").join("old.mp4"), b"old trailer").unwrap();
        fs::create_dir_all(root.join("extras").join("deep")).unwrap();
        fs::write(root.join("extras").join("deep").join("skipped.mp4"), b"too deep").unwrap();
    }

    #[test]
    fn test_capture_depth_and_layout() {
        let dir = tempdir().unwrap();
        create_test_folder(dir.path());

        let snapshot = FileSystemSnapshot::capture(dir.path()).unwrap();
        assert_eq!(
            snapshot.content.get("Inception.mkv"),
            Some(&hasher::hash_data(b"main feature"))
        );
        assert_eq!(
            snapshot.subdirectories["trailers"].get("old.mp4"),
            Some(&hasher::hash_data(b"old trailer"))
        );
        assert!(snapshot.subdirectories["extras"].is_empty());
        assert!(!snapshot.subdirectories.contains_key("deep"));
    }

    #[test]
    fn test_collision_classification() {
        let dir = tempdir().unwrap();
        create_test_folder(dir.path());
        let snapshot = FileSystemSnapshot::capture(dir.path()).unwrap();

        let old_hash = hasher::hash_data(b"old trailer");
        assert_eq!(snapshot.collision("old.mp4", "other"), Some(Collision::Name));
        assert_eq!(snapshot.collision("renamed.mp4", &old_hash), Some(Collision::Hash));
        assert_eq!(snapshot.collision("new.mp4", "other"), None);
    }

    #[test]
    fn test_insert_updates_collisions() {
        let mut snapshot = FileSystemSnapshot::default();
        snapshot.insert(Some("trailers"), "a.mp4", "h1");
        snapshot.insert(None, "theme.mp3", "h2");
        assert_eq!(snapshot.collision("x", "h1"), Some(Collision::Hash));
        assert_eq!(snapshot.collision("theme.mp3", "zz"), Some(Collision::Name));
        assert_eq!(snapshot.collision("b.mp4", "h3"), None);
    }

    #[test]
    fn test_existing_trailer_and_theme_detection() {
        let dir = tempdir().unwrap();
        assert!(!has_existing_trailer(dir.path()).unwrap());
        assert!(!has_existing_theme(dir.path()).unwrap());

        fs::write(dir.path().join("Inception-Trailer.MKV"), b"x").unwrap();
        assert!(has_existing_trailer(dir.path()).unwrap());

        let other = tempdir().unwrap();
        fs::create_dir(other.path().join("theme-music")).unwrap();
        fs::write(other.path().join("theme-music").join("song.flac"), b"x").unwrap();
        assert!(has_existing_theme(other.path()).unwrap());
        assert!(!has_existing_trailer(other.path()).unwrap());
    }
}
