//! Source video discovery.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReelcutError;

/// Extensions picked up by `reelcut shorts` when none are given.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];

/// List the regular files directly inside `dir` whose extension matches one
/// of `extensions` (case-insensitive, without the dot).
///
/// Subdirectories are not searched. The result is sorted so batches run in a
/// stable order.
///
/// # Errors
///
/// Returns [`ReelcutError::IoError`] if `dir` cannot be read.
pub fn discover_videos(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, ReelcutError> {
    let mut videos = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                log::warn!("Failed to read entry in {}: {error}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(extension))
            });
        if matches {
            videos.push(path);
        }
    }

    videos.sort();
    log::debug!("Found {} videos in {}", videos.len(), dir.display());
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    #[test]
    fn filters_by_extension_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.webm", "a.mp4", "notes.txt", "C.MP4", "noext"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let found = discover_videos(dir.path(), DEFAULT_VIDEO_EXTENSIONS).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["C.MP4", "a.mp4", "b.webm"]);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let result = discover_videos(Path::new("/nonexistent/reelcut"), DEFAULT_VIDEO_EXTENSIONS);
        assert!(matches!(result, Err(ReelcutError::IoError(_))));
    }
}
