//! Output file naming.

use std::path::Path;

/// File stem of `source`, used as the base of every output name.
///
/// Falls back to `"video"` for paths without a usable stem.
pub fn base_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "video".to_string())
}

/// `<base>_part_<ordinal>.mp4`, with a zero-based ordinal.
pub fn segment_file_name(source: &Path, ordinal: usize) -> String {
    format!("{}_part_{ordinal}.mp4", base_name(source))
}

/// `short_<base>_<ordinal>.mp4`, with a one-based acceptance ordinal.
pub fn clip_file_name(source: &Path, ordinal: usize) -> String {
    format!("short_{}_{ordinal}.mp4", base_name(source))
}
