use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScannerConfig;

/// A media file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredMedia {
    pub path: PathBuf,
    pub is_video: bool,
}

pub fn discover_media(directory: &Path, config: &ScannerConfig) -> Result<Vec<DiscoveredMedia>> {
    let mut media = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(ext) = path.extension() else {
            continue;
        };
        let ext_lower = ext.to_string_lossy().to_lowercase();

        let is_video = if matches_extension(&config.image_extensions, &ext_lower) {
            false
        } else if matches_extension(&config.video_extensions, &ext_lower) {
            true
        } else {
            continue;
        };

        media.push(DiscoveredMedia {
            path: path.to_path_buf(),
            is_video,
        });
    }

    // Sort by path for consistent ordering
    media.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(media)
}

fn matches_extension(extensions: &[String], ext_lower: &str) -> bool {
    extensions.iter().any(|e| e.to_lowercase() == ext_lower)
}

/// MIME type guessed from the file extension.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "tif" | "tiff" => "image/tiff",
        "gif" => "image/gif",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "3gp" => "video/3gpp",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(mime)
}
