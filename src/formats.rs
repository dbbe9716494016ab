/// Media kind, storage area and output format handling
///
/// Replaces string-based `file_type`/`type` tags with enums that are parsed
/// once at the boundary.
use crate::constants::{ALLOWED_IMAGE_EXTENSIONS, ALLOWED_VIDEO_EXTENSIONS};
use crate::error::{CompressionError, Result};
use image::ImageFormat;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Declared kind of an uploaded asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Extensions accepted on upload, lowercase and without the dot
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => ALLOWED_IMAGE_EXTENSIONS,
            MediaKind::Video => ALLOWED_VIDEO_EXTENSIONS,
        }
    }

    pub fn allows_extension(&self, extension: &str) -> bool {
        let ext = extension.to_lowercase();
        self.allowed_extensions().contains(&ext.as_str())
    }

    /// Infer the kind from a path's extension, used by the one-shot CLI
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if MediaKind::Image.allows_extension(ext) {
            Some(MediaKind::Image)
        } else if MediaKind::Video.allows_extension(ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            _ => Err(CompressionError::Validation(format!(
                "Invalid file type: {}. Expected image or video",
                s
            ))),
        }
    }
}

/// Which directory a stored asset lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    Original,
    Compressed,
}

impl StorageArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Original => "original",
            StorageArea::Compressed => "compressed",
        }
    }
}

impl FromStr for StorageArea {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "original" => Ok(StorageArea::Original),
            "compressed" => Ok(StorageArea::Compressed),
            _ => Err(CompressionError::Validation("Invalid type".to_string())),
        }
    }
}

/// Encoders the image backend writes with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JPEG with the quality factor applied
    Jpeg,
    /// PNG, optimized with oxipng
    Png,
}

impl OutputFormat {
    /// `.jpg`/`.jpeg` select JPEG; every other destination is written as PNG.
    pub fn for_destination(output_path: &Path) -> Self {
        match output_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => OutputFormat::Jpeg,
            _ => OutputFormat::Png,
        }
    }

    pub fn to_image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
        };
        write!(f, "{}", name)
    }
}

/// Lowercased extension of a file name, if it has one
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn mime_type_for(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("flv") => "video/x-flv",
        _ => "application/octet-stream",
    }
}
