use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid quality value: {0}. Must be between 1 and 100")]
    InvalidQuality(i64),

    #[error("Invalid {0}: {1}. Must be a non-negative number of pixels")]
    InvalidDimension(&'static str, i64),

    #[error("Invalid {kind} format: .{extension}. Allowed: {allowed}")]
    UnsupportedExtension {
        kind: &'static str,
        extension: String,
        allowed: String,
    },

    #[error("Invalid image dimensions: {0}x{1}. Maximum allowed: {2}x{2}")]
    ImageTooLarge(u32, u32, u32),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BackendUnavailable(String),

    #[error("{0}")]
    BackendFailure(String),

    #[error("Video encoder did not finish within {0:?}")]
    EncoderTimeout(Duration),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("PNG optimization error: {0}")]
    PngOptimization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure classes that callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    BackendUnavailable,
    BackendFailure,
    Io,
}

impl CompressionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompressionError::Validation(_)
            | CompressionError::InvalidQuality(_)
            | CompressionError::InvalidDimension(..)
            | CompressionError::UnsupportedExtension { .. }
            | CompressionError::ImageTooLarge(..) => ErrorKind::Validation,
            CompressionError::NotFound(_) => ErrorKind::NotFound,
            CompressionError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            CompressionError::BackendFailure(_)
            | CompressionError::EncoderTimeout(_)
            | CompressionError::ImageProcessing(_)
            | CompressionError::PngOptimization(_) => ErrorKind::BackendFailure,
            CompressionError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            CompressionError::InvalidQuality(0).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CompressionError::NotFound("a.png".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CompressionError::EncoderTimeout(Duration::from_secs(1)).kind(),
            ErrorKind::BackendFailure
        );
        assert_eq!(
            CompressionError::Io(std::io::Error::other("disk full")).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn test_unsupported_extension_message() {
        let err = CompressionError::UnsupportedExtension {
            kind: "image",
            extension: "txt".into(),
            allowed: "PNG, JPG".into(),
        };
        assert_eq!(err.to_string(), "Invalid image format: .txt. Allowed: PNG, JPG");
    }
}
