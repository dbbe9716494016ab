use crate::error::{CompressionError, Result};
use crate::formats::{MediaKind, StorageArea};
use crate::processing::compress_image;
use crate::quality::{compression_ratio, Quality};
use crate::resize::ResizeConstraints;
use crate::storage::MediaStore;
use crate::video::{compress_video, VideoEncoder};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionRequest {
    pub source_name: String,
    pub kind: MediaKind,
    pub quality: Quality,
    pub constraints: ResizeConstraints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionResult {
    pub compressed_name: String,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    /// Percent of bytes saved; negative when the derivative grew
    pub ratio: f64,
    /// Output size for images; videos are not probed
    pub dimensions: Option<(u32, u32)>,
}

/// Request-level coordinator over the store and both backends.
#[derive(Clone)]
pub struct Compressor {
    store: MediaStore,
    video: Arc<dyn VideoEncoder>,
}

impl Compressor {
    pub fn new(store: MediaStore, video: Arc<dyn VideoEncoder>) -> Self {
        Self { store, video }
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    /// Compress a stored original into a new derivative.
    ///
    /// Blocks for the backend's full runtime. On failure the reserved
    /// derivative is removed and no sizes are read.
    pub fn compress(&self, request: &CompressionRequest) -> Result<CompressionResult> {
        let input = self
            .store
            .resolve(StorageArea::Original, &request.source_name)?;

        let original_bytes = fs::metadata(&input)?.len();
        if original_bytes == 0 {
            return Err(CompressionError::Validation(
                "Source file is empty".to_string(),
            ));
        }

        let (compressed_name, output) = self.store.reserve_derivative(&request.source_name)?;

        let dimensions = match run_backend(
            self.video.as_ref(),
            request.kind,
            &input,
            &output,
            request.quality,
            request.constraints,
        ) {
            Ok(dimensions) => dimensions,
            Err(err) => {
                warn!(
                    source = %request.source_name,
                    kind = %request.kind,
                    error = %err,
                    "compression failed"
                );
                let _ = fs::remove_file(&output);
                return Err(err);
            }
        };

        let compressed_bytes = fs::metadata(&output)?.len();
        let ratio = compression_ratio(original_bytes, compressed_bytes).unwrap_or_default();

        info!(
            source = %request.source_name,
            derivative = %compressed_name,
            original_bytes,
            compressed_bytes,
            ratio,
            "compression finished"
        );

        Ok(CompressionResult {
            compressed_name,
            original_bytes,
            compressed_bytes,
            ratio,
            dimensions,
        })
    }
}

/// Dispatch to the image or video backend by declared kind.
///
/// Returns the output dimensions when the backend knows them.
pub fn run_backend(
    video: &dyn VideoEncoder,
    kind: MediaKind,
    input: &Path,
    output: &Path,
    quality: Quality,
    constraints: ResizeConstraints,
) -> Result<Option<(u32, u32)>> {
    match kind {
        MediaKind::Image => {
            let outcome = compress_image(input, output, quality, constraints)?;
            Ok(Some((outcome.width, outcome.height)))
        }
        MediaKind::Video => {
            compress_video(video, input, output, quality, constraints)?;
            Ok(None)
        }
    }
}
