pub mod cleanup;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod formats;
pub mod http;
pub mod logger;
pub mod pipeline;
pub mod processing;
pub mod quality;
pub mod resize;
pub mod storage;
pub mod utils;
pub mod validation;
pub mod video;

pub use cleanup::{sweep, sweep_at, CleanupReport};
pub use config::ServerConfig;
pub use error::{CompressionError, ErrorKind, Result};
pub use formats::{MediaKind, OutputFormat, StorageArea};
pub use http::{router, AppState};
pub use pipeline::{run_backend, CompressionRequest, CompressionResult, Compressor};
pub use processing::{compress_image, ImageOutcome};
pub use quality::{compression_ratio, image_quality, video_crf, Quality};
pub use resize::{plan_image_resize, video_scale_filter, ResizeConstraints, ScalePlan};
pub use storage::{MediaStore, StoredAsset};
pub use utils::format_file_size;
pub use video::{compress_video, FfmpegEncoder, VideoEncodeParams, VideoEncoder};
