use std::time::Duration;

pub const DEFAULT_QUALITY: u8 = 85;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

/// CRF produced for quality 100.
pub const CRF_BASE: f64 = 18.0;
/// CRF added per quality point below 100.
pub const CRF_PER_QUALITY_POINT: f64 = 0.3;

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];
pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "flv"];

pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 20_000;

pub const RETENTION_WINDOW: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_ENCODE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const ENCODER_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";
pub const DEFAULT_FFMPEG_PRESET: &str = "medium";
pub const VIDEO_CODEC: &str = "libx264";
pub const AUDIO_CODEC: &str = "aac";

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_COMPRESSED_DIR: &str = "compressed";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

pub const DERIVATIVE_PREFIX: &str = "compressed_";
pub const DERIVATIVE_TOKEN_LEN: usize = 8;

pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;

pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";

// Console report prefixes for the one-shot CLI commands
pub const ORIGINAL_SIZE_PREFIX: &str = "📊 Original size:";
pub const COMPRESSED_SIZE_PREFIX: &str = "📈 Compressed size:";
pub const COMPRESSION_RATIO_PREFIX: &str = "🎯 Compression ratio:";
pub const SUCCESS_PREFIX: &str = "✅";
pub const WARNING_PREFIX: &str = "⚠️";
