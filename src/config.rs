use crate::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_COMPRESSED_DIR, DEFAULT_ENCODE_TIMEOUT, DEFAULT_FFMPEG_BINARY,
    DEFAULT_FFMPEG_PRESET, DEFAULT_UPLOAD_DIR, MAX_UPLOAD_BYTES, RETENTION_WINDOW,
};
use crate::storage::MediaStore;
use crate::video::FfmpegEncoder;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything the service needs, passed explicitly to each component.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub uploads_dir: PathBuf,
    pub compressed_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub retention: Duration,
    pub ffmpeg_binary: PathBuf,
    pub ffmpeg_preset: String,
    pub encode_timeout: Option<Duration>,
    /// `None` disables the background sweep; `POST /cleanup` still works
    pub cleanup_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 5000))),
            uploads_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            compressed_dir: PathBuf::from(DEFAULT_COMPRESSED_DIR),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            retention: RETENTION_WINDOW,
            ffmpeg_binary: PathBuf::from(DEFAULT_FFMPEG_BINARY),
            ffmpeg_preset: DEFAULT_FFMPEG_PRESET.to_string(),
            encode_timeout: Some(DEFAULT_ENCODE_TIMEOUT),
            cleanup_interval: None,
        }
    }
}

impl ServerConfig {
    /// Default settings with both storage areas under `root`.
    pub fn for_root(root: &Path) -> Self {
        Self {
            uploads_dir: root.join(DEFAULT_UPLOAD_DIR),
            compressed_dir: root.join(DEFAULT_COMPRESSED_DIR),
            ..Self::default()
        }
    }

    pub fn store(&self) -> MediaStore {
        MediaStore::new(&self.uploads_dir, &self.compressed_dir)
    }

    pub fn encoder(&self) -> FfmpegEncoder {
        FfmpegEncoder::new(&self.ffmpeg_binary)
            .with_preset(&self.ffmpeg_preset)
            .with_timeout(self.encode_timeout)
    }
}
