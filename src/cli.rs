use crate::config::ServerConfig;
use crate::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_COMPRESSED_DIR, DEFAULT_FFMPEG_BINARY, DEFAULT_FFMPEG_PRESET,
    DEFAULT_UPLOAD_DIR,
};
use anyhow::{anyhow, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "media-squeeze",
    about = "Compress uploaded images and videos with a single quality setting",
    long_about = "media-squeeze serves an HTTP API that accepts image and video uploads and produces \
                  size-reduced derivatives. Images are re-encoded in-process (JPEG or oxipng-optimized PNG); \
                  videos are re-encoded with FFmpeg (H.264/AAC) at a CRF derived from the quality setting.",
    version,
    after_help = "EXAMPLES:\n  \
    media-squeeze serve --bind 127.0.0.1:5000 --cleanup-interval-secs 600\n  \
    media-squeeze compress photo.png small.jpg -q 70 -w 1000\n  \
    media-squeeze compress clip.mp4 clip-720.mp4 -H 720\n  \
    media-squeeze cleanup --retention-secs 3600"
)]
pub struct Args {
    #[arg(long, global = true, help = "Only print warnings and errors")]
    pub quiet: bool,

    #[arg(short, long, global = true, help = "Print debug diagnostics")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP compression service")]
    Serve(ServeArgs),

    #[command(
        about = "Compress a single image or video file",
        long_about = "Compress one local file. The media kind is inferred from the input extension; \
                      image output format follows the output extension (.jpg/.jpeg for JPEG, PNG otherwise)."
    )]
    Compress {
        #[arg(help = "Input image or video file path")]
        input: PathBuf,

        #[arg(help = "Output file path")]
        output: PathBuf,

        #[arg(
            short = 'q',
            long,
            default_value_t = 85,
            allow_negative_numbers = true,
            help = "Compression quality (1-100, default: 85)",
            long_help = "Quality from 1 (smallest) to 100 (best). Images use it as the JPEG quality factor; \
                         videos map it to CRF = floor(18 + (100 - quality) * 0.3)."
        )]
        quality: i64,

        #[arg(short = 'w', long, help = "Maximum width in pixels (never enlarges)")]
        width: Option<u32>,

        #[arg(short = 'H', long, help = "Maximum height in pixels (never enlarges)")]
        height: Option<u32>,

        #[arg(long, env = "MEDIA_SQUEEZE_FFMPEG", default_value = DEFAULT_FFMPEG_BINARY, help = "FFmpeg binary")]
        ffmpeg: PathBuf,
    },

    #[command(about = "Delete stored files older than the retention window")]
    Cleanup {
        #[arg(long, env = "MEDIA_SQUEEZE_UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
        uploads_dir: PathBuf,

        #[arg(long, env = "MEDIA_SQUEEZE_COMPRESSED_DIR", default_value = DEFAULT_COMPRESSED_DIR)]
        compressed_dir: PathBuf,

        #[arg(long, env = "MEDIA_SQUEEZE_RETENTION_SECS", default_value_t = 3600)]
        retention_secs: u64,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "MEDIA_SQUEEZE_BIND", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    #[arg(long, env = "MEDIA_SQUEEZE_UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    pub uploads_dir: PathBuf,

    #[arg(long, env = "MEDIA_SQUEEZE_COMPRESSED_DIR", default_value = DEFAULT_COMPRESSED_DIR)]
    pub compressed_dir: PathBuf,

    #[arg(long, env = "MEDIA_SQUEEZE_MAX_UPLOAD_BYTES", default_value_t = 100 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    #[arg(long, env = "MEDIA_SQUEEZE_RETENTION_SECS", default_value_t = 3600)]
    pub retention_secs: u64,

    #[arg(long, env = "MEDIA_SQUEEZE_FFMPEG", default_value = DEFAULT_FFMPEG_BINARY)]
    pub ffmpeg: PathBuf,

    #[arg(long, env = "MEDIA_SQUEEZE_FFMPEG_PRESET", default_value = DEFAULT_FFMPEG_PRESET)]
    pub ffmpeg_preset: String,

    #[arg(
        long,
        env = "MEDIA_SQUEEZE_ENCODE_TIMEOUT_SECS",
        default_value_t = 1800,
        help = "Kill video encodes running longer than this (0 = no limit)"
    )]
    pub encode_timeout_secs: u64,

    #[arg(
        long,
        env = "MEDIA_SQUEEZE_CLEANUP_INTERVAL_SECS",
        default_value_t = 0,
        help = "Run the retention sweep periodically (0 = only on POST /cleanup)"
    )]
    pub cleanup_interval_secs: u64,
}

impl ServeArgs {
    pub fn into_config(self) -> Result<ServerConfig> {
        let bind_addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|err| anyhow!("invalid bind address {}: {}", self.bind, err))?;
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max upload size must be greater than 0"));
        }

        Ok(ServerConfig {
            bind_addr,
            uploads_dir: self.uploads_dir,
            compressed_dir: self.compressed_dir,
            max_upload_bytes: self.max_upload_bytes,
            retention: Duration::from_secs(self.retention_secs),
            ffmpeg_binary: self.ffmpeg,
            ffmpeg_preset: self.ffmpeg_preset,
            encode_timeout: non_zero_secs(self.encode_timeout_secs),
            cleanup_interval: non_zero_secs(self.cleanup_interval_secs),
        })
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
