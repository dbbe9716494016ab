/// Video compression through an external encoder process.
///
/// The encoder sits behind `VideoEncoder` so the orchestrator and its tests
/// never need the real binary.
use crate::constants::{
    AUDIO_CODEC, DEFAULT_ENCODE_TIMEOUT, DEFAULT_FFMPEG_BINARY, DEFAULT_FFMPEG_PRESET,
    ENCODER_POLL_INTERVAL, VIDEO_CODEC,
};
use crate::error::{CompressionError, Result};
use crate::quality::{video_crf, Quality};
use crate::resize::{video_scale_filter, ResizeConstraints};
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Encoder-level parameters derived from a compression request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEncodeParams {
    pub crf: u8,
    pub scale_filter: Option<String>,
}

impl VideoEncodeParams {
    pub fn new(quality: Quality, constraints: ResizeConstraints) -> Self {
        Self {
            crf: video_crf(quality),
            scale_filter: video_scale_filter(constraints),
        }
    }
}

pub trait VideoEncoder: Send + Sync {
    /// Check the encoder can run at all. Fails with `BackendUnavailable`.
    fn probe(&self) -> Result<()>;

    /// Encode `input` into `output`, overwriting any existing file.
    fn encode(&self, input: &Path, output: &Path, params: &VideoEncodeParams) -> Result<()>;
}

/// Probe, then encode. Nothing is touched on disk when the probe fails.
pub fn compress_video(
    encoder: &dyn VideoEncoder,
    input: &Path,
    output: &Path,
    quality: Quality,
    constraints: ResizeConstraints,
) -> Result<()> {
    encoder.probe()?;

    let params = VideoEncodeParams::new(quality, constraints);
    info!(
        quality = quality.get(),
        crf = params.crf,
        scale = params.scale_filter.as_deref().unwrap_or("none"),
        "encoding video"
    );
    encoder.encode(input, output, &params)
}

/// Runs the `ffmpeg` binary with H.264 video and AAC audio.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
    preset: String,
    timeout: Option<Duration>,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_FFMPEG_BINARY),
            preset: DEFAULT_FFMPEG_PRESET.to_string(),
            timeout: Some(DEFAULT_ENCODE_TIMEOUT),
        }
    }
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// `None` lets an encode run for as long as it takes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn build_args(
        &self,
        input: &Path,
        output: &Path,
        params: &VideoEncodeParams,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            input.into(),
            "-vcodec".into(),
            VIDEO_CODEC.into(),
            "-crf".into(),
            params.crf.to_string().into(),
        ];

        if let Some(filter) = &params.scale_filter {
            args.push("-vf".into());
            args.push(filter.into());
        }

        let tail: [OsString; 6] = [
            "-preset".into(),
            self.preset.clone().into(),
            "-acodec".into(),
            AUDIO_CODEC.into(),
            "-y".into(),
            output.into(),
        ];
        args.extend(tail);
        args
    }

    fn unavailable(&self) -> CompressionError {
        CompressionError::BackendUnavailable(format!(
            "FFmpeg is not installed (tried {}). Please install FFmpeg to compress videos.",
            self.binary.display()
        ))
    }

    fn wait(&self, child: &mut Child) -> Result<Option<std::process::ExitStatus>> {
        let Some(timeout) = self.timeout else {
            return Ok(Some(child.wait()?));
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(ENCODER_POLL_INTERVAL);
        }
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn probe(&self) -> Result<()> {
        let status = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => {
                warn!(binary = %self.binary.display(), ?status, "encoder probe failed");
                Err(self.unavailable())
            }
            Err(err) => {
                warn!(binary = %self.binary.display(), error = %err, "encoder not runnable");
                Err(self.unavailable())
            }
        }
    }

    fn encode(&self, input: &Path, output: &Path, params: &VideoEncodeParams) -> Result<()> {
        let args = self.build_args(input, output, params);
        debug!(binary = %self.binary.display(), ?args, "spawning encoder");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => self.unavailable(),
                _ => CompressionError::Io(err),
            })?;

        let stderr_reader = child.stderr.take().map(drain_stderr);

        let Some(status) = self.wait(&mut child)? else {
            let _ = child.kill();
            let _ = child.wait();
            // The reader thread ends once the killed process closes its stderr
            let timeout = self.timeout.unwrap_or_default();
            warn!(?timeout, output = %output.display(), "encoder timed out");
            return Err(CompressionError::EncoderTimeout(timeout));
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(CompressionError::BackendFailure(format!(
                "FFmpeg error: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }
}

fn drain_stderr(mut stderr: std::process::ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}
