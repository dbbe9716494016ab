use anyhow::{anyhow, Result};
use clap::Parser;
use media_squeeze::cli::{Args, Commands};
use media_squeeze::constants::{
    COMPRESSED_SIZE_PREFIX, COMPRESSION_RATIO_PREFIX, ORIGINAL_SIZE_PREFIX, SUCCESS_PREFIX,
    WARNING_PREFIX,
};
use media_squeeze::utils::create_progress_spinner;
use media_squeeze::{
    cleanup, compression_ratio, format_file_size, logger, report, run_backend, FfmpegEncoder,
    MediaKind, MediaStore, Quality, ResizeConstraints,
};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_tracing(args.quiet, args.verbose);

    match args.command {
        Commands::Serve(serve) => {
            let config = serve.into_config()?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(media_squeeze::http::serve(config))?;
        }
        Commands::Compress {
            input,
            output,
            quality,
            width,
            height,
            ffmpeg,
        } => {
            let quality = Quality::new(quality)?;
            let constraints = ResizeConstraints::new(width, height);
            compress_file(&input, &output, quality, constraints, &FfmpegEncoder::new(ffmpeg))?;
        }
        Commands::Cleanup {
            uploads_dir,
            compressed_dir,
            retention_secs,
        } => {
            let store = MediaStore::new(uploads_dir, compressed_dir);
            let result = cleanup::sweep(&store, Duration::from_secs(retention_secs));
            report!(
                "{} Cleanup completed: removed {} of {} files",
                SUCCESS_PREFIX,
                result.removed,
                result.scanned
            );
        }
    }

    Ok(())
}

fn compress_file(
    input: &Path,
    output: &Path,
    quality: Quality,
    constraints: ResizeConstraints,
    encoder: &FfmpegEncoder,
) -> Result<()> {
    let kind = MediaKind::from_path(input)
        .ok_or_else(|| anyhow!("unsupported input extension: {}", input.display()))?;
    let original_size = fs::metadata(input)
        .map_err(|err| anyhow!("cannot read {}: {}", input.display(), err))?
        .len();

    report!("🗜️  Compressing {}: {:?}", kind, input);
    report!("📁 Output: {:?}", output);
    report!(
        "{} {} ({})",
        ORIGINAL_SIZE_PREFIX,
        original_size,
        format_file_size(original_size)
    );

    let pb = create_progress_spinner("Compressing...");
    if logger::is_quiet() {
        pb.finish_and_clear();
    } else {
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    let outcome = run_backend(encoder, kind, input, output, quality, constraints);
    pb.finish_and_clear();
    let dimensions = outcome?;

    let compressed_size = fs::metadata(output)?.len();
    if let Some((width, height)) = dimensions {
        report!("📏 Dimensions: {}x{}", width, height);
    }
    report!(
        "{} {} ({})",
        COMPRESSED_SIZE_PREFIX,
        compressed_size,
        format_file_size(compressed_size)
    );

    if let Some(ratio) = compression_ratio(original_size, compressed_size) {
        report!("{} {:.2}%", COMPRESSION_RATIO_PREFIX, ratio);
        if ratio > 0.0 {
            report!("{} Successfully reduced file size by {:.2}%", SUCCESS_PREFIX, ratio);
        } else {
            report!("{}  File size increased by {:.2}%", WARNING_PREFIX, ratio.abs());
        }
    }

    Ok(())
}
