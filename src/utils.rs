/// Utility functions shared by the CLI report and the HTTP responses
use crate::constants::PROGRESS_SPINNER_TEMPLATE;
use indicatif::{ProgressBar, ProgressStyle};

/// Format file size in human-readable format
///
/// # Arguments
/// * `bytes` - Size in bytes
///
/// # Returns
/// * Size with two decimals and a binary unit (e.g., "512.00 B", "1.50 KB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    const THRESHOLD: f64 = 1024.0;

    let mut size = bytes as f64;
    for unit in UNITS {
        if size < THRESHOLD {
            return format!("{:.2} {}", size, unit);
        }
        size /= THRESHOLD;
    }
    format!("{:.2} TB", size)
}

/// Create a progress spinner with consistent styling
pub fn create_progress_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(PROGRESS_SPINNER_TEMPLATE) {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0.00 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_file_size(1024 * 1024 * 1024), "1.00 GB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024 * 1024), "3.00 TB");
    }
}
