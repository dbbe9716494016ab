/// Mapping of the single user-facing quality percentage onto encoder knobs.
use crate::constants::{CRF_BASE, CRF_PER_QUALITY_POINT, DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY};
use crate::error::{CompressionError, Result};

/// A quality percentage known to lie in `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    pub fn new(pct: i64) -> Result<Self> {
        if !(MIN_QUALITY as i64..=MAX_QUALITY as i64).contains(&pct) {
            return Err(CompressionError::InvalidQuality(pct));
        }
        Ok(Self(pct as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

/// Quality factor handed to the JPEG encoder. Identity on the percentage.
pub fn image_quality(quality: Quality) -> u8 {
    quality.get()
}

/// Constant Rate Factor for the video encoder.
///
/// `floor(18 + (100 - pct) * 0.3)`: quality 100 maps to CRF 18 and
/// quality 10 to CRF 45, lower quality always giving an equal or higher CRF.
pub fn video_crf(quality: Quality) -> u8 {
    let pct = f64::from(quality.get());
    (CRF_BASE + (100.0 - pct) * CRF_PER_QUALITY_POINT).floor() as u8
}

/// Percentage of bytes saved, rounded to two decimals.
///
/// Negative when the derivative grew. `None` for an empty original, where
/// the ratio is undefined.
pub fn compression_ratio(original_bytes: u64, compressed_bytes: u64) -> Option<f64> {
    if original_bytes == 0 {
        return None;
    }
    let ratio = (original_bytes as f64 - compressed_bytes as f64) / original_bytes as f64 * 100.0;
    Some((ratio * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(pct: i64) -> Quality {
        Quality::new(pct).unwrap()
    }

    #[test]
    fn test_quality_bounds() {
        assert!(Quality::new(1).is_ok());
        assert!(Quality::new(100).is_ok());
        assert!(matches!(Quality::new(0), Err(CompressionError::InvalidQuality(0))));
        assert!(matches!(
            Quality::new(101),
            Err(CompressionError::InvalidQuality(101))
        ));
        assert!(matches!(
            Quality::new(-5),
            Err(CompressionError::InvalidQuality(-5))
        ));
        assert_eq!(Quality::default().get(), 85);
    }

    #[test]
    fn test_image_quality_is_identity() {
        assert_eq!(image_quality(q(1)), 1);
        assert_eq!(image_quality(q(70)), 70);
        assert_eq!(image_quality(q(100)), 100);
    }

    #[test]
    fn test_video_crf_anchor_points() {
        assert_eq!(video_crf(q(100)), 18);
        assert_eq!(video_crf(q(85)), 22);
        assert_eq!(video_crf(q(70)), 27);
        assert_eq!(video_crf(q(50)), 33);
        assert_eq!(video_crf(q(10)), 45);
        assert_eq!(video_crf(q(1)), 47);
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(compression_ratio(1000, 1000), Some(0.0));
        assert_eq!(compression_ratio(1000, 0), Some(100.0));
        assert_eq!(compression_ratio(1000, 800), Some(20.0));
        assert_eq!(compression_ratio(1000, 1200), Some(-20.0));
        assert_eq!(compression_ratio(3, 1), Some(66.67));
        assert_eq!(compression_ratio(0, 500), None);
    }
}
