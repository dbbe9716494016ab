/// Aspect-preserving downscale planning for both backends.
///
/// Images know their native dimensions and get explicit pixel sizes. Videos
/// are not probed, so the constraint is handed to the encoder as a scale
/// filter expression that preserves aspect ratio and never enlarges.
use crate::error::{CompressionError, Result};

/// Optional upper bounds on output dimensions. `None` means unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeConstraints {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl ResizeConstraints {
    pub fn new(max_width: Option<u32>, max_height: Option<u32>) -> Self {
        Self {
            max_width: max_width.filter(|&w| w > 0),
            max_height: max_height.filter(|&h| h > 0),
        }
    }

    /// Build from raw request values where `0` or absence means "no bound".
    pub fn from_request(max_width: Option<i64>, max_height: Option<i64>) -> Result<Self> {
        Ok(Self::new(
            bound("max_width", max_width)?,
            bound("max_height", max_height)?,
        ))
    }
}

fn bound(name: &'static str, value: Option<i64>) -> Result<Option<u32>> {
    match value {
        None | Some(0) => Ok(None),
        Some(v) if v < 0 => Err(CompressionError::InvalidDimension(name, v)),
        Some(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| CompressionError::InvalidDimension(name, v)),
    }
}

/// Target pixel dimensions for an image resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalePlan {
    pub width: u32,
    pub height: u32,
}

/// Plan an image resize. Returns `None` when the image should be left at its
/// native size: no bounds, bounds at or above the native size, or a degenerate
/// source.
pub fn plan_image_resize(
    native_width: u32,
    native_height: u32,
    constraints: ResizeConstraints,
) -> Option<ScalePlan> {
    if native_width == 0 || native_height == 0 {
        return None;
    }

    let width_ratio = constraints
        .max_width
        .map(|w| f64::from(w) / f64::from(native_width));
    let height_ratio = constraints
        .max_height
        .map(|h| f64::from(h) / f64::from(native_height));

    let ratio = match (width_ratio, height_ratio) {
        (Some(w), Some(h)) => w.min(h),
        (Some(w), None) => w,
        (None, Some(h)) => h,
        (None, None) => return None,
    };

    if ratio >= 1.0 {
        return None;
    }

    let width = scaled(native_width, ratio);
    let height = scaled(native_height, ratio);
    if width >= native_width && height >= native_height {
        return None;
    }

    Some(ScalePlan { width, height })
}

fn scaled(native: u32, ratio: f64) -> u32 {
    ((f64::from(native) * ratio).round() as u32).max(1)
}

/// Scale filter for the video encoder, or `None` when no bound is set.
///
/// Every bound becomes `min(bound, native)` so the encoder only ever shrinks;
/// an unbounded side keeps the native size and lets the aspect-ratio fit
/// decide. Both sides are forced even, which yuv420p H.264 requires.
pub fn video_scale_filter(constraints: ResizeConstraints) -> Option<String> {
    if constraints.max_width.is_none() && constraints.max_height.is_none() {
        return None;
    }

    let side = |bound: Option<u32>, native: &str| match bound {
        Some(b) => format!("'min({},{})'", b, native),
        None => native.to_string(),
    };
    Some(format!(
        "scale={}:{}:force_original_aspect_ratio=decrease:force_divisible_by=2",
        side(constraints.max_width, "iw"),
        side(constraints.max_height, "ih"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(w: Option<u32>, h: Option<u32>) -> ResizeConstraints {
        ResizeConstraints::new(w, h)
    }

    #[test]
    fn test_no_bounds_no_resize() {
        assert_eq!(plan_image_resize(2000, 1000, bounds(None, None)), None);
    }

    #[test]
    fn test_width_only() {
        assert_eq!(
            plan_image_resize(2000, 1000, bounds(Some(1000), None)),
            Some(ScalePlan { width: 1000, height: 500 })
        );
    }

    #[test]
    fn test_height_only() {
        assert_eq!(
            plan_image_resize(2000, 1500, bounds(None, Some(750))),
            Some(ScalePlan { width: 1000, height: 750 })
        );
    }

    #[test]
    fn test_both_bounds_pick_tighter_axis() {
        assert_eq!(
            plan_image_resize(2000, 1500, bounds(Some(800), Some(800))),
            Some(ScalePlan { width: 800, height: 600 })
        );
        assert_eq!(
            plan_image_resize(1000, 2000, bounds(Some(800), Some(800))),
            Some(ScalePlan { width: 400, height: 800 })
        );
    }

    #[test]
    fn test_never_upscales() {
        assert_eq!(plan_image_resize(800, 600, bounds(Some(1600), None)), None);
        assert_eq!(plan_image_resize(800, 600, bounds(Some(800), Some(600))), None);
        assert_eq!(plan_image_resize(800, 600, bounds(Some(4000), Some(4000))), None);
    }

    #[test]
    fn test_rounding_and_minimum_size() {
        assert_eq!(
            plan_image_resize(1001, 333, bounds(Some(500), None)),
            Some(ScalePlan { width: 500, height: 166 })
        );
        assert_eq!(
            plan_image_resize(4000, 2, bounds(Some(10), None)),
            Some(ScalePlan { width: 10, height: 1 })
        );
    }

    #[test]
    fn test_zero_bounds_mean_unconstrained() {
        let c = bounds(Some(0), Some(0));
        assert_eq!(c, ResizeConstraints::default());
        assert_eq!(plan_image_resize(2000, 1000, c), None);
    }

    #[test]
    fn test_from_request() {
        let c = ResizeConstraints::from_request(Some(1000), Some(0)).unwrap();
        assert_eq!(c, bounds(Some(1000), None));
        assert!(matches!(
            ResizeConstraints::from_request(Some(-1), None),
            Err(CompressionError::InvalidDimension("max_width", -1))
        ));
        assert!(matches!(
            ResizeConstraints::from_request(None, Some(i64::MAX)),
            Err(CompressionError::InvalidDimension("max_height", _))
        ));
    }

    #[test]
    fn test_video_scale_filter() {
        assert_eq!(video_scale_filter(bounds(None, None)), None);
        assert_eq!(
            video_scale_filter(bounds(Some(1280), Some(720))).as_deref(),
            Some("scale='min(1280,iw)':'min(720,ih)':force_original_aspect_ratio=decrease:force_divisible_by=2")
        );
        assert_eq!(
            video_scale_filter(bounds(Some(1280), None)).as_deref(),
            Some("scale='min(1280,iw)':ih:force_original_aspect_ratio=decrease:force_divisible_by=2")
        );
        assert_eq!(
            video_scale_filter(bounds(None, Some(720))).as_deref(),
            Some("scale=iw:'min(720,ih)':force_original_aspect_ratio=decrease:force_divisible_by=2")
        );
    }

    #[test]
    fn test_video_scale_filter_odd_box_is_forced_even() {
        // 1920x1080 fitted into 1001x1001 would otherwise come out 1001x563
        let filter = video_scale_filter(bounds(Some(1001), Some(1001))).unwrap();
        assert!(filter.starts_with("scale='min(1001,iw)':'min(1001,ih)':"));
        assert!(filter.ends_with(":force_divisible_by=2"));
    }
}
