//! Frame scaling for display.
//!
//! Received screenshots are remote-resolution images; the presentation
//! layer shows them in a viewport of arbitrary size. Frames are scaled
//! down (or up) uniformly to fit while preserving aspect ratio.

use image::DynamicImage;
use image::imageops::FilterType;

/// A decoded screenshot scaled to fit a viewport.
#[derive(Debug, Clone)]
pub struct ScaledFrame {
    /// RGBA pixels at the scaled size.
    pub image: image::RgbaImage,
    /// Native resolution of the remote screen this frame came from.
    pub remote_width: u32,
    /// Native resolution of the remote screen this frame came from.
    pub remote_height: u32,
}

impl ScaledFrame {
    /// Scaled width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Scaled height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Uniform scale factor that fits `(src_w, src_h)` inside
/// `(dst_w, dst_h)` without distortion.
pub fn fit_scale(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> f64 {
    if src_w == 0 || src_h == 0 {
        return 1.0;
    }
    let sx = dst_w as f64 / src_w as f64;
    let sy = dst_h as f64 / src_h as f64;
    sx.min(sy)
}

/// Target dimensions after fitting, never zero.
pub fn fit_dimensions(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32) {
    let scale = fit_scale(src_w, src_h, dst_w, dst_h);
    let w = ((src_w as f64 * scale).round() as u32).max(1);
    let h = ((src_h as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Scale a decoded frame to fit the viewport.
pub fn scale_to_fit(image: &DynamicImage, viewport_w: u32, viewport_h: u32) -> ScaledFrame {
    let (remote_width, remote_height) = (image.width(), image.height());
    let (w, h) = fit_dimensions(remote_width, remote_height, viewport_w, viewport_h);

    let scaled = if (w, h) == (remote_width, remote_height) {
        image.to_rgba8()
    } else {
        image.resize_exact(w, h, FilterType::Lanczos3).to_rgba8()
    };

    ScaledFrame {
        image: scaled,
        remote_width,
        remote_height,
    }
}

// ── Tests ────────────────────────────────────────────────────────
