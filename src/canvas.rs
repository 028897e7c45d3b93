//! Mask surface pair — authoritative mask buffer + derived preview buffer.
//!
//! Both buffers live at the source image's native resolution, never the
//! display size.  The mask buffer is the single source of truth; the preview
//! buffer is a pure projection of it (a fixed translucent highlight tint)
//! and is re-derived after every mask mutation, never written directly.

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

/// Dimension guard: refuse buffers above ~256 megapixels.
const MAX_PIXELS: u64 = 256_000_000;

/// Fixed highlight color used to tint selected pixels in the preview.
pub const HIGHLIGHT_COLOR: [u8; 3] = [66, 133, 244];

/// Preview opacity at full mask alpha.  Keeps the highlight translucent so
/// the underlying photo stays legible.
pub const HIGHLIGHT_OPACITY: u8 = 140;

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised while (re)allocating the surface pair.
#[derive(Debug)]
pub enum CanvasError {
    /// Requested resolution exceeds the pixel guard (or is zero-sized).
    /// Fatal for the session: no further mask operations can proceed.
    BadResolution { width: u32, height: u32 },
}

impl std::fmt::Display for CanvasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanvasError::BadResolution { width, height } => {
                write!(f, "Cannot allocate {}×{} mask surface", width, height)
            }
        }
    }
}

impl std::error::Error for CanvasError {}

// ============================================================================
// MASK STATS
// ============================================================================

/// Summary of the selected region, computed on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskStats {
    /// Number of pixels with mask value > 0.
    pub pixel_count: usize,
    /// Inclusive bounding box of the selected region: (min_x, min_y, max_x, max_y).
    pub bounds: (u32, u32, u32, u32),
}

// ============================================================================
// MASK CANVAS
// ============================================================================

/// The surface pair: a `W × H` grayscale mask (>0 = selected, converging to
/// 0/255 outside soft-erase transients) and its `W × H` tinted RGBA preview.
///
/// Owned exclusively by the selection session; no other component writes
/// either buffer.
pub struct MaskCanvas {
    width: u32,
    height: u32,
    mask: GrayImage,
    preview: RgbaImage,
}

impl MaskCanvas {
    /// Allocate a zeroed surface pair at the given native resolution.
    pub fn new(width: u32, height: u32) -> Result<Self, CanvasError> {
        let total = width as u64 * height as u64;
        if width == 0 || height == 0 || total > MAX_PIXELS {
            return Err(CanvasError::BadResolution { width, height });
        }
        Ok(Self {
            width,
            height,
            mask: GrayImage::new(width, height),
            preview: RgbaImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read access to the authoritative mask buffer.
    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// The tinted preview, valid as of the last [`derive_preview`] call.
    ///
    /// [`derive_preview`]: MaskCanvas::derive_preview
    pub fn preview(&self) -> &RgbaImage {
        &self.preview
    }

    /// Mutable mask access for the rasterizer and wand.  Crate-internal so
    /// external code cannot bypass the session's commit discipline.
    pub(crate) fn mask_mut(&mut self) -> &mut GrayImage {
        &mut self.mask
    }

    /// Replace the mask contents wholesale (external import path).
    /// `mask` must already be at native resolution.
    pub(crate) fn replace_mask(&mut self, mask: GrayImage) {
        debug_assert_eq!(mask.dimensions(), (self.width, self.height));
        self.mask = mask;
    }

    /// Re-derive the preview buffer from the mask buffer.
    ///
    /// Row-parallel; cheap enough to run after every mutation at interactive
    /// rates.  Idempotent: equal masks always produce equal previews.
    pub fn derive_preview(&mut self) {
        let w = self.width as usize;
        let mask_raw: &[u8] = self.mask.as_raw();
        let preview_raw: &mut [u8] = &mut self.preview;

        preview_raw
            .par_chunks_mut(w * 4)
            .zip(mask_raw.par_chunks(w))
            .for_each(|(prow, mrow)| {
                for (px, &m) in prow.chunks_exact_mut(4).zip(mrow.iter()) {
                    px[0] = HIGHLIGHT_COLOR[0];
                    px[1] = HIGHLIGHT_COLOR[1];
                    px[2] = HIGHLIGHT_COLOR[2];
                    px[3] = ((m as u16 * HIGHLIGHT_OPACITY as u16) / 255) as u8;
                }
            });
    }

    /// True when no pixel is selected (empty selection ⇒ no mask artifact).
    pub fn is_empty(&self) -> bool {
        self.mask.as_raw().iter().all(|&v| v == 0)
    }

    /// Selected-pixel count and bounding box, or `None` for an empty mask.
    pub fn stats(&self) -> Option<MaskStats> {
        let mut pixel_count = 0usize;
        let mut min_x = self.width;
        let mut min_y = self.height;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        for (x, y, p) in self.mask.enumerate_pixels() {
            if p.0[0] > 0 {
                pixel_count += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        if pixel_count == 0 {
            None
        } else {
            Some(MaskStats {
                pixel_count,
                bounds: (min_x, min_y, max_x, max_y),
            })
        }
    }

    /// Zero both buffers.
    pub fn clear(&mut self) {
        self.mask.as_mut().fill(0);
        self.preview.as_mut().fill(0);
    }

    /// Set every mask pixel to fully selected.
    pub fn select_all(&mut self) {
        self.mask.as_mut().fill(255);
    }

    /// Invert the selection: each mask value v becomes 255 − v.
    pub fn invert(&mut self) {
        for v in self.mask.as_mut().iter_mut() {
            *v = 255 - *v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_canvas_is_empty() {
        let canvas = MaskCanvas::new(16, 8).unwrap();
        assert!(canvas.is_empty());
        assert!(canvas.stats().is_none());
        assert_eq!(canvas.mask().dimensions(), (16, 8));
        assert_eq!(canvas.preview().dimensions(), (16, 8));
    }

    #[test]
    fn rejects_degenerate_resolutions() {
        assert!(MaskCanvas::new(0, 100).is_err());
        assert!(MaskCanvas::new(100_000, 100_000).is_err());
    }

    #[test]
    fn preview_is_pure_function_of_mask() {
        let mut canvas = MaskCanvas::new(4, 4).unwrap();
        canvas.mask_mut().put_pixel(1, 2, image::Luma([255]));
        canvas.mask_mut().put_pixel(3, 0, image::Luma([128]));
        canvas.derive_preview();
        let first = canvas.preview().clone();

        // Re-deriving from the same mask reproduces the same preview.
        canvas.derive_preview();
        assert_eq!(canvas.preview().as_raw(), first.as_raw());

        let full = canvas.preview().get_pixel(1, 2);
        assert_eq!(
            full.0,
            [
                HIGHLIGHT_COLOR[0],
                HIGHLIGHT_COLOR[1],
                HIGHLIGHT_COLOR[2],
                HIGHLIGHT_OPACITY
            ]
        );
        // Partial mask alpha scales the preview alpha down.
        let partial = canvas.preview().get_pixel(3, 0);
        assert!(partial.0[3] > 0 && partial.0[3] < HIGHLIGHT_OPACITY);
        // Unselected pixels are fully transparent.
        assert_eq!(canvas.preview().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn stats_reports_count_and_bounds() {
        let mut canvas = MaskCanvas::new(10, 10).unwrap();
        canvas.mask_mut().put_pixel(2, 3, image::Luma([255]));
        canvas.mask_mut().put_pixel(7, 5, image::Luma([10]));
        let stats = canvas.stats().unwrap();
        assert_eq!(stats.pixel_count, 2);
        assert_eq!(stats.bounds, (2, 3, 7, 5));
    }

    #[test]
    fn select_all_then_invert_is_empty() {
        let mut canvas = MaskCanvas::new(6, 6).unwrap();
        canvas.select_all();
        assert_eq!(canvas.stats().unwrap().pixel_count, 36);
        canvas.invert();
        assert!(canvas.is_empty());
    }

    #[test]
    fn clear_zeroes_both_buffers() {
        let mut canvas = MaskCanvas::new(5, 5).unwrap();
        canvas.select_all();
        canvas.derive_preview();
        canvas.clear();
        assert!(canvas.is_empty());
        assert!(canvas.preview().as_raw().iter().all(|&v| v == 0));
    }
}
