//! Mask import/export bridge.
//!
//! Outbound, the current mask buffer becomes a [`MaskArtifact`] — an 8-bit
//! grayscale PNG snapshot handed to the external edit-request pipeline.
//! Inbound, an externally computed mask image (e.g. the result of a
//! point-based segmentation request) is decoded, brought to native
//! resolution and written over the mask buffer.  PNG is lossless, so an
//! exported artifact re-imports to an identical buffer.

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, GrayImage, ImageEncoder};

use crate::canvas::MaskCanvas;

// ============================================================================
// ERRORS
// ============================================================================

/// Errors crossing the import/export boundary.
#[derive(Debug)]
pub enum MaskIoError {
    /// The externally supplied mask image could not be decoded.  The mask
    /// buffer is left unchanged; the caller should clear any pending-import
    /// indicator.
    Decode(String),
    /// Encoding the mask buffer failed (effectively resource exhaustion).
    Encode(String),
}

impl std::fmt::Display for MaskIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskIoError::Decode(e) => write!(f, "Failed to decode external mask: {}", e),
            MaskIoError::Encode(e) => write!(f, "Failed to encode mask artifact: {}", e),
        }
    }
}

impl std::error::Error for MaskIoError {}

// ============================================================================
// MASK ARTIFACT
// ============================================================================

/// Encoded snapshot of the mask buffer, produced on every commit.
///
/// An empty selection produces no artifact at all (`None` at the call
/// sites), which downstream consumers read as "no mask".
#[derive(Clone, Debug)]
pub struct MaskArtifact {
    /// Lossless 8-bit grayscale PNG of the full mask buffer.
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Number of selected (>0) pixels.
    pub pixel_count: usize,
    /// Inclusive bounding box of the selected region: (min_x, min_y, max_x, max_y).
    pub bounds: (u32, u32, u32, u32),
}

/// Encode the current mask buffer, or `Ok(None)` when nothing is selected.
pub fn export_artifact(canvas: &MaskCanvas) -> Result<Option<MaskArtifact>, MaskIoError> {
    let Some(stats) = canvas.stats() else {
        return Ok(None);
    };

    let mask = canvas.mask();
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(mask.as_raw(), mask.width(), mask.height(), ColorType::L8)
        .map_err(|e| MaskIoError::Encode(e.to_string()))?;

    Ok(Some(MaskArtifact {
        png,
        width: mask.width(),
        height: mask.height(),
        pixel_count: stats.pixel_count,
        bounds: stats.bounds,
    }))
}

/// Decode an externally supplied mask image and bring it to native
/// resolution.
///
/// Any format the `image` crate recognizes is accepted; the result is
/// collapsed to 8-bit luma.  A same-dimensions image passes through without
/// resampling, which is what keeps the export → import round trip lossless.
pub fn decode_mask(bytes: &[u8], native_w: u32, native_h: u32) -> Result<GrayImage, MaskIoError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| MaskIoError::Decode(e.to_string()))?;
    let luma = decoded.to_luma8();
    if luma.dimensions() == (native_w, native_h) {
        Ok(luma)
    } else {
        Ok(imageops::resize(&luma, native_w, native_h, FilterType::Triangle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::raster;

    #[test]
    fn empty_mask_exports_none() {
        let canvas = MaskCanvas::new(32, 32).unwrap();
        assert!(export_artifact(&canvas).unwrap().is_none());
    }

    #[test]
    fn export_import_round_trip_is_lossless() {
        let mut canvas = MaskCanvas::new(48, 32).unwrap();
        raster::paint_segment(canvas.mask_mut(), (4.0, 4.0), (40.0, 20.0), 9.0);
        // Graded values survive too.
        raster::erase_segment(canvas.mask_mut(), (20.0, 12.0), (20.0, 12.0), 10.0, true);

        let artifact = export_artifact(&canvas).unwrap().unwrap();
        assert_eq!((artifact.width, artifact.height), (48, 32));

        let decoded = decode_mask(&artifact.png, 48, 32).unwrap();
        assert_eq!(decoded.as_raw(), canvas.mask().as_raw());
    }

    #[test]
    fn artifact_carries_stats() {
        let mut canvas = MaskCanvas::new(16, 16).unwrap();
        raster::fill_rect(canvas.mask_mut(), (2.0, 3.0), (5.0, 6.0));
        let artifact = export_artifact(&canvas).unwrap().unwrap();
        assert_eq!(artifact.pixel_count, 16);
        assert_eq!(artifact.bounds, (2, 3, 5, 6));
    }

    #[test]
    fn undecodable_bytes_are_rejected() {
        let err = decode_mask(b"definitely not an image", 8, 8).unwrap_err();
        assert!(matches!(err, MaskIoError::Decode(_)));
    }

    #[test]
    fn mismatched_dimensions_are_resized_to_native() {
        let mut canvas = MaskCanvas::new(20, 20).unwrap();
        canvas.select_all();
        let artifact = export_artifact(&canvas).unwrap().unwrap();
        let decoded = decode_mask(&artifact.png, 40, 10).unwrap();
        assert_eq!(decoded.dimensions(), (40, 10));
        // A fully selected mask stays fully selected through resampling.
        assert!(decoded.as_raw().iter().all(|&v| v == 255));
    }
}
