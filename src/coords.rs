//! Display ↔ native coordinate mapping.
//!
//! Pointer events arrive in display space (the on-screen box the rendered
//! image occupies); every raster operation works in the mask buffer's native
//! pixel space.  The two resolutions must never desynchronize, so all
//! conversions go through a [`CoordMapper`] that is rebuilt whenever the
//! display rectangle or the source image changes.

/// The on-screen rectangle occupied by the rendered source image.
///
/// Changes on window resize or layout reflow; the host pushes updates via
/// [`crate::session::MaskSession::set_display_rect`].  Not persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRect {
    /// Left edge in display units.
    pub x: f32,
    /// Top edge in display units.
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A zero-area rectangle makes the mapping undefined; gestures against
    /// it are skipped rather than surfaced as errors.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Converts pointer positions between display space and native mask-buffer
/// space using independent X/Y scale factors.
#[derive(Clone, Copy, Debug)]
pub struct CoordMapper {
    rect: DisplayRect,
    native_w: u32,
    native_h: u32,
    scale_x: f32,
    scale_y: f32,
}

impl CoordMapper {
    pub fn new(rect: DisplayRect, native_w: u32, native_h: u32) -> Self {
        let (scale_x, scale_y) = if rect.has_area() {
            (
                native_w as f32 / rect.width,
                native_h as f32 / rect.height,
            )
        } else {
            (0.0, 0.0)
        };
        Self {
            rect,
            native_w,
            native_h,
            scale_x,
            scale_y,
        }
    }

    /// False when the display rectangle has zero area.
    pub fn is_mappable(&self) -> bool {
        self.rect.has_area()
    }

    pub fn display_rect(&self) -> DisplayRect {
        self.rect
    }

    pub fn native_dimensions(&self) -> (u32, u32) {
        (self.native_w, self.native_h)
    }

    /// Display-space point → native mask-buffer point.
    ///
    /// Points outside the display rectangle map to out-of-bounds native
    /// coordinates; raster operations clamp, so a drag that leaves the
    /// surface still commits what was drawn.
    pub fn to_native(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.rect.x) * self.scale_x, (y - self.rect.y) * self.scale_y)
    }

    /// Native mask-buffer point → display-space point.
    pub fn to_display(&self, x: f32, y: f32) -> (f32, f32) {
        if self.scale_x == 0.0 || self.scale_y == 0.0 {
            return (self.rect.x, self.rect.y);
        }
        (x / self.scale_x + self.rect.x, y / self.scale_y + self.rect.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_display_to_native_with_independent_scales() {
        // 800×600 native image shown in a 400×150 box at (100, 50)
        let mapper = CoordMapper::new(DisplayRect::new(100.0, 50.0, 400.0, 150.0), 800, 600);
        let (x, y) = mapper.to_native(100.0, 50.0);
        assert_eq!((x, y), (0.0, 0.0));
        let (x, y) = mapper.to_native(500.0, 200.0);
        assert_eq!((x, y), (800.0, 600.0));
        let (x, y) = mapper.to_native(300.0, 125.0);
        assert_eq!((x, y), (400.0, 300.0));
    }

    #[test]
    fn round_trips_back_to_display() {
        let mapper = CoordMapper::new(DisplayRect::new(12.0, 8.0, 320.0, 240.0), 640, 480);
        let (nx, ny) = mapper.to_native(200.0, 100.0);
        let (dx, dy) = mapper.to_display(nx, ny);
        assert!((dx - 200.0).abs() < 1e-4);
        assert!((dy - 100.0).abs() < 1e-4);
    }

    #[test]
    fn zero_area_rect_is_not_mappable() {
        let mapper = CoordMapper::new(DisplayRect::new(0.0, 0.0, 0.0, 100.0), 800, 600);
        assert!(!mapper.is_mappable());
    }

    #[test]
    fn rebuilding_with_identical_geometry_is_idempotent() {
        let rect = DisplayRect::new(5.0, 5.0, 200.0, 100.0);
        let a = CoordMapper::new(rect, 400, 200);
        let b = CoordMapper::new(rect, 400, 200);
        assert_eq!(a.to_native(77.0, 31.0), b.to_native(77.0, 31.0));
    }
}
