//! Selection session — the tool state machine and the engine's public
//! surface.
//!
//! The host feeds display-space gesture events in; the session maps them to
//! native coordinates, dispatches to the rasterizer or the wand, keeps the
//! preview in sync, and finalizes each interaction into a committed mask
//! artifact.  Everything runs synchronously on the input thread; the only
//! asynchronous boundary is the external segmentation request, which is
//! fire-and-forget and whose result re-enters through [`MaskSession::import_mask`].

use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{CanvasError, MaskCanvas};
use crate::coords::{CoordMapper, DisplayRect};
use crate::io::{self, MaskArtifact, MaskIoError};
use crate::ops::{raster, wand};

/// Display-space radius within which a polygon click closes the shape.
const POLYGON_CLOSE_RADIUS: f32 = 20.0;
/// A polygon may only close once this many vertices exist.
const POLYGON_MIN_VERTICES: usize = 3;

// ============================================================================
// TOOLS
// ============================================================================

/// The mutually exclusive selection tools.  Exactly one is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    /// Freehand paint into the mask.
    Brush,
    /// Freehand removal from the mask (hard or soft edge).
    Eraser,
    Rectangle,
    Circle,
    /// Click-to-place vertices; closes near the first vertex.
    Polygon,
    /// Color-similarity flood select on the source image.
    Wand,
    /// Forwards a seed point to the external segmentation collaborator.
    PointSelect,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[
            Tool::Brush,
            Tool::Eraser,
            Tool::Rectangle,
            Tool::Circle,
            Tool::Polygon,
            Tool::Wand,
            Tool::PointSelect,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Brush => "Brush",
            Tool::Eraser => "Eraser",
            Tool::Rectangle => "Rectangle",
            Tool::Circle => "Circle",
            Tool::Polygon => "Polygon",
            Tool::Wand => "Wand",
            Tool::PointSelect => "Point Select",
        }
    }

    /// Tools whose strokes hit the mask incrementally while dragging.
    fn paints_incrementally(self) -> bool {
        matches!(self, Tool::Brush | Tool::Eraser)
    }
}

/// Host-adjustable engine settings.  Serde-serializable so hosts can persist
/// them alongside their own configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolProperties {
    /// Brush/eraser stroke width in native (mask-buffer) pixels, so a
    /// stroke's footprint on the artifact does not depend on display zoom.
    pub brush_width: f32,
    /// Soft-falloff eraser edge instead of a hard one.
    pub soft_erase: bool,
    /// Wand tolerance on the 0–100 user scale.
    pub wand_tolerance: f32,
    /// Restrict the wand to the 4-connected region around the seed.
    pub wand_contiguous: bool,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            brush_width: 32.0,
            soft_erase: false,
            wand_tolerance: 20.0,
            wand_contiguous: true,
        }
    }
}

// ============================================================================
// EVENTS & REQUESTS
// ============================================================================

/// A pointer/touch gesture step in display coordinates.
///
/// Hosts may also forward hover movement as `Move` while no drag is open;
/// the session only uses it to keep the polygon outline anchored to the
/// cursor.
#[derive(Clone, Copy, Debug)]
pub enum GestureEvent {
    Start { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    End { x: f32, y: f32 },
}

/// A fire-and-forget request for external point-based segmentation.
/// The engine stays responsive while it is outstanding; whatever mask comes
/// back is applied through [`MaskSession::import_mask`] — last write wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentationRequest {
    /// Correlation id for the host's request/response plumbing.
    pub id: Uuid,
    /// Seed point in source-image pixel space.
    pub point: (u32, u32),
}

// ============================================================================
// SESSION STATE
// ============================================================================

/// Typed interaction state.  At most one tool's in-progress shape is live.
#[derive(Clone, Debug)]
pub enum SessionState {
    Idle,
    /// A drag gesture is open for brush/eraser/rectangle/circle.
    Dragging {
        tool: Tool,
        /// Native-space gesture origin (rectangle/circle anchor).
        anchor: (f32, f32),
        /// Last sampled point, for stroke segment interpolation.
        last: (f32, f32),
        /// Live end point (rectangle/circle overlay).
        current: (f32, f32),
        /// Mask snapshot from gesture start; restored if the tool is
        /// switched away mid-gesture.  Present for incremental tools only.
        before: Option<GrayImage>,
    },
    /// Polygon vertices collected so far (native space).
    PolygonBuilding { vertices: Vec<(f32, f32)> },
    /// Transient: a finished interaction is being rasterized and exported.
    Committing,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }
}

/// Geometry of the in-progress interaction, for the host to draw as chrome.
/// Native-space coordinates; never touches the mask.
#[derive(Clone, Debug)]
pub enum SessionOverlay {
    Rectangle {
        min: (f32, f32),
        max: (f32, f32),
    },
    Circle {
        center: (f32, f32),
        radius: f32,
    },
    /// Committed vertices plus the rubber-band segment to the cursor.
    /// `closing` flips on when the cursor re-enters the closing radius of
    /// the first vertex (and enough vertices exist).
    Polygon {
        vertices: Vec<(f32, f32)>,
        cursor: (f32, f32),
        closing: bool,
    },
}

// ============================================================================
// MASK SESSION
// ============================================================================

/// The selection session: owns the surface pair, the coordinate mapper and
/// all interaction state.
pub struct MaskSession {
    source: RgbaImage,
    canvas: MaskCanvas,
    mapper: CoordMapper,
    active_tool: Tool,
    pub properties: ToolProperties,
    state: SessionState,
    artifact: Option<MaskArtifact>,
    pending_segmentation: Option<SegmentationRequest>,
    /// Last observed pointer position (display space), for the polygon
    /// rubber band.
    last_pointer: Option<(f32, f32)>,
}

impl MaskSession {
    /// Create a session over a source image.  Fails only when the surface
    /// pair cannot be allocated at the image's native resolution.
    pub fn new(source: RgbaImage, display_rect: DisplayRect) -> Result<Self, CanvasError> {
        let (w, h) = source.dimensions();
        let canvas = MaskCanvas::new(w, h)?;
        crate::log_info!("mask session created for {}×{} source", w, h);
        Ok(Self {
            source,
            canvas,
            mapper: CoordMapper::new(display_rect, w, h),
            active_tool: Tool::Brush,
            properties: ToolProperties::default(),
            state: SessionState::Idle,
            artifact: None,
            pending_segmentation: None,
            last_pointer: None,
        })
    }

    // ---- accessors ----------------------------------------------------------

    pub fn canvas(&self) -> &MaskCanvas {
        &self.canvas
    }

    pub fn mapper(&self) -> &CoordMapper {
        &self.mapper
    }

    pub fn active_tool(&self) -> Tool {
        self.active_tool
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The artifact produced by the most recent commit; `None` while the
    /// selection is empty.  Never updated mid-gesture.
    pub fn mask_artifact(&self) -> Option<&MaskArtifact> {
        self.artifact.as_ref()
    }

    /// Drain the pending external segmentation request, if any.
    pub fn take_segmentation_request(&mut self) -> Option<SegmentationRequest> {
        self.pending_segmentation.take()
    }

    // ---- lifecycle ----------------------------------------------------------

    /// Swap in a new source image (fresh upload or an applied edit result).
    /// Reallocates both buffers, drops all interaction state and the current
    /// artifact; the display rectangle is kept until the host reports a new
    /// layout.
    pub fn set_source_image(&mut self, source: RgbaImage) -> Result<(), CanvasError> {
        let (w, h) = source.dimensions();
        self.canvas = MaskCanvas::new(w, h)?;
        self.source = source;
        self.mapper = CoordMapper::new(self.mapper.display_rect(), w, h);
        self.state = SessionState::Idle;
        self.artifact = None;
        crate::log_info!("source image replaced ({}×{}), mask reset", w, h);
        Ok(())
    }

    /// Report the on-screen rectangle the rendered image occupies.
    /// Idempotent: repeated calls with identical geometry change nothing.
    pub fn set_display_rect(&mut self, rect: DisplayRect) {
        if rect == self.mapper.display_rect() {
            return;
        }
        let (w, h) = (self.canvas.width(), self.canvas.height());
        self.mapper = CoordMapper::new(rect, w, h);
    }

    /// Zero the mask, discard in-progress shape state, report no artifact.
    pub fn clear(&mut self) {
        self.canvas.clear();
        self.state = SessionState::Idle;
        self.artifact = None;
        crate::log_info!("selection cleared");
    }

    // ---- tool switching -----------------------------------------------------

    /// Activate a tool.  Switching away from a tool with an in-progress
    /// shape discards that shape without committing: an interrupted stroke
    /// is rolled back to the pre-gesture mask.
    pub fn on_tool_change(&mut self, tool: Tool) {
        if tool == self.active_tool {
            return;
        }
        self.cancel_in_progress();
        self.active_tool = tool;
    }

    fn cancel_in_progress(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Dragging {
                before: Some(before),
                ..
            } => {
                self.canvas.replace_mask(before);
                self.canvas.derive_preview();
            }
            _ => {}
        }
    }

    // ---- whole-mask commands ------------------------------------------------

    /// Select every pixel (single-shot commit).
    pub fn select_all(&mut self) {
        self.cancel_in_progress();
        self.state = SessionState::Committing;
        self.canvas.select_all();
        self.commit();
        self.state = SessionState::Idle;
    }

    /// Invert the selection (single-shot commit).
    pub fn invert_selection(&mut self) {
        self.cancel_in_progress();
        self.state = SessionState::Committing;
        self.canvas.invert();
        self.commit();
        self.state = SessionState::Idle;
    }

    // ---- gesture handling ---------------------------------------------------

    /// Feed one gesture event through the state machine.
    pub fn handle_gesture(&mut self, event: GestureEvent) {
        match event {
            GestureEvent::Start { x, y } => self.on_gesture_start(x, y),
            GestureEvent::Move { x, y } => self.on_gesture_move(x, y),
            GestureEvent::End { x, y } => self.on_gesture_end(x, y),
        }
    }

    pub fn on_gesture_start(&mut self, x: f32, y: f32) {
        self.last_pointer = Some((x, y));
        if !self.mapper.is_mappable() {
            return;
        }
        // A Start while a drag is already open behaves like a Move.
        if matches!(self.state, SessionState::Dragging { .. }) {
            self.on_gesture_move(x, y);
            return;
        }

        let native = self.mapper.to_native(x, y);
        match self.active_tool {
            Tool::Brush | Tool::Eraser => {
                let before = self.canvas.mask().clone();
                self.apply_stroke(self.active_tool, native, native);
                self.canvas.derive_preview();
                self.state = SessionState::Dragging {
                    tool: self.active_tool,
                    anchor: native,
                    last: native,
                    current: native,
                    before: Some(before),
                };
            }
            Tool::Rectangle | Tool::Circle => {
                self.state = SessionState::Dragging {
                    tool: self.active_tool,
                    anchor: native,
                    last: native,
                    current: native,
                    before: None,
                };
            }
            Tool::Polygon => self.polygon_click(native, (x, y)),
            Tool::Wand => self.wand_click(native),
            Tool::PointSelect => self.point_select_click(native),
        }
    }

    pub fn on_gesture_move(&mut self, x: f32, y: f32) {
        self.last_pointer = Some((x, y));
        if !self.mapper.is_mappable() {
            return;
        }
        let native = self.mapper.to_native(x, y);

        let (tool, from) = match &mut self.state {
            SessionState::Dragging {
                tool,
                last,
                current,
                ..
            } => {
                *current = native;
                if !tool.paints_incrementally() {
                    // Rectangle/circle: only the overlay tracks the pointer;
                    // the final shape is rasterized once on gesture end.
                    return;
                }
                let from = *last;
                *last = native;
                (*tool, from)
            }
            _ => return,
        };

        self.apply_stroke(tool, from, native);
        self.canvas.derive_preview();
    }

    /// Finish the open gesture.  Fires whether or not the pointer is still
    /// over the surface — a drag that leaves the element commits whatever
    /// was drawn so far; partial strokes are never silently discarded.
    pub fn on_gesture_end(&mut self, x: f32, y: f32) {
        self.last_pointer = Some((x, y));
        if !self.mapper.is_mappable() {
            return;
        }

        match std::mem::replace(&mut self.state, SessionState::Committing) {
            SessionState::Dragging {
                tool, anchor, last, ..
            } => {
                let native = self.mapper.to_native(x, y);
                match tool {
                    Tool::Brush | Tool::Eraser => self.apply_stroke(tool, last, native),
                    Tool::Rectangle => {
                        raster::fill_rect(self.canvas.mask_mut(), anchor, native);
                    }
                    Tool::Circle => {
                        let dx = native.0 - anchor.0;
                        let dy = native.1 - anchor.1;
                        raster::fill_circle(self.canvas.mask_mut(), anchor, (dx * dx + dy * dy).sqrt());
                    }
                    _ => {}
                }
                self.commit();
                self.state = SessionState::Idle;
            }
            // Polygon building spans many click gestures; End is not a
            // commit point for it.
            other => self.state = other,
        }
    }

    fn apply_stroke(&mut self, tool: Tool, from: (f32, f32), to: (f32, f32)) {
        let width = self.properties.brush_width;
        match tool {
            Tool::Brush => raster::paint_segment(self.canvas.mask_mut(), from, to, width),
            Tool::Eraser => raster::erase_segment(
                self.canvas.mask_mut(),
                from,
                to,
                width,
                self.properties.soft_erase,
            ),
            _ => {}
        }
    }

    // ---- single-shot tools --------------------------------------------------

    fn wand_click(&mut self, native: (f32, f32)) {
        let Some(seed) = self.native_pixel(native) else {
            return; // out-of-bounds seed: no-op
        };
        self.state = SessionState::Committing;
        wand::flood_select(
            &self.source,
            self.canvas.mask_mut(),
            seed,
            self.properties.wand_tolerance,
            self.properties.wand_contiguous,
        );
        self.commit();
        self.state = SessionState::Idle;
    }

    fn point_select_click(&mut self, native: (f32, f32)) {
        let Some(point) = self.native_pixel(native) else {
            return;
        };
        self.state = SessionState::Committing;
        let request = SegmentationRequest {
            id: Uuid::new_v4(),
            point,
        };
        crate::log_info!(
            "segmentation requested at ({}, {}) [{}]",
            point.0,
            point.1,
            request.id
        );
        // The mask is untouched; the eventual result arrives via import_mask.
        self.pending_segmentation = Some(request);
        self.commit();
        self.state = SessionState::Idle;
    }

    fn polygon_click(&mut self, native: (f32, f32), display: (f32, f32)) {
        let close = match &self.state {
            SessionState::PolygonBuilding { vertices }
                if vertices.len() >= POLYGON_MIN_VERTICES =>
            {
                self.display_distance(vertices[0], display) <= POLYGON_CLOSE_RADIUS
            }
            _ => false,
        };

        if close {
            if let SessionState::PolygonBuilding { vertices } =
                std::mem::replace(&mut self.state, SessionState::Committing)
            {
                raster::fill_polygon(self.canvas.mask_mut(), &vertices);
                self.commit();
            }
            self.state = SessionState::Idle;
        } else {
            match &mut self.state {
                SessionState::PolygonBuilding { vertices } => vertices.push(native),
                _ => {
                    self.state = SessionState::PolygonBuilding {
                        vertices: vec![native],
                    }
                }
            }
        }
    }

    // ---- import / export ----------------------------------------------------

    /// Apply an externally computed mask image (e.g. a segmentation result).
    /// Replaces the mask buffer wholesale and commits; any in-progress shape
    /// state is dropped — per the concurrency model, last write wins.
    /// On decode failure the buffer is left untouched and the error is
    /// returned so the host can clear its pending-import indicator.
    pub fn import_mask(&mut self, bytes: &[u8]) -> Result<(), MaskIoError> {
        let mask = match io::decode_mask(bytes, self.canvas.width(), self.canvas.height()) {
            Ok(mask) => mask,
            Err(e) => {
                crate::log_warn!("external mask import rejected: {}", e);
                return Err(e);
            }
        };
        self.state = SessionState::Idle;
        self.canvas.replace_mask(mask);
        self.commit();
        crate::log_info!("external mask imported");
        Ok(())
    }

    /// Re-derive the preview and refresh the exported artifact from the
    /// current mask buffer.  Runs only at interaction boundaries, never
    /// mid-gesture.
    fn commit(&mut self) {
        self.canvas.derive_preview();
        match io::export_artifact(&self.canvas) {
            Ok(artifact) => self.artifact = artifact,
            Err(e) => {
                crate::log_err!("mask export failed: {}", e);
                self.artifact = None;
            }
        }
    }

    // ---- overlay ------------------------------------------------------------

    /// Geometry of the live interaction for the host to draw (rubber-band
    /// rectangle/circle, polygon outline).  `None` when there is nothing
    /// in progress.
    pub fn overlay(&self) -> Option<SessionOverlay> {
        match &self.state {
            SessionState::Dragging {
                tool: Tool::Rectangle,
                anchor,
                current,
                ..
            } => Some(SessionOverlay::Rectangle {
                min: (anchor.0.min(current.0), anchor.1.min(current.1)),
                max: (anchor.0.max(current.0), anchor.1.max(current.1)),
            }),
            SessionState::Dragging {
                tool: Tool::Circle,
                anchor,
                current,
                ..
            } => {
                let dx = current.0 - anchor.0;
                let dy = current.1 - anchor.1;
                Some(SessionOverlay::Circle {
                    center: *anchor,
                    radius: (dx * dx + dy * dy).sqrt(),
                })
            }
            SessionState::PolygonBuilding { vertices } => {
                let cursor_display = self.last_pointer.unwrap_or_else(|| {
                    let last = vertices[vertices.len() - 1];
                    self.mapper.to_display(last.0, last.1)
                });
                let closing = vertices.len() >= POLYGON_MIN_VERTICES
                    && self.display_distance(vertices[0], cursor_display)
                        <= POLYGON_CLOSE_RADIUS;
                Some(SessionOverlay::Polygon {
                    vertices: vertices.clone(),
                    cursor: self.mapper.to_native(cursor_display.0, cursor_display.1),
                    closing,
                })
            }
            _ => None,
        }
    }

    // ---- helpers ------------------------------------------------------------

    /// Native-space point → integer pixel, `None` when outside the buffer.
    fn native_pixel(&self, native: (f32, f32)) -> Option<(u32, u32)> {
        if native.0 < 0.0 || native.1 < 0.0 {
            return None;
        }
        let (x, y) = (native.0 as u32, native.1 as u32);
        if x >= self.canvas.width() || y >= self.canvas.height() {
            return None;
        }
        Some((x, y))
    }

    /// Display-space distance between a native-space point and a
    /// display-space point.
    fn display_distance(&self, native: (f32, f32), display: (f32, f32)) -> f32 {
        let mapped = self.mapper.to_display(native.0, native.1);
        let dx = display.0 - mapped.0;
        let dy = display.1 - mapped.1;
        (dx * dx + dy * dy).sqrt()
    }
}
