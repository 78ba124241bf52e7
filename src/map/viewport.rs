use glam::DVec2;

/// Boundary stroke width at zoom 1
pub const BASE_STROKE_WIDTH: f64 = 0.5;

/// Accumulated pan/zoom transform: `screen = content * k + (x, y)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl ZoomTransform {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    #[inline(always)]
    pub fn apply(&self, p: DVec2) -> DVec2 {
        DVec2::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    #[inline(always)]
    pub fn invert(&self, p: DVec2) -> DVec2 {
        DVec2::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Drag-to-pan and wheel-to-zoom over the map content.
///
/// The transform tracks the pointer directly; there is no easing. Every
/// mutating call returns whether the transform changed so the caller can
/// rescale strokes and markers.
#[derive(Clone, Debug)]
pub struct ViewportController {
    transform: ZoomTransform,
    min_zoom: f64,
    max_zoom: f64,
    drag_anchor: Option<DVec2>,
}

impl ViewportController {
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            transform: ZoomTransform::IDENTITY,
            min_zoom,
            max_zoom,
            drag_anchor: None,
        }
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    pub fn scale(&self) -> f64 {
        self.transform.k
    }

    pub fn scale_bounds(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    /// Boundary stroke width in content units, constant on screen
    pub fn stroke_width(&self) -> f64 {
        BASE_STROKE_WIDTH / self.transform.k
    }

    /// Pan by a delta in screen units
    pub fn pan(&mut self, dx: f64, dy: f64) -> bool {
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        self.transform.x += dx;
        self.transform.y += dy;
        true
    }

    pub fn begin_drag(&mut self, p: DVec2) {
        self.drag_anchor = Some(p);
    }

    /// Move the drag to `p`, panning by the pointer delta
    pub fn drag_to(&mut self, p: DVec2) -> bool {
        let Some(anchor) = self.drag_anchor.replace(p) else {
            return false;
        };
        let delta = p - anchor;
        self.pan(delta.x, delta.y)
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Zoom in towards a specific screen location
    pub fn zoom_in_at(&mut self, p: DVec2) -> bool {
        self.zoom_at(p, 1.5)
    }

    /// Zoom out from a specific screen location
    pub fn zoom_out_at(&mut self, p: DVec2) -> bool {
        self.zoom_at(p, 1.0 / 1.5)
    }

    /// Multiply the scale by `factor`, keeping the content under `p` fixed
    pub fn zoom_at(&mut self, p: DVec2, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        self.zoom_to(p, self.transform.k * factor)
    }

    fn zoom_to(&mut self, p: DVec2, k: f64) -> bool {
        let k = k.clamp(self.min_zoom, self.max_zoom);
        if k == self.transform.k {
            return false;
        }
        // Content point under the pointer stays under the pointer
        let anchor = self.transform.invert(p);
        self.transform.k = k;
        self.transform.x = p.x - anchor.x * k;
        self.transform.y = p.y - anchor.y * k;
        true
    }

    pub fn reset(&mut self) -> bool {
        let changed = self.transform != ZoomTransform::IDENTITY;
        self.transform = ZoomTransform::IDENTITY;
        self.drag_anchor = None;
        changed
    }
}
