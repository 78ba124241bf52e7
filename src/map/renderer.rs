use crate::braille::{BrailleCanvas, Ink};
use crate::map::atlas::Atlas;
use crate::map::geometry::{draw_circle, draw_line, draw_ring, draw_thick_line};
use crate::map::viewport::{ZoomTransform, BASE_STROKE_WIDTH};
use crate::scene::{Element, Scene, Shape};
use glam::DVec2;

/// Elements fainter than this are not drawn
const MIN_VISIBLE_OPACITY: f64 = 0.05;

/// Fits the logical viewport into the canvas dot grid, letterboxed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenMapping {
    pub fit: f64,
    pub offset: DVec2,
}

impl ScreenMapping {
    pub fn new(dots_w: usize, dots_h: usize, logical_w: f64, logical_h: f64) -> Self {
        let fit = (dots_w as f64 / logical_w).min(dots_h as f64 / logical_h).max(1e-6);
        let offset = DVec2::new(
            (dots_w as f64 - logical_w * fit) / 2.0,
            (dots_h as f64 - logical_h * fit) / 2.0,
        );
        Self { fit, offset }
    }

    /// Logical screen point to canvas dots
    #[inline(always)]
    pub fn to_dots(&self, p: DVec2) -> DVec2 {
        p * self.fit + self.offset
    }

    /// Canvas dots to logical screen point
    #[inline(always)]
    pub fn to_logical(&self, dots: DVec2) -> DVec2 {
        (dots - self.offset) / self.fit
    }

    /// Centre of a terminal cell (relative to the map area) in logical units
    pub fn cell_to_logical(&self, col: u16, row: u16) -> DVec2 {
        self.to_logical(DVec2::new(col as f64 * 2.0 + 1.0, row as f64 * 4.0 + 2.0))
    }
}

/// Rendered layers, back to front
pub struct MapLayers {
    pub countries: BrailleCanvas,
    pub overlay: BrailleCanvas,
    /// (column, row, text) in map-area cells
    pub labels: Vec<(u16, u16, String)>,
}

/// Draws country outlines and scene elements into Braille canvases
pub struct MapRenderer {
    pub show_labels: bool,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self { show_labels: false }
    }

    pub fn render(
        &self,
        atlas: Option<&Atlas>,
        scene: &Scene,
        transform: ZoomTransform,
        mapping: &ScreenMapping,
        cols: usize,
        rows: usize,
    ) -> MapLayers {
        let mut layers = MapLayers {
            countries: BrailleCanvas::new(cols, rows),
            overlay: BrailleCanvas::new(cols, rows),
            labels: Vec::new(),
        };
        let to_dots = |p: DVec2| mapping.to_dots(transform.apply(p));

        if let Some(atlas) = atlas {
            // Boundary strokes keep constant width on screen
            let thick = BASE_STROKE_WIDTH * mapping.fit >= 1.5;
            for shape in &atlas.shapes {
                for ring in &shape.path.rings {
                    for pair in ring.windows(2) {
                        stroke(&mut layers.countries, to_dots(pair[0]), to_dots(pair[1]), thick, None);
                    }
                }
            }

            if self.show_labels {
                for shape in &atlas.shapes {
                    let (Some(name), Some(centroid)) = (&shape.name, shape.centroid) else {
                        continue;
                    };
                    let dots = to_dots(centroid);
                    if dots.x < 0.0 || dots.y < 0.0 {
                        continue;
                    }
                    let (col, row) = ((dots.x / 2.0) as usize, (dots.y / 4.0) as usize);
                    if col < cols && row < rows {
                        layers.labels.push((col as u16, row as u16, name.clone()));
                    }
                }
            }
        }

        for (_, element) in scene.iter() {
            draw_element(&mut layers.overlay, element, transform, mapping);
        }

        layers
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Colour dimmed by opacity against a black background
pub fn faded(color: Ink, opacity: f64) -> Ink {
    let o = opacity.clamp(0.0, 1.0);
    let scale = |c: u8| (c as f64 * o).round() as u8;
    (scale(color.0), scale(color.1), scale(color.2))
}

fn draw_element(canvas: &mut BrailleCanvas, element: &Element, transform: ZoomTransform, mapping: &ScreenMapping) {
    if element.opacity < MIN_VISIBLE_OPACITY {
        return;
    }
    let ink = faded(element.color, element.opacity);
    let to_dots = |p: DVec2| mapping.to_dots(transform.apply(p));

    match &element.shape {
        Shape::Line {
            from,
            to,
            length,
            dash_offset,
        } => {
            let visible = (length - dash_offset).clamp(0.0, *length);
            if visible <= 0.0 || *length <= 0.0 {
                return;
            }
            let head = *from + (*to - *from) * (visible / length);
            let thick = element.stroke_width * transform.k * mapping.fit >= 1.5;
            stroke(canvas, to_dots(*from), to_dots(head), thick, Some(ink));
        }
        Shape::Circle {
            center,
            radius,
            filled,
            ..
        } => {
            if *radius <= 0.0 {
                return;
            }
            let c = to_dots(*center);
            if !c.is_finite() {
                return;
            }
            let r = (radius * transform.k * mapping.fit).round() as i32;
            let (cx, cy) = (c.x.round() as i32, c.y.round() as i32);
            if *filled {
                draw_circle(canvas, cx, cy, r, Some(ink));
            } else {
                draw_ring(canvas, cx, cy, r, Some(ink));
            }
        }
    }
}

/// Draw a segment after clipping it to the canvas
fn stroke(canvas: &mut BrailleCanvas, a: DVec2, b: DVec2, thick: bool, ink: Option<Ink>) {
    let (w, h) = canvas.pixel_size();
    let Some((a, b)) = clip_segment(a, b, DVec2::splat(-2.0), DVec2::new(w as f64 + 2.0, h as f64 + 2.0)) else {
        return;
    };
    let (x0, y0, x1, y1) = (
        a.x.round() as i32,
        a.y.round() as i32,
        b.x.round() as i32,
        b.y.round() as i32,
    );
    if thick {
        draw_thick_line(canvas, x0, y0, x1, y1, ink);
    } else {
        draw_line(canvas, x0, y0, x1, y1, ink);
    }
}

/// Liang–Barsky clip of segment `a`→`b` against the box `[min, max]`
fn clip_segment(a: DVec2, b: DVec2, min: DVec2, max: DVec2) -> Option<(DVec2, DVec2)> {
    if !a.is_finite() || !b.is_finite() {
        return None;
    }
    let d = b - a;
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);

    for (p, q) in [
        (-d.x, a.x - min.x),
        (d.x, max.x - a.x),
        (-d.y, a.y - min.y),
        (d.y, max.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return None;
            }
        }
    }

    Some((a + d * t0, a + d * t1))
}
