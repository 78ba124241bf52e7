use geojson::{Geometry, Value};
use glam::DVec2;
use std::f64::consts::FRAC_PI_4;
use std::fmt::Write;

/// Mercator projection onto a fixed logical viewport.
///
/// `project` maps (lon, lat) in degrees to planar (x, y); anything outside the
/// domain or non-finite comes back as `None`, which callers treat as "skip".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub scale: f64,
    pub translate: DVec2,
}

impl Projection {
    pub fn new(scale: f64, translate: DVec2) -> Self {
        Self { scale, translate }
    }

    /// Center sits at `height / 1.4` to trim the empty polar band
    pub fn fitted(width: f64, height: f64, scale: f64) -> Self {
        Self::new(scale, DVec2::new(width / 2.0, height / 1.4))
    }

    pub fn project(&self, lon: f64, lat: f64) -> Option<DVec2> {
        if !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() >= 90.0 {
            return None;
        }
        let lambda = lon.to_radians();
        let phi = lat.to_radians();
        let y = (FRAC_PI_4 + phi / 2.0).tan().ln();
        let p = DVec2::new(
            self.translate.x + self.scale * lambda,
            self.translate.y - self.scale * y,
        );
        p.is_finite().then_some(p)
    }

    /// Inverse of `project`, returns (lon, lat) in degrees
    pub fn invert(&self, p: DVec2) -> Option<(f64, f64)> {
        if !p.is_finite() {
            return None;
        }
        let lambda = (p.x - self.translate.x) / self.scale;
        let y = (self.translate.y - p.y) / self.scale;
        let phi = 2.0 * y.exp().atan() - std::f64::consts::FRAC_PI_2;
        let (lon, lat) = (crate::geo::wrap_lon(lambda.to_degrees()), phi.to_degrees());
        (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
    }
}

/// Projected outline of one geometry: closed rings in viewport units
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathData {
    pub rings: Vec<Vec<DVec2>>,
}

impl PathData {
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// `M x,y L x,y ... Z` per ring; empty string for empty geometry
    pub fn to_svg(&self) -> String {
        let mut d = String::new();
        for ring in &self.rings {
            for (i, p) in ring.iter().enumerate() {
                let cmd = if i == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{cmd}{:.2},{:.2}", p.x, p.y);
            }
            d.push('Z');
        }
        d
    }

    /// Axis-aligned bounds `(min, max)`
    pub fn bounds(&self) -> Option<(DVec2, DVec2)> {
        let mut points = self.rings.iter().flatten();
        let first = *points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some((min, max))
    }

    /// Area-weighted centroid; falls back to the vertex mean for zero-area shapes
    pub fn centroid(&self) -> Option<DVec2> {
        let mut area_sum = 0.0;
        let mut weighted = DVec2::ZERO;
        let mut vertex_sum = DVec2::ZERO;
        let mut vertex_count = 0usize;

        for ring in &self.rings {
            for (i, a) in ring.iter().enumerate() {
                let b = ring[(i + 1) % ring.len()];
                let cross = a.perp_dot(b);
                area_sum += cross;
                weighted += (*a + b) * cross;
                vertex_sum += *a;
                vertex_count += 1;
            }
        }

        if vertex_count == 0 {
            return None;
        }
        if area_sum.abs() > 1e-9 {
            Some(weighted / (3.0 * area_sum))
        } else {
            Some(vertex_sum / vertex_count as f64)
        }
    }
}

/// Turns polygon geometry into projected rings for a projection
#[derive(Clone, Copy, Debug)]
pub struct GeoPath {
    projection: Projection,
    /// Horizontal jump that marks an antimeridian crossing
    wrap_threshold: f64,
}

impl GeoPath {
    pub fn new(projection: Projection) -> Self {
        // Half the projected world width
        let wrap_threshold = projection.scale * std::f64::consts::PI;
        Self {
            projection,
            wrap_threshold,
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Drawable path string for a geometry, empty when degenerate
    pub fn path(&self, geometry: Option<&Geometry>) -> String {
        geometry
            .map(|g| self.project_geometry(g).to_svg())
            .unwrap_or_default()
    }

    /// Project every ring; invalid points are skipped and rings are split
    /// where they wrap around the antimeridian
    pub fn project_geometry(&self, geometry: &Geometry) -> PathData {
        let mut data = PathData::default();
        self.collect_rings(&geometry.value, &mut data.rings);
        data
    }

    fn collect_rings(&self, value: &Value, rings: &mut Vec<Vec<DVec2>>) {
        match value {
            Value::Polygon(polygon) => {
                for ring in polygon {
                    self.push_ring(ring, rings);
                }
            }
            Value::MultiPolygon(polygons) => {
                for polygon in polygons {
                    for ring in polygon {
                        self.push_ring(ring, rings);
                    }
                }
            }
            Value::LineString(line) => self.push_ring(line, rings),
            Value::MultiLineString(lines) => {
                for line in lines {
                    self.push_ring(line, rings);
                }
            }
            Value::GeometryCollection(geometries) => {
                for g in geometries {
                    self.collect_rings(&g.value, rings);
                }
            }
            Value::Point(_) | Value::MultiPoint(_) => {}
        }
    }

    fn push_ring(&self, positions: &[Vec<f64>], rings: &mut Vec<Vec<DVec2>>) {
        let mut current: Vec<DVec2> = Vec::with_capacity(positions.len());

        for pos in positions {
            let (Some(&lon), Some(&lat)) = (pos.first(), pos.get(1)) else {
                continue;
            };
            let Some(p) = self.projection.project(lon, lat) else {
                continue;
            };
            if let Some(prev) = current.last() {
                if (p.x - prev.x).abs() > self.wrap_threshold {
                    flush_ring(&mut current, rings);
                }
            }
            current.push(p);
        }

        flush_ring(&mut current, rings);
    }
}

fn flush_ring(current: &mut Vec<DVec2>, rings: &mut Vec<Vec<DVec2>>) {
    if current.len() >= 2 {
        rings.push(std::mem::take(current));
    } else {
        current.clear();
    }
}
