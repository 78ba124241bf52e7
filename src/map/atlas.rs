use crate::data::WorldGeometry;
use crate::map::projection::{GeoPath, PathData};
use glam::DVec2;
use rayon::prelude::*;

/// A country projected once into viewport units
#[derive(Clone, Debug)]
pub struct CountryShape {
    pub code: Option<u16>,
    pub name: Option<String>,
    pub path: PathData,
    pub bounds: Option<(DVec2, DVec2)>,
    pub centroid: Option<DVec2>,
}

impl CountryShape {
    /// Bounds usable for scattering points: finite with non-zero area
    pub fn scatter_box(&self) -> Option<(DVec2, DVec2)> {
        let (min, max) = self.bounds?;
        (min.is_finite() && max.is_finite() && max.x > min.x && max.y > min.y)
            .then_some((min, max))
    }
}

/// Projected country shapes, in the same order as the loaded features
#[derive(Clone, Debug, Default)]
pub struct Atlas {
    pub shapes: Vec<CountryShape>,
}

impl Atlas {
    /// Project every country in parallel
    pub fn build(world: &WorldGeometry, path: &GeoPath) -> Self {
        let shapes = world
            .countries
            .par_iter()
            .map(|country| {
                let data = country
                    .feature
                    .geometry
                    .as_ref()
                    .map(|g| path.project_geometry(g))
                    .unwrap_or_default();
                CountryShape {
                    code: country.code,
                    name: country.name.clone(),
                    bounds: data.bounds(),
                    centroid: data.centroid(),
                    path: data,
                }
            })
            .collect();
        Self { shapes }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Look a country up by ISO numeric code
    pub fn by_code(&self, code: u16) -> Option<&CountryShape> {
        self.shapes.iter().find(|s| s.code == Some(code))
    }

    /// Total number of projected ring points
    pub fn point_count(&self) -> usize {
        self.shapes
            .iter()
            .map(|s| s.path.rings.iter().map(Vec::len).sum::<usize>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::three_countries;
    use crate::map::projection::Projection;

    #[test]
    fn test_build_preserves_order_and_codes() {
        let path = GeoPath::new(Projection::fitted(1200.0, 600.0, 170.0));
        let atlas = Atlas::build(&three_countries(), &path);
        assert_eq!(atlas.len(), 3);
        assert_eq!(atlas.shapes[2].code, Some(643));
        assert!(atlas.by_code(156).unwrap().centroid.is_some());
        assert!(atlas.shapes.iter().all(|s| s.scatter_box().is_some()));
        assert_eq!(atlas.point_count(), 15);
    }
}
