use super::{AttackEvent, AttackKind};
use crate::data::places::{City, HIGH_INTENSITY_COUNTRIES};
use crate::geo::GeoCoordinate;
use crate::hash::RandomSource;
use crate::map::{Atlas, Projection};
use std::collections::BTreeSet;

/// A high-intensity country resolved to its centroid
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hotspot {
    pub code: u16,
    pub coord: GeoCoordinate,
}

/// Synthesizes random attack events once per tick.
///
/// With probability `high_intensity_ratio` a tick pairs two hotspot
/// centroids and adds a burst of one to `max_burst` extra pairs; otherwise it
/// pairs two named cities. Pairs whose endpoints coincide are rejected.
#[derive(Clone, Debug)]
pub struct AttackGenerator {
    hotspots: Vec<Hotspot>,
    cities: Vec<City>,
    high_intensity_ratio: f64,
    max_burst: usize,
}

impl AttackGenerator {
    pub fn new(hotspots: Vec<Hotspot>, cities: Vec<City>, high_intensity_ratio: f64, max_burst: usize) -> Self {
        Self {
            hotspots,
            cities,
            high_intensity_ratio,
            max_burst,
        }
    }

    /// Resolve hotspot centroids by country code.
    ///
    /// Candidates are the high-intensity countries in priority order; a
    /// non-empty `focus` keeps only those among them. Codes missing from the
    /// atlas, or whose centroid does not invert, are skipped.
    pub fn resolve_hotspots(atlas: &Atlas, projection: &Projection, focus: &BTreeSet<u16>) -> Vec<Hotspot> {
        HIGH_INTENSITY_COUNTRIES
            .iter()
            .copied()
            .filter(|code| focus.is_empty() || focus.contains(code))
            .filter_map(|code| {
                let centroid = atlas.by_code(code)?.centroid?;
                let (lon, lat) = projection.invert(centroid)?;
                let coord = GeoCoordinate::new(lon, lat);
                coord.is_valid().then_some(Hotspot { code, coord })
            })
            .collect()
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn set_hotspots(&mut self, hotspots: Vec<Hotspot>) {
        self.hotspots = hotspots;
    }

    pub fn set_cities(&mut self, cities: Vec<City>) {
        self.cities = cities;
    }

    /// Events for one tick, in firing order
    pub fn tick(&self, rng: &mut dyn RandomSource) -> Vec<AttackEvent> {
        let mut events = Vec::new();
        let use_hotspots = rng.chance(self.high_intensity_ratio) && !self.hotspots.is_empty();

        if use_hotspots {
            self.push_pair(&mut events, self.hotspot_pair(rng), AttackKind::Hotspot);

            let extra = rng.index(self.max_burst.max(1)) + 1;
            for _ in 0..extra.min(self.max_burst) {
                self.push_pair(&mut events, self.hotspot_pair(rng), AttackKind::Hotspot);
            }
        } else if !self.cities.is_empty() {
            let source = self.cities[rng.index(self.cities.len())].coord;
            let target = self.cities[rng.index(self.cities.len())].coord;
            self.push_pair(&mut events, (source, target), AttackKind::City);
        }

        events
    }

    fn hotspot_pair(&self, rng: &mut dyn RandomSource) -> (GeoCoordinate, GeoCoordinate) {
        let source = self.hotspots[rng.index(self.hotspots.len())].coord;
        let target = self.hotspots[rng.index(self.hotspots.len())].coord;
        (source, target)
    }

    fn push_pair(&self, events: &mut Vec<AttackEvent>, (source, target): (GeoCoordinate, GeoCoordinate), kind: AttackKind) {
        if source != target {
            events.push(AttackEvent { source, target, kind });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::places::city_pool;
    use crate::data::testing::{square_country, three_countries};
    use crate::data::WorldGeometry;
    use geojson::FeatureCollection;
    use crate::hash::testing::Scripted;
    use crate::hash::SimRng;
    use crate::map::GeoPath;

    fn generator(ratio: f64) -> AttackGenerator {
        let projection = Projection::fitted(1200.0, 600.0, 170.0);
        let atlas = Atlas::build(&three_countries(), &GeoPath::new(projection));
        let hotspots = AttackGenerator::resolve_hotspots(&atlas, &projection, &BTreeSet::new());
        AttackGenerator::new(hotspots, city_pool(false), ratio, 3)
    }

    #[test]
    fn test_hotspots_resolved_by_code() {
        let gen = generator(0.7);
        let codes: Vec<u16> = gen.hotspots().iter().map(|h| h.code).collect();
        // Only the three mock countries exist, in priority order
        assert_eq!(codes, vec![840, 156, 643]);
        let usa = gen.hotspots()[0].coord;
        assert!(usa.lon > -100.0 && usa.lon < -90.0);
        assert!(usa.lat > 30.0 && usa.lat < 40.0);
    }

    #[test]
    fn test_focus_limits_hotspots() {
        let projection = Projection::fitted(1200.0, 600.0, 170.0);
        let atlas = Atlas::build(&three_countries(), &GeoPath::new(projection));
        let hotspots = AttackGenerator::resolve_hotspots(&atlas, &projection, &BTreeSet::from([643, 999]));
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].code, 643);
    }

    #[test]
    fn test_focus_never_adds_countries() {
        let world = WorldGeometry::from_collection(FeatureCollection {
            bbox: None,
            features: vec![
                square_country("380", "Italy", 12.0, 42.0, 5.0),
                square_country("276", "Germany", 10.0, 50.0, 5.0),
                square_country("616", "Poland", 20.0, 52.0, 5.0),
            ],
            foreign_members: None,
        });
        let projection = Projection::fitted(1200.0, 600.0, 170.0);
        let atlas = Atlas::build(&world, &GeoPath::new(projection));
        let europe = crate::data::places::region_countries(&BTreeSet::from(["EUROPE".to_string()]));
        let codes: Vec<u16> = AttackGenerator::resolve_hotspots(&atlas, &projection, &europe)
            .iter()
            .map(|h| h.code)
            .collect();
        assert_eq!(codes, vec![276]);
    }

    #[test]
    fn test_same_pick_is_rejected() {
        let gen = generator(0.0);
        // City tick: both picks land on index 0
        let mut rng = Scripted::new(&[0.9, 0.0, 0.0], 0.0);
        assert!(gen.tick(&mut rng).is_empty());
    }

    #[test]
    fn test_city_tick() {
        let gen = generator(0.0);
        let mut rng = Scripted::new(&[0.9, 0.0, 0.15], 0.0);
        let events = gen.tick(&mut rng);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AttackKind::City);
        assert_eq!(events[0].source, city_pool(false)[0].coord);
        assert_eq!(events[0].target, city_pool(false)[1].coord);
    }

    #[test]
    fn test_hotspot_burst() {
        let gen = generator(1.0);
        // main A->B, burst of 3 (0.9), pairs B->C, C->A, A->A (rejected)
        let mut rng = Scripted::new(&[0.0, 0.0, 0.5, 0.9, 0.5, 0.9, 0.9, 0.0, 0.0, 0.0], 0.0);
        let events = gen.tick(&mut rng);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.kind == AttackKind::Hotspot));
    }

    #[test]
    fn test_no_hotspots_falls_back_to_cities() {
        let gen = AttackGenerator::new(Vec::new(), city_pool(false), 1.0, 3);
        let mut rng = SimRng::new(11);
        for _ in 0..100 {
            assert!(gen.tick(&mut rng).iter().all(|e| e.kind == AttackKind::City));
        }
    }

    #[test]
    fn test_random_ticks_never_emit_degenerate_pairs() {
        let gen = generator(0.7);
        let mut rng = SimRng::new(99);
        for _ in 0..1000 {
            let events = gen.tick(&mut rng);
            assert!(events.len() <= 4);
            assert!(events.iter().all(|e| e.source != e.target));
        }
    }
}
