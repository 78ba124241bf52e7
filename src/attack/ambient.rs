use crate::hash::RandomSource;
use crate::scene::{Animator, Attr, Completion, Element, ElementId, Millis, Rgb, Role, Tween};
use glam::DVec2;
use tracing::debug;

/// Latest a marker's first pulse may start after seeding
pub const PULSE_START_MAX_DELAY_MS: Millis = 2000.0;

const PLACEMENT_ATTEMPTS: usize = 15;
const HALO_RADIUS: f64 = 4.0;
const HALO_PEAK_RADIUS: f64 = 8.0;
const CORE_RADIUS: f64 = 2.0;
const PULSE_MIN_MS: Millis = 2000.0;
const PULSE_JITTER_MS: Millis = 1000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Critical,
    High,
    Medium,
}

/// How many markers of one severity to scatter, and how they look at rest
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlertTier {
    pub severity: Severity,
    pub color: Rgb,
    pub count: usize,
    pub opacity: f64,
}

pub const ALERT_TIERS: [AlertTier; 3] = [
    AlertTier {
        severity: Severity::Critical,
        color: (255, 0, 0),
        count: 50,
        opacity: 0.4,
    },
    AlertTier {
        severity: Severity::High,
        color: (255, 69, 0),
        count: 35,
        opacity: 0.35,
    },
    AlertTier {
        severity: Severity::Medium,
        color: (0, 204, 255),
        count: 25,
        opacity: 0.3,
    },
];

#[derive(Clone, Copy, Debug)]
struct Marker {
    halo: ElementId,
    core: ElementId,
    severity: Severity,
    opacity: f64,
    start_delay: Millis,
}

/// Background alert markers that pulse forever.
///
/// Each marker is a halo ring plus a filled core placed at a random point of
/// a random country's bounding box. A pulse swells the halo out to nothing,
/// snaps it back and reports a completion that restarts the next pulse.
/// Markers are never removed on their own.
#[derive(Clone, Debug, Default)]
pub struct AmbientPulses {
    markers: Vec<Marker>,
}

impl AmbientPulses {
    /// Scatter markers for every tier over `boxes`.
    ///
    /// `boxes` holds one entry per candidate country; `None` entries are
    /// retried like a failed placement. A marker whose attempts all fail is
    /// skipped.
    pub fn seed(
        surface: &mut impl Animator,
        boxes: &[Option<(DVec2, DVec2)>],
        tiers: &[AlertTier],
        rng: &mut dyn RandomSource,
    ) -> Self {
        let mut markers = Vec::new();
        if boxes.is_empty() {
            return Self { markers };
        }

        let mut skipped = 0usize;
        for tier in tiers {
            for _ in 0..tier.count {
                let Some(center) = place(boxes, rng) else {
                    skipped += 1;
                    continue;
                };
                let halo = surface.spawn(
                    Element::circle(center, HALO_RADIUS, false, Role::AlertHalo, tier.color)
                        .with_opacity(tier.opacity),
                );
                let core = surface.spawn(
                    Element::circle(center, CORE_RADIUS, true, Role::AlertCore, tier.color)
                        .with_opacity(tier.opacity + 0.2),
                );
                markers.push(Marker {
                    halo,
                    core,
                    severity: tier.severity,
                    opacity: tier.opacity,
                    start_delay: rng.next_f64() * PULSE_START_MAX_DELAY_MS,
                });
            }
        }

        debug!(markers = markers.len(), skipped, "ambient alerts seeded");
        Self { markers }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.markers.iter().filter(|m| m.severity == severity).count()
    }

    /// Delay before each marker's first pulse, by marker index
    pub fn start_delays(&self) -> impl Iterator<Item = (usize, Millis)> + '_ {
        self.markers.iter().enumerate().map(|(i, m)| (i, m.start_delay))
    }

    /// Begin one pulse cycle of marker `index`
    pub fn start_pulse(
        &self,
        surface: &mut impl Animator,
        index: usize,
        rng: &mut dyn RandomSource,
        now: Millis,
    ) {
        let Some(marker) = self.markers.get(index) else {
            return;
        };
        let duration = PULSE_MIN_MS + rng.next_f64() * PULSE_JITTER_MS;

        surface.animate(
            marker.halo,
            Tween::new(duration)
                .to(Attr::Radius, HALO_PEAK_RADIUS)
                .to(Attr::Opacity, 0.0)
                .chain(
                    Tween::new(0.0)
                        .to(Attr::Radius, HALO_RADIUS)
                        .to(Attr::Opacity, marker.opacity)
                        .notify(index as u64),
                ),
            now,
        );
        surface.animate(
            marker.core,
            Tween::new(duration / 2.0)
                .to(Attr::Opacity, (marker.opacity + 0.4).min(1.0))
                .chain(Tween::new(duration / 2.0).to(Attr::Opacity, marker.opacity + 0.2)),
            now,
        );
    }

    /// Restart the pulse whose cycle just reported back.
    ///
    /// Completions that do not belong to a marker halo are ignored.
    pub fn on_completion(
        &self,
        surface: &mut impl Animator,
        completion: &Completion,
        rng: &mut dyn RandomSource,
    ) -> bool {
        let index = completion.token as usize;
        match self.markers.get(index) {
            Some(marker) if marker.halo == completion.id => {
                self.start_pulse(surface, index, rng, completion.at);
                true
            }
            _ => false,
        }
    }

    /// Every element id owned by the markers
    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.markers.iter().flat_map(|m| [m.halo, m.core])
    }
}

fn place(boxes: &[Option<(DVec2, DVec2)>], rng: &mut dyn RandomSource) -> Option<DVec2> {
    for _ in 0..PLACEMENT_ATTEMPTS {
        if let Some((min, max)) = boxes[rng.index(boxes.len())] {
            let x = rng.range(min.x, max.x);
            let y = rng.range(min.y, max.y);
            return Some(DVec2::new(x, y));
        }
    }
    None
}
