mod ambient;
mod generator;
mod renderer;

pub use ambient::{AlertTier, AmbientPulses, Severity, ALERT_TIERS, PULSE_START_MAX_DELAY_MS};
pub use generator::{AttackGenerator, Hotspot};
pub use renderer::{AttackRenderer, DropReason, EventTimings, LaunchOutcome};

use crate::geo::GeoCoordinate;

/// Kind of simulated traffic an event represents
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackKind {
    /// Between two high-intensity countries
    Hotspot,
    /// Between two named cities
    City,
}

/// A single attack to animate; produced by the generator, drawn once
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackEvent {
    pub source: GeoCoordinate,
    pub target: GeoCoordinate,
    pub kind: AttackKind,
}
