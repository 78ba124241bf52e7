use super::AttackEvent;
use crate::map::Projection;
use crate::scene::{Animator, Attr, Ease, Element, ElementId, Millis, Rgb, Role, Tween};
use tracing::trace;

pub const LINE_COLOR: Rgb = (0, 255, 255);
pub const ORIGIN_COLOR: Rgb = (255, 62, 62);
pub const DESTINATION_COLOR: Rgb = (0, 255, 255);

/// Line opacity while travelling
const LINE_OPACITY: f64 = 0.6;
const LINE_STROKE: f64 = 2.0;
const ORIGIN_RADIUS: f64 = 3.0;
const DESTINATION_RADIUS: f64 = 4.0;

/// Durations of one attack animation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EventTimings {
    /// Line growth; the origin marker fades over the same time
    pub travel: Millis,
    pub line_fade: Millis,
    /// Destination marker growth
    pub arrival: Millis,
    pub destination_fade: Millis,
}

impl EventTimings {
    pub fn with_travel(travel: Millis) -> Self {
        Self {
            travel,
            ..Self::default()
        }
    }
}

impl Default for EventTimings {
    fn default() -> Self {
        Self {
            travel: 2000.0,
            line_fade: 200.0,
            arrival: 300.0,
            destination_fade: 1000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// An endpoint projected to a non-finite point
    InvalidProjection,
    /// Source and target land on the same point
    SamePoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchOutcome {
    Drawn {
        line: ElementId,
        origin: ElementId,
        destination: ElementId,
    },
    Dropped(DropReason),
}

/// Turns attack events into self-removing scene elements
#[derive(Clone, Debug)]
pub struct AttackRenderer {
    timings: EventTimings,
}

impl AttackRenderer {
    pub fn new(timings: EventTimings) -> Self {
        Self { timings }
    }

    pub fn timings(&self) -> EventTimings {
        self.timings
    }

    pub fn set_timings(&mut self, timings: EventTimings) {
        self.timings = timings;
    }

    /// Draw one event.
    ///
    /// A bad event is dropped without touching the surface; every element
    /// that is drawn removes itself when its last tween ends.
    pub fn launch<A: Animator>(
        &self,
        surface: &mut A,
        projection: &Projection,
        event: &AttackEvent,
        now: Millis,
    ) -> LaunchOutcome {
        let source = projection.project(event.source.lon, event.source.lat);
        let target = projection.project(event.target.lon, event.target.lat);
        let (Some(source), Some(target)) = (source, target) else {
            trace!(?event, "dropping event with unprojectable endpoint");
            return LaunchOutcome::Dropped(DropReason::InvalidProjection);
        };
        if source.distance_squared(target) < 1e-12 {
            trace!(?event, "dropping event with identical endpoints");
            return LaunchOutcome::Dropped(DropReason::SamePoint);
        }

        let t = self.timings;

        let line = surface.spawn(
            Element::line(source, target, Role::AttackLine, LINE_COLOR, LINE_STROKE)
                .with_opacity(LINE_OPACITY)
                .hidden_dash(),
        );
        surface.animate(
            line,
            Tween::new(t.travel)
                .to(Attr::DashOffset, 0.0)
                .ease(Ease::Linear)
                .chain(Tween::new(t.line_fade).to(Attr::Opacity, 0.0).remove()),
            now,
        );

        let origin = surface.spawn(Element::circle(
            source,
            ORIGIN_RADIUS,
            true,
            Role::Origin,
            ORIGIN_COLOR,
        ));
        surface.animate(
            origin,
            Tween::new(t.travel).to(Attr::Opacity, 0.0).remove(),
            now,
        );

        let destination = surface.spawn(
            Element::circle(
                target,
                DESTINATION_RADIUS,
                true,
                Role::Destination,
                DESTINATION_COLOR,
            )
            .with_radius(0.0),
        );
        surface.animate(
            destination,
            Tween::new(t.arrival)
                .to(Attr::Radius, DESTINATION_RADIUS)
                .chain(Tween::new(t.destination_fade).to(Attr::Opacity, 0.0).remove()),
            now,
        );

        LaunchOutcome::Drawn {
            line,
            origin,
            destination,
        }
    }
}

impl Default for AttackRenderer {
    fn default() -> Self {
        Self::new(EventTimings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::AttackKind;
    use crate::geo::GeoCoordinate;
    use crate::scene::{Scene, Shape};

    fn projection() -> Projection {
        Projection::fitted(1200.0, 600.0, 170.0)
    }

    fn event(source: (f64, f64), target: (f64, f64)) -> AttackEvent {
        AttackEvent {
            source: GeoCoordinate::new(source.0, source.1),
            target: GeoCoordinate::new(target.0, target.1),
            kind: AttackKind::City,
        }
    }

    #[test]
    fn test_same_point_creates_nothing() {
        let mut scene = Scene::new();
        let outcome = AttackRenderer::default().launch(
            &mut scene,
            &projection(),
            &event((2.35, 48.85), (2.35, 48.85)),
            0.0,
        );
        assert_eq!(outcome, LaunchOutcome::Dropped(DropReason::SamePoint));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_invalid_projection_creates_nothing() {
        let mut scene = Scene::new();
        let renderer = AttackRenderer::default();
        for bad in [(0.0, -90.0), (f64::NAN, 10.0), (0.0, 90.0)] {
            let outcome = renderer.launch(&mut scene, &projection(), &event(bad, (10.0, 10.0)), 0.0);
            assert_eq!(outcome, LaunchOutcome::Dropped(DropReason::InvalidProjection));
        }
        assert!(scene.is_empty());
    }

    #[test]
    fn test_event_lifecycle() {
        let mut scene = Scene::new();
        let outcome = AttackRenderer::default().launch(
            &mut scene,
            &projection(),
            &event((-74.0, 40.7), (139.6, 35.6)),
            1000.0,
        );
        let LaunchOutcome::Drawn {
            line,
            origin,
            destination,
        } = outcome
        else {
            panic!("event should draw");
        };
        assert_eq!(scene.len(), 3);

        // Line starts hidden, destination starts at radius 0
        scene.advance(1000.0);
        match scene.get(line).unwrap().shape {
            Shape::Line {
                length,
                dash_offset,
                ..
            } => assert_eq!(dash_offset, length),
            _ => unreachable!(),
        }

        // Halfway through travel the line is half drawn
        scene.advance(2000.0);
        match scene.get(line).unwrap().shape {
            Shape::Line {
                length,
                dash_offset,
                ..
            } => assert!((dash_offset - length / 2.0).abs() < 1e-9),
            _ => unreachable!(),
        }
        // Destination grew (t=300) and has been fading since
        assert!(!scene.contains(destination) || scene.get(destination).unwrap().opacity < 1.0);

        scene.advance(2300.0);
        assert!(!scene.contains(destination));
        assert!(scene.contains(origin));

        scene.advance(3000.0);
        assert!(!scene.contains(origin));
        assert!(scene.contains(line));

        scene.advance(3199.0);
        assert!(scene.contains(line));
        scene.advance(3200.0);
        assert!(scene.is_empty());
        assert_eq!(scene.active_transitions(), 0);
    }
}
