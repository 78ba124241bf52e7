mod animation;

pub use animation::{Animator, Attr, Ease, Then, Tween};

use animation::Transition;
use glam::DVec2;
use std::collections::{BTreeMap, HashSet};

/// Milliseconds on the panel clock
pub type Millis = f64;

/// RGB colour of an element at full opacity
pub type Rgb = (u8, u8, u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

/// What an element is, so the renderer can layer and style it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    AttackLine,
    Origin,
    Destination,
    AlertHalo,
    AlertCore,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Straight line drawn with a single dash of `length`
    Line {
        from: DVec2,
        to: DVec2,
        length: f64,
        dash_offset: f64,
    },
    Circle {
        center: DVec2,
        /// Radius at zoom 1 when at rest; a rescale returns to it unless a
        /// radius tween is running
        base_radius: f64,
        /// Animated radius at zoom 1
        nominal_radius: f64,
        /// `nominal_radius / zoom`
        radius: f64,
        filled: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub shape: Shape,
    pub role: Role,
    pub color: Rgb,
    pub opacity: f64,
    pub base_stroke: f64,
    pub stroke_width: f64,
}

impl Element {
    pub fn line(from: DVec2, to: DVec2, role: Role, color: Rgb, stroke: f64) -> Self {
        let length = from.distance(to);
        Self {
            shape: Shape::Line {
                from,
                to,
                length,
                dash_offset: 0.0,
            },
            role,
            color,
            opacity: 1.0,
            base_stroke: stroke,
            stroke_width: stroke,
        }
    }

    pub fn circle(center: DVec2, base_radius: f64, filled: bool, role: Role, color: Rgb) -> Self {
        Self {
            shape: Shape::Circle {
                center,
                base_radius,
                nominal_radius: base_radius,
                radius: base_radius,
                filled,
            },
            role,
            color,
            opacity: 1.0,
            base_stroke: 1.0,
            stroke_width: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Start the line fully hidden
    pub fn hidden_dash(mut self) -> Self {
        if let Shape::Line {
            length,
            dash_offset,
            ..
        } = &mut self.shape
        {
            *dash_offset = *length;
        }
        self
    }

    pub fn with_radius(mut self, r: f64) -> Self {
        if let Shape::Circle {
            nominal_radius,
            radius,
            ..
        } = &mut self.shape
        {
            *nominal_radius = r;
            *radius = r;
        }
        self
    }

    pub fn get(&self, attr: Attr) -> f64 {
        match (attr, &self.shape) {
            (Attr::Opacity, _) => self.opacity,
            (Attr::DashOffset, Shape::Line { dash_offset, .. }) => *dash_offset,
            (Attr::Radius, Shape::Circle { nominal_radius, .. }) => *nominal_radius,
            _ => 0.0,
        }
    }

    fn set(&mut self, attr: Attr, value: f64, zoom: f64) {
        match (attr, &mut self.shape) {
            (Attr::Opacity, _) => self.opacity = value.clamp(0.0, 1.0),
            (Attr::DashOffset, Shape::Line { dash_offset, .. }) => *dash_offset = value.max(0.0),
            (
                Attr::Radius,
                Shape::Circle {
                    nominal_radius,
                    radius,
                    ..
                },
            ) => {
                *nominal_radius = value.max(0.0);
                *radius = *nominal_radius / zoom;
            }
            _ => {}
        }
    }

    fn settle_radius(&mut self) {
        if let Shape::Circle {
            base_radius,
            nominal_radius,
            ..
        } = &mut self.shape
        {
            *nominal_radius = *base_radius;
        }
    }

    fn rescale(&mut self, zoom: f64) {
        self.stroke_width = self.base_stroke / zoom;
        if let Shape::Circle {
            nominal_radius,
            radius,
            ..
        } = &mut self.shape
        {
            *radius = *nominal_radius / zoom;
        }
    }
}

/// A tween that reached a `Then::Notify`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Completion {
    pub id: ElementId,
    pub token: u64,
    pub at: Millis,
}

/// Retained set of transient visual elements plus their running tweens.
///
/// Elements belong to the scene. Whoever spawns one only keeps its id while
/// scheduling; once a `Remove` tween completes the element is gone in the
/// same `advance` call.
#[derive(Debug)]
pub struct Scene {
    elements: BTreeMap<ElementId, Element>,
    transitions: Vec<Transition>,
    next_id: u64,
    zoom: f64,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            elements: BTreeMap::new(),
            transitions: Vec::new(),
            next_id: 0,
            zoom: 1.0,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> + '_ {
        self.elements.iter().map(|(id, el)| (*id, el))
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.elements.values().filter(|e| e.role == role).count()
    }

    pub fn active_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn remove(&mut self, id: ElementId) -> bool {
        self.transitions.retain(|t| t.id != id);
        self.elements.remove(&id).is_some()
    }

    /// Drop every element and tween
    pub fn clear(&mut self) {
        self.elements.clear();
        self.transitions.clear();
    }

    /// Re-derive stroke widths and radii for a new zoom from base values
    pub fn rescale(&mut self, zoom: f64) {
        self.zoom = zoom;
        for (id, el) in self.elements.iter_mut() {
            let resizing = self
                .transitions
                .iter()
                .any(|t| t.id == *id && t.tween.reaches(Attr::Radius));
            if !resizing {
                el.settle_radius();
            }
            el.rescale(zoom);
        }
    }

    /// Interpolate every running tween to `now` and run completion actions.
    ///
    /// Chained tweens start at the previous tween's end time, so a long frame
    /// can finish several links of a chain in one call.
    pub fn advance(&mut self, now: Millis) -> Vec<Completion> {
        let mut pending = std::mem::take(&mut self.transitions);
        pending.reverse();
        let mut running = Vec::with_capacity(pending.len());
        let mut completions = Vec::new();
        let mut removed: HashSet<ElementId> = HashSet::new();

        while let Some(mut tr) = pending.pop() {
            if removed.contains(&tr.id) {
                continue;
            }
            let Some(el) = self.elements.get_mut(&tr.id) else {
                continue;
            };
            if now < tr.start {
                running.push(tr);
                continue;
            }

            let t = tr.tween.ease.apply(tr.progress(now));
            let from = tr
                .from
                .get_or_insert_with(|| tr.tween.changes.iter().map(|(a, _)| el.get(*a)).collect());
            for ((attr, to), start) in tr.tween.changes.iter().zip(from.iter()) {
                el.set(*attr, start + (to - start) * t, self.zoom);
            }

            if now < tr.end() {
                running.push(tr);
                continue;
            }

            let end = tr.end();
            match tr.tween.then {
                Then::Nothing => {}
                Then::Remove => {
                    self.elements.remove(&tr.id);
                    removed.insert(tr.id);
                }
                Then::Chain(next) => pending.push(Transition::new(tr.id, *next, end)),
                Then::Notify(token) => completions.push(Completion {
                    id: tr.id,
                    token,
                    at: end,
                }),
            }
        }

        running.retain(|t| !removed.contains(&t.id));
        self.transitions = running;
        completions
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator for Scene {
    fn spawn(&mut self, mut element: Element) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        // Spawned at the current zoom like everything else
        element.rescale(self.zoom);
        self.elements.insert(id, element);
        id
    }

    fn animate(&mut self, id: ElementId, tween: Tween, now: Millis) {
        if !self.elements.contains_key(&id) {
            return;
        }
        self.transitions
            .retain(|t| t.id != id || !tween.changes.iter().any(|(a, _)| t.tween.touches(*a)));
        self.transitions.push(Transition::new(id, tween, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYAN: Rgb = (0, 255, 255);

    fn dot(scene: &mut Scene) -> ElementId {
        scene.spawn(Element::circle(DVec2::new(10.0, 10.0), 3.0, true, Role::Origin, CYAN))
    }

    #[test]
    fn test_linear_interpolation() {
        let mut scene = Scene::new();
        let id = dot(&mut scene);
        scene.animate(id, Tween::new(1000.0).to(Attr::Opacity, 0.0).ease(Ease::Linear), 0.0);
        scene.advance(250.0);
        assert!((scene.get(id).unwrap().opacity - 0.75).abs() < 1e-12);
        scene.advance(1000.0);
        assert_eq!(scene.get(id).unwrap().opacity, 0.0);
        assert_eq!(scene.active_transitions(), 0);
    }

    #[test]
    fn test_remove_on_completion() {
        let mut scene = Scene::new();
        let id = dot(&mut scene);
        scene.animate(id, Tween::new(500.0).to(Attr::Opacity, 0.0).remove(), 0.0);
        scene.advance(499.0);
        assert!(scene.contains(id));
        scene.advance(500.0);
        assert!(!scene.contains(id));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_chain_catches_up_in_one_frame() {
        let mut scene = Scene::new();
        let id = dot(&mut scene);
        let tween = Tween::new(300.0)
            .to(Attr::Radius, 4.0)
            .chain(Tween::new(1000.0).to(Attr::Opacity, 0.0).remove());
        scene.animate(id, tween, 0.0);
        // One huge frame crosses both links
        scene.advance(5000.0);
        assert!(!scene.contains(id));
    }

    #[test]
    fn test_chain_starts_at_previous_end() {
        let mut scene = Scene::new();
        let id = dot(&mut scene);
        let tween = Tween::new(100.0)
            .to(Attr::Radius, 4.0)
            .chain(Tween::new(100.0).to(Attr::Opacity, 0.0).ease(Ease::Linear));
        scene.animate(id, tween, 0.0);
        scene.advance(150.0);
        let el = scene.get(id).unwrap();
        assert!((el.opacity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_notify_reports_completion() {
        let mut scene = Scene::new();
        let id = dot(&mut scene);
        scene.animate(id, Tween::new(0.0).to(Attr::Radius, 4.0).notify(7), 10.0);
        let done = scene.advance(10.0);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].token, 7);
        assert_eq!(done[0].id, id);
    }

    #[test]
    fn test_new_tween_interrupts_same_attr() {
        let mut scene = Scene::new();
        let id = dot(&mut scene);
        scene.animate(id, Tween::new(1000.0).to(Attr::Opacity, 0.0).remove(), 0.0);
        scene.animate(id, Tween::new(1000.0).to(Attr::Opacity, 1.0), 0.0);
        assert_eq!(scene.active_transitions(), 1);
        scene.advance(2000.0);
        assert!(scene.contains(id));
    }

    #[test]
    fn test_rescale_does_not_compound() {
        let mut scene = Scene::new();
        let id = dot(&mut scene);
        for zoom in [2.0, 4.0, 8.0, 4.0] {
            scene.rescale(zoom);
        }
        match scene.get(id).unwrap().shape {
            Shape::Circle { radius, .. } => assert!((radius - 0.75).abs() < 1e-12),
            _ => unreachable!(),
        }
        assert!((scene.get(id).unwrap().stroke_width - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rescale_restores_rest_radius() {
        let mut scene = Scene::new();
        let resting = dot(&mut scene);
        let growing = dot(&mut scene);
        scene.animate(resting, Tween::new(100.0).to(Attr::Radius, 6.0), 0.0);
        scene.animate(growing, Tween::new(1000.0).to(Attr::Radius, 6.0), 0.0);
        scene.advance(500.0);
        assert_eq!(scene.get(resting).unwrap().get(Attr::Radius), 6.0);

        scene.rescale(2.0);
        let radius = |id| match scene.get(id).unwrap().shape {
            Shape::Circle { radius, .. } => radius,
            _ => unreachable!(),
        };
        assert!((radius(resting) - 1.5).abs() < 1e-12);
        assert!((radius(growing) - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_radius_tween_respects_zoom() {
        let mut scene = Scene::new();
        scene.rescale(2.0);
        let id = scene.spawn(
            Element::circle(DVec2::ZERO, 4.0, true, Role::Destination, CYAN).with_radius(0.0),
        );
        scene.animate(id, Tween::new(300.0).to(Attr::Radius, 4.0), 0.0);
        scene.advance(300.0);
        match scene.get(id).unwrap().shape {
            Shape::Circle { radius, .. } => assert!((radius - 2.0).abs() < 1e-12),
            _ => unreachable!(),
        }
    }
}
