use super::{ElementId, Millis};

/// Attribute a tween can drive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attr {
    /// Hidden length at the end of a line's dash
    DashOffset,
    /// Radius at zoom 1; the live radius divides by the current zoom
    Radius,
    Opacity,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Ease {
    Linear,
    #[default]
    CubicInOut,
}

impl Ease {
    #[inline]
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Ease::Linear => t,
            Ease::CubicInOut => {
                let t2 = t * 2.0;
                if t2 <= 1.0 {
                    t2 * t2 * t2 / 2.0
                } else {
                    let u = t2 - 2.0;
                    (u * u * u + 2.0) / 2.0
                }
            }
        }
    }
}

/// What happens when a tween reaches its end
#[derive(Clone, Debug, PartialEq)]
pub enum Then {
    Nothing,
    /// Delete the element (and anything else animating it)
    Remove,
    /// Start the next tween exactly where this one ended
    Chain(Box<Tween>),
    /// Report a completion with this token from `advance`
    Notify(u64),
}

/// A timed change of one or more attributes
#[derive(Clone, Debug, PartialEq)]
pub struct Tween {
    pub changes: Vec<(Attr, f64)>,
    pub duration: Millis,
    pub ease: Ease,
    pub then: Then,
}

impl Tween {
    pub fn new(duration: Millis) -> Self {
        Self {
            changes: Vec::new(),
            duration,
            ease: Ease::default(),
            then: Then::Nothing,
        }
    }

    pub fn to(mut self, attr: Attr, value: f64) -> Self {
        self.changes.push((attr, value));
        self
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn remove(mut self) -> Self {
        self.then = Then::Remove;
        self
    }

    pub fn chain(mut self, next: Tween) -> Self {
        self.then = Then::Chain(Box::new(next));
        self
    }

    pub fn notify(mut self, token: u64) -> Self {
        self.then = Then::Notify(token);
        self
    }

    pub(crate) fn touches(&self, attr: Attr) -> bool {
        self.changes.iter().any(|(a, _)| *a == attr)
    }

    /// True when this tween or any chained one changes `attr`
    pub(crate) fn reaches(&self, attr: Attr) -> bool {
        self.touches(attr) || matches!(&self.then, Then::Chain(next) if next.reaches(attr))
    }
}

/// A tween bound to an element and a start time
#[derive(Clone, Debug)]
pub(crate) struct Transition {
    pub id: ElementId,
    pub tween: Tween,
    pub start: Millis,
    /// Start values, captured the first time the transition runs
    pub from: Option<Vec<f64>>,
}

impl Transition {
    pub fn new(id: ElementId, tween: Tween, start: Millis) -> Self {
        Self {
            id,
            tween,
            start,
            from: None,
        }
    }

    pub fn end(&self) -> Millis {
        self.start + self.tween.duration
    }

    pub fn progress(&self, now: Millis) -> f64 {
        if self.tween.duration <= 0.0 {
            1.0
        } else {
            ((now - self.start) / self.tween.duration).clamp(0.0, 1.0)
        }
    }
}

/// Scheduling interface the attack renderer draws through.
///
/// Anything that can host elements and interpolate their attributes over
/// time can stand in for the terminal scene.
pub trait Animator {
    fn spawn(&mut self, element: super::Element) -> ElementId;

    /// Start `tween` on `id` at `now`, interrupting running tweens on the
    /// same attributes
    fn animate(&mut self, id: ElementId, tween: Tween, now: Millis);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_endpoints() {
        for ease in [Ease::Linear, Ease::CubicInOut] {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
        }
        assert!((Ease::CubicInOut.apply(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reaches_follows_chain() {
        let tween = Tween::new(2000.0)
            .to(Attr::DashOffset, 0.0)
            .chain(Tween::new(200.0).to(Attr::Radius, 0.0).remove());
        assert!(!tween.touches(Attr::Radius));
        assert!(tween.reaches(Attr::Radius));
        assert!(!tween.reaches(Attr::Opacity));
    }
}
