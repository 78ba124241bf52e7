use crate::scene::Millis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Clone, Debug)]
struct Timer<T> {
    id: TimerId,
    due: Millis,
    period: Option<Millis>,
    task: T,
}

/// Cooperative timers polled from the render loop.
///
/// Intervals fire at most once per poll and never burst to catch up after a
/// stall, the way browser intervals behave.
#[derive(Debug)]
pub struct TimerQueue<T> {
    timers: Vec<Timer<T>>,
    next_id: u64,
}

impl<T: Clone> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 0,
        }
    }

    fn push(&mut self, due: Millis, period: Option<Millis>, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due,
            period,
            task,
        });
        id
    }

    /// Fire `task` once after `delay`
    pub fn set_timeout(&mut self, now: Millis, delay: Millis, task: T) -> TimerId {
        self.push(now + delay.max(0.0), None, task)
    }

    /// Fire `task` every `period`, first at `now + period`
    pub fn set_interval(&mut self, now: Millis, period: Millis, task: T) -> TimerId {
        let period = period.max(1.0);
        self.push(now + period, Some(period), task)
    }

    pub fn clear(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn clear_all(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Pop every timer due at `now`, earliest first
    pub fn due(&mut self, now: Millis) -> Vec<(TimerId, T)> {
        let mut fired: Vec<(Millis, TimerId, T)> = Vec::new();

        self.timers.retain_mut(|timer| {
            if timer.due > now {
                return true;
            }
            fired.push((timer.due, timer.id, timer.task.clone()));
            match timer.period {
                Some(period) => {
                    timer.due += period;
                    if timer.due <= now {
                        timer.due = now + period;
                    }
                    true
                }
                None => false,
            }
        });

        fired.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        fired.into_iter().map(|(_, id, task)| (id, task)).collect()
    }
}

impl<T: Clone> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_fires_once() {
        let mut timers = TimerQueue::new();
        timers.set_timeout(0.0, 100.0, "pulse");
        assert!(timers.due(99.0).is_empty());
        assert_eq!(timers.due(100.0).len(), 1);
        assert!(timers.due(1000.0).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_interval_repeats_without_burst() {
        let mut timers = TimerQueue::new();
        timers.set_interval(0.0, 500.0, "tick");
        assert_eq!(timers.due(500.0).len(), 1);
        assert_eq!(timers.due(1000.0).len(), 1);
        // Long stall: still one tick
        assert_eq!(timers.due(10_000.0).len(), 1);
        assert!(timers.due(10_100.0).is_empty());
        assert_eq!(timers.due(10_500.0).len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut timers = TimerQueue::new();
        let a = timers.set_interval(0.0, 10.0, 1);
        timers.set_timeout(0.0, 10.0, 2);
        assert!(timers.clear(a));
        assert!(!timers.clear(a));
        assert_eq!(timers.len(), 1);
        timers.clear_all();
        assert!(timers.due(1e9).is_empty());
    }

    #[test]
    fn test_fires_in_due_order() {
        let mut timers = TimerQueue::new();
        timers.set_timeout(0.0, 30.0, 'c');
        timers.set_timeout(0.0, 10.0, 'a');
        timers.set_timeout(0.0, 20.0, 'b');
        let order: Vec<char> = timers.due(100.0).into_iter().map(|(_, t)| t).collect();
        assert_eq!(order, vec!['a', 'b', 'c']);
    }
}
