/// Fast 2-value hash with xorshift
#[inline(always)]
pub fn hash2(a: u64, b: u64) -> u64 {
    let mut seed = a.wrapping_mul(2654435761).wrapping_add(b.wrapping_mul(2246822519));
    seed ^= seed << 13;
    seed ^= seed >> 7;
    seed ^= seed << 17;
    seed
}

/// Fast deterministic random using splitmix64 - handles small seeds properly
#[inline(always)]
pub fn rand_simple(seed: u64) -> f64 {
    let mut x = seed.wrapping_mul(0x9e3779b97f4a7c15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    (x >> 11) as f64 / 9007199254740992.0
}

/// Source of uniform numbers in [0, 1).
///
/// The simulation only ever asks for uniform floats, so tests can script the
/// exact sequence a tick will see.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `0..len` (`len` must be non-zero)
    fn index(&mut self, len: usize) -> usize {
        ((self.next_f64() * len as f64) as usize).min(len.saturating_sub(1))
    }

    /// Uniform float in `[lo, hi)`
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

/// Counter-based generator built on `hash2` + `rand_simple`
#[derive(Clone, Debug)]
pub struct SimRng {
    seed: u64,
    counter: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, counter: 0 }
    }

    /// Seed from the wall clock
    pub fn from_time() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed);
        Self::new(nanos)
    }
}

impl RandomSource for SimRng {
    fn next_f64(&mut self) -> f64 {
        self.counter = self.counter.wrapping_add(1);
        rand_simple(hash2(self.seed, self.counter))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::RandomSource;
    use std::collections::VecDeque;

    /// Replays a fixed list of values, then repeats the fallback forever
    pub struct Scripted {
        values: VecDeque<f64>,
        fallback: f64,
    }

    impl Scripted {
        pub fn new(values: &[f64], fallback: f64) -> Self {
            Self {
                values: values.iter().copied().collect(),
                fallback,
            }
        }
    }

    impl RandomSource for Scripted {
        fn next_f64(&mut self) -> f64 {
            self.values.pop_front().unwrap_or(self.fallback)
        }
    }
}
