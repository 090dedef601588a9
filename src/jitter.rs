//! Deterministic jitter source
//!
//! A linear congruential generator used to nudge exactly-zero displacement
//! components before they are normalized. The force step creates a fresh
//! generator per invocation, so the jitter sequence only depends on the
//! order of calls within one step.

const MULTIPLIER: u64 = 1_664_525;
const INCREMENT: u64 = 1_013_904_223;
const MODULUS: u64 = 4_294_967_296;

/// Seed every force step starts from
pub const DEFAULT_SEED: u64 = 1;

/// Magnitude of a jitter sample; samples fall in `[-SCALE/2, SCALE/2)`
const SCALE: f64 = 1e-6;

/// Linear congruential generator producing uniform samples in `[0, 1)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lcg {
    state: u64,
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Lcg {
    /// Create a generator with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed % MODULUS,
        }
    }

    /// Next uniform sample in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        self.state = (MULTIPLIER * self.state + INCREMENT) % MODULUS;
        self.state as f64 / MODULUS as f64
    }

    /// Small perturbation centred on zero
    pub fn jiggle(&mut self) -> f64 {
        (self.next_f64() - 0.5) * SCALE
    }

    /// Return `value` unchanged unless it is exactly zero, in which case a
    /// jitter sample is substituted
    pub fn or_jiggle(&mut self, value: f64) -> f64 {
        if value == 0.0 { self.jiggle() } else { value }
    }
}
