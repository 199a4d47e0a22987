// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::types::{ErrorKind, MetricError};
use rand::Rng;
use std::fmt;

/// Percent chance, between 1 and 100 inclusive, that a metric observation
/// is emitted at all.
///
/// Rates below 100 are also written to the wire so that the collector can
/// scale the sampled values back up.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct SampleRate(u8);

impl SampleRate {
    /// Every observation is emitted.
    pub const ALWAYS: SampleRate = SampleRate(100);

    pub fn percent(&self) -> u32 {
        u32::from(self.0)
    }

    /// Whether this rate needs to be written out as part of the metric line
    pub fn is_partial(&self) -> bool {
        self.0 < 100
    }

    fn probability(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::ALWAYS
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = MetricError;

    fn try_from(rate: u32) -> Result<Self, Self::Error> {
        if (1..=100).contains(&rate) {
            Ok(SampleRate(rate as u8))
        } else {
            Err(MetricError::from((
                ErrorKind::InvalidInput,
                "Sample rate must be between 1 and 100",
            )))
        }
    }
}

/// Decide if a single observation should be emitted, using the thread local
/// generator. Safe to call for every metric without any coordination.
pub fn should_emit(rate: SampleRate) -> bool {
    should_emit_with(&mut rand::thread_rng(), rate)
}

/// Decide if a single observation should be emitted using the given source of
/// randomness: a uniform draw in `[0, 1)` passes when it is at most the rate.
pub fn should_emit_with<R>(rng: &mut R, rate: SampleRate) -> bool
where
    R: Rng + ?Sized,
{
    if !rate.is_partial() {
        return true;
    }

    let draw: f64 = rng.gen();
    draw <= rate.probability()
}

#[cfg(test)]
mod tests {
    use super::{should_emit, should_emit_with, SampleRate};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const TRIALS: u32 = 100_000;

    fn observed_ratio(rate: u32, seed: u64) -> f64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let rate = SampleRate::try_from(rate).unwrap();
        let emitted = (0..TRIALS).filter(|_| should_emit_with(&mut rng, rate)).count();
        emitted as f64 / f64::from(TRIALS)
    }

    #[test]
    fn test_sample_rate_bounds() {
        assert!(SampleRate::try_from(0).is_err());
        assert!(SampleRate::try_from(101).is_err());
        assert_eq!(1, SampleRate::try_from(1).unwrap().percent());
        assert_eq!(100, SampleRate::try_from(100).unwrap().percent());
    }

    #[test]
    fn test_sample_rate_default_is_always() {
        assert_eq!(SampleRate::ALWAYS, SampleRate::default());
        assert!(!SampleRate::default().is_partial());
    }

    #[test]
    fn test_sample_rate_display() {
        assert_eq!("25", SampleRate::try_from(25).unwrap().to_string());
    }

    #[test]
    fn test_should_emit_always_at_full_rate() {
        assert!((0..1000).all(|_| should_emit(SampleRate::ALWAYS)));
    }

    #[test]
    fn test_should_emit_converges_to_rate() {
        for (i, rate) in [1, 10, 25, 50, 75, 99].into_iter().enumerate() {
            let ratio = observed_ratio(rate, 42 + i as u64);
            let expected = f64::from(rate) / 100.0;
            assert!(
                (ratio - expected).abs() < 0.01,
                "rate {} observed {} expected {}",
                rate,
                ratio,
                expected
            );
        }
    }

    #[test]
    fn test_should_emit_thread_rng_samples() {
        let rate = SampleRate::try_from(50).unwrap();
        let emitted = (0..1000).filter(|_| should_emit(rate)).count();

        assert!(emitted > 0); // always happening (probably)
        assert!(emitted < 1000); // never happening (probably)
    }
}
