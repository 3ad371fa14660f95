// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::sample_rate::SampleRate;
use rand::{Rng, RngCore};
use std::sync::Mutex;

/// Source of the random draws used to decide whether a sampled metric is sent.
///
/// A metric with a sample rate below 1.0 makes exactly one draw and is dropped
/// when the draw is greater than the rate.
///
/// The default sampler uses the thread local RNG from the `rand` crate. A
/// `Mutex` wrapping any `RngCore` is also a `Sampler`, which makes it easy to
/// use a seeded RNG for reproducible sampling.
///
/// # Example
///
/// ```
/// use std::sync::Mutex;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use metronome::{NopMetricSink, StatsClient};
///
/// let client = StatsClient::builder("my.prefix", NopMetricSink)
///     .with_sampler(Mutex::new(StdRng::seed_from_u64(42)))
///     .build();
/// ```
pub trait Sampler {
    /// Return a uniformly distributed value in `[0, 1)`.
    fn draw(&self) -> f64;
}

/// `Sampler` backed by `rand::thread_rng()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSampler;

impl Sampler for ThreadRngSampler {
    fn draw(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

impl<R> Sampler for Mutex<R>
where
    R: RngCore,
{
    fn draw(&self) -> f64 {
        let mut rng = self.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen::<f64>()
    }
}

/// Decide whether a metric at the given rate is kept. Full rate metrics never
/// consume a draw.
pub(crate) fn keep<S>(sampler: &S, rate: SampleRate) -> bool
where
    S: Sampler + ?Sized,
{
    !rate.is_sampled() || sampler.draw() <= rate.value()
}

#[cfg(test)]
mod tests {
    use super::{keep, Sampler, ThreadRngSampler};
    use crate::builder::sample_rate::SampleRate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::cell::Cell;
    use std::sync::Mutex;

    struct Fixed {
        value: f64,
        draws: Cell<u32>,
    }

    impl Sampler for Fixed {
        fn draw(&self) -> f64 {
            self.draws.set(self.draws.get() + 1);
            self.value
        }
    }

    #[test]
    fn test_thread_rng_sampler_in_range() {
        for _ in 0..1000 {
            let v = ThreadRngSampler.draw();
            assert!((0.0..1.0).contains(&v), "draw was {}", v);
        }
    }

    #[test]
    fn test_keep_full_rate_never_draws() {
        let fixed = Fixed { value: 0.99, draws: Cell::new(0) };
        assert!(keep(&fixed, SampleRate::FULL));
        assert_eq!(0, fixed.draws.get());
    }

    #[test]
    fn test_keep_drops_iff_draw_exceeds_rate() {
        let rate = SampleRate::try_from(0.5).unwrap();

        let above = Fixed { value: 0.51, draws: Cell::new(0) };
        let equal = Fixed { value: 0.5, draws: Cell::new(0) };
        let below = Fixed { value: 0.1, draws: Cell::new(0) };

        assert!(!keep(&above, rate));
        assert!(keep(&equal, rate));
        assert!(keep(&below, rate));
        assert_eq!(1, above.draws.get());
    }

    #[test]
    fn test_seeded_sampler_is_reproducible() {
        let a = Mutex::new(ChaCha8Rng::seed_from_u64(7));
        let b = Mutex::new(ChaCha8Rng::seed_from_u64(7));

        let first: Vec<f64> = (0..16).map(|_| a.draw()).collect();
        let second: Vec<f64> = (0..16).map(|_| b.draw()).collect();
        assert_eq!(first, second);
    }
}
