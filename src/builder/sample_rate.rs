// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::types::{ErrorKind, MetricError};
use std::fmt;

/// Represents the sample rate of a metric. This is used to determine how often
/// a metric should be sent to the the statsd server. The sample rate is a value
/// greater than 0.0 and at most 1.0.
///
/// A rate of exactly 1.0 means the metric is always sent and is never written
/// as part of the metric line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SampleRate {
    value: f64,
}

impl SampleRate {
    pub(crate) const FULL: SampleRate = SampleRate { value: 1.0 };

    pub(crate) fn value(&self) -> f64 {
        self.value
    }

    /// Does this rate drop some metrics (and so need to be written out)?
    pub(crate) fn is_sampled(&self) -> bool {
        self.value < 1.0
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.value)
    }
}

impl TryFrom<f64> for SampleRate {
    type Error = MetricError;

    fn try_from(rate: f64) -> Result<Self, Self::Error> {
        if rate > 0.0 && rate <= 1.0 {
            Ok(Self { value: rate })
        } else {
            let err = MetricError::from((ErrorKind::InvalidInput, "Sample rate must be between 0.0 and 1.0"));
            Err(err)
        }
    }
}
