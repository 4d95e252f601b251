// Corpusbench - CPU vs GPU Corpus Statistics
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wall-clock measurement primitives.
//!
//! Each engine invocation is timed exactly once; there is no warmup and no
//! iteration loop, since the quantity of interest is the cost of a single
//! pass over the corpus.

use std::time::{Duration, Instant};

/// A single wall-clock measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Elapsed time of the measured operation.
    pub duration: Duration,
}

impl Measurement {
    /// Creates a measurement from a duration.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Elapsed time in seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

/// A running timer.
///
/// Engines start the stopwatch at the point where their timed region begins,
/// which is not always the top of the function.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Starts timing now.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stops timing and returns the elapsed measurement.
    pub fn stop(self) -> Measurement {
        Measurement::new(self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_units() {
        let m = Measurement::new(Duration::from_millis(1500));
        assert!((m.as_secs_f64() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stopwatch_covers_work() {
        let stopwatch = Stopwatch::start();
        std::thread::sleep(Duration::from_millis(5));
        assert!(stopwatch.stop().duration >= Duration::from_millis(5));
    }

    #[test]
    fn test_stopwatch_monotonic() {
        let stopwatch = Stopwatch::start();
        let first = stopwatch.stop();
        let second = stopwatch.stop();
        assert!(second.duration >= first.duration);
    }
}
