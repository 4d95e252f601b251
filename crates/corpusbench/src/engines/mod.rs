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

//! Corpus statistics engines.
//!
//! # Modules
//!
//! - `length`: per-record length statistics (CPU and device)
//! - `words`: word frequency (CPU only)
//! - `chars`: character distribution (codepoints on CPU, bytes on device)
//!
//! Engines accept any slice of `AsRef<str>` so they can be driven by a
//! [`Corpus`](crate::corpus::Corpus) or by plain string fixtures.

pub mod chars;
pub mod length;
pub mod words;

pub use chars::{
    byte_distribution_gpu, char_distribution_cpu, ByteDistribution, ByteHistogram,
    CharDistribution, CharHistogram, ClassCounts,
};
pub use length::{compute_stats, length_stats_cpu, length_stats_gpu, StatResult};
pub use words::{tokenize, word_frequency_cpu, FrequencyTable, WordCount, WordFrequency};

use crate::core::Measurement;

/// An engine result together with its wall-clock measurement.
#[derive(Debug, Clone)]
pub struct Timed<T> {
    /// The computed result.
    pub value: T,
    /// Time spent computing it.
    pub measurement: Measurement,
}

impl<T> Timed<T> {
    /// Pairs a value with its measurement.
    pub fn new(value: T, measurement: Measurement) -> Self {
        Self { value, measurement }
    }

    /// Elapsed seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.measurement.as_secs_f64()
    }
}
