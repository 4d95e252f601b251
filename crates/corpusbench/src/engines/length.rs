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

//! Record length statistics.
//!
//! Lengths are measured in Unicode scalar values. Both paths reduce the full
//! length vector exactly; the device path is timed from the host-to-device
//! transfer until `synchronize` returns, so transfer cost is included.

use super::Timed;
use crate::core::Stopwatch;
use crate::device::Device;
use crate::{BenchError, Result};

/// Summary statistics over record lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatResult {
    /// Number of records.
    pub count: u64,
    /// Sum of lengths.
    pub total: u64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Shortest record.
    pub min: u64,
    /// Longest record.
    pub max: u64,
    /// Median; the mean of the middle pair for even counts.
    pub median: f64,
}

impl StatResult {
    /// True when `other` has identical integer fields and floating fields
    /// within `rel_tol` relative tolerance.
    pub fn agrees_with(&self, other: &StatResult, rel_tol: f64) -> bool {
        let close = |a: f64, b: f64| {
            let scale = a.abs().max(b.abs()).max(1.0);
            (a - b).abs() <= rel_tol * scale
        };
        self.count == other.count
            && self.total == other.total
            && self.min == other.min
            && self.max == other.max
            && close(self.mean, other.mean)
            && close(self.std, other.std)
            && close(self.median, other.median)
    }
}

fn record_lengths<S: AsRef<str>>(texts: &[S]) -> Vec<u64> {
    texts
        .iter()
        .map(|t| t.as_ref().chars().count() as u64)
        .collect()
}

fn empty_corpus() -> BenchError {
    BenchError::EmptyCorpus {
        attempts: Vec::new(),
    }
}

/// Exact statistics over `lengths`. `None` for an empty slice.
pub fn compute_stats(lengths: &[u64]) -> Option<StatResult> {
    if lengths.is_empty() {
        return None;
    }

    let count = lengths.len() as u64;
    let total: u64 = lengths.iter().sum();
    let mean = total as f64 / count as f64;
    let variance = lengths
        .iter()
        .map(|&l| {
            let d = l as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count as f64;

    let mut sorted = lengths.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    };

    Some(StatResult {
        count,
        total,
        mean,
        std: variance.sqrt(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median,
    })
}

/// CPU length statistics, timed from length-vector construction.
///
/// # Errors
///
/// [`BenchError::EmptyCorpus`] when `texts` is empty.
pub fn length_stats_cpu<S: AsRef<str>>(texts: &[S]) -> Result<Timed<StatResult>> {
    let stopwatch = Stopwatch::start();
    let lengths = record_lengths(texts);
    let stats = compute_stats(&lengths).ok_or_else(empty_corpus)?;
    Ok(Timed::new(stats, stopwatch.stop()))
}

/// Device length statistics, timed from the host-to-device transfer.
///
/// # Errors
///
/// [`BenchError::EmptyCorpus`] when `texts` is empty, [`BenchError::Device`]
/// when a transfer or kernel fails.
pub fn length_stats_gpu<S: AsRef<str>>(
    texts: &[S],
    device: &dyn Device,
) -> Result<Timed<StatResult>> {
    if texts.is_empty() {
        return Err(empty_corpus());
    }
    let lengths = record_lengths(texts);

    let stopwatch = Stopwatch::start();
    let array = device.upload_u64(&lengths)?;
    let reduction = device.reduce(&array)?;
    let median = device.median(&array)?;
    device.synchronize()?;

    let reduction = reduction.read()?;
    let stats = StatResult {
        count: reduction.count,
        total: reduction.sum,
        mean: reduction.mean(),
        std: reduction.std(),
        min: reduction.min.ok_or_else(empty_corpus)?,
        max: reduction.max.ok_or_else(empty_corpus)?,
        median: median.read()?.ok_or_else(empty_corpus)?,
    };
    drop(array);

    Ok(Timed::new(stats, stopwatch.stop()))
}
