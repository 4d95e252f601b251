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

//! CPU / GPU comparison.

use crate::reporters::types::{BenchmarkRecord, DeviceKind, Task};
use std::collections::BTreeMap;

/// CPU time divided by GPU time. A zero GPU time yields `0.0`.
pub fn speedup(cpu_secs: f64, gpu_secs: f64) -> f64 {
    if gpu_secs > 0.0 {
        cpu_secs / gpu_secs
    } else {
        0.0
    }
}

/// Speedups for every task that has both a CPU and a GPU record.
///
/// # Arguments
///
/// * `records` - Timing records in any order
///
/// # Returns
///
/// Map from task to CPU / GPU ratio.
pub fn compute_speedups<'a, I>(records: I) -> BTreeMap<Task, f64>
where
    I: IntoIterator<Item = &'a BenchmarkRecord>,
{
    let mut cpu = BTreeMap::new();
    let mut gpu = BTreeMap::new();
    for record in records {
        match record.device {
            DeviceKind::Cpu => cpu.insert(record.task, record.elapsed_secs),
            DeviceKind::Gpu => gpu.insert(record.task, record.elapsed_secs),
        };
    }

    cpu.into_iter()
        .filter_map(|(task, cpu_secs)| {
            gpu.get(&task)
                .map(|&gpu_secs| (task, speedup(cpu_secs, gpu_secs)))
        })
        .collect()
}
