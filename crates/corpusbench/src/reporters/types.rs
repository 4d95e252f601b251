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

//! Report types and structures.

use crate::corpus::TableInfo;
use crate::engines::{ByteDistribution, CharDistribution, StatResult, WordFrequency};
use std::collections::BTreeMap;
use std::fmt;

/// A benchmarked workload. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Task {
    /// Record length statistics.
    Lengths,
    /// Word frequency.
    Words,
    /// Character distribution.
    Chars,
}

impl Task {
    /// Short identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Lengths => "lengths",
            Task::Words => "words",
            Task::Chars => "chars",
        }
    }

    /// Heading used in reports.
    pub fn title(&self) -> &'static str {
        match self {
            Task::Lengths => "Text Length Analysis",
            Task::Words => "Word Frequency Analysis",
            Task::Chars => "Character Distribution Analysis",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a task ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Host computation.
    Cpu,
    /// Device-accelerated computation.
    Gpu,
}

impl DeviceKind {
    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Gpu => "gpu",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing for one task on one device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkRecord {
    /// The task.
    pub task: Task,
    /// Where it ran.
    pub device: DeviceKind,
    /// Wall-clock seconds.
    pub elapsed_secs: f64,
}

impl BenchmarkRecord {
    /// Creates a record.
    pub fn new(task: Task, device: DeviceKind, elapsed_secs: f64) -> Self {
        Self {
            task,
            device,
            elapsed_secs,
        }
    }

    /// Combined identifier, e.g. `lengths_cpu`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.task, self.device)
    }
}

/// The statistics produced by a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    /// Length statistics.
    Lengths(StatResult),
    /// Word frequency summary.
    Words(WordFrequency),
    /// Codepoint distribution.
    Chars(CharDistribution),
    /// Byte distribution.
    Bytes(ByteDistribution),
}

/// A completed task: its timing and its result.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    /// Timing.
    pub record: BenchmarkRecord,
    /// Result.
    pub output: TaskOutput,
}

/// A device path that did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPath {
    /// The task whose device path was skipped.
    pub task: Task,
    /// Why it was skipped.
    pub reason: String,
}

/// What was loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSummary {
    /// Number of records.
    pub records: usize,
    /// Total characters.
    pub total_chars: u64,
    /// Average record length in characters.
    pub average_len: f64,
    /// The statement that produced the corpus.
    pub source_query: String,
}

/// Complete results of a benchmark run, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    /// Report title.
    pub title: String,
    /// Row limit in effect.
    pub row_limit: Option<usize>,
    /// Device capability description.
    pub device: String,
    /// Tables in the store.
    pub tables: Vec<TableInfo>,
    /// Loaded corpus.
    pub corpus: CorpusSummary,
    /// Completed tasks in execution order.
    pub outcomes: Vec<TaskOutcome>,
    /// Device paths that did not run.
    pub skipped: Vec<SkippedPath>,
    /// CPU / GPU ratios for tasks that ran on both.
    pub speedups: BTreeMap<Task, f64>,
    /// Top words to print.
    pub show_words: usize,
}

impl BenchmarkReport {
    /// Timing records in execution order.
    pub fn records(&self) -> impl Iterator<Item = &BenchmarkRecord> + '_ {
        self.outcomes.iter().map(|o| &o.record)
    }

    /// The record for `task` on `device`, if it ran.
    pub fn record(&self, task: Task, device: DeviceKind) -> Option<&BenchmarkRecord> {
        self.records()
            .find(|r| r.task == task && r.device == device)
    }

    /// The result for `task` on `device`, if it ran.
    pub fn output(&self, task: Task, device: DeviceKind) -> Option<&TaskOutput> {
        self.outcomes
            .iter()
            .find(|o| o.record.task == task && o.record.device == device)
            .map(|o| &o.output)
    }

    /// The speedup for `task`, if both paths ran.
    pub fn speedup(&self, task: Task) -> Option<f64> {
        self.speedups.get(&task).copied()
    }

    /// Number of timing records.
    pub fn result_count(&self) -> usize {
        self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key() {
        let record = BenchmarkRecord::new(Task::Lengths, DeviceKind::Gpu, 0.5);
        assert_eq!(record.key(), "lengths_gpu");
    }

    #[test]
    fn test_task_order_matches_execution() {
        assert!(Task::Lengths < Task::Words);
        assert!(Task::Words < Task::Chars);
    }
}
