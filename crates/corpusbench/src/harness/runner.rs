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

//! Benchmark runner.
//!
//! Runs the loader and engines in a fixed order:
//!
//! ```text
//! load -> lengths (cpu, gpu) -> words (cpu) -> chars (cpu, gpu)
//! ```
//!
//! Device paths run only when the capability handed to [`Harness::new`]
//! carries a device. A device path that fails is recorded as skipped and the
//! run continues with the results gathered so far.

use super::comparator::compute_speedups;
use crate::core::config::BenchConfig;
use crate::core::Measurement;
use crate::corpus::{load_corpus, Corpus, TextSource};
use crate::device::{Device, DeviceCapability};
use crate::engines::{
    byte_distribution_gpu, char_distribution_cpu, length_stats_cpu, length_stats_gpu,
    word_frequency_cpu, Timed,
};
use crate::reporters::types::{
    BenchmarkRecord, BenchmarkReport, CorpusSummary, DeviceKind, SkippedPath, Task, TaskOutcome,
    TaskOutput,
};
use crate::Result;
use tracing::{info, warn};

/// Report title.
pub const REPORT_TITLE: &str = "TEXT ANALYSIS - CPU vs GPU Performance";

/// Orchestrates one benchmark run.
pub struct Harness {
    config: BenchConfig,
    capability: DeviceCapability,
}

/// Accumulates outcomes while the run progresses.
#[derive(Default)]
struct Outcomes {
    completed: Vec<TaskOutcome>,
    skipped: Vec<SkippedPath>,
}

impl Outcomes {
    fn record(
        &mut self,
        task: Task,
        device: DeviceKind,
        measurement: Measurement,
        output: TaskOutput,
    ) {
        let record = BenchmarkRecord::new(task, device, measurement.as_secs_f64());
        info!(
            task = %task,
            device = %device,
            elapsed_secs = record.elapsed_secs,
            "task complete"
        );
        self.completed.push(TaskOutcome { record, output });
    }

    fn skip(&mut self, task: Task, reason: impl Into<String>) {
        self.skipped.push(SkippedPath {
            task,
            reason: reason.into(),
        });
    }
}

impl Harness {
    /// Creates a harness. `capability` is resolved once by the caller.
    pub fn new(config: BenchConfig, capability: DeviceCapability) -> Self {
        Self { config, capability }
    }

    /// The configuration in use.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// The device capability in use.
    pub fn capability(&self) -> &DeviceCapability {
        &self.capability
    }

    /// Loads the corpus and runs every engine.
    ///
    /// # Errors
    ///
    /// Returns fatal errors only: an invalid configuration, or
    /// [`BenchError::EmptyCorpus`](crate::BenchError::EmptyCorpus) when no
    /// query produced rows. Device failures are recorded in the report.
    pub fn run(&self, source: &dyn TextSource) -> Result<BenchmarkReport> {
        self.config.validate()?;

        let tables = source.catalog().unwrap_or_else(|e| {
            warn!(error = %e, "could not list tables");
            Vec::new()
        });

        info!(limit = ?self.config.row_limit, "loading corpus");
        let corpus = load_corpus(source, &self.config.query_plan, self.config.row_limit)?;
        info!(
            records = corpus.len(),
            query = corpus.source_query(),
            "corpus loaded"
        );

        let outcomes = self.run_engines(&corpus)?;
        let speedups = compute_speedups(outcomes.completed.iter().map(|o| &o.record));

        Ok(BenchmarkReport {
            title: REPORT_TITLE.to_string(),
            row_limit: self.config.row_limit,
            device: self.capability.describe(),
            tables,
            corpus: CorpusSummary {
                records: corpus.len(),
                total_chars: corpus.total_chars(),
                average_len: corpus.average_len(),
                source_query: corpus.source_query().to_string(),
            },
            outcomes: outcomes.completed,
            skipped: outcomes.skipped,
            speedups,
            show_words: self.config.show_words,
        })
    }

    fn run_engines(&self, corpus: &Corpus) -> Result<Outcomes> {
        let records = corpus.records();
        let mut outcomes = Outcomes::default();

        let Timed { value, measurement } = length_stats_cpu(records)?;
        outcomes.record(
            Task::Lengths,
            DeviceKind::Cpu,
            measurement,
            TaskOutput::Lengths(value),
        );
        self.run_device_path(&mut outcomes, Task::Lengths, |device| {
            length_stats_gpu(records, device)
                .map(|t| (t.measurement, TaskOutput::Lengths(t.value)))
        });

        let Timed { value, measurement } = word_frequency_cpu(records, self.config.top_n);
        outcomes.record(Task::Words, DeviceKind::Cpu, measurement, TaskOutput::Words(value));

        let Timed { value, measurement } = char_distribution_cpu(records);
        outcomes.record(Task::Chars, DeviceKind::Cpu, measurement, TaskOutput::Chars(value));
        self.run_device_path(&mut outcomes, Task::Chars, |device| {
            byte_distribution_gpu(records, device)
                .map(|t| (t.measurement, TaskOutput::Bytes(t.value)))
        });

        Ok(outcomes)
    }

    fn run_device_path<F>(&self, outcomes: &mut Outcomes, task: Task, path: F)
    where
        F: FnOnce(&dyn Device) -> Result<(Measurement, TaskOutput)>,
    {
        let device = match self.capability.require() {
            Ok(device) => device,
            Err(e) => {
                info!(task = %task, reason = %e, "skipping GPU path");
                outcomes.skip(task, e.to_string());
                return;
            }
        };

        match path(device) {
            Ok((measurement, output)) => {
                outcomes.record(task, DeviceKind::Gpu, measurement, output)
            }
            Err(e) => {
                warn!(task = %task, error = %e, "GPU path failed, keeping CPU results");
                outcomes.skip(task, e.to_string());
            }
        }
    }
}
