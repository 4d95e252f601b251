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
//! Console reporter for benchmark results.
//!
//! Formats a [`BenchmarkReport`] as plain text. Rendering goes through any
//! [`io::Write`] so the output can be captured in tests.

use crate::engines::{ClassCounts, StatResult, WordFrequency};
use crate::reporters::types::{BenchmarkReport, DeviceKind, Task, TaskOutput};
use std::io::{self, Write};

const WIDTH: usize = 60;

/// Prints the full benchmark report to stdout.
pub fn print_report(report: &BenchmarkReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(report, &mut out)?;
    out.flush()
}

/// Writes the full benchmark report to `out`.
pub fn write_report<W: Write>(report: &BenchmarkReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n{}", "=".repeat(WIDTH))?;
    writeln!(out, "{}", report.title)?;
    writeln!(out, "{}", "=".repeat(WIDTH))?;
    match report.row_limit {
        Some(limit) => writeln!(out, "Row limit: {}", limit)?,
        None => writeln!(out, "Row limit: none")?,
    }
    writeln!(out, "Device: {}", report.device)?;

    if !report.tables.is_empty() {
        writeln!(out, "\nDatabase tables:")?;
        for table in &report.tables {
            writeln!(out, "  - {}: {} rows", table.name, table.rows)?;
        }
    }

    let corpus = &report.corpus;
    writeln!(out, "\nLoaded {} text records", corpus.records)?;
    writeln!(out, "  Query: {}", corpus.source_query)?;
    writeln!(out, "  Total characters: {}", corpus.total_chars)?;
    writeln!(out, "  Average length: {:.2}", corpus.average_len)?;

    for task in [Task::Lengths, Task::Words, Task::Chars] {
        write_task(report, task, out)?;
    }

    write_summary(report, out)?;
    writeln!(out, "{}", "=".repeat(WIDTH))
}

fn write_task<W: Write>(report: &BenchmarkReport, task: Task, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n{}", "-".repeat(WIDTH))?;
    writeln!(out, "{}", task.title().to_uppercase())?;
    writeln!(out, "{}", "-".repeat(WIDTH))?;

    for outcome in report.outcomes.iter().filter(|o| o.record.task == task) {
        let label = outcome.record.device.as_str().to_uppercase();
        writeln!(
            out,
            "[{}] completed in {:.6} s",
            label, outcome.record.elapsed_secs
        )?;
        match &outcome.output {
            TaskOutput::Lengths(stats) => write_lengths(stats, out)?,
            TaskOutput::Words(words) => write_words(words, report.show_words, out)?,
            TaskOutput::Chars(dist) => {
                writeln!(out, "  Unique characters: {}", dist.classes.unique)?;
                write_classes(&dist.classes, "characters", out)?;
            }
            TaskOutput::Bytes(dist) => {
                writeln!(out, "  Unique bytes: {}", dist.classes.unique)?;
                write_classes(&dist.classes, "bytes", out)?;
            }
        }
    }

    for skipped in report.skipped.iter().filter(|s| s.task == task) {
        writeln!(
            out,
            "[{}] skipped: {}",
            DeviceKind::Gpu.as_str().to_uppercase(),
            skipped.reason
        )?;
    }
    Ok(())
}

fn write_lengths<W: Write>(stats: &StatResult, out: &mut W) -> io::Result<()> {
    writeln!(out, "  Records: {}", stats.count)?;
    writeln!(out, "  Total length: {}", stats.total)?;
    writeln!(out, "  Mean: {:.2}", stats.mean)?;
    writeln!(out, "  Std dev: {:.2}", stats.std)?;
    writeln!(out, "  Min: {}", stats.min)?;
    writeln!(out, "  Max: {}", stats.max)?;
    writeln!(out, "  Median: {:.2}", stats.median)
}

fn write_words<W: Write>(words: &WordFrequency, show: usize, out: &mut W) -> io::Result<()> {
    writeln!(out, "  Total words: {}", words.total_tokens)?;
    writeln!(out, "  Unique words: {}", words.unique_tokens)?;
    if words.top.is_empty() || show == 0 {
        return Ok(());
    }
    writeln!(out, "  Top {} words:", show.min(words.top.len()))?;
    for (i, entry) in words.top.iter().take(show).enumerate() {
        writeln!(out, "    {}. {}: {}", i + 1, entry.word, entry.count)?;
    }
    Ok(())
}

fn write_classes<W: Write>(classes: &ClassCounts, unit: &str, out: &mut W) -> io::Result<()> {
    writeln!(out, "  Total {}: {}", unit, classes.total)?;
    writeln!(
        out,
        "  Letters: {} ({:.1}%)",
        classes.letters,
        classes.letter_pct()
    )?;
    writeln!(
        out,
        "  Digits: {} ({:.1}%)",
        classes.digits,
        classes.digit_pct()
    )?;
    writeln!(
        out,
        "  Spaces: {} ({:.1}%)",
        classes.spaces,
        classes.space_pct()
    )
}

fn write_summary<W: Write>(report: &BenchmarkReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n{}", "-".repeat(WIDTH))?;
    writeln!(out, "PERFORMANCE SUMMARY")?;
    writeln!(out, "{}", "-".repeat(WIDTH))?;

    writeln!(out, "Computation Times:")?;
    for record in report.records() {
        writeln!(out, "  {}: {:.6} s", record.key(), record.elapsed_secs)?;
    }

    writeln!(out, "\nSpeedup (CPU / GPU):")?;
    if report.speedups.is_empty() {
        writeln!(out, "  n/a (no GPU results)")?;
    }
    for (task, ratio) in &report.speedups {
        writeln!(out, "  {}: {:.2}x", task, ratio)?;
    }
    Ok(())
}
