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
//! Command-line arguments and execution.

use crate::error::CliError;
use clap::Parser;
use corpusbench::core::{DEFAULT_ROW_LIMIT, DEFAULT_SHOW_WORDS, DEFAULT_TOP_N};
use corpusbench::reporters::print_report;
use corpusbench::{BenchConfig, DeviceCapability, DeviceMode, Harness, QueryPlan, SqliteSource};
use std::path::PathBuf;
use tracing::info;

/// Corpusbench - CPU vs GPU corpus statistics
///
/// Loads text records from a SQLite database and computes length, word and
/// character statistics on the CPU and on the GPU, then
/// reports the timings and speedups.
///
/// # Examples
///
/// ```bash
/// # Analyze the first million records
/// corpusbench wiki.db
///
/// # Analyze 10,000 records on the CPU only
/// corpusbench wiki.db 10000 --cpu-only
///
/// # Use a custom query plan
/// corpusbench wiki.db --queries queries.json
/// ```
#[derive(Parser, Debug)]
#[command(name = "corpusbench")]
#[command(author, version, about = "CPU vs GPU corpus statistics benchmark", long_about = None)]
pub struct Cli {
    /// Path to the SQLite database
    #[arg(value_name = "DATABASE")]
    pub database: PathBuf,

    /// Maximum number of rows to load
    #[arg(value_name = "LIMIT", conflicts_with = "no_limit")]
    pub limit: Option<usize>,

    /// Load every row
    #[arg(long)]
    pub no_limit: bool,

    /// Number of top words kept by the word frequency analysis
    #[arg(long, value_name = "N", default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Number of top words shown in the report
    #[arg(long, value_name = "N", default_value_t = DEFAULT_SHOW_WORDS)]
    pub show_words: usize,

    /// Skip GPU computations
    #[arg(long)]
    pub cpu_only: bool,

    /// JSON file with the primary and fallback queries
    #[arg(long, value_name = "FILE")]
    pub queries: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Log level for the `corpusbench` target.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Builds the run configuration from the arguments.
    pub fn config(&self) -> Result<BenchConfig, CliError> {
        let row_limit = if self.no_limit {
            None
        } else {
            Some(self.limit.unwrap_or(DEFAULT_ROW_LIMIT))
        };
        let device_mode = if self.cpu_only {
            DeviceMode::Off
        } else {
            DeviceMode::Auto
        };

        let mut config = BenchConfig::default()
            .with_row_limit(row_limit)
            .with_top_n(self.top_n)
            .with_show_words(self.show_words)
            .with_device_mode(device_mode);
        if let Some(path) = &self.queries {
            config = config.with_query_plan(QueryPlan::from_json_file(path)?);
        }
        config.validate()?;
        Ok(config)
    }

    /// Runs the benchmark and prints the report.
    pub fn execute(&self) -> Result<(), CliError> {
        let config = self.config()?;

        println!("Database: {}", self.database.display());
        match config.row_limit {
            Some(limit) => println!("Loading up to {} rows", limit),
            None => println!("Loading all rows"),
        }

        let capability = DeviceCapability::probe(config.device_mode);
        let source = SqliteSource::open(&self.database)?;
        info!(path = %self.database.display(), "connected to database");

        let report = Harness::new(config, capability).run(&source)?;
        print_report(&report).map_err(CliError::output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("corpusbench").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["wiki.db"]);
        let config = cli.config().unwrap();
        assert_eq!(config.row_limit, Some(DEFAULT_ROW_LIMIT));
        assert_eq!(config.top_n, DEFAULT_TOP_N);
        assert_eq!(config.show_words, DEFAULT_SHOW_WORDS);
        assert_eq!(config.device_mode, DeviceMode::Auto);
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_positional_limit_and_flags() {
        let cli = parse(&["wiki.db", "500", "--cpu-only", "--top-n", "7", "-v"]);
        let config = cli.config().unwrap();
        assert_eq!(config.row_limit, Some(500));
        assert_eq!(config.top_n, 7);
        assert_eq!(config.device_mode, DeviceMode::Off);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_no_limit() {
        let cli = parse(&["wiki.db", "--no-limit", "-q"]);
        assert_eq!(cli.config().unwrap().row_limit, None);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_conflicting_limits_rejected() {
        let result = Cli::try_parse_from(["corpusbench", "wiki.db", "10", "--no-limit"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_limit_is_invalid() {
        let cli = parse(&["wiki.db", "0"]);
        assert!(cli.config().unwrap_err().to_string().contains("row_limit"));
    }

    #[test]
    fn test_missing_queries_file() {
        let cli = parse(&["wiki.db", "--queries", "/nonexistent/queries.json"]);
        assert!(cli.config().is_err());
    }
}
