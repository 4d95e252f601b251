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

//! Centralized benchmark configuration.
//!
//! Provides the settings for one benchmark run: how many rows to load, which
//! queries to try, how many top words to keep, and how the device probe
//! should behave.

use crate::corpus::QueryPlan;
use crate::device::DeviceMode;
use crate::{BenchError, Result};

/// Default number of rows loaded from the store.
pub const DEFAULT_ROW_LIMIT: usize = 1_000_000;

/// Default number of top words kept by the word frequency engine.
pub const DEFAULT_TOP_N: usize = 100;

/// Default number of top words shown in the console report.
pub const DEFAULT_SHOW_WORDS: usize = 10;

/// Configuration for a benchmark run.
///
/// # Example
///
/// ```
/// use corpusbench::core::config::BenchConfig;
/// use corpusbench::device::DeviceMode;
///
/// let config = BenchConfig::default()
///     .with_row_limit(Some(5_000))
///     .with_top_n(20)
///     .with_device_mode(DeviceMode::Off);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Row limit applied to every query attempt. `None` loads everything.
    pub row_limit: Option<usize>,
    /// Top words kept by the word frequency engine.
    pub top_n: usize,
    /// Top words printed in the console report.
    pub show_words: usize,
    /// Primary and fallback queries.
    pub query_plan: QueryPlan,
    /// Device probe behavior.
    pub device_mode: DeviceMode,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            row_limit: Some(DEFAULT_ROW_LIMIT),
            top_n: DEFAULT_TOP_N,
            show_words: DEFAULT_SHOW_WORDS,
            query_plan: QueryPlan::default(),
            device_mode: DeviceMode::Auto,
        }
    }
}

impl BenchConfig {
    /// Sets the row limit.
    pub fn with_row_limit(mut self, limit: Option<usize>) -> Self {
        self.row_limit = limit;
        self
    }

    /// Sets how many top words are kept.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Sets how many top words are printed.
    pub fn with_show_words(mut self, show_words: usize) -> Self {
        self.show_words = show_words;
        self
    }

    /// Replaces the query plan.
    pub fn with_query_plan(mut self, plan: QueryPlan) -> Self {
        self.query_plan = plan;
        self
    }

    /// Sets the device probe mode.
    pub fn with_device_mode(mut self, mode: DeviceMode) -> Self {
        self.device_mode = mode;
        self
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.row_limit == Some(0) {
            return Err(BenchError::invalid_config("row_limit", "must be positive"));
        }
        if self.top_n == 0 {
            return Err(BenchError::invalid_config("top_n", "must be positive"));
        }
        self.query_plan.validate()
    }
}
