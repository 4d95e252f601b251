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
//! Error types for the corpusbench CLI.

use corpusbench::BenchError;
use thiserror::Error;

/// Errors surfaced by the command-line runner.
#[derive(Error, Debug, Clone)]
pub enum CliError {
    /// The library reported a fatal condition.
    #[error(transparent)]
    Bench(#[from] BenchError),

    /// The report could not be written to stdout.
    #[error("Failed to write report: {message}")]
    Output {
        /// The error message
        message: String,
    },
}

impl CliError {
    /// Wraps a stdout write failure.
    pub fn output(err: std::io::Error) -> Self {
        Self::Output {
            message: err.to_string(),
        }
    }
}
