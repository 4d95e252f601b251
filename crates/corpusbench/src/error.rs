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

//! Error types for corpus benchmarking operations.
//!
//! The taxonomy separates conditions that abort a run (connection failure,
//! an empty corpus) from conditions the run absorbs (a single failing query,
//! a missing or failing device path).

use crate::device::DeviceError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for benchmarking operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that can occur during benchmarking operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BenchError {
    /// The data source could not be opened. Always fatal.
    #[error("Failed to open data source '{path}': {message}")]
    Connection {
        /// Path of the data source
        path: PathBuf,
        /// Underlying driver message
        message: String,
    },

    /// A single query failed. The loader recovers from this while fallback
    /// queries remain.
    #[error("Query failed: {query}: {message}")]
    Query {
        /// The rendered statement that failed
        query: String,
        /// Underlying driver message
        message: String,
    },

    /// No usable text rows were produced by any configured query.
    #[error("No text data found after {} query attempt(s)", attempts.len())]
    EmptyCorpus {
        /// Every statement that was attempted, in order
        attempts: Vec<String>,
    },

    /// Device acceleration is not available in this process.
    #[error("Device unavailable: {reason}")]
    DeviceUnavailable {
        /// Why the probe rejected the device
        reason: String,
    },

    /// A device operation failed at runtime.
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Invalid configuration parameter
    #[error("Invalid configuration parameter '{parameter}': {reason}")]
    InvalidConfig {
        /// Parameter name
        parameter: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error for '{path}': {message}")]
    Io {
        /// The file path that caused the error
        path: PathBuf,
        /// The error message
        message: String,
    },

    /// A query configuration file could not be parsed.
    #[error("Invalid query configuration '{path}': {message}")]
    ConfigParse {
        /// The file path that failed to parse
        path: PathBuf,
        /// The parser message
        message: String,
    },
}

impl BenchError {
    /// Create a query error for the given statement.
    pub fn query(query: impl Into<String>, message: impl ToString) -> Self {
        Self::Query {
            query: query.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Returns true when the error must terminate the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            BenchError::Query { .. } | BenchError::DeviceUnavailable { .. } | BenchError::Device(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchError::query("SELECT text FROM articles", "no such table: articles");
        let msg = err.to_string();
        assert!(msg.contains("SELECT text FROM articles"));
        assert!(msg.contains("no such table"));

        let err = BenchError::EmptyCorpus {
            attempts: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "No text data found after 2 query attempt(s)");

        let err = BenchError::invalid_config("top_n", "must be positive");
        let msg = err.to_string();
        assert!(msg.contains("top_n"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_fatality() {
        assert!(BenchError::Connection {
            path: PathBuf::from("wiki.db"),
            message: "unable to open".to_string(),
        }
        .is_fatal());
        assert!(BenchError::EmptyCorpus { attempts: vec![] }.is_fatal());
        assert!(!BenchError::query("q", "boom").is_fatal());
        assert!(!BenchError::DeviceUnavailable {
            reason: "disabled".to_string()
        }
        .is_fatal());
        assert!(!BenchError::Device(DeviceError::NotSynchronized).is_fatal());
    }

    #[test]
    fn test_device_error_conversion() {
        let err: BenchError = DeviceError::NotSynchronized.into();
        assert!(matches!(err, BenchError::Device(DeviceError::NotSynchronized)));
    }
}
