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

//! Corpus model and loading.
//!
//! - **source**: the [`TextSource`] seam and its SQLite implementation
//! - **loader**: primary/fallback query resolution

pub mod loader;
pub mod source;

pub use loader::{
    load_corpus, resolve_texts, Attempt, AttemptOutcome, LoadOutcome, QueryPlan, QuerySpec,
};
pub use source::{SqliteSource, TableInfo, TextSource};

use crate::{BenchError, Result};

/// One text unit of the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRecord {
    text: String,
}

impl CorpusRecord {
    /// Creates a record.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The raw text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl AsRef<str> for CorpusRecord {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// The ordered, non-empty collection of records for one run.
///
/// A `Corpus` can only be built from at least one record, so every engine
/// that receives one can rely on it being non-empty.
#[derive(Debug, Clone)]
pub struct Corpus {
    records: Vec<CorpusRecord>,
    source_query: String,
}

impl Corpus {
    /// Builds a corpus from loaded texts and the query that produced them.
    ///
    /// # Errors
    ///
    /// [`BenchError::EmptyCorpus`] when `texts` is empty.
    pub fn from_texts<I, S>(texts: I, source_query: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source_query = source_query.into();
        let records: Vec<CorpusRecord> = texts.into_iter().map(CorpusRecord::new).collect();
        if records.is_empty() {
            return Err(BenchError::EmptyCorpus {
                attempts: vec![source_query],
            });
        }
        Ok(Self {
            records,
            source_query,
        })
    }

    /// The records in load order.
    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    /// The statement that produced this corpus.
    pub fn source_query(&self) -> &str {
        &self.source_query
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total length of all records in characters.
    pub fn total_chars(&self) -> u64 {
        self.records
            .iter()
            .map(|r| r.text.chars().count() as u64)
            .sum()
    }

    /// Average record length in characters.
    pub fn average_len(&self) -> f64 {
        self.total_chars() as f64 / self.records.len() as f64
    }
}
