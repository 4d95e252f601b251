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

//! Corpus resolution with ordered fallback queries.
//!
//! A [`QueryPlan`] is a primary [`QuerySpec`] followed by fallbacks. Every
//! attempt is rendered with the same row limit, and the first attempt that
//! yields at least one text row wins. Individual query failures are logged
//! and skipped; only exhausting the plan is an error.

use super::source::{quote_identifier, TextSource};
use super::Corpus;
use crate::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// One text-bearing column to query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Table name.
    pub table: String,
    /// Text column name.
    pub column: String,
    /// Filter NULL values in SQL rather than on the host.
    #[serde(default)]
    pub non_null: bool,
}

impl QuerySpec {
    /// Creates a spec for `table.column`.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            non_null: false,
        }
    }

    /// Adds an `IS NOT NULL` filter to the rendered statement.
    pub fn non_null(mut self) -> Self {
        self.non_null = true;
        self
    }

    /// Renders the statement, appending `LIMIT` when a limit is given.
    pub fn render(&self, limit: Option<usize>) -> String {
        let column = quote_identifier(&self.column);
        let mut sql = format!("SELECT {} FROM {}", column, quote_identifier(&self.table));
        if self.non_null {
            sql.push_str(&format!(" WHERE {} IS NOT NULL", column));
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }
}

/// A primary query and its ordered fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Attempted first.
    pub primary: QuerySpec,
    /// Attempted in order when the primary fails or returns no rows.
    #[serde(default)]
    pub fallbacks: Vec<QuerySpec>,
}

impl QueryPlan {
    /// Creates a plan with no fallbacks.
    pub fn new(primary: QuerySpec) -> Self {
        Self {
            primary,
            fallbacks: Vec::new(),
        }
    }

    /// Appends a fallback.
    pub fn with_fallback(mut self, spec: QuerySpec) -> Self {
        self.fallbacks.push(spec);
        self
    }

    /// All specs in attempt order.
    pub fn attempts(&self) -> impl Iterator<Item = &QuerySpec> {
        std::iter::once(&self.primary).chain(self.fallbacks.iter())
    }

    /// Parses a plan from JSON.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads a plan from a JSON file.
    ///
    /// ```json
    /// {
    ///   "primary": { "table": "ARTICLES", "column": "SECTION_TEXT", "non_null": true },
    ///   "fallbacks": [ { "table": "articles", "column": "text" } ]
    /// }
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&content).map_err(|e| BenchError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Checks that every spec names a table and a column.
    pub fn validate(&self) -> Result<()> {
        for spec in self.attempts() {
            if spec.table.trim().is_empty() || spec.column.trim().is_empty() {
                return Err(BenchError::invalid_config(
                    "query_plan",
                    "every query needs a table and a column",
                ));
            }
        }
        Ok(())
    }
}

impl Default for QueryPlan {
    /// The Wikipedia dump layout, then common text column names.
    fn default() -> Self {
        Self::new(QuerySpec::new("ARTICLES", "SECTION_TEXT").non_null())
            .with_fallback(QuerySpec::new("articles", "SECTION_TEXT"))
            .with_fallback(QuerySpec::new("articles", "text"))
            .with_fallback(QuerySpec::new("articles", "content"))
            .with_fallback(QuerySpec::new("articles", "body"))
    }
}

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Produced this many text rows.
    Rows(usize),
    /// Ran but produced no text rows.
    Empty,
    /// Raised an error.
    Failed(String),
}

/// One executed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// The rendered statement.
    pub query: String,
    /// What happened.
    pub outcome: AttemptOutcome,
}

/// Result of walking a query plan.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    /// Text rows from the winning attempt; empty if none won.
    pub texts: Vec<String>,
    /// The winning statement.
    pub query: Option<String>,
    /// Every attempt made, in order.
    pub attempts: Vec<Attempt>,
}

/// Walks `plan` against `source`, stopping at the first attempt with rows.
///
/// `limit` is applied to every attempt.
pub fn resolve_texts(
    source: &dyn TextSource,
    plan: &QueryPlan,
    limit: Option<usize>,
) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    for (index, spec) in plan.attempts().enumerate() {
        let query = spec.render(limit);
        if index == 0 {
            info!(query = %query, "executing primary query");
        } else {
            info!(query = %query, "trying fallback query");
        }

        match source.query_texts(&query) {
            Ok(texts) if !texts.is_empty() => {
                debug!(query = %query, rows = texts.len(), "query produced rows");
                outcome.attempts.push(Attempt {
                    query: query.clone(),
                    outcome: AttemptOutcome::Rows(texts.len()),
                });
                outcome.texts = texts;
                outcome.query = Some(query);
                return outcome;
            }
            Ok(_) => {
                warn!(query = %query, "query returned no text rows");
                outcome.attempts.push(Attempt {
                    query,
                    outcome: AttemptOutcome::Empty,
                });
            }
            Err(e) => {
                warn!(query = %query, error = %e, "query failed");
                outcome.attempts.push(Attempt {
                    query,
                    outcome: AttemptOutcome::Failed(e.to_string()),
                });
            }
        }
    }

    outcome
}

/// Loads the corpus for a run.
///
/// # Errors
///
/// [`BenchError::EmptyCorpus`] listing every attempted statement when no
/// attempt produced a row.
pub fn load_corpus(
    source: &dyn TextSource,
    plan: &QueryPlan,
    limit: Option<usize>,
) -> Result<Corpus> {
    let outcome = resolve_texts(source, plan, limit);
    match outcome.query {
        Some(query) => Corpus::from_texts(outcome.texts, query),
        None => Err(BenchError::EmptyCorpus {
            attempts: outcome.attempts.into_iter().map(|a| a.query).collect(),
        }),
    }
}
