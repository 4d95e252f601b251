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

//! Read-only text sources.

use crate::{BenchError, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A table in the store and its row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Number of rows.
    pub rows: u64,
}

/// A store that answers SQL statements with rows of text.
pub trait TextSource {
    /// Executes `sql` and returns the first column of every row as text,
    /// in row order. NULL and empty values are dropped. Numbers are
    /// formatted; text and blob bytes that are not valid UTF-8 have each
    /// invalid sequence replaced with U+FFFD, which changes their length.
    ///
    /// # Errors
    ///
    /// [`BenchError::Query`] when the statement cannot be prepared or run.
    fn query_texts(&self, sql: &str) -> Result<Vec<String>>;

    /// Lists tables with their row counts.
    fn catalog(&self) -> Result<Vec<TableInfo>>;
}

/// A SQLite database opened read-only.
pub struct SqliteSource {
    path: PathBuf,
    conn: Connection,
}

impl SqliteSource {
    /// Opens the database at `path` without write access.
    ///
    /// # Errors
    ///
    /// [`BenchError::Connection`] if the file is missing or not a database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let connection_error = |e: rusqlite::Error| BenchError::Connection {
            path: path.clone(),
            message: e.to_string(),
        };

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(connection_error)?;

        // SQLite opens lazily; touching the schema surfaces a non-database file here.
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(connection_error)?;

        debug!(path = %path.display(), "opened database");
        Ok(Self { path, conn })
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn value_to_text(value: ValueRef<'_>) -> Option<String> {
    let text = match value {
        ValueRef::Null => return None,
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => match String::from_utf8_lossy(bytes) {
            Cow::Borrowed(text) => text.to_string(),
            Cow::Owned(text) => {
                debug!(bytes = bytes.len(), "replaced invalid UTF-8 in column value");
                text
            }
        },
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Backtick quoting: SQLite never reinterprets it as a string literal.
pub(crate) fn quote_identifier(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

impl TextSource for SqliteSource {
    fn query_texts(&self, sql: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| BenchError::query(sql, e))?;
        if stmt.column_count() == 0 {
            return Err(BenchError::query(sql, "statement returns no columns"));
        }

        let mut rows = stmt.query([]).map_err(|e| BenchError::query(sql, e))?;
        let mut texts = Vec::new();
        while let Some(row) = rows.next().map_err(|e| BenchError::query(sql, e))? {
            let value = row.get_ref(0).map_err(|e| BenchError::query(sql, e))?;
            if let Some(text) = value_to_text(value) {
                texts.push(text);
            }
        }
        Ok(texts)
    }

    fn catalog(&self) -> Result<Vec<TableInfo>> {
        let sql = "SELECT name FROM sqlite_master WHERE type = 'table'";
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| BenchError::query(sql, e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| BenchError::query(sql, e))?;

        names
            .into_iter()
            .map(|name| {
                let count_sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(&name));
                let rows = self
                    .conn
                    .query_row(&count_sql, [], |row| row.get::<_, i64>(0))
                    .map_err(|e| BenchError::query(&count_sql, e))?;
                Ok(TableInfo {
                    name,
                    rows: rows.max(0) as u64,
                })
            })
            .collect()
    }
}
