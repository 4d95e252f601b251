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
//! End-to-end tests against real SQLite databases.

use corpusbench::corpus::{load_corpus, resolve_texts, AttemptOutcome};
use corpusbench::engines::{
    byte_distribution_gpu, char_distribution_cpu, compute_stats, length_stats_cpu,
    length_stats_gpu,
};
use corpusbench::{
    BenchConfig, BenchError, DeviceCapability, DeviceKind, GpuDevice, Harness,
    HostParallelDevice, QueryPlan, QuerySpec, SqliteSource, Task, TextSource,
};
use proptest::prelude::*;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

// ===== Test Helpers =====

/// Creates a database with one table holding `rows` in `column`.
fn create_db(table: &str, column: &str, rows: &[Option<&str>]) -> (TempDir, PathBuf) {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("corpus.db");
    let conn = Connection::open(&path).expect("Failed to create database");
    conn.execute(
        &format!("CREATE TABLE {} (id INTEGER PRIMARY KEY, {} TEXT)", table, column),
        [],
    )
    .expect("Failed to create table");
    for row in rows {
        conn.execute(
            &format!("INSERT INTO {} ({}) VALUES (?1)", table, column),
            params![row],
        )
        .expect("Failed to insert row");
    }
    (dir, path)
}

fn sample_rows() -> Vec<Option<&'static str>> {
    vec![
        Some("The cat sat on the mat."),
        Some("The dog sat, 42 times."),
        Some("Naïve café owners drink 3 coffees"),
        Some("Ünïcödé"),
    ]
}

// ===== Loader =====

#[test]
fn test_default_plan_falls_back_to_text_column() {
    let (_dir, path) = create_db("articles", "text", &sample_rows());
    let source = SqliteSource::open(&path).unwrap();

    let outcome = resolve_texts(&source, &QueryPlan::default(), Some(100));
    assert_eq!(outcome.texts.len(), 4);
    assert_eq!(
        outcome.query.as_deref(),
        Some("SELECT `text` FROM `articles` LIMIT 100")
    );
    assert!(matches!(outcome.attempts[0].outcome, AttemptOutcome::Failed(_)));
    assert!(matches!(outcome.attempts[1].outcome, AttemptOutcome::Failed(_)));
    assert_eq!(outcome.attempts[2].outcome, AttemptOutcome::Rows(4));
    assert_eq!(outcome.attempts.len(), 3);
}

#[test]
fn test_primary_query_with_not_null_filter() {
    let (_dir, path) = create_db(
        "ARTICLES",
        "SECTION_TEXT",
        &[Some("first"), None, Some("second")],
    );
    let source = SqliteSource::open(&path).unwrap();

    let corpus = load_corpus(&source, &QueryPlan::default(), Some(2)).unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.records()[1].text(), "second");
    assert!(corpus.source_query().contains("IS NOT NULL"));
}

#[test]
fn test_limit_applies_to_every_attempt() {
    let (_dir, path) = create_db("articles", "body", &sample_rows());
    let source = SqliteSource::open(&path).unwrap();

    let outcome = resolve_texts(&source, &QueryPlan::default(), Some(2));
    assert_eq!(outcome.texts.len(), 2);
    assert!(outcome.attempts.iter().all(|a| a.query.ends_with(" LIMIT 2")));
}

#[test]
fn test_null_and_empty_rows_are_dropped() {
    let (_dir, path) = create_db("articles", "text", &[None, Some(""), Some("kept")]);
    let source = SqliteSource::open(&path).unwrap();

    let corpus = load_corpus(&source, &QueryPlan::default(), None).unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.records()[0].text(), "kept");
}

#[test]
fn test_no_matching_table_is_empty_corpus() {
    let (_dir, path) = create_db("other", "text", &sample_rows());
    let source = SqliteSource::open(&path).unwrap();

    match load_corpus(&source, &QueryPlan::default(), Some(10)) {
        Err(BenchError::EmptyCorpus { attempts }) => assert_eq!(attempts.len(), 5),
        other => panic!("expected EmptyCorpus, got {:?}", other.map(|c| c.len())),
    }
}

#[test]
fn test_catalog_lists_row_counts() {
    let (_dir, path) = create_db("articles", "text", &sample_rows());
    let source = SqliteSource::open(&path).unwrap();

    let tables = source.catalog().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "articles");
    assert_eq!(tables[0].rows, 4);
}

// ===== Engines =====

#[test]
fn test_cpu_and_gpu_lengths_agree() {
    let texts: Vec<String> = (0..5_000).map(|i| "wörd ".repeat(i % 37 + 1)).collect();
    let device = HostParallelDevice::new(4).unwrap();

    let cpu = length_stats_cpu(&texts).unwrap().value;
    let gpu = length_stats_gpu(&texts, &device).unwrap().value;
    assert_eq!(cpu.count, gpu.count);
    assert_eq!(cpu.total, gpu.total);
    assert_eq!(cpu.min, gpu.min);
    assert_eq!(cpu.max, gpu.max);
    assert!(cpu.agrees_with(&gpu, 1e-6));
    assert_eq!(device.memory_in_use(), 0);
}

#[test]
fn test_ascii_distributions_match_across_devices() {
    let texts = ["ab12 ", "Hello World 2025"];
    let device = HostParallelDevice::new(2).unwrap();

    let cpu = char_distribution_cpu(&texts).value.classes;
    let gpu = byte_distribution_gpu(&texts, &device).unwrap().value.classes;
    assert_eq!(cpu.total, gpu.total);
    assert_eq!(cpu.letters, gpu.letters);
    assert_eq!(cpu.digits, gpu.digits);
    assert_eq!(cpu.spaces, gpu.spaces);
}

#[test]
fn test_hardware_gpu_matches_cpu() {
    // Only meaningful on machines with a GPU adapter.
    let Ok(device) = GpuDevice::new() else {
        return;
    };
    let texts: Vec<String> = (0..3_000)
        .map(|i| format!("{} {}", "größe ".repeat(i % 41), i))
        .collect();

    let cpu = length_stats_cpu(&texts).unwrap().value;
    let gpu = length_stats_gpu(&texts, &device).unwrap().value;
    assert!(cpu.agrees_with(&gpu, 1e-6), "{:?} vs {:?}", cpu, gpu);

    let host = HostParallelDevice::new(2).unwrap();
    let expected = byte_distribution_gpu(&texts, &host).unwrap().value;
    let actual = byte_distribution_gpu(&texts, &device).unwrap().value;
    assert_eq!(expected.histogram, actual.histogram);
}

#[test]
fn test_invalid_blob_is_replaced_not_dropped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("blobs.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute("CREATE TABLE articles (id INTEGER PRIMARY KEY, text BLOB)", [])
        .unwrap();
    conn.execute(
        "INSERT INTO articles (text) VALUES (?1)",
        params![vec![b'o', b'k', 0xFF, b'!']],
    )
    .unwrap();
    drop(conn);

    let source = SqliteSource::open(&path).unwrap();
    let texts = source.query_texts("SELECT text FROM articles").unwrap();
    assert_eq!(texts, vec!["ok\u{FFFD}!".to_string()]);
}

// ===== Harness =====

#[test]
fn test_full_run_against_sqlite() {
    let (_dir, path) = create_db("articles", "content", &sample_rows());
    let source = SqliteSource::open(&path).unwrap();
    let config = BenchConfig::default().with_row_limit(Some(1_000));
    let device = HostParallelDevice::new(2).unwrap();

    let report = Harness::new(config, DeviceCapability::with_device(device))
        .run(&source)
        .unwrap();

    assert_eq!(report.corpus.records, 4);
    assert_eq!(report.result_count(), 5);
    assert!(report.record(Task::Words, DeviceKind::Gpu).is_none());
    assert!(report.speedup(Task::Lengths).is_some());
    assert!(report.speedup(Task::Chars).is_some());
    assert_eq!(report.tables[0].name, "articles");
}

#[test]
fn test_custom_plan_from_json() {
    let (_dir, path) = create_db("docs", "payload", &sample_rows());
    let source = SqliteSource::open(&path).unwrap();
    let plan = QueryPlan::from_json_str(
        r#"{ "primary": { "table": "docs", "column": "missing" },
             "fallbacks": [ { "table": "docs", "column": "payload" } ] }"#,
    )
    .unwrap();
    assert_eq!(plan.fallbacks[0], QuerySpec::new("docs", "payload"));

    let config = BenchConfig::default().with_query_plan(plan);
    let report = Harness::new(config, DeviceCapability::unavailable("disabled"))
        .run(&source)
        .unwrap();
    assert_eq!(report.corpus.records, 4);
    assert_eq!(report.skipped.len(), 2);
}

// ===== Properties =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_mean_times_count_is_total(lengths in prop::collection::vec(0u64..100_000, 1..500)) {
        let stats = compute_stats(&lengths).unwrap();
        let reconstructed = stats.mean * stats.count as f64;
        let tolerance = 1e-6 * stats.total.max(1) as f64;
        prop_assert!((reconstructed - stats.total as f64).abs() <= tolerance);
    }

    #[test]
    fn prop_median_within_bounds(lengths in prop::collection::vec(0u64..100_000, 1..500)) {
        let stats = compute_stats(&lengths).unwrap();
        prop_assert!(stats.min as f64 <= stats.median);
        prop_assert!(stats.median <= stats.max as f64);
        prop_assert!(stats.std >= 0.0);
    }

    #[test]
    fn prop_char_classes_partition(texts in prop::collection::vec("\\PC*", 1..20)) {
        let classes = char_distribution_cpu(&texts).value.classes;
        prop_assert!(classes.letters + classes.digits + classes.spaces <= classes.total);
        let pct = classes.letter_pct() + classes.digit_pct() + classes.space_pct();
        prop_assert!(pct <= 100.0 + 1e-9);
    }

    #[test]
    fn prop_cpu_gpu_lengths_agree(texts in prop::collection::vec("\\PC{0,40}", 1..100)) {
        let device = HostParallelDevice::new(2).unwrap();
        let cpu = length_stats_cpu(&texts).unwrap().value;
        let gpu = length_stats_gpu(&texts, &device).unwrap().value;
        prop_assert!(cpu.agrees_with(&gpu, 1e-6));
    }
}
