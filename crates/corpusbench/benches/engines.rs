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
//! Benchmarks for the CPU statistics engines and the device paths.
//!
//! Device paths run on the host-parallel reference device, and on the GPU
//! when an adapter is present.

use corpusbench::engines::{
    byte_distribution_gpu, char_distribution_cpu, length_stats_cpu, length_stats_gpu,
    word_frequency_cpu,
};
use corpusbench::{Device, GpuDevice, HostParallelDevice};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "Wikipedia", "article",
    "section", "2024", "café", "naïve", "data",
];

/// Deterministic corpus of `records` sentences.
fn corpus(records: usize) -> Vec<String> {
    (0..records)
        .map(|i| {
            let len = 5 + i % 40;
            (0..len)
                .map(|j| WORDS[(i * 7 + j * 13) % WORDS.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn total_bytes(texts: &[String]) -> u64 {
    texts.iter().map(|t| t.len() as u64).sum()
}

/// Labelled devices to benchmark.
fn devices() -> Vec<(&'static str, Box<dyn Device>)> {
    let mut devices: Vec<(&'static str, Box<dyn Device>)> = vec![(
        "host",
        Box::new(HostParallelDevice::new(4).expect("Failed to build device")),
    )];
    if let Ok(gpu) = GpuDevice::new() {
        devices.push(("gpu", Box::new(gpu)));
    }
    devices
}

fn bench_lengths(c: &mut Criterion) {
    let mut group = c.benchmark_group("lengths");
    let devices = devices();

    for size in [1_000, 10_000, 100_000] {
        let texts = corpus(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("cpu", size), &texts, |b, input| {
            b.iter(|| length_stats_cpu(black_box(input)))
        });
        for (label, device) in &devices {
            group.bench_with_input(BenchmarkId::new(*label, size), &texts, |b, input| {
                b.iter(|| length_stats_gpu(black_box(input), device.as_ref()))
            });
        }
    }

    group.finish();
}

fn bench_words(c: &mut Criterion) {
    let mut group = c.benchmark_group("words");

    for size in [1_000, 10_000] {
        let texts = corpus(size);
        group.throughput(Throughput::Bytes(total_bytes(&texts)));
        group.bench_with_input(BenchmarkId::new("cpu", size), &texts, |b, input| {
            b.iter(|| word_frequency_cpu(black_box(input), 100))
        });
    }

    group.finish();
}

fn bench_chars(c: &mut Criterion) {
    let mut group = c.benchmark_group("chars");
    let devices = devices();

    for size in [1_000, 10_000] {
        let texts = corpus(size);
        group.throughput(Throughput::Bytes(total_bytes(&texts)));
        group.bench_with_input(BenchmarkId::new("cpu", size), &texts, |b, input| {
            b.iter(|| char_distribution_cpu(black_box(input)))
        });
        for (label, device) in &devices {
            group.bench_with_input(BenchmarkId::new(*label, size), &texts, |b, input| {
                b.iter(|| byte_distribution_gpu(black_box(input), device.as_ref()))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_lengths, bench_words, bench_chars);
criterion_main!(benches);
