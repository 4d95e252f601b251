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
//! Corpusbench - CPU vs GPU corpus statistics
//!
//! Loads a text corpus from a SQLite database and computes the same
//! statistics twice, once on the host and once on a GPU through `wgpu`,
//! timing both and reporting the speedup.
//!
//! ## Features
//!
//! - **Corpus loading**: primary query with ordered fallbacks and a uniform
//!   row limit
//! - **Length statistics**: count, total, mean, std, min, max, median
//! - **Word frequency**: case-folded tokens with a stable top-N ordering
//! - **Character distribution**: codepoint classes on the host, byte
//!   classes on the device
//! - **Harness**: fixed execution order, device capability resolved once,
//!   CPU / GPU speedups
//!
//! ## Usage
//!
//! ```no_run
//! use corpusbench::{BenchConfig, DeviceCapability, Harness, SqliteSource};
//!
//! let config = BenchConfig::default().with_row_limit(Some(10_000));
//! let capability = DeviceCapability::probe(config.device_mode);
//! let source = SqliteSource::open("wiki.db")?;
//! let report = Harness::new(config, capability).run(&source)?;
//! corpusbench::reporters::print_report(&report)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod corpus;
pub mod device;
pub mod engines;
pub mod error;
pub mod harness;
pub mod reporters;

// Re-export key types for convenience
pub use crate::core::{BenchConfig, Measurement};
pub use corpus::{Corpus, QueryPlan, QuerySpec, SqliteSource, TableInfo, TextSource};
pub use device::{
    Device, DeviceCapability, DeviceError, DeviceMode, GpuDevice, HostParallelDevice, Reduction,
};
pub use error::{BenchError, Result};
pub use harness::{Harness, REPORT_TITLE};
pub use reporters::{BenchmarkReport, DeviceKind, Task};
