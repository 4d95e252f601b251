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

//! Host-parallel reference device.
//!
//! A dedicated rayon pool plays the role of the accelerator. Uploads copy
//! host slices into pool-owned buffers, kernels are spawned onto the pool and
//! run data-parallel, and `synchronize` blocks until the in-flight counter
//! drops to zero. The capability probe never selects this device; it is
//! handed to [`DeviceCapability::with_device`](super::DeviceCapability::with_device)
//! by tests and benchmarks that need the device paths without a GPU.

use super::{Device, DeviceArray, DeviceError, DeviceResult, Pending, Reduction};
use parking_lot::{Condvar, Mutex};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{debug, error};

/// Elements per work item for the byte histogram kernel.
const HISTOGRAM_CHUNK: usize = 64 * 1024;

/// Counts launched kernels that have not completed.
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn begin(&self) {
        *self.count.lock() += 1;
    }

    fn end(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }
}

/// Marks a kernel complete when dropped, including on unwind.
struct LaunchGuard(Arc<InFlight>);

impl Drop for LaunchGuard {
    fn drop(&mut self) {
        self.0.end();
    }
}

/// Device memory accounting.
struct MemoryBudget {
    limit: Option<usize>,
    used: Mutex<usize>,
}

impl MemoryBudget {
    fn reserve(&self, bytes: usize) -> DeviceResult<()> {
        let mut used = self.used.lock();
        if let Some(limit) = self.limit {
            let available = limit.saturating_sub(*used);
            if bytes > available {
                return Err(DeviceError::OutOfMemory {
                    requested: bytes,
                    available,
                });
            }
        }
        *used += bytes;
        Ok(())
    }

    fn release(&self, bytes: usize) {
        let mut used = self.used.lock();
        *used = used.saturating_sub(bytes);
    }
}

/// Reference device backed by a dedicated worker pool.
pub struct HostParallelDevice {
    name: String,
    pool: ThreadPool,
    in_flight: Arc<InFlight>,
    memory: Arc<MemoryBudget>,
}

impl HostParallelDevice {
    /// Creates a device with `threads` workers and no memory limit.
    pub fn new(threads: usize) -> DeviceResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("corpusbench-device-{}", i))
            .panic_handler(|_| error!("device kernel panicked"))
            .build()
            .map_err(|e| DeviceError::Init(e.to_string()))?;

        Ok(Self {
            name: format!("host-parallel, {} workers", threads),
            pool,
            in_flight: Arc::new(InFlight::default()),
            memory: Arc::new(MemoryBudget {
                limit: None,
                used: Mutex::new(0),
            }),
        })
    }

    /// Caps device memory at `bytes`.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory = Arc::new(MemoryBudget {
            limit: Some(bytes),
            used: Mutex::new(0),
        });
        self
    }

    /// Bytes currently held in device memory.
    pub fn memory_in_use(&self) -> usize {
        *self.memory.used.lock()
    }

    fn release_hook(&self, reserved: usize) -> Option<Box<dyn FnOnce(usize) + Send + Sync>> {
        let memory = Arc::clone(&self.memory);
        Some(Box::new(move |_| memory.release(reserved)))
    }

    fn upload<T: Copy + Send + Sync + 'static>(&self, host: &[T]) -> DeviceResult<DeviceArray<T>> {
        let bytes = std::mem::size_of_val(host);
        self.memory.reserve(bytes)?;
        debug!(bytes, "host to device transfer");
        Ok(DeviceArray::new(
            host.len(),
            bytes,
            Arc::new(host.to_vec()),
            self.release_hook(bytes),
        ))
    }

    fn launch<T, F>(&self, kernel: &'static str, f: F) -> DeviceResult<Pending<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.in_flight.begin();
        let guard = LaunchGuard(Arc::clone(&self.in_flight));
        self.pool.spawn(move || {
            let _guard = guard;
            let _ = tx.send(f());
        });
        Ok(Pending::new(kernel, rx))
    }
}

fn median_of(values: &[u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.par_sort_unstable();
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    })
}

fn byte_histogram(bytes: &[u8]) -> [u64; 256] {
    bytes
        .par_chunks(HISTOGRAM_CHUNK)
        .map(|chunk| {
            let mut counts = [0u64; 256];
            for &b in chunk {
                counts[b as usize] += 1;
            }
            counts
        })
        .reduce(
            || [0u64; 256],
            |mut acc, counts| {
                for (a, c) in acc.iter_mut().zip(counts.iter()) {
                    *a += c;
                }
                acc
            },
        )
}

impl Device for HostParallelDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn upload_u64(&self, host: &[u64]) -> DeviceResult<DeviceArray<u64>> {
        self.upload(host)
    }

    fn upload_bytes(&self, host: &[u8]) -> DeviceResult<DeviceArray<u8>> {
        self.upload(host)
    }

    fn reduce(&self, array: &DeviceArray<u64>) -> DeviceResult<Pending<Reduction>> {
        let data = Arc::clone(array.storage::<Arc<Vec<u64>>>("reduce")?);
        self.launch("reduce", move || {
            data.par_iter()
                .map(|&v| Reduction::of(v))
                .reduce(Reduction::default, Reduction::merge)
        })
    }

    fn median(&self, array: &DeviceArray<u64>) -> DeviceResult<Pending<Option<f64>>> {
        let data = Arc::clone(array.storage::<Arc<Vec<u64>>>("median")?);
        self.launch("median", move || median_of(&data))
    }

    fn unique_counts(&self, array: &DeviceArray<u8>) -> DeviceResult<Pending<Vec<(u8, u64)>>> {
        let data = Arc::clone(array.storage::<Arc<Vec<u8>>>("unique_counts")?);
        self.launch("unique_counts", move || {
            let counts = byte_histogram(&data);
            (0..=u8::MAX)
                .zip(counts.iter())
                .filter(|&(_, &count)| count > 0)
                .map(|(byte, &count)| (byte, count))
                .collect()
        })
    }

    fn synchronize(&self) -> DeviceResult<()> {
        self.in_flight.wait();
        Ok(())
    }
}
