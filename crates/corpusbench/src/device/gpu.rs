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

//! GPU device on a `wgpu` adapter.
//!
//! Every kernel is a WGSL compute shader:
//!
//! - `reduce`: per-workgroup sum, sum of squares, min and max over the
//!   length array, with 64-bit sums built from u32 pairs. The host folds
//!   one partial per 256 elements.
//! - `bitonic`: in-place bitonic sort of a padded copy, for the median.
//! - `histogram`, `fold`, `compact`: a byte histogram built chunk by chunk
//!   with workgroup atomics, accumulated into 64-bit totals, then compacted
//!   into ascending `(byte, count)` pairs on the device.
//!
//! Results come back through mapped readback buffers. The map request is
//! issued at launch and completes during [`Device::synchronize`].

use super::{Device, DeviceArray, DeviceError, DeviceResult, Pending, Reduction};
use std::borrow::Cow;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{debug, error};
use wgpu::util::DeviceExt;

/// Invocations per workgroup, matching `@workgroup_size` in every shader.
const WORKGROUP: usize = 256;

/// Words written per workgroup by the reduce kernel.
const PARTIAL_WORDS: usize = 6;

/// Lengths above this would let a workgroup's sum of squares overflow 64 bits.
pub const MAX_DEVICE_LENGTH: u64 = (1 << 28) - 1;

/// Count word plus 256 `(byte, lo, hi)` triples.
const COMPACT_WORDS: usize = 1 + 256 * 3;

const REDUCE_SHADER: &str = include_str!("shaders/reduce.wgsl");
const BITONIC_SHADER: &str = include_str!("shaders/bitonic.wgsl");
const HISTOGRAM_SHADER: &str = include_str!("shaders/histogram.wgsl");
const FOLD_SHADER: &str = include_str!("shaders/fold.wgsl");
const COMPACT_SHADER: &str = include_str!("shaders/compact.wgsl");

/// Device storage: one buffer per chunk. Length arrays always use a single
/// chunk; byte streams are split at the storage binding limit.
struct GpuStorage {
    chunks: Vec<GpuChunk>,
}

struct GpuChunk {
    buffer: wgpu::Buffer,
    /// Elements (lengths or bytes) held by the chunk, excluding padding.
    len: usize,
}

/// Device backed by a hardware GPU adapter.
pub struct GpuDevice {
    name: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
    max_binding: usize,
    max_groups_per_dim: u32,
    reduce: wgpu::ComputePipeline,
    bitonic: wgpu::ComputePipeline,
    histogram: wgpu::ComputePipeline,
    fold: wgpu::ComputePipeline,
    compact: wgpu::ComputePipeline,
}

impl GpuDevice {
    /// Opens the highest-performance hardware adapter and compiles the
    /// kernels.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Init`] when no adapter is found, when only a software
    /// adapter exists, when the adapter cannot run compute shaders, or when
    /// the kernels fail to compile.
    pub fn new() -> DeviceResult<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> DeviceResult<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| DeviceError::Init("no GPU adapter found".to_string()))?;

        let info = adapter.get_info();
        if info.device_type == wgpu::DeviceType::Cpu {
            return Err(DeviceError::Init(format!(
                "only a software adapter is available ({})",
                info.name
            )));
        }
        if !adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(DeviceError::Init(format!(
                "adapter {} does not support compute shaders",
                info.name
            )));
        }

        let limits = adapter.limits();
        if (limits.max_compute_invocations_per_workgroup as usize) < WORKGROUP
            || (limits.max_compute_workgroup_size_x as usize) < WORKGROUP
        {
            return Err(DeviceError::Init(format!(
                "adapter {} cannot run {} invocations per workgroup",
                info.name, WORKGROUP
            )));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("corpusbench-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                },
                None,
            )
            .await
            .map_err(|e| DeviceError::Init(e.to_string()))?;
        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            error!(error = %e, "uncaptured GPU error")
        }));

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let reduce = pipeline(&device, "corpusbench-reduce", REDUCE_SHADER);
        let bitonic = pipeline(&device, "corpusbench-bitonic", BITONIC_SHADER);
        let histogram = pipeline(&device, "corpusbench-histogram", HISTOGRAM_SHADER);
        let fold = pipeline(&device, "corpusbench-fold", FOLD_SHADER);
        let compact = pipeline(&device, "corpusbench-compact", COMPACT_SHADER);
        if let Some(e) = device.pop_error_scope().await {
            return Err(DeviceError::Init(format!("kernel compilation failed: {}", e)));
        }

        let max_binding = limits
            .max_storage_buffer_binding_size
            .min(u32::try_from(limits.max_buffer_size).unwrap_or(u32::MAX))
            as usize
            & !3;
        let max_binding = max_binding.max(4);

        Ok(Self {
            name: format!("{} ({:?})", info.name, info.backend),
            device,
            queue,
            max_binding,
            max_groups_per_dim: limits.max_compute_workgroups_per_dimension,
            reduce,
            bitonic,
            histogram,
            fold,
            compact,
        })
    }

    /// Creates an initialised storage buffer, padding `contents` to whole
    /// words.
    fn storage_buffer(&self, label: &str, contents: &[u8]) -> DeviceResult<wgpu::Buffer> {
        let padded;
        let contents = if contents.is_empty() || contents.len() % 4 != 0 {
            let mut words = contents.to_vec();
            words.resize(padded_len(contents.len()), 0);
            padded = words;
            &padded[..]
        } else {
            contents
        };

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(_) => Err(DeviceError::OutOfMemory {
                requested: contents.len(),
                available: 0,
            }),
            None => Ok(buffer),
        }
    }

    fn scratch_buffer(&self, label: &str, size: usize, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as u64,
            usage,
            mapped_at_creation: false,
        })
    }

    fn uniform(&self, words: [u32; 4]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("corpusbench-params"),
                contents: bytemuck::cast_slice(&words),
                usage: wgpu::BufferUsages::UNIFORM,
            })
    }

    fn bind_group(
        &self,
        pipeline: &wgpu::ComputePipeline,
        buffers: &[&wgpu::Buffer],
    ) -> wgpu::BindGroup {
        let layout = pipeline.get_bind_group_layout(0);
        let entries: Vec<wgpu::BindGroupEntry<'_>> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &layout,
            entries: &entries,
        })
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Splits `groups` workgroups over x and y so neither exceeds the
    /// per-dimension dispatch limit.
    fn grid(&self, groups: usize) -> (u32, u32) {
        let groups = u32::try_from(groups.max(1)).unwrap_or(u32::MAX);
        if groups <= self.max_groups_per_dim {
            (groups, 1)
        } else {
            let x = self.max_groups_per_dim;
            (x, (groups + x - 1) / x)
        }
    }

    /// Copies `size` bytes of `source` into a readback buffer, submits the
    /// encoder and requests the mapping. `decode` turns the mapped bytes
    /// into the result once the device has been synchronized.
    fn readback<T, F>(
        &self,
        kernel: &'static str,
        mut encoder: wgpu::CommandEncoder,
        source: &wgpu::Buffer,
        offset: u64,
        size: u64,
        decode: F,
    ) -> Pending<T>
    where
        T: 'static,
        F: FnOnce(&[u32]) -> T + Send + 'static,
    {
        let staging = Arc::new(self.scratch_buffer(
            "corpusbench-readback",
            size as usize,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        ));
        encoder.copy_buffer_to_buffer(source, offset, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let (tx, rx) = mpsc::channel();
        staging
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result.map_err(|e| e.to_string()));
            });

        Pending::mapped(kernel, rx, move || {
            let value = {
                let mapped = staging.slice(..).get_mapped_range();
                decode(bytemuck::cast_slice(&mapped[..]))
            };
            staging.unmap();
            debug!(kernel, bytes = size, "device to host transfer");
            Ok(value)
        })
    }

    fn single_chunk<'a>(
        &self,
        kernel: &'static str,
        array: &'a DeviceArray<u64>,
    ) -> DeviceResult<Option<&'a GpuChunk>> {
        Ok(array.storage::<GpuStorage>(kernel)?.chunks.first())
    }
}

fn pipeline(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: None,
        module: &module,
        entry_point: "main",
    })
}

fn padded_len(bytes: usize) -> usize {
    ((bytes + 3) & !3).max(4)
}

fn groups_for(items: usize) -> usize {
    (items + WORKGROUP - 1) / WORKGROUP
}

fn word_pair(lo: u32, hi: u32) -> u64 {
    u64::from(lo) | (u64::from(hi) << 32)
}

/// Folds reduce-kernel partials on the host.
fn fold_partials(count: usize, partials: &[u32]) -> Reduction {
    let mut reduction = Reduction {
        count: count as u64,
        ..Reduction::default()
    };
    for partial in partials.chunks_exact(PARTIAL_WORDS) {
        reduction.sum += word_pair(partial[0], partial[1]);
        reduction.sum_sq += u128::from(word_pair(partial[2], partial[3]));
        let (min, max) = (u64::from(partial[4]), u64::from(partial[5]));
        reduction.min = Some(reduction.min.map_or(min, |m| m.min(min)));
        reduction.max = Some(reduction.max.map_or(max, |m| m.max(max)));
    }
    reduction
}

/// Decodes the compact histogram: a count word, then `(byte, lo, hi)` triples.
fn decode_compact(words: &[u32]) -> Vec<(u8, u64)> {
    let count = words.first().copied().unwrap_or(0) as usize;
    words
        .get(1..)
        .unwrap_or(&[])
        .chunks_exact(3)
        .take(count.min(256))
        .map(|t| (t[0] as u8, word_pair(t[1], t[2])))
        .collect()
}

impl Device for GpuDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn upload_u64(&self, host: &[u64]) -> DeviceResult<DeviceArray<u64>> {
        let words = host
            .iter()
            .map(|&v| u32::try_from(v).ok().filter(|&v| u64::from(v) <= MAX_DEVICE_LENGTH))
            .collect::<Option<Vec<u32>>>()
            .ok_or_else(|| DeviceError::Launch {
                kernel: "upload",
                message: format!("record length exceeds {} characters", MAX_DEVICE_LENGTH),
            })?;

        // The median sorts a power-of-two copy in one binding.
        let sorted_bytes = host.len().next_power_of_two() * 4;
        if sorted_bytes > self.max_binding {
            return Err(DeviceError::OutOfMemory {
                requested: sorted_bytes,
                available: self.max_binding,
            });
        }

        let bytes = words.len() * 4;
        debug!(bytes, "host to device transfer");
        let buffer = self.storage_buffer("corpusbench-lengths", bytemuck::cast_slice(&words))?;
        let storage = GpuStorage {
            chunks: vec![GpuChunk {
                buffer,
                len: host.len(),
            }],
        };
        Ok(DeviceArray::new(host.len(), bytes, storage, None))
    }

    fn upload_bytes(&self, host: &[u8]) -> DeviceResult<DeviceArray<u8>> {
        debug!(bytes = host.len(), "host to device transfer");
        let chunks = host
            .chunks(self.max_binding)
            .map(|part| {
                Ok(GpuChunk {
                    buffer: self.storage_buffer("corpusbench-bytes", part)?,
                    len: part.len(),
                })
            })
            .collect::<DeviceResult<Vec<_>>>()?;
        Ok(DeviceArray::new(
            host.len(),
            host.len(),
            GpuStorage { chunks },
            None,
        ))
    }

    fn reduce(&self, array: &DeviceArray<u64>) -> DeviceResult<Pending<Reduction>> {
        let chunk = match self.single_chunk("reduce", array)? {
            Some(chunk) if chunk.len > 0 => chunk,
            _ => {
                let (tx, rx) = mpsc::channel();
                let _ = tx.send(Reduction::default());
                return Ok(Pending::new("reduce", rx));
            }
        };

        let groups = groups_for(chunk.len);
        let partial_bytes = groups * PARTIAL_WORDS * 4;
        let partials = self.scratch_buffer(
            "corpusbench-partials",
            partial_bytes,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );
        let params = self.uniform([chunk.len as u32, groups as u32, 0, 0]);
        let bind_group = self.bind_group(&self.reduce, &[&chunk.buffer, &partials, &params]);

        let mut encoder = self.encoder("corpusbench-reduce");
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("corpusbench-reduce"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.reduce);
            pass.set_bind_group(0, &bind_group, &[]);
            let (x, y) = self.grid(groups);
            pass.dispatch_workgroups(x, y, 1);
        }

        let count = chunk.len;
        Ok(self.readback(
            "reduce",
            encoder,
            &partials,
            0,
            partial_bytes as u64,
            move |words| fold_partials(count, words),
        ))
    }

    fn median(&self, array: &DeviceArray<u64>) -> DeviceResult<Pending<Option<f64>>> {
        let chunk = match self.single_chunk("median", array)? {
            Some(chunk) if chunk.len > 0 => chunk,
            _ => {
                let (tx, rx) = mpsc::channel();
                let _ = tx.send(None);
                return Ok(Pending::new("median", rx));
            }
        };

        let len = chunk.len;
        let count = len.next_power_of_two();
        let sorted = self.scratch_buffer(
            "corpusbench-sorted",
            count * 4,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        );
        if count > len {
            self.queue
                .write_buffer(&sorted, (len * 4) as u64, &vec![0xff; (count - len) * 4]);
        }

        let mut encoder = self.encoder("corpusbench-median");
        encoder.copy_buffer_to_buffer(&chunk.buffer, 0, &sorted, 0, (len * 4) as u64);

        let (x, y) = self.grid(groups_for(count));
        let row_stride = x * WORKGROUP as u32;
        let mut stages = Vec::new();
        let mut k = 2;
        while k <= count {
            let mut j = k / 2;
            while j > 0 {
                let params = self.uniform([j as u32, k as u32, row_stride, count as u32]);
                stages.push(self.bind_group(&self.bitonic, &[&sorted, &params]));
                j /= 2;
            }
            k *= 2;
        }
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("corpusbench-bitonic"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.bitonic);
            for stage in &stages {
                pass.set_bind_group(0, stage, &[]);
                pass.dispatch_workgroups(x, y, 1);
            }
        }

        let mid = len / 2;
        let (offset, odd) = if len % 2 == 1 {
            (mid * 4, true)
        } else {
            ((mid - 1) * 4, false)
        };
        let size = if odd { 4 } else { 8 };
        Ok(self.readback(
            "median",
            encoder,
            &sorted,
            offset as u64,
            size,
            move |words| match (odd, words) {
                (true, [v, ..]) => Some(f64::from(*v)),
                (false, [a, b, ..]) => Some((f64::from(*a) + f64::from(*b)) / 2.0),
                _ => None,
            },
        ))
    }

    fn unique_counts(&self, array: &DeviceArray<u8>) -> DeviceResult<Pending<Vec<(u8, u64)>>> {
        let storage = array.storage::<GpuStorage>("unique_counts")?;
        let counts = self.scratch_buffer(
            "corpusbench-counts",
            256 * 4,
            wgpu::BufferUsages::STORAGE,
        );
        let totals = self.scratch_buffer(
            "corpusbench-totals",
            256 * 8,
            wgpu::BufferUsages::STORAGE,
        );
        let compact = self.scratch_buffer(
            "corpusbench-compact",
            COMPACT_WORDS * 4,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );

        let fold_group = self.bind_group(&self.fold, &[&counts, &totals]);
        let compact_group = self.bind_group(&self.compact, &[&totals, &compact]);
        let chunk_groups = storage
            .chunks
            .iter()
            .map(|chunk| {
                let (x, y) = self.grid(groups_for(padded_len(chunk.len) / 4));
                let row_stride = x * WORKGROUP as u32;
                let params = self.uniform([chunk.len as u32, row_stride, 0, 0]);
                let group = self.bind_group(&self.histogram, &[&chunk.buffer, &counts, &params]);
                (group, x, y)
            })
            .collect::<Vec<_>>();

        let mut encoder = self.encoder("corpusbench-unique-counts");
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("corpusbench-unique-counts"),
                timestamp_writes: None,
            });
            for (group, x, y) in &chunk_groups {
                pass.set_pipeline(&self.histogram);
                pass.set_bind_group(0, group, &[]);
                pass.dispatch_workgroups(*x, *y, 1);
                pass.set_pipeline(&self.fold);
                pass.set_bind_group(0, &fold_group, &[]);
                pass.dispatch_workgroups(1, 1, 1);
            }
            pass.set_pipeline(&self.compact);
            pass.set_bind_group(0, &compact_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }

        Ok(self.readback(
            "unique_counts",
            encoder,
            &compact,
            0,
            (COMPACT_WORDS * 4) as u64,
            decode_compact,
        ))
    }

    fn synchronize(&self) -> DeviceResult<()> {
        self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }
}
