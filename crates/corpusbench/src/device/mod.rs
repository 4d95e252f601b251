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

//! Device acceleration runtime.
//!
//! The accelerated statistics paths talk to a [`Device`]: arrays are
//! transferred into device-owned memory, kernels are *launched* and
//! complete asynchronously, and results can only be read after
//! [`Device::synchronize`] returns. Reading a [`Pending`] result before the
//! device has been synchronized yields [`DeviceError::NotSynchronized`], so a
//! timer stopped after a successful read always covers completed work.
//!
//! Whether a device exists is decided exactly once, by
//! [`DeviceCapability::probe`], and the resulting value is handed to the
//! harness explicitly.
//!
//! # Modules
//!
//! - `gpu`: [`GpuDevice`], WGSL compute kernels on a `wgpu` adapter
//! - `host`: [`HostParallelDevice`], a rayon-pool reference device used to
//!   exercise the device paths on machines without a GPU

pub mod gpu;
pub mod host;

pub use gpu::GpuDevice;
pub use host::HostParallelDevice;

use crate::BenchError;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Result type for device operations
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Errors raised by a device runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The runtime could not be initialised.
    #[error("failed to initialise device: {0}")]
    Init(String),

    /// A transfer would exceed the device memory budget.
    #[error("out of device memory: requested {requested} bytes, {available} bytes available")]
    OutOfMemory {
        /// Bytes requested by the transfer
        requested: usize,
        /// Bytes still free on the device
        available: usize,
    },

    /// A kernel aborted before producing its result.
    #[error("kernel '{kernel}' failed: {message}")]
    Launch {
        /// Kernel name
        kernel: &'static str,
        /// Failure description
        message: String,
    },

    /// A result was read before the device was synchronized.
    #[error("result read before the device was synchronized")]
    NotSynchronized,
}

type ReleaseHook = Box<dyn FnOnce(usize) + Send + Sync>;

/// An array living in device memory.
///
/// The backing storage is owned by the device that created the array; other
/// devices reject it. Dropping the array releases its device memory.
pub struct DeviceArray<T> {
    len: usize,
    size_bytes: usize,
    storage: Box<dyn Any + Send + Sync>,
    release: Option<ReleaseHook>,
    _element: PhantomData<fn() -> T>,
}

impl<T> DeviceArray<T> {
    /// Wraps device-owned storage holding `len` elements in `size_bytes`
    /// bytes. `release` is invoked with the byte size when the array is
    /// dropped.
    pub fn new<S: Any + Send + Sync>(
        len: usize,
        size_bytes: usize,
        storage: S,
        release: Option<ReleaseHook>,
    ) -> Self {
        Self {
            len,
            size_bytes,
            storage: Box::new(storage),
            release,
            _element: PhantomData,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the array in device memory, in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// The backend storage, when this array was created by a backend that
    /// stores `S`.
    pub(crate) fn storage<S: Any>(&self, kernel: &'static str) -> DeviceResult<&S> {
        self.storage
            .downcast_ref::<S>()
            .ok_or_else(|| DeviceError::Launch {
                kernel,
                message: "array was uploaded to a different device".to_string(),
            })
    }
}

impl<T> Drop for DeviceArray<T> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.size_bytes);
        }
    }
}

impl<T> fmt::Debug for DeviceArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceArray")
            .field("len", &self.len)
            .field("bytes", &self.size_bytes)
            .finish()
    }
}

type Decode<T> = Box<dyn FnOnce() -> DeviceResult<T> + Send>;

enum Completion<T> {
    /// The kernel sends its result when it finishes.
    Value(Receiver<T>),
    /// A readback buffer signals when it is mapped; `decode` then copies the
    /// result out of it.
    Mapped {
        status: Receiver<Result<(), String>>,
        decode: Decode<T>,
    },
}

/// The result of a launched kernel, readable once the device is synchronized.
pub struct Pending<T> {
    kernel: &'static str,
    completion: Completion<T>,
}

impl<T> Pending<T> {
    /// Creates a pending result fed by a kernel's completion channel.
    pub fn new(kernel: &'static str, rx: Receiver<T>) -> Self {
        Self {
            kernel,
            completion: Completion::Value(rx),
        }
    }

    /// Creates a pending result backed by a mapped readback buffer.
    ///
    /// `status` receives the outcome of the map request; `decode` runs on
    /// the reading thread once the mapping succeeded.
    pub fn mapped(
        kernel: &'static str,
        status: Receiver<Result<(), String>>,
        decode: impl FnOnce() -> DeviceResult<T> + Send + 'static,
    ) -> Self {
        Self {
            kernel,
            completion: Completion::Mapped {
                status,
                decode: Box::new(decode),
            },
        }
    }

    /// Reads the result.
    ///
    /// # Errors
    ///
    /// [`DeviceError::NotSynchronized`] if the kernel has not completed yet,
    /// [`DeviceError::Launch`] if it aborted.
    pub fn read(self) -> DeviceResult<T> {
        let kernel = self.kernel;
        let aborted = |message: String| DeviceError::Launch { kernel, message };
        match self.completion {
            Completion::Value(rx) => match rx.try_recv() {
                Ok(value) => Ok(value),
                Err(TryRecvError::Empty) => Err(DeviceError::NotSynchronized),
                Err(TryRecvError::Disconnected) => Err(aborted(
                    "kernel aborted before producing a result".to_string(),
                )),
            },
            Completion::Mapped { status, decode } => match status.try_recv() {
                Ok(Ok(())) => decode(),
                Ok(Err(message)) => Err(aborted(message)),
                Err(TryRecvError::Empty) => Err(DeviceError::NotSynchronized),
                Err(TryRecvError::Disconnected) => {
                    Err(aborted("readback was never mapped".to_string()))
                }
            },
        }
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("kernel", &self.kernel)
            .finish()
    }
}

/// Fused reduction over a length array: sum, sum of squares, min and max.
///
/// Sums are exact integers, so mean and standard deviation are derived
/// without floating-point accumulation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reduction {
    /// Number of elements reduced.
    pub count: u64,
    /// Sum of all elements.
    pub sum: u64,
    /// Sum of squared elements.
    pub sum_sq: u128,
    /// Smallest element.
    pub min: Option<u64>,
    /// Largest element.
    pub max: Option<u64>,
}

impl Reduction {
    /// Reduction of a single element.
    pub fn of(value: u64) -> Self {
        Self {
            count: 1,
            sum: value,
            sum_sq: u128::from(value) * u128::from(value),
            min: Some(value),
            max: Some(value),
        }
    }

    /// Combines two partial reductions.
    pub fn merge(self, other: Self) -> Self {
        Self {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            sum_sq: self.sum_sq + other.sum_sq,
            min: match (self.min, other.min) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
            max: self.max.max(other.max),
        }
    }

    /// Arithmetic mean. NaN when empty.
    pub fn mean(&self) -> f64 {
        self.sum as f64 / self.count as f64
    }

    /// Population standard deviation. NaN when empty.
    pub fn std(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        let n = u128::from(self.count);
        let sum = u128::from(self.sum);
        // n * sum_sq >= sum^2 by Cauchy-Schwarz, exact in u128
        let spread = n * self.sum_sq - sum * sum;
        (spread as f64 / (n * n) as f64).sqrt()
    }
}

/// A device-acceleration runtime.
///
/// Launch methods enqueue work and return immediately. Callers must call
/// [`Device::synchronize`] before reading any [`Pending`] result.
pub trait Device: Send + Sync {
    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Transfers a length vector to device memory.
    fn upload_u64(&self, host: &[u64]) -> DeviceResult<DeviceArray<u64>>;

    /// Transfers a byte stream to device memory.
    fn upload_bytes(&self, host: &[u8]) -> DeviceResult<DeviceArray<u8>>;

    /// Sum, sum of squares, min and max in one launch. Mean and standard
    /// deviation derive from it.
    fn reduce(&self, array: &DeviceArray<u64>) -> DeviceResult<Pending<Reduction>>;

    /// Median, averaging the middle pair for even lengths.
    fn median(&self, array: &DeviceArray<u64>) -> DeviceResult<Pending<Option<f64>>>;

    /// Distinct byte values in ascending order with their counts. The
    /// histogram is compacted on the device, and only the compact pairs are
    /// copied back.
    fn unique_counts(&self, array: &DeviceArray<u8>) -> DeviceResult<Pending<Vec<(u8, u64)>>>;

    /// Blocks until every launched kernel has completed.
    fn synchronize(&self) -> DeviceResult<()>;
}

/// How the capability probe should treat the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceMode {
    /// Use a GPU when the probe finds one.
    #[default]
    Auto,
    /// Never use the device.
    Off,
}

/// Process-wide device capability, resolved once before the corpus is loaded.
#[derive(Clone)]
pub struct DeviceCapability {
    device: Option<Arc<dyn Device>>,
    reason: Option<String>,
}

impl DeviceCapability {
    /// Probes for a GPU adapter.
    ///
    /// The capability is unavailable when acceleration is switched off, when
    /// no hardware adapter with compute support exists, or when the adapter
    /// fails to initialise.
    pub fn probe(mode: DeviceMode) -> Self {
        if mode == DeviceMode::Off {
            info!("device acceleration disabled by configuration");
            return Self::unavailable("disabled by configuration");
        }

        match GpuDevice::new() {
            Ok(device) => {
                info!(device = device.name(), "device acceleration enabled");
                Self::with_device(device)
            }
            Err(e) => {
                warn!(error = %e, "no usable GPU, GPU computations will be skipped");
                Self::unavailable(e.to_string())
            }
        }
    }

    /// A capability with no device.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            device: None,
            reason: Some(reason.into()),
        }
    }

    /// A capability backed by the given device.
    pub fn with_device(device: impl Device + 'static) -> Self {
        Self {
            device: Some(Arc::new(device)),
            reason: None,
        }
    }

    /// Returns true if device paths should run.
    pub fn is_available(&self) -> bool {
        self.device.is_some()
    }

    /// The device, when available.
    pub fn device(&self) -> Option<&dyn Device> {
        self.device.as_deref()
    }

    /// The device, or [`BenchError::DeviceUnavailable`] with the probe's reason.
    pub fn require(&self) -> crate::Result<&dyn Device> {
        self.device().ok_or_else(|| BenchError::DeviceUnavailable {
            reason: self.reason().unwrap_or("no device").to_string(),
        })
    }

    /// Why the device is unavailable.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// One-line description for reports.
    pub fn describe(&self) -> String {
        match (&self.device, &self.reason) {
            (Some(device), _) => format!("enabled ({})", device.name()),
            (None, Some(reason)) => format!("unavailable ({})", reason),
            (None, None) => "unavailable".to_string(),
        }
    }
}

impl fmt::Debug for DeviceCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCapability")
            .field("available", &self.is_available())
            .field("reason", &self.reason)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_pending_before_completion() {
        let (tx, rx) = mpsc::channel::<u64>();
        let pending = Pending::new("reduce", rx);
        assert_eq!(pending.read(), Err(DeviceError::NotSynchronized));
        drop(tx);
    }

    #[test]
    fn test_pending_aborted_kernel() {
        let (tx, rx) = mpsc::channel::<u64>();
        drop(tx);
        let err = Pending::new("median", rx).read().unwrap_err();
        assert!(matches!(err, DeviceError::Launch { kernel: "median", .. }));
    }

    #[test]
    fn test_pending_ready() {
        let (tx, rx) = mpsc::channel();
        tx.send(42u64).unwrap();
        assert_eq!(Pending::new("reduce", rx).read(), Ok(42));
    }

    #[test]
    fn test_mapped_pending_waits_for_map() {
        let (tx, rx) = mpsc::channel();
        let pending = Pending::mapped("unique_counts", rx, || Ok(7u64));
        assert_eq!(pending.read(), Err(DeviceError::NotSynchronized));
        drop(tx);
    }

    #[test]
    fn test_mapped_pending_decodes_after_map() {
        let (tx, rx) = mpsc::channel();
        tx.send(Ok(())).unwrap();
        assert_eq!(Pending::mapped("median", rx, || Ok(7u64)).read(), Ok(7));
    }

    #[test]
    fn test_mapped_pending_map_failure() {
        let (tx, rx) = mpsc::channel();
        tx.send(Err("device lost".to_string())).unwrap();
        let err = Pending::mapped("reduce", rx, || Ok(0u64)).read().unwrap_err();
        assert_eq!(
            err,
            DeviceError::Launch {
                kernel: "reduce",
                message: "device lost".to_string()
            }
        );
    }

    #[test]
    fn test_reduction_merge() {
        let reduction = [2u64, 4, 4, 4, 5, 5, 7, 9]
            .iter()
            .map(|&v| Reduction::of(v))
            .fold(Reduction::default(), Reduction::merge);
        assert_eq!(reduction.count, 8);
        assert_eq!(reduction.sum, 40);
        assert_eq!(reduction.min, Some(2));
        assert_eq!(reduction.max, Some(9));
        assert_eq!(reduction.mean(), 5.0);
        assert_eq!(reduction.std(), 2.0);
    }

    #[test]
    fn test_empty_reduction() {
        let reduction = Reduction::default();
        assert!(reduction.mean().is_nan());
        assert!(reduction.std().is_nan());
        assert_eq!(reduction.min, None);
    }

    #[test]
    fn test_probe_off() {
        let capability = DeviceCapability::probe(DeviceMode::Off);
        assert!(!capability.is_available());
        assert!(capability.device().is_none());
        assert_eq!(capability.reason(), Some("disabled by configuration"));
        assert!(matches!(
            capability.require(),
            Err(BenchError::DeviceUnavailable { .. })
        ));
    }

    #[test]
    fn test_auto_mode_never_selects_host_device() {
        let capability = DeviceCapability::probe(DeviceMode::Auto);
        match capability.device() {
            Some(device) => assert!(!device.name().starts_with("host-parallel")),
            None => {
                let reason = capability.reason().unwrap();
                assert!(!reason.is_empty());
                assert!(capability.describe().starts_with("unavailable"));
            }
        }
    }

    #[test]
    fn test_explicit_device_is_available() {
        let capability = DeviceCapability::with_device(HostParallelDevice::new(2).unwrap());
        assert!(capability.is_available());
        assert!(capability.describe().starts_with("enabled (host-parallel"));
        assert!(capability.require().is_ok());
    }

    #[test]
    fn test_device_array_release() {
        let released = Arc::new(parking_lot::Mutex::new(0usize));
        let sink = Arc::clone(&released);
        let array = DeviceArray::<u64>::new(
            3,
            24,
            vec![1u64, 2, 3],
            Some(Box::new(move |bytes| *sink.lock() += bytes)),
        );
        assert_eq!(array.size_bytes(), 24);
        drop(array);
        assert_eq!(*released.lock(), 24);
    }

    #[test]
    fn test_foreign_storage_rejected() {
        let array = DeviceArray::<u64>::new(1, 8, vec![1u64], None);
        assert!(array.storage::<Vec<u64>>("reduce").is_ok());
        let err = array.storage::<String>("reduce").unwrap_err();
        assert!(matches!(err, DeviceError::Launch { kernel: "reduce", .. }));
    }
}
