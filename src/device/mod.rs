//! Accelerator runtime.
//!
//! The accelerator is a separate compute device with its own memory and its
//! own execution queue. Memory is handed out as [`DeviceBuffer`]s, moved
//! across the host boundary only through explicit `upload`/`download` copies,
//! and operated on by the linear-algebra kernels in [`kernels`].
//!
//! The queue is a dedicated `rayon` pool. Every kernel is `install`-ed on it
//! and waited for, so from the caller's side each device call is synchronous.
//!
//! The device is process-wide. It starts lazily with a default
//! [`DeviceConfig`] on first use, or explicitly through [`configure`].

use std::mem::size_of;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Result;

mod buffer;
pub mod kernels;
mod status;

pub use buffer::DeviceBuffer;
pub use status::Status;

static DEVICE: OnceLock<Device> = OnceLock::new();

/// Start-up parameters for the accelerator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Worker threads of the execution queue; `None` lets rayon decide.
    #[serde(default)]
    pub threads: Option<usize>,
    /// Upper bound on device memory in bytes; `None` means unbounded.
    #[serde(default)]
    pub memory_limit: Option<usize>,
}

/// The accelerator context: execution queue plus memory accounting.
pub struct Device {
    queue: ThreadPool,
    limit: Option<usize>,
    allocated: AtomicUsize,
}

impl Device {
    fn start(config: &DeviceConfig) -> Result<Self> {
        let queue = ThreadPoolBuilder::new()
            .num_threads(config.threads.unwrap_or(0))
            .thread_name(|i| format!("dualnet-device-{i}"))
            .build()
            .map_err(|e| Status::NotInitialized.error(e))?;

        debug!(
            "device started: threads={} memory_limit={:?}",
            queue.current_num_threads(),
            config.memory_limit
        );

        Ok(Self {
            queue,
            limit: config.memory_limit,
            allocated: AtomicUsize::new(0),
        })
    }

    /// Bytes currently held by live buffers.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    /// Configured memory limit in bytes, if any.
    pub fn memory_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Number of threads serving the execution queue.
    pub fn threads(&self) -> usize {
        self.queue.current_num_threads()
    }

    fn reserve(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(Status::InvalidValue.error("zero-length allocation"));
        }

        let bytes = len * size_of::<f32>();
        let before = self.allocated.fetch_add(bytes, Ordering::AcqRel);

        if let Some(limit) = self.limit {
            if before + bytes > limit {
                self.allocated.fetch_sub(bytes, Ordering::AcqRel);
                return Err(Status::AllocFailed.error(format!(
                    "requested {bytes} bytes with {before} of {limit} in use"
                )));
            }
        }

        Ok(())
    }

    fn release(&self, len: usize) {
        self.allocated
            .fetch_sub(len * size_of::<f32>(), Ordering::AcqRel);
    }

    /// Runs `job` on the execution queue and waits for it.
    ///
    /// A panicking kernel is reported as `ExecutionFailed`.
    fn launch<R, F>(&self, name: &'static str, job: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        panic::catch_unwind(AssertUnwindSafe(|| self.queue.install(job)))
            .map_err(|_| Status::ExecutionFailed.error(format!("kernel `{name}` aborted")))
    }
}

/// Starts the device with an explicit configuration.
///
/// Fails if the device is already running.
pub fn configure(config: DeviceConfig) -> Result<&'static Device> {
    if DEVICE.get().is_some() {
        return Err(Status::InvalidValue.error("device already started"));
    }

    install(&DEVICE, Device::start(&config)?)
}

/// Stores `device` in `slot`, failing if another device got there first.
fn install(slot: &OnceLock<Device>, device: Device) -> Result<&Device> {
    let mut installed = false;
    let stored = slot.get_or_init(|| {
        installed = true;
        device
    });
    if !installed {
        return Err(Status::InvalidValue.error("device started concurrently"));
    }
    Ok(stored)
}

/// Returns the process-wide device, starting it with defaults if needed.
pub fn get() -> Result<&'static Device> {
    if let Some(device) = DEVICE.get() {
        return Ok(device);
    }

    let device = Device::start(&DeviceConfig::default())?;
    Ok(DEVICE.get_or_init(|| device))
}
