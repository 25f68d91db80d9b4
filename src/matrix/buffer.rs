//! Dual-location matrix with lazy synchronization.
//!
//! A [`Matrix`] is one logical `f32` buffer with up to two physical copies:
//! a host `Vec<f32>` and a buffer in accelerator memory. Each copy is tracked
//! as [`CopyState::Absent`], [`CopyState::Clean`] or [`CopyState::Stale`].
//! At least one copy is always clean and at most one is stale.
//!
//! Callers never move data by hand. Before reading a copy they assert its
//! location with [`Matrix::assert_location`], which transfers only when that
//! copy is absent or stale.

use crate::backend::{Accelerator, BufferId, Kernel, KernelOutput, Stream};
use crate::core::error::{RuntimeError, RuntimeResult};
use crate::core::types::{Location, Point2, Shape};
use log::trace;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Compute Context
// ============================================================================

/// An accelerator paired with the stream its work is issued on.
///
/// Shared by every matrix created through one `ImageUtil`.
#[derive(Debug)]
pub struct ComputeContext {
    accelerator: Arc<dyn Accelerator>,
    stream: Stream,
}

impl ComputeContext {
    /// Bind a fresh stream on `accelerator`.
    pub fn new(accelerator: Arc<dyn Accelerator>) -> Self {
        let stream = Stream::new(accelerator.device_id());
        Self {
            accelerator,
            stream,
        }
    }

    /// The bound accelerator.
    pub fn accelerator(&self) -> &dyn Accelerator {
        self.accelerator.as_ref()
    }

    /// The stream work is issued on.
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Device id of the bound accelerator.
    pub fn device_id(&self) -> u32 {
        self.accelerator.device_id()
    }

    /// Issue a kernel on this context's stream.
    pub fn launch(&self, kernel: &Kernel) -> RuntimeResult<KernelOutput> {
        self.accelerator.launch(&self.stream, kernel)
    }

    /// Wait for all outstanding work on the stream.
    pub fn synchronize(&self) -> RuntimeResult<()> {
        self.accelerator.synchronize(&self.stream)
    }
}

// ============================================================================
// Copy Tracking
// ============================================================================

/// State of one physical copy of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    /// No storage at this location
    Absent,
    /// Storage holds the current contents
    Clean,
    /// Storage exists but the other copy has been written since
    Stale,
}

impl CopyState {
    /// True when the copy can be read without a transfer.
    pub fn is_clean(self) -> bool {
        self == CopyState::Clean
    }
}

#[derive(Debug)]
struct Copies {
    host: Option<Vec<f32>>,
    host_state: CopyState,
    device: Option<BufferId>,
    device_state: CopyState,
    transfers: usize,
}

fn alloc_host(len: usize) -> RuntimeResult<Vec<f32>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| RuntimeError::AllocationFailure {
            location: Location::Host,
            bytes: len * std::mem::size_of::<f32>(),
        })?;
    data.resize(len, 0.0);
    Ok(data)
}

// ============================================================================
// Matrix
// ============================================================================

/// A 2-D `f32` buffer that can live on the host, the accelerator, or both.
pub struct Matrix {
    shape: Shape,
    context: Arc<ComputeContext>,
    copies: Mutex<Copies>,
}

impl Matrix {
    /// Zero-filled matrix whose authoritative copy is on the host.
    pub fn new_host(context: Arc<ComputeContext>, shape: Shape) -> RuntimeResult<Self> {
        let data = alloc_host(shape.len())?;
        Ok(Self::host_backed(context, shape, data))
    }

    /// Take ownership of `data` as the host copy.
    pub fn from_vec(context: Arc<ComputeContext>, shape: Shape, data: Vec<f32>) -> RuntimeResult<Self> {
        if data.len() != shape.len() {
            return Err(RuntimeError::DataLength {
                shape,
                got: data.len(),
            });
        }
        Ok(Self::host_backed(context, shape, data))
    }

    /// Copy `data` into a new host-backed matrix.
    pub fn from_slice(context: Arc<ComputeContext>, shape: Shape, data: &[f32]) -> RuntimeResult<Self> {
        if data.len() != shape.len() {
            return Err(RuntimeError::DataLength {
                shape,
                got: data.len(),
            });
        }
        let mut host = Vec::new();
        host.try_reserve_exact(data.len())
            .map_err(|_| RuntimeError::AllocationFailure {
                location: Location::Host,
                bytes: shape.byte_len(),
            })?;
        host.extend_from_slice(data);
        Ok(Self::host_backed(context, shape, host))
    }

    /// Zero-filled matrix whose authoritative copy is on the accelerator.
    pub fn new_device(context: Arc<ComputeContext>, shape: Shape) -> RuntimeResult<Self> {
        let buffer = context.accelerator().allocate(shape.len())?;
        Ok(Self {
            shape,
            context,
            copies: Mutex::new(Copies {
                host: None,
                host_state: CopyState::Absent,
                device: Some(buffer),
                device_state: CopyState::Clean,
                transfers: 0,
            }),
        })
    }

    fn host_backed(context: Arc<ComputeContext>, shape: Shape, data: Vec<f32>) -> Self {
        Self {
            shape,
            context,
            copies: Mutex::new(Copies {
                host: Some(data),
                host_state: CopyState::Clean,
                device: None,
                device_state: CopyState::Absent,
                transfers: 0,
            }),
        }
    }

    /// Matrix extents.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    /// Never true for a constructed matrix.
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// Context this matrix allocates and launches through.
    pub fn context(&self) -> &Arc<ComputeContext> {
        &self.context
    }

    /// State of the copy at `location`.
    pub fn state(&self, location: Location) -> CopyState {
        let copies = self.copies.lock();
        match location {
            Location::Host => copies.host_state,
            Location::Device => copies.device_state,
        }
    }

    /// Number of host/device transfers performed so far.
    pub fn transfer_count(&self) -> usize {
        self.copies.lock().transfers
    }

    /// Make the copy at `location` present and current.
    ///
    /// Transfers only when that copy is absent or stale. Asserting
    /// [`Location::Host`] also synchronizes the stream, so host reads observe
    /// every kernel issued before them.
    pub fn assert_location(&self, location: Location) -> RuntimeResult<()> {
        let mut copies = self.copies.lock();
        match location {
            Location::Host => self.sync_host(&mut copies),
            Location::Device => self.sync_device(&mut copies).map(|_| ()),
        }
    }

    fn sync_host(&self, copies: &mut Copies) -> RuntimeResult<()> {
        self.context.synchronize()?;
        if copies.host_state.is_clean() {
            return Ok(());
        }
        let buffer = match (copies.device, copies.device_state) {
            (Some(buffer), CopyState::Clean) => buffer,
            _ => {
                return Err(RuntimeError::TransferFailure {
                    from: Location::Device,
                    to: Location::Host,
                    reason: "no current device copy".to_string(),
                })
            }
        };
        let mut host = match copies.host.take() {
            Some(host) => host,
            None => alloc_host(self.shape.len())?,
        };
        let result = self
            .context
            .accelerator()
            .download(self.context.stream(), buffer, &mut host);
        copies.host = Some(host);
        match result {
            Ok(()) => {
                copies.host_state = CopyState::Clean;
                copies.transfers += 1;
                trace!("{}: device -> host ({} bytes)", self.shape, self.shape.byte_len());
                Ok(())
            }
            Err(e) => {
                copies.host_state = CopyState::Stale;
                Err(e)
            }
        }
    }

    fn sync_device(&self, copies: &mut Copies) -> RuntimeResult<BufferId> {
        if let (Some(buffer), CopyState::Clean) = (copies.device, copies.device_state) {
            return Ok(buffer);
        }
        let host = match (&copies.host, copies.host_state) {
            (Some(host), CopyState::Clean) => host,
            _ => {
                return Err(RuntimeError::TransferFailure {
                    from: Location::Host,
                    to: Location::Device,
                    reason: "no current host copy".to_string(),
                })
            }
        };
        let accelerator = self.context.accelerator();
        let buffer = match copies.device {
            Some(buffer) => buffer,
            None => accelerator.allocate(self.shape.len())?,
        };
        let result = accelerator.upload(self.context.stream(), buffer, host);
        copies.device = Some(buffer);
        match result {
            Ok(()) => {
                copies.device_state = CopyState::Clean;
                copies.transfers += 1;
                trace!("{}: host -> device ({} bytes)", self.shape, self.shape.byte_len());
                Ok(buffer)
            }
            Err(e) => {
                copies.device_state = CopyState::Stale;
                Err(e)
            }
        }
    }

    /// Device buffer holding the current contents, uploading if needed.
    pub fn device_buffer(&self) -> RuntimeResult<BufferId> {
        let mut copies = self.copies.lock();
        self.sync_device(&mut copies)
    }

    /// Record that a kernel has written the device copy.
    pub(crate) fn mark_device_written(&self) {
        let mut copies = self.copies.lock();
        copies.device_state = CopyState::Clean;
        if copies.host.is_some() {
            copies.host_state = CopyState::Stale;
        }
    }

    /// Read the host copy, downloading first if needed.
    pub fn with_host<R>(&self, f: impl FnOnce(&[f32]) -> R) -> RuntimeResult<R> {
        let mut copies = self.copies.lock();
        self.sync_host(&mut copies)?;
        let host = copies.host.as_deref().unwrap_or_default();
        Ok(f(host))
    }

    /// Write through the host copy. The device copy becomes stale.
    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut [f32]) -> R) -> RuntimeResult<R> {
        let mut copies = self.copies.lock();
        self.sync_host(&mut copies)?;
        let result = f(copies.host.as_deref_mut().unwrap_or_default());
        if copies.device.is_some() {
            copies.device_state = CopyState::Stale;
        }
        Ok(result)
    }

    /// Copy the contents out to a new vector.
    pub fn to_vec(&self) -> RuntimeResult<Vec<f32>> {
        self.with_host(<[f32]>::to_vec)
    }

    /// Value at `point`, or `None` outside the extents.
    pub fn get(&self, point: Point2) -> RuntimeResult<Option<f32>> {
        match self.shape.offset(point) {
            Some(offset) => self.with_host(|data| Some(data[offset])),
            None => Ok(None),
        }
    }

    /// Independent copy on the same context, host-resident.
    pub fn try_clone(&self) -> RuntimeResult<Self> {
        let data = self.to_vec()?;
        Self::from_vec(Arc::clone(&self.context), self.shape, data)
    }
}

impl Drop for Matrix {
    fn drop(&mut self) {
        if let Some(buffer) = self.copies.get_mut().device.take() {
            self.context.accelerator().release(buffer);
        }
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let copies = self.copies.lock();
        f.debug_struct("Matrix")
            .field("shape", &self.shape)
            .field("host", &copies.host_state)
            .field("device", &copies.device_state)
            .field("transfers", &copies.transfers)
            .finish()
    }
}
