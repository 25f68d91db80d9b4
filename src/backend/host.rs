//! In-process accelerator.
//!
//! Device buffers live in a registry separate from any host copy, so a
//! matrix still has to transfer explicitly between the two locations. Kernels
//! execute synchronously on the calling thread (fanning out to rayon for
//! large outputs), which trivially preserves per-stream ordering.

use crate::backend::{kernels, Accelerator, BufferId, Kernel, KernelOutput, Stream};
use crate::core::config::RuntimeConfig;
use crate::core::error::{RuntimeError, RuntimeResult};
use crate::core::types::{Location, Shape};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use slab::Slab;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Accelerator backed by host memory and the rayon pool.
#[derive(Debug)]
pub struct HostAccelerator {
    device_id: u32,
    buffers: Mutex<Slab<Vec<f32>>>,
    bytes_in_use: AtomicUsize,
    memory_limit: Option<usize>,
    parallel_threshold: usize,
}

impl HostAccelerator {
    /// Create an unbounded accelerator for `device_id`.
    pub fn new(device_id: u32) -> Self {
        Self::from_config(&RuntimeConfig::new().with_device(device_id))
    }

    /// Create an accelerator from configuration.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            device_id: config.device_id,
            buffers: Mutex::new(Slab::new()),
            bytes_in_use: AtomicUsize::new(0),
            memory_limit: config.device_memory_limit,
            parallel_threshold: config.parallel_threshold.max(1),
        }
    }

    /// Number of live device buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.lock().len()
    }

    fn execute(&self, kernel: &Kernel) -> RuntimeResult<KernelOutput> {
        let name = kernel.name();
        let threshold = self.parallel_threshold;
        let mut buffers = self.buffers.lock();
        match *kernel {
            Kernel::Add { a, b, out } | Kernel::Subtract { a, b, out } => {
                let subtract = matches!(kernel, Kernel::Subtract { .. });
                with_output(&mut buffers, out, |buffers, dst| {
                    let a = read(buffers, a, name, dst.len())?;
                    let b = read(buffers, b, name, dst.len())?;
                    if subtract {
                        kernels::zip_with(a, b, dst, threshold, |x, y| x - y);
                    } else {
                        kernels::zip_with(a, b, dst, threshold, |x, y| x + y);
                    }
                    Ok(KernelOutput::Done)
                })
            }
            Kernel::Scale { src, scalar, out } => with_output(&mut buffers, out, |buffers, dst| {
                let src = read(buffers, src, name, dst.len())?;
                kernels::scale(src, scalar, dst, threshold);
                Ok(KernelOutput::Done)
            }),
            Kernel::Convolve {
                src,
                shape,
                kernel,
                kernel_shape,
                out,
            } => with_output(&mut buffers, out, |buffers, dst| {
                expect_len(name, dst.len(), shape)?;
                let src = read(buffers, src, name, shape.len())?;
                let weights = read(buffers, kernel, name, kernel_shape.len())?;
                kernels::convolve(src, shape, weights, kernel_shape, dst, threshold);
                Ok(KernelOutput::Done)
            }),
            Kernel::Resample {
                src,
                shape,
                out,
                out_shape,
                filter,
            } => with_output(&mut buffers, out, |buffers, dst| {
                expect_len(name, dst.len(), out_shape)?;
                let src = read(buffers, src, name, shape.len())?;
                kernels::resample(src, shape, dst, out_shape, filter, threshold);
                Ok(KernelOutput::Done)
            }),
            Kernel::ReduceMax {
                src,
                shape,
                axis,
                out,
            } => with_output(&mut buffers, out, |buffers, dst| {
                expect_len(name, dst.len(), axis.output_shape(shape))?;
                let src = read(buffers, src, name, shape.len())?;
                Ok(KernelOutput::Indices(kernels::reduce_max(src, shape, axis, dst)))
            }),
            Kernel::Gradients {
                src,
                shape,
                magnitude,
                angle,
            } => {
                let mut mag = magnitude.map(|id| take(&mut buffers, id)).transpose()?;
                let mut ang = match angle.map(|id| take(&mut buffers, id)).transpose() {
                    Ok(ang) => ang,
                    Err(e) => {
                        restore(&mut buffers, magnitude, mag);
                        return Err(e);
                    }
                };
                let result = (|| -> RuntimeResult<KernelOutput> {
                    for dst in mag.iter().chain(ang.iter()) {
                        expect_len(name, dst.len(), shape)?;
                    }
                    let src = read(&buffers, src, name, shape.len())?;
                    kernels::gradients(
                        src,
                        shape,
                        mag.as_deref_mut(),
                        ang.as_deref_mut(),
                        threshold,
                    );
                    Ok(KernelOutput::Done)
                })();
                // Reverse order, so aliasing outputs keep the first copy.
                restore(&mut buffers, angle, ang);
                restore(&mut buffers, magnitude, mag);
                result
            }
        }
    }
}

fn take(buffers: &mut Slab<Vec<f32>>, id: BufferId) -> RuntimeResult<Vec<f32>> {
    buffers
        .get_mut(id.0)
        .map(std::mem::take)
        .ok_or(RuntimeError::InvalidBuffer(id.0))
}

fn restore(buffers: &mut Slab<Vec<f32>>, id: Option<BufferId>, data: Option<Vec<f32>>) {
    if let (Some(id), Some(data)) = (id, data) {
        buffers[id.0] = data;
    }
}

/// Run `f` with the output buffer moved out of the registry, so inputs can
/// be borrowed alongside it.
fn with_output<F>(buffers: &mut Slab<Vec<f32>>, out: BufferId, f: F) -> RuntimeResult<KernelOutput>
where
    F: FnOnce(&Slab<Vec<f32>>, &mut [f32]) -> RuntimeResult<KernelOutput>,
{
    let mut dst = take(buffers, out)?;
    let result = f(buffers, &mut dst);
    buffers[out.0] = dst;
    result
}

fn read<'a>(
    buffers: &'a Slab<Vec<f32>>,
    id: BufferId,
    kernel: &'static str,
    len: usize,
) -> RuntimeResult<&'a [f32]> {
    let data = buffers.get(id.0).ok_or(RuntimeError::InvalidBuffer(id.0))?;
    if data.len() != len {
        return Err(RuntimeError::kernel(
            kernel,
            format!("buffer {} holds {} elements, expected {}", id, data.len(), len),
        ));
    }
    Ok(data)
}

fn expect_len(kernel: &'static str, len: usize, shape: Shape) -> RuntimeResult<()> {
    if len != shape.len() {
        return Err(RuntimeError::kernel(
            kernel,
            format!("output holds {} elements, shape {} needs {}", len, shape, shape.len()),
        ));
    }
    Ok(())
}

impl Accelerator for HostAccelerator {
    fn name(&self) -> &str {
        "host"
    }

    fn device_id(&self) -> u32 {
        self.device_id
    }

    fn allocate(&self, len: usize) -> RuntimeResult<BufferId> {
        let bytes = len * std::mem::size_of::<f32>();
        let mut buffers = self.buffers.lock();
        let in_use = self.bytes_in_use.load(Ordering::Acquire);
        if let Some(limit) = self.memory_limit {
            if in_use + bytes > limit {
                warn!(
                    "device {}: refusing {} byte allocation ({} of {} in use)",
                    self.device_id, bytes, in_use, limit
                );
                return Err(RuntimeError::AllocationFailure {
                    location: Location::Device,
                    bytes,
                });
            }
        }
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| RuntimeError::AllocationFailure {
                location: Location::Device,
                bytes,
            })?;
        data.resize(len, 0.0);
        let id = BufferId(buffers.insert(data));
        self.bytes_in_use.fetch_add(bytes, Ordering::AcqRel);
        debug!("device {}: allocated {} ({} bytes)", self.device_id, id, bytes);
        Ok(id)
    }

    fn release(&self, buffer: BufferId) {
        let mut buffers = self.buffers.lock();
        if let Some(data) = buffers.try_remove(buffer.0) {
            let bytes = data.len() * std::mem::size_of::<f32>();
            self.bytes_in_use.fetch_sub(bytes, Ordering::AcqRel);
            debug!("device {}: released {} ({} bytes)", self.device_id, buffer, bytes);
        }
    }

    fn buffer_len(&self, buffer: BufferId) -> Option<usize> {
        self.buffers.lock().get(buffer.0).map(Vec::len)
    }

    fn upload(&self, stream: &Stream, buffer: BufferId, src: &[f32]) -> RuntimeResult<()> {
        stream.submit();
        let result = {
            let mut buffers = self.buffers.lock();
            match buffers.get_mut(buffer.0) {
                Some(dst) if dst.len() == src.len() => {
                    dst.copy_from_slice(src);
                    Ok(())
                }
                Some(dst) => Err(RuntimeError::TransferFailure {
                    from: Location::Host,
                    to: Location::Device,
                    reason: format!("{} holds {} elements, got {}", buffer, dst.len(), src.len()),
                }),
                None => Err(RuntimeError::InvalidBuffer(buffer.0)),
            }
        };
        stream.complete();
        trace!("{}: upload {} ({} elements)", stream, buffer, src.len());
        result
    }

    fn download(&self, stream: &Stream, buffer: BufferId, dst: &mut [f32]) -> RuntimeResult<()> {
        stream.submit();
        let result = {
            let buffers = self.buffers.lock();
            match buffers.get(buffer.0) {
                Some(src) if src.len() == dst.len() => {
                    dst.copy_from_slice(src);
                    Ok(())
                }
                Some(src) => Err(RuntimeError::TransferFailure {
                    from: Location::Device,
                    to: Location::Host,
                    reason: format!("{} holds {} elements, host has {}", buffer, src.len(), dst.len()),
                }),
                None => Err(RuntimeError::InvalidBuffer(buffer.0)),
            }
        };
        stream.complete();
        trace!("{}: download {} ({} elements)", stream, buffer, dst.len());
        result
    }

    fn launch(&self, stream: &Stream, kernel: &Kernel) -> RuntimeResult<KernelOutput> {
        let seq = stream.submit();
        trace!("{}: launch #{} {}", stream, seq, kernel.name());
        let result = self.execute(kernel);
        stream.complete();
        result
    }

    fn synchronize(&self, stream: &Stream) -> RuntimeResult<()> {
        trace!("{}: synchronize ({} submitted)", stream, stream.submitted());
        Ok(())
    }

    fn bytes_in_use(&self) -> usize {
        self.bytes_in_use.load(Ordering::Acquire)
    }
}
