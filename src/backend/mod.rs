//! Accelerator abstraction: device memory, kernel launches and streams.
//!
//! The runtime never touches accelerator memory directly. Matrices hold a
//! [`BufferId`] and go through an [`Accelerator`] for every allocation,
//! transfer and kernel launch. Work is issued on a [`Stream`]; launches on one
//! stream complete in submission order.
//!
//! [`HostAccelerator`] is the in-process implementation: device buffers live
//! in a separate registry in host memory and kernels run on the rayon pool.

pub mod host;
pub mod kernels;

pub use host::HostAccelerator;

use crate::core::config::ResampleFilter;
use crate::core::error::RuntimeResult;
use crate::core::types::Shape;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Handle to a buffer in accelerator memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf{}", self.0)
    }
}

/// Reduction direction for `max` / `max_idx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// One maximum per column; result Shape `(width, 1)`
    Columns,
    /// One maximum per row; result Shape `(1, height)`
    Rows,
    /// Single global maximum; result Shape `(1, 1)`
    All,
}

impl Axis {
    /// Decode the integer mode taken by `max` / `max_idx`.
    ///
    /// `0` reduces columns, `1` reduces rows, anything else is global.
    pub fn from_mode(mode: i32) -> Self {
        match mode {
            0 => Axis::Columns,
            1 => Axis::Rows,
            _ => Axis::All,
        }
    }

    /// Shape of the reduced result.
    pub fn output_shape(self, shape: Shape) -> Shape {
        match self {
            Axis::Columns => shape.row(),
            Axis::Rows => shape.column(),
            Axis::All => Shape::scalar(),
        }
    }
}

/// A unit of work for the accelerator.
///
/// Inputs are read, `out` buffers are overwritten. Buffer lengths must match
/// the shapes given.
#[derive(Debug, Clone, PartialEq)]
pub enum Kernel {
    /// `out = a + b`, element-wise.
    Add {
        /// Left operand.
        a: BufferId,
        /// Right operand.
        b: BufferId,
        /// Destination.
        out: BufferId,
    },
    /// `out = a - b`, element-wise.
    Subtract {
        /// Minuend.
        a: BufferId,
        /// Subtrahend.
        b: BufferId,
        /// Destination.
        out: BufferId,
    },
    /// `out = src * scalar`.
    Scale {
        /// Input plane.
        src: BufferId,
        /// Multiplier.
        scalar: f32,
        /// Destination.
        out: BufferId,
    },
    /// 2-D convolution with zero padding; `out` has the shape of `src`.
    Convolve {
        /// Input plane.
        src: BufferId,
        /// Shape of `src` and `out`.
        shape: Shape,
        /// Weights.
        kernel: BufferId,
        /// Shape of `kernel`.
        kernel_shape: Shape,
        /// Destination.
        out: BufferId,
    },
    /// Resize `src` into `out`.
    Resample {
        /// Input plane.
        src: BufferId,
        /// Shape of `src`.
        shape: Shape,
        /// Destination.
        out: BufferId,
        /// Shape of `out`.
        out_shape: Shape,
        /// Interpolation.
        filter: ResampleFilter,
    },
    /// Writes maxima into `out`; the offsets come back as [`KernelOutput::Indices`].
    ReduceMax {
        /// Input plane.
        src: BufferId,
        /// Shape of `src`.
        shape: Shape,
        /// Reduction direction.
        axis: Axis,
        /// Destination, shaped by [`Axis::output_shape`].
        out: BufferId,
    },
    /// Central-difference gradients; either output may be skipped.
    Gradients {
        /// Input plane.
        src: BufferId,
        /// Shape of `src` and both outputs.
        shape: Shape,
        /// Destination for `sqrt(dx² + dy²)`.
        magnitude: Option<BufferId>,
        /// Destination for `atan2(dy, dx)`.
        angle: Option<BufferId>,
    },
}

impl Kernel {
    /// Kernel name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Add { .. } => "add",
            Kernel::Subtract { .. } => "subtract",
            Kernel::Scale { .. } => "scale",
            Kernel::Convolve { .. } => "convolve",
            Kernel::Resample { .. } => "resample",
            Kernel::ReduceMax { .. } => "reduce_max",
            Kernel::Gradients { .. } => "gradients",
        }
    }
}

/// What a launch hands back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelOutput {
    /// Results are in the output buffers
    Done,
    /// Flat offsets produced by an arg-max reduction
    Indices(Vec<usize>),
}

/// Ordered queue of accelerator work owned by one `ImageUtil`.
#[derive(Debug)]
pub struct Stream {
    id: Uuid,
    device_id: u32,
    submitted: AtomicU64,
    completed: AtomicU64,
}

impl Stream {
    /// Create a stream on `device_id`.
    pub fn new(device_id: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id,
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    /// Stream identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Device the stream issues to.
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Record a submission, returning its sequence number.
    pub fn submit(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::AcqRel)
    }

    /// Record completion of the oldest outstanding submission.
    pub fn complete(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    /// Submissions not yet completed.
    pub fn pending(&self) -> u64 {
        self.submitted.load(Ordering::Acquire) - self.completed.load(Ordering::Acquire)
    }

    /// Total submissions so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Acquire)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream {} on device {}", &self.id.to_string()[..8], self.device_id)
    }
}

/// Kernel-execution and device-memory capability.
///
/// Implementations must execute work issued on one [`Stream`] in submission
/// order, and every call that reads device memory back into the host must
/// observe all earlier work on that stream.
pub trait Accelerator: Send + Sync + fmt::Debug {
    /// Backend name.
    fn name(&self) -> &str;

    /// Device this accelerator drives.
    fn device_id(&self) -> u32;

    /// Allocate a zeroed buffer of `len` floats.
    fn allocate(&self, len: usize) -> RuntimeResult<BufferId>;

    /// Release a buffer. Unknown ids are ignored.
    fn release(&self, buffer: BufferId);

    /// Length in floats of a live buffer.
    fn buffer_len(&self, buffer: BufferId) -> Option<usize>;

    /// Copy host data into a device buffer of the same length.
    fn upload(&self, stream: &Stream, buffer: BufferId, src: &[f32]) -> RuntimeResult<()>;

    /// Copy a device buffer into host memory of the same length.
    fn download(&self, stream: &Stream, buffer: BufferId, dst: &mut [f32]) -> RuntimeResult<()>;

    /// Run a kernel.
    fn launch(&self, stream: &Stream, kernel: &Kernel) -> RuntimeResult<KernelOutput>;

    /// Block until all work on `stream` has completed.
    fn synchronize(&self, stream: &Stream) -> RuntimeResult<()>;

    /// Accelerator memory currently allocated, in bytes.
    fn bytes_in_use(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_modes() {
        let shape = Shape::new(4, 3).unwrap();
        assert_eq!(Axis::from_mode(0).output_shape(shape), Shape::new(4, 1).unwrap());
        assert_eq!(Axis::from_mode(1).output_shape(shape), Shape::new(1, 3).unwrap());
        assert_eq!(Axis::from_mode(-1), Axis::All);
        assert_eq!(Axis::from_mode(7).output_shape(shape), Shape::scalar());
    }

    #[test]
    fn test_stream_counters() {
        let stream = Stream::new(2);
        assert_eq!(stream.device_id(), 2);
        assert_eq!(stream.submit(), 0);
        assert_eq!(stream.pending(), 1);
        stream.complete();
        assert_eq!(stream.pending(), 0);
        assert_eq!(stream.submitted(), 1);
        assert!(stream.to_string().contains("device 2"));
    }
}
