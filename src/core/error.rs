//! Error types for the matrix runtime.
//!
//! Uses thiserror for structured errors with context. Two families:
//! - [`RuntimeError`]: buffer, transfer, kernel and codec failures
//! - [`ContainerError`]: lookups and structural misuse of the containers

use crate::core::types::{Location, Shape};
use crate::structs::key::KeyKind;
use crate::structs::tree::NodeId;
use thiserror::Error;

/// Errors raised by matrices, images, the accelerator and the codecs.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A zero width or height.
    #[error("Invalid shape {width}x{height}: both extents must be at least 1")]
    InvalidShape {
        /// Requested columns.
        width: usize,
        /// Requested rows.
        height: usize,
    },

    /// Operands of an element-wise operator differ in shape.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Shape of the first operand.
        expected: Shape,
        /// Shape of the offending operand.
        got: Shape,
    },

    /// Host data does not fill the shape.
    #[error("Shape {shape} needs {} elements, got {got}", .shape.len())]
    DataLength {
        /// Target shape.
        shape: Shape,
        /// Elements supplied.
        got: usize,
    },

    /// Host or accelerator memory exhausted.
    #[error("Could not allocate {bytes} bytes on {location}")]
    AllocationFailure {
        /// Where the allocation was attempted.
        location: Location,
        /// Requested size.
        bytes: usize,
    },

    /// A copy between host and device failed.
    #[error("Transfer from {from} to {to} failed: {reason}")]
    TransferFailure {
        /// Source side.
        from: Location,
        /// Destination side.
        to: Location,
        /// Backend message.
        reason: String,
    },

    /// File bytes are not a readable image.
    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    /// Pixels could not be written in the requested format.
    #[error("Failed to encode image: {0}")]
    EncodeFailure(String),

    /// A kernel launch was rejected or failed.
    #[error("Kernel '{kernel}' failed: {reason}")]
    Kernel {
        /// Kernel name.
        kernel: &'static str,
        /// Backend message.
        reason: String,
    },

    /// A device buffer handle is stale.
    #[error("Device buffer {0} does not exist")]
    InvalidBuffer(usize),

    /// Bad configuration file or value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operand was created by another `ImageUtil`.
    #[error("Image belongs to the context on device {device}")]
    ForeignContext {
        /// Device of the operand's context.
        device: u32,
    },

    /// Container misuse surfaced through the runtime.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the list and tree containers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// Positional lookup past the end.
    #[error("No entry at index {index} (length {len})")]
    LookupMiss {
        /// Requested position.
        index: usize,
        /// Container length.
        len: usize,
    },

    /// Key of another kind than the container holds.
    #[error("Key kind mismatch: container holds {expected} keys, got {got}")]
    KeyKindMismatch {
        /// Kind already stored.
        expected: KeyKind,
        /// Kind supplied.
        got: KeyKind,
    },

    /// The node must be detached first.
    #[error("Node {0} is still linked into its tree")]
    NodeAttached(NodeId),

    /// The node handle is stale.
    #[error("Node {0} does not exist")]
    InvalidNode(NodeId),

    /// The child slot is taken.
    #[error("Node {0} already has a child on that side")]
    SlotOccupied(NodeId),
}

// ============================================================================
// Error Utilities
// ============================================================================

impl RuntimeError {
    /// Failures that leave no usable result for the call in progress.
    ///
    /// Nothing is retried automatically.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RuntimeError::AllocationFailure { .. }
                | RuntimeError::TransferFailure { .. }
                | RuntimeError::Kernel { .. }
                | RuntimeError::InvalidBuffer(_)
        )
    }

    /// Shorthand for a kernel failure.
    pub fn kernel(kernel: &'static str, reason: impl Into<String>) -> Self {
        RuntimeError::Kernel {
            kernel,
            reason: reason.into(),
        }
    }
}

impl ContainerError {
    /// Lookup misses are always recoverable; everything else is misuse.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, ContainerError::LookupMiss { .. })
    }
}

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Result type alias for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;
