//! Core types for the matrix runtime.
//!
//! This module contains the foundational pieces shared by every other module:
//! - Value types (Shape, Point2, Location)
//! - Error types
//! - Runtime configuration

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{ResampleFilter, RuntimeConfig};
pub use error::{ContainerError, ContainerResult, RuntimeError, RuntimeResult};
pub use types::{Location, Point2, Shape};
