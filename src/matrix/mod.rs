//! Matrices, images and kernel generators.
//!
//! - [`Matrix`]: host/accelerator buffer with lazy synchronization
//! - [`Image`]: a matrix with image metadata
//! - [`ImageIndexPair`], [`ImageGradientVectorPair`]: paired operator results
//! - [`gaussian`]: Gaussian kernel generation

pub mod buffer;
pub mod gaussian;
pub mod image;

pub use buffer::{ComputeContext, CopyState, Matrix};
pub use gaussian::{gaussian_weights, generate_gaussian, generate_gaussian_normalized};
pub use image::{Image, ImageGradientVectorPair, ImageIndexPair};
