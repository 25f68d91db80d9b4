//! # Ambara Matrix - Host/Accelerator Image Runtime
//!
//! A small numeric runtime for 2-D `f32` images that live on the host, on an
//! accelerator, or both, with an operator pipeline on top and a handful of
//! key-addressed containers for indexing and ranking results.
//!
//! ## Features
//!
//! - **Lazy synchronization**: a [`Matrix`] tracks which copy is current and
//!   transfers only when a location is asserted
//! - **Operator pipeline**: [`ImageUtil`] provides resampling, arithmetic,
//!   convolution, reductions, gradients and Gaussian kernels
//! - **Pluggable backends**: kernels run through the [`Accelerator`] trait;
//!   [`HostAccelerator`] executes them in-process on the rayon pool
//! - **Codecs**: PNG/TIFF/JPEG/... through the `image` crate, plus a lossless
//!   raw `f32` format
//! - **Containers**: [`List`], [`LinkedList`] and [`Tree`] (generic, search
//!   tree and heap orderings) keyed by [`Key`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ambara_matrix::prelude::*;
//!
//! let util = ImageUtil::with_config(RuntimeConfig::new().with_memory_limit_mb(256));
//! let img = util.load_image_from_file("input.png")?;
//! let half = util.resample(&img, img.width() / 2, img.height() / 2)?;
//!
//! let peak = util.max_idx(&half, -1)?;
//! println!("brightest pixel at {:?}", peak.point(0));
//!
//! for ranked in util.rank_maxima(&half, 5)? {
//!     println!("{} = {}", ranked.point, ranked.value);
//! }
//! # Ok::<(), ambara_matrix::RuntimeError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: value types, errors and configuration
//! - [`structs`]: keys, lists and trees
//! - [`backend`]: accelerator trait, kernels and streams
//! - [`matrix`]: dual-location matrices, images and Gaussian kernels
//! - [`codec`]: image encoding and decoding
//! - [`util`]: the `ImageUtil` operator pipeline and extremum ranking

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod codec;
pub mod core;
pub mod matrix;
pub mod structs;
pub mod util;

pub use crate::backend::{Accelerator, HostAccelerator};
pub use crate::core::error::{ContainerError, ContainerResult, RuntimeError, RuntimeResult};
pub use crate::matrix::{Image, Matrix};
pub use crate::structs::{Key, LinkedList, List, Tree};
pub use crate::util::ImageUtil;

/// Prelude module for convenient imports.
///
/// ```rust
/// use ambara_matrix::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::config::{ResampleFilter, RuntimeConfig};
    pub use crate::core::error::{ContainerError, ContainerResult, RuntimeError, RuntimeResult};
    pub use crate::core::types::{Location, Point2, Shape};

    // Backend
    pub use crate::backend::{Accelerator, Axis, HostAccelerator, Stream};

    // Matrices and images
    pub use crate::matrix::{
        ComputeContext, CopyState, Image, ImageGradientVectorPair, ImageIndexPair, Matrix,
    };

    // Codecs
    pub use crate::codec::{DecodedImage, ImageCodec, ImageCrateCodec, RawCodec};

    // Containers
    pub use crate::structs::{
        GenericTree, Heap, HeapOrder, Key, KeyKind, LinkedList, List, ListNode, NodeId,
        SearchTree, Tree, TreeNode,
    };

    // Pipeline
    pub use crate::util::{ImageUtil, RankedPixel};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
