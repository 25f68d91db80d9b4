//! The image operator pipeline and helpers built on it.
//!
//! - [`ImageUtil`]: operators bound to one device and stream
//! - [`ranking`]: extremum ranking through the heap container

pub mod image_util;
pub mod ranking;

pub use image_util::ImageUtil;
pub use ranking::{rank_maxima, rank_values, ranked_list, RankedPixel};
