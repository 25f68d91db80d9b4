//! Image wrappers over [`Matrix`].

use crate::core::error::RuntimeResult;
use crate::core::types::{Point2, Shape};
use crate::matrix::buffer::Matrix;
use crate::structs::{List, ListNode};

/// A single-plane image backed by a [`Matrix`].
#[derive(Debug)]
pub struct Image {
    matrix: Matrix,
    channels: usize,
}

impl Image {
    /// Wrap a matrix as a one-channel image.
    pub fn new(matrix: Matrix) -> Self {
        Self {
            matrix,
            channels: 1,
        }
    }

    /// Set the channel count recorded for this image.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels.max(1);
        self
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.matrix.shape().width()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.matrix.shape().height()
    }

    /// Image extents.
    pub fn shape(&self) -> Shape {
        self.matrix.shape()
    }

    /// Recorded channel count (at least 1).
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Underlying matrix.
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Unwrap the underlying matrix.
    pub fn into_matrix(self) -> Matrix {
        self.matrix
    }

    /// Pixels in row-major order.
    pub fn to_vec(&self) -> RuntimeResult<Vec<f32>> {
        self.matrix.to_vec()
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: usize, y: usize) -> RuntimeResult<Option<f32>> {
        self.matrix.get(Point2::new(x, y))
    }
}

impl From<Matrix> for Image {
    fn from(matrix: Matrix) -> Self {
        Image::new(matrix)
    }
}

/// Result of an arg-max reduction: the maxima plus where they were found.
#[derive(Debug)]
pub struct ImageIndexPair {
    /// Reduced maximum values.
    pub image: Image,
    /// Flat offsets into the source image, one per maximum.
    pub index: Vec<usize>,
    source: Shape,
}

impl ImageIndexPair {
    pub(crate) fn new(image: Image, index: Vec<usize>, source: Shape) -> Self {
        Self {
            image,
            index,
            source,
        }
    }

    /// Shape of the image the offsets refer to.
    pub fn source_shape(&self) -> Shape {
        self.source
    }

    /// Coordinates of the `i`-th maximum in the source image.
    pub fn point(&self, i: usize) -> Option<Point2> {
        self.index.get(i).and_then(|&offset| self.source.point(offset))
    }

    /// All maxima coordinates as a list with positional keys.
    pub fn to_list(&self) -> List<Point2> {
        let mut list = List::new();
        for &offset in &self.index {
            if let Some(point) = self.source.point(offset) {
                list.append(ListNode::new(0, point));
            }
        }
        list
    }
}

/// Gradient magnitude and angle planes of one source image.
#[derive(Debug)]
pub struct ImageGradientVectorPair {
    /// `sqrt(dx² + dy²)`.
    pub magnitude: Image,
    /// Radians, `atan2(dy, dx)`.
    pub angle: Image,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostAccelerator;
    use crate::matrix::buffer::ComputeContext;
    use crate::structs::Key;
    use std::sync::Arc;

    fn image(w: usize, h: usize, data: &[f32]) -> Image {
        let ctx = Arc::new(ComputeContext::new(Arc::new(HostAccelerator::new(0))));
        Image::new(Matrix::from_slice(ctx, Shape::new(w, h).unwrap(), data).unwrap())
    }

    #[test]
    fn test_image_accessors() {
        let img = image(3, 2, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).with_channels(0);
        assert_eq!((img.width(), img.height()), (3, 2));
        assert_eq!(img.channels(), 1);
        assert_eq!(img.pixel(2, 1).unwrap(), Some(5.0));
        assert_eq!(img.pixel(3, 0).unwrap(), None);
    }

    #[test]
    fn test_index_pair_points() {
        let source = Shape::new(4, 3).unwrap();
        let pair = ImageIndexPair::new(image(2, 1, &[9.0, 7.0]), vec![6, 11], source);
        assert_eq!(pair.point(0), Some(Point2::new(2, 1)));
        assert_eq!(pair.point(1), Some(Point2::new(3, 2)));
        assert_eq!(pair.point(2), None);

        let list = pair.to_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(&Key::Int(1)).map(|n| n.value), Some(Point2::new(3, 2)));
    }
}
