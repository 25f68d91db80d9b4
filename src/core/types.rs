//! Value types shared by the matrix runtime.
//!
//! - [`Shape`]: extents of a 2-D buffer (both at least 1)
//! - [`Point2`]: a pixel coordinate
//! - [`Location`]: where a physical copy of a buffer lives

use crate::core::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extents of a 2-D matrix.
///
/// Buffers are stored row-major, so the flat offset of `(x, y)` is
/// `y * width + x`.
///
/// Extents are private so every `Shape` in circulation has passed
/// [`Shape::new`]; deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ShapeRepr", into = "ShapeRepr")]
pub struct Shape {
    width: usize,
    height: usize,
}

#[derive(Serialize, Deserialize)]
struct ShapeRepr {
    width: usize,
    height: usize,
}

impl TryFrom<ShapeRepr> for Shape {
    type Error = RuntimeError;

    fn try_from(repr: ShapeRepr) -> RuntimeResult<Self> {
        Shape::new(repr.width, repr.height)
    }
}

impl From<Shape> for ShapeRepr {
    fn from(shape: Shape) -> Self {
        ShapeRepr {
            width: shape.width,
            height: shape.height,
        }
    }
}

impl Shape {
    /// Create a shape, rejecting zero extents.
    pub fn new(width: usize, height: usize) -> RuntimeResult<Self> {
        if width == 0 || height == 0 {
            return Err(RuntimeError::InvalidShape { width, height });
        }
        Ok(Self { width, height })
    }

    /// Shape of a single element.
    pub const fn scalar() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Shape of a single row: `(width, 1)`.
    pub fn row(&self) -> Self {
        Self {
            width: self.width,
            height: 1,
        }
    }

    /// Shape of a single column: `(1, height)`.
    pub fn column(&self) -> Self {
        Self {
            width: 1,
            height: self.height,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// A valid shape is never empty; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of an `f32` buffer with this shape.
    pub fn byte_len(&self) -> usize {
        self.len() * std::mem::size_of::<f32>()
    }

    /// Row-major offset of a point. Returns `None` outside the extents.
    pub fn offset(&self, point: Point2) -> Option<usize> {
        if point.x < self.width && point.y < self.height {
            Some(point.y * self.width + point.x)
        } else {
            None
        }
    }

    /// Point for a row-major offset. Returns `None` past the end.
    pub fn point(&self, offset: usize) -> Option<Point2> {
        if offset < self.len() {
            Some(Point2::new(offset % self.width, offset / self.width))
        } else {
            None
        }
    }

    /// Point at the kernel anchor `(width / 2, height / 2)`.
    pub fn center(&self) -> Point2 {
        Point2::new(self.width / 2, self.height / 2)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A 2-D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point2 {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

impl Point2 {
    /// Create a new point.
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Where a physical copy of a matrix lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Host (CPU) memory
    Host,
    /// Accelerator memory
    Device,
}

impl Location {
    /// The other location.
    pub fn other(self) -> Self {
        match self {
            Location::Host => Location::Device,
            Location::Device => Location::Host,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Host => write!(f, "host"),
            Location::Device => write!(f, "device"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_rejects_zero_extent() {
        assert!(matches!(
            Shape::new(0, 4),
            Err(RuntimeError::InvalidShape { width: 0, height: 4 })
        ));
        assert!(Shape::new(3, 0).is_err());
        assert_eq!(Shape::new(3, 2).unwrap().len(), 6);
    }

    #[test]
    fn test_offset_point_conversion() {
        let shape = Shape::new(4, 3).unwrap();
        assert_eq!(shape.offset(Point2::new(1, 2)), Some(9));
        assert_eq!(shape.point(9), Some(Point2::new(1, 2)));
        assert_eq!(shape.point(12), None);
        assert_eq!(shape.offset(Point2::new(4, 0)), None);
    }

    #[test]
    fn test_shape_deserialize_validates() {
        let shape: Shape = serde_json::from_str(r#"{"width":3,"height":2}"#).unwrap();
        assert_eq!((shape.width(), shape.height()), (3, 2));
        assert_eq!(serde_json::to_string(&shape).unwrap(), r#"{"width":3,"height":2}"#);
        assert!(serde_json::from_str::<Shape>(r#"{"width":0,"height":3}"#).is_err());
    }

    #[test]
    fn test_row_and_column_shapes() {
        let shape = Shape::new(4, 3).unwrap();
        assert_eq!(shape.row(), Shape::new(4, 1).unwrap());
        assert_eq!(shape.column(), Shape::new(1, 3).unwrap());
    }

    #[test]
    fn test_center_truncates() {
        assert_eq!(Shape::new(5, 4).unwrap().center(), Point2::new(2, 2));
    }

    #[test]
    fn test_location_other() {
        assert_eq!(Location::Host.other(), Location::Device);
        assert_eq!(format!("{}", Location::Device), "device");
    }
}
