//! Gaussian kernel generation.

use crate::core::error::RuntimeResult;
use crate::core::types::{Location, Shape};
use crate::matrix::buffer::{ComputeContext, Matrix};
use std::f32::consts::PI;
use std::sync::Arc;

/// Gaussian weights for `shape`, row-major.
///
/// `g(x, y) = sqrt(1 / 2π) · exp(-((x - rw)² / 2w² + (y - rh)² / 2h²))`
/// where the centre `(rw, rh)` is `(w / 2, h / 2)` truncated to whole pixels.
/// The weights are not normalized.
pub fn gaussian_weights(shape: Shape, w: f32, h: f32) -> Vec<f32> {
    let rw = (w / 2.0).trunc();
    let rh = (h / 2.0).trunc();
    let scale = (1.0 / (2.0 * PI)).sqrt();
    let (sx, sy) = (2.0 * w * w, 2.0 * h * h);
    let mut weights = Vec::with_capacity(shape.len());
    for y in 0..shape.height() {
        let dy = y as f32 - rh;
        for x in 0..shape.width() {
            let dx = x as f32 - rw;
            weights.push(scale * (-(dx * dx / sx + dy * dy / sy)).exp());
        }
    }
    weights
}

/// Build the Gaussian on the host and assert it onto the accelerator.
pub fn generate_gaussian(
    context: &Arc<ComputeContext>,
    shape: Shape,
    w: f32,
    h: f32,
) -> RuntimeResult<Matrix> {
    device_resident(context, shape, gaussian_weights(shape, w, h))
}

/// Like [`generate_gaussian`], rescaled so the weights sum to 1.
pub fn generate_gaussian_normalized(
    context: &Arc<ComputeContext>,
    shape: Shape,
    w: f32,
    h: f32,
) -> RuntimeResult<Matrix> {
    let mut weights = gaussian_weights(shape, w, h);
    let total: f32 = weights.iter().sum();
    if total > 0.0 {
        weights.iter_mut().for_each(|v| *v /= total);
    }
    device_resident(context, shape, weights)
}

fn device_resident(
    context: &Arc<ComputeContext>,
    shape: Shape,
    weights: Vec<f32>,
) -> RuntimeResult<Matrix> {
    let matrix = Matrix::from_vec(Arc::clone(context), shape, weights)?;
    matrix.assert_location(Location::Device)?;
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostAccelerator;
    use crate::matrix::buffer::CopyState;
    use proptest::prelude::*;

    fn context() -> Arc<ComputeContext> {
        Arc::new(ComputeContext::new(Arc::new(HostAccelerator::new(0))))
    }

    #[test]
    fn test_peak_at_center() {
        let shape = Shape::new(5, 5).unwrap();
        let weights = gaussian_weights(shape, 5.0, 5.0);
        let peak = (1.0 / (2.0 * PI)).sqrt();
        assert!((weights[2 * 5 + 2] - peak).abs() < 1e-6);
        let max = weights.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(max, weights[12]);
    }

    #[test]
    fn test_center_truncates() {
        // w = 3 puts the centre at column 1.
        let weights = gaussian_weights(Shape::new(3, 1).unwrap(), 3.0, 1.0);
        assert!(weights[1] > weights[0]);
        assert!((weights[0] - weights[2]).abs() < 1e-7);
    }

    #[test]
    fn test_generated_kernel_is_device_resident() {
        let m = generate_gaussian(&context(), Shape::new(3, 3).unwrap(), 3.0, 3.0).unwrap();
        assert_eq!(m.state(Location::Device), CopyState::Clean);
        assert_eq!(m.state(Location::Host), CopyState::Clean);
        assert_eq!(m.transfer_count(), 1);
    }

    #[test]
    fn test_normalized_has_unit_mass() {
        let m = generate_gaussian_normalized(&context(), Shape::new(7, 5).unwrap(), 7.0, 5.0)
            .unwrap();
        let total: f32 = m.to_vec().unwrap().iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_symmetric_about_center(half in 0usize..6) {
            // Odd extent 2r + 1 with w = h = extent centres the peak at (r, r).
            let extent = 2 * half + 1;
            let shape = Shape::new(extent, extent).unwrap();
            let weights = gaussian_weights(shape, extent as f32, extent as f32);
            for y in 0..extent {
                for x in 0..extent {
                    let v = weights[y * extent + x];
                    let mirrored_x = weights[y * extent + (extent - 1 - x)];
                    let mirrored_y = weights[(extent - 1 - y) * extent + x];
                    let transposed = weights[x * extent + y];
                    prop_assert!((v - mirrored_x).abs() < 1e-6);
                    prop_assert!((v - mirrored_y).abs() < 1e-6);
                    prop_assert!((v - transposed).abs() < 1e-6);
                }
            }
        }
    }
}
