//! Ranking of image extrema through the heap container.

use crate::core::error::{ContainerResult, RuntimeResult};
use crate::core::types::{Point2, Shape};
use crate::matrix::Image;
use crate::structs::{Heap, Key, List, ListNode};
use std::cmp::Ordering;

/// A pixel picked out by [`rank_maxima`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedPixel {
    /// Where the pixel is.
    pub point: Point2,
    /// Its value.
    pub value: f32,
}

/// The `k` brightest pixels of `image`, brightest first.
///
/// Equal values keep row-major order. NaN pixels are never ranked.
pub fn rank_maxima(image: &Image, k: usize) -> RuntimeResult<Vec<RankedPixel>> {
    let pixels = image.to_vec()?;
    Ok(rank_values(&pixels, image.shape(), k)?)
}

/// [`rank_maxima`] over a row-major slice laid out as `shape`.
pub fn rank_values(pixels: &[f32], shape: Shape, k: usize) -> ContainerResult<Vec<RankedPixel>> {
    if k == 0 {
        return Ok(Vec::new());
    }
    let mut heap: Heap<usize> = Heap::max_heap();
    for (offset, &value) in pixels.iter().enumerate() {
        if !value.is_nan() {
            heap.insert(Key::Float(value), offset)?;
        }
    }

    // Pop past the cutoff while values tie with the k-th, then settle ties by offset.
    let mut picked: Vec<(f32, usize)> = Vec::with_capacity(k);
    while let Some((key, offset)) = heap.pop_root() {
        let value = key.as_float().unwrap_or(f32::NAN);
        if picked.len() >= k && picked.last().map(|&(v, _)| v) != Some(value) {
            break;
        }
        picked.push((value, offset));
    }
    picked.sort_by(|a, b| match b.0.total_cmp(&a.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });
    picked.truncate(k);

    Ok(picked
        .into_iter()
        .filter_map(|(value, offset)| shape.point(offset).map(|point| RankedPixel { point, value }))
        .collect())
}

/// Ranked pixels as a list with positional keys.
pub fn ranked_list(ranked: &[RankedPixel]) -> List<RankedPixel> {
    let mut list = List::new();
    for &pixel in ranked {
        list.append(ListNode::new(0, pixel));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn shape(w: usize, h: usize) -> Shape {
        Shape::new(w, h).unwrap()
    }

    #[test]
    fn test_ranks_descending() {
        let pixels = [0.1, 0.9, 0.4, 0.7];
        let ranked = rank_values(&pixels, shape(2, 2), 3).unwrap();
        let values: Vec<f32> = ranked.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0.9, 0.7, 0.4]);
        assert_eq!(ranked[0].point, Point2::new(1, 0));
        assert_eq!(ranked[1].point, Point2::new(1, 1));
    }

    #[test]
    fn test_ties_keep_row_major_order() {
        let pixels = [5.0, 1.0, 5.0, 5.0, 0.0, 5.0];
        let ranked = rank_values(&pixels, shape(3, 2), 2).unwrap();
        let points: Vec<Point2> = ranked.iter().map(|p| p.point).collect();
        assert_eq!(points, vec![Point2::new(0, 0), Point2::new(2, 0)]);
    }

    #[test]
    fn test_k_larger_than_image() {
        let ranked = rank_values(&[3.0, f32::NAN, 1.0], shape(3, 1), 10).unwrap();
        assert_eq!(ranked.len(), 2);
        assert!(rank_values(&[1.0], shape(1, 1), 0).unwrap().is_empty());
    }

    #[test]
    fn test_ranked_list_keys() {
        let ranked = rank_values(&[2.0, 8.0], shape(2, 1), 2).unwrap();
        let list = ranked_list(&ranked);
        assert_eq!(list.keys(), vec![Key::Int(0), Key::Int(1)]);
        assert_eq!(list.get(&Key::Int(0)).map(|n| n.value.value), Some(8.0));
    }

    proptest! {
        #[test]
        fn prop_matches_sorted_scan(
            pixels in proptest::collection::vec(-100i32..100, 1..64),
            k in 0usize..10,
        ) {
            let pixels: Vec<f32> = pixels.into_iter().map(|v| v as f32).collect();
            let width = pixels.len();
            let ranked = rank_values(&pixels, shape(width, 1), k).unwrap();

            let mut expected: Vec<(f32, usize)> =
                pixels.iter().copied().enumerate().map(|(i, v)| (v, i)).collect();
            expected.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
            expected.truncate(k);

            let got: Vec<(f32, usize)> = ranked.iter().map(|p| (p.value, p.point.x)).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
