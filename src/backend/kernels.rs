//! Reference kernels executed by the in-process accelerator.
//!
//! Every kernel writes into a caller-provided output slice. Work is split
//! across the rayon pool by rows once the output reaches `threshold`
//! elements.

use crate::backend::Axis;
use crate::core::config::ResampleFilter;
use crate::core::types::Shape;
use rayon::prelude::*;

fn for_each_row<F>(out: &mut [f32], width: usize, threshold: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    if out.len() >= threshold {
        out.par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    } else {
        out.chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }
}

/// `out[i] = f(a[i], b[i])`.
pub fn zip_with<F>(a: &[f32], b: &[f32], out: &mut [f32], threshold: usize, f: F)
where
    F: Fn(f32, f32) -> f32 + Send + Sync,
{
    if out.len() >= threshold {
        out.par_iter_mut()
            .zip(a.par_iter().zip(b.par_iter()))
            .for_each(|(o, (&x, &y))| *o = f(x, y));
    } else {
        for (o, (&x, &y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
            *o = f(x, y);
        }
    }
}

/// `out[i] = a[i] * scalar`.
pub fn scale(a: &[f32], scalar: f32, out: &mut [f32], threshold: usize) {
    if out.len() >= threshold {
        out.par_iter_mut()
            .zip(a.par_iter())
            .for_each(|(o, &x)| *o = x * scalar);
    } else {
        for (o, &x) in out.iter_mut().zip(a.iter()) {
            *o = x * scalar;
        }
    }
}

/// 2-D convolution producing an output the size of `src`.
///
/// The kernel is anchored at `(kw / 2, kh / 2)` and samples outside the
/// source read as zero.
pub fn convolve(
    src: &[f32],
    shape: Shape,
    kernel: &[f32],
    kernel_shape: Shape,
    out: &mut [f32],
    threshold: usize,
) {
    let anchor = kernel_shape.center();
    let (w, h) = (shape.width() as isize, shape.height() as isize);
    for_each_row(out, shape.width(), threshold, |y, row| {
        for (x, value) in row.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for j in 0..kernel_shape.height() {
                let sy = y as isize - (j as isize - anchor.y as isize);
                if sy < 0 || sy >= h {
                    continue;
                }
                for i in 0..kernel_shape.width() {
                    let sx = x as isize - (i as isize - anchor.x as isize);
                    if sx < 0 || sx >= w {
                        continue;
                    }
                    acc += kernel[j * kernel_shape.width() + i] * src[(sy * w + sx) as usize];
                }
            }
            *value = acc;
        }
    });
}

/// Resample `src` into `out`, sampling at pixel centres.
pub fn resample(
    src: &[f32],
    shape: Shape,
    out: &mut [f32],
    out_shape: Shape,
    filter: ResampleFilter,
    threshold: usize,
) {
    let scale_x = shape.width() as f32 / out_shape.width() as f32;
    let scale_y = shape.height() as f32 / out_shape.height() as f32;
    let source = |coord: usize, scale: f32, extent: usize| -> f32 {
        ((coord as f32 + 0.5) * scale - 0.5).clamp(0.0, (extent - 1) as f32)
    };
    let at = |x: usize, y: usize| src[y * shape.width() + x];
    for_each_row(out, out_shape.width(), threshold, |y, row| {
        let sy = source(y, scale_y, shape.height());
        for (x, value) in row.iter_mut().enumerate() {
            let sx = source(x, scale_x, shape.width());
            *value = match filter {
                ResampleFilter::Nearest => at(sx.round() as usize, sy.round() as usize),
                ResampleFilter::Bilinear => {
                    let (x0, y0) = (sx.floor() as usize, sy.floor() as usize);
                    let x1 = (x0 + 1).min(shape.width() - 1);
                    let y1 = (y0 + 1).min(shape.height() - 1);
                    let (tx, ty) = (sx - x0 as f32, sy - y0 as f32);
                    let top = at(x0, y0) * (1.0 - tx) + at(x1, y0) * tx;
                    let bottom = at(x0, y1) * (1.0 - tx) + at(x1, y1) * tx;
                    top * (1.0 - ty) + bottom * ty
                }
            };
        }
    });
}

/// Maximum along `axis`, writing values into `out` and returning the flat
/// offset of each maximum. Ties resolve to the first element in row-major
/// scan order.
pub fn reduce_max(src: &[f32], shape: Shape, axis: Axis, out: &mut [f32]) -> Vec<usize> {
    let groups: Vec<Vec<usize>> = match axis {
        Axis::Columns => (0..shape.width())
            .map(|x| (0..shape.height()).map(|y| y * shape.width() + x).collect())
            .collect(),
        Axis::Rows => (0..shape.height())
            .map(|y| (0..shape.width()).map(|x| y * shape.width() + x).collect())
            .collect(),
        Axis::All => vec![(0..shape.len()).collect()],
    };
    let indices: Vec<usize> = groups
        .into_iter()
        .filter_map(|group| argmax(src, &group))
        .collect();
    for (slot, &index) in out.iter_mut().zip(indices.iter()) {
        *slot = src[index];
    }
    indices
}

fn argmax(src: &[f32], offsets: &[usize]) -> Option<usize> {
    let (&first, rest) = offsets.split_first()?;
    let mut best = first;
    for &offset in rest {
        let (value, current) = (src[offset], src[best]);
        if value > current || (current.is_nan() && !value.is_nan()) {
            best = offset;
        }
    }
    Some(best)
}

fn derivatives(src: &[f32], shape: Shape, x: usize, y: usize) -> (f32, f32) {
    let at = |x: usize, y: usize| src[y * shape.width() + x];
    let (w, h) = (shape.width(), shape.height());
    let dx = if w == 1 {
        0.0
    } else if x == 0 {
        at(1, y) - at(0, y)
    } else if x == w - 1 {
        at(w - 1, y) - at(w - 2, y)
    } else {
        (at(x + 1, y) - at(x - 1, y)) * 0.5
    };
    let dy = if h == 1 {
        0.0
    } else if y == 0 {
        at(x, 1) - at(x, 0)
    } else if y == h - 1 {
        at(x, h - 1) - at(x, h - 2)
    } else {
        (at(x, y + 1) - at(x, y - 1)) * 0.5
    };
    (dx, dy)
}

/// Gradient magnitude and/or angle from central differences (one-sided at
/// the borders), computed in a single pass.
pub fn gradients(
    src: &[f32],
    shape: Shape,
    magnitude: Option<&mut [f32]>,
    angle: Option<&mut [f32]>,
    threshold: usize,
) {
    let width = shape.width();
    match (magnitude, angle) {
        (Some(mag), Some(ang)) => {
            let fill = |y: usize, (mag_row, ang_row): (&mut [f32], &mut [f32])| {
                for x in 0..width {
                    let (dx, dy) = derivatives(src, shape, x, y);
                    mag_row[x] = dx.hypot(dy);
                    ang_row[x] = dy.atan2(dx);
                }
            };
            if mag.len() >= threshold {
                mag.par_chunks_mut(width)
                    .zip(ang.par_chunks_mut(width))
                    .enumerate()
                    .for_each(|(y, rows)| fill(y, rows));
            } else {
                mag.chunks_mut(width)
                    .zip(ang.chunks_mut(width))
                    .enumerate()
                    .for_each(|(y, rows)| fill(y, rows));
            }
        }
        (Some(mag), None) => for_each_row(mag, width, threshold, |y, row| {
            for (x, value) in row.iter_mut().enumerate() {
                let (dx, dy) = derivatives(src, shape, x, y);
                *value = dx.hypot(dy);
            }
        }),
        (None, Some(ang)) => for_each_row(ang, width, threshold, |y, row| {
            for (x, value) in row.iter_mut().enumerate() {
                let (dx, dy) = derivatives(src, shape, x, y);
                *value = dy.atan2(dx);
            }
        }),
        (None, None) => {}
    }
}
