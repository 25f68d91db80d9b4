//! The image operator pipeline.
//!
//! An [`ImageUtil`] is bound to one accelerator and owns the stream all of its
//! work is issued on. Every operator reads its inputs on the accelerator,
//! writes a freshly allocated output there, and leaves the inputs untouched.
//! Host copies are only produced when pixels are read back or saved.
//!
//! # Example
//!
//! ```no_run
//! use ambara_matrix::prelude::*;
//!
//! let util = ImageUtil::new(0);
//! let img = util.load_image_from_file("input.png")?;
//! let kernel = util.generate_gaussian_normalized(Shape::new(5, 5)?, 5.0, 5.0)?;
//! let blurred = util.convolve(&img, &kernel)?;
//! let edges = util.gradients(&blurred)?;
//! util.save_image_to_file(&edges.magnitude, "edges.png")?;
//! # Ok::<(), ambara_matrix::RuntimeError>(())
//! ```

use crate::backend::{Accelerator, Axis, BufferId, HostAccelerator, Kernel, KernelOutput, Stream};
use crate::codec::codec_for_path;
use crate::core::config::RuntimeConfig;
use crate::core::error::{RuntimeError, RuntimeResult};
use crate::core::types::Shape;
use crate::matrix::{
    gaussian, ComputeContext, Image, ImageGradientVectorPair, ImageIndexPair, Matrix,
};
use crate::util::ranking::{self, RankedPixel};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

/// Image operators bound to one device and stream.
#[derive(Debug)]
pub struct ImageUtil {
    config: RuntimeConfig,
    context: Arc<ComputeContext>,
}

impl ImageUtil {
    /// Bind to `device_id` with default configuration.
    pub fn new(device_id: u32) -> Self {
        Self::with_config(RuntimeConfig::new().with_device(device_id))
    }

    /// Bind to the in-process accelerator described by `config`.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let accelerator = Arc::new(HostAccelerator::from_config(&config));
        Self::with_accelerator(config, accelerator)
    }

    /// Bind to an existing accelerator.
    pub fn with_accelerator(config: RuntimeConfig, accelerator: Arc<dyn Accelerator>) -> Self {
        let context = Arc::new(ComputeContext::new(accelerator));
        info!(
            "ImageUtil on {} device {} ({})",
            context.accelerator().name(),
            context.device_id(),
            context.stream()
        );
        Self { config, context }
    }

    /// Device this instance issues work to.
    pub fn device_id(&self) -> u32 {
        self.context.device_id()
    }

    /// Configuration this instance was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Accelerator and stream shared by every image this instance creates.
    pub fn context(&self) -> &Arc<ComputeContext> {
        &self.context
    }

    /// Stream all work is issued on.
    pub fn stream(&self) -> &Stream {
        self.context.stream()
    }

    // ========================================================================
    // Construction and I/O
    // ========================================================================

    /// Zero-filled image allocated on the accelerator.
    pub fn new_empty_image(&self, width: usize, height: usize) -> RuntimeResult<Image> {
        let shape = Shape::new(width, height)?;
        Ok(Image::new(self.output(shape)?))
    }

    /// Image holding a copy of `data` (row-major, `width * height` values).
    pub fn new_image(&self, data: &[f32], width: usize, height: usize) -> RuntimeResult<Image> {
        let shape = Shape::new(width, height)?;
        let matrix = Matrix::from_slice(Arc::clone(&self.context), shape, data)?;
        Ok(Image::new(matrix))
    }

    /// Decode an image file, choosing the codec by extension.
    pub fn load_image_from_file(&self, path: impl AsRef<Path>) -> RuntimeResult<Image> {
        let path = path.as_ref();
        let codec = codec_for_path(path).ok_or_else(|| {
            RuntimeError::DecodeFailure(format!("no codec for {}", path.display()))
        })?;
        let bytes = std::fs::read(path)?;
        let decoded = codec.decode(&bytes)?;
        let shape = Shape::new(decoded.width, decoded.height)?;
        debug!("loaded {} ({}, {})", path.display(), shape, codec.name());
        let matrix = Matrix::from_vec(Arc::clone(&self.context), shape, decoded.pixels)?;
        Ok(Image::new(matrix))
    }

    /// Encode `image` and write it to `path`, choosing the codec by extension.
    pub fn save_image_to_file(&self, image: &Image, path: impl AsRef<Path>) -> RuntimeResult<()> {
        let path = path.as_ref();
        let codec = codec_for_path(path).ok_or_else(|| {
            RuntimeError::EncodeFailure(format!("no codec for {}", path.display()))
        })?;
        let pixels = image.to_vec()?;
        let bytes = codec.encode(&pixels, image.width(), image.height())?;
        std::fs::write(path, bytes)?;
        debug!("saved {} ({}, {})", path.display(), image.shape(), codec.name());
        Ok(())
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// Resample to exactly `width x height` with the configured filter.
    pub fn resample(&self, image: &Image, width: usize, height: usize) -> RuntimeResult<Image> {
        let out_shape = Shape::new(width, height)?;
        let src = self.input(image)?;
        let out = self.output(out_shape)?;
        self.run(
            Kernel::Resample {
                src,
                shape: image.shape(),
                out: out.device_buffer()?,
                out_shape,
                filter: self.config.resample_filter,
            },
            &[&out],
        )?;
        Ok(Image::new(out).with_channels(image.channels()))
    }

    /// 2-D convolution; the result has the shape of `image`.
    pub fn convolve(&self, image: &Image, kernel: &Image) -> RuntimeResult<Image> {
        let src = self.input(image)?;
        let weights = self.input(kernel)?;
        let out = self.output(image.shape())?;
        self.run(
            Kernel::Convolve {
                src,
                shape: image.shape(),
                kernel: weights,
                kernel_shape: kernel.shape(),
                out: out.device_buffer()?,
            },
            &[&out],
        )?;
        Ok(Image::new(out).with_channels(image.channels()))
    }

    /// Element-wise `a + b`.
    pub fn add(&self, a: &Image, b: &Image) -> RuntimeResult<Image> {
        self.binary(a, b, |a, b, out| Kernel::Add { a, b, out })
    }

    /// Element-wise `a - b`.
    pub fn subtract(&self, a: &Image, b: &Image) -> RuntimeResult<Image> {
        self.binary(a, b, |a, b, out| Kernel::Subtract { a, b, out })
    }

    /// Every pixel multiplied by `scalar`.
    pub fn multiply_c(&self, image: &Image, scalar: f32) -> RuntimeResult<Image> {
        let src = self.input(image)?;
        let out = self.output(image.shape())?;
        self.run(
            Kernel::Scale {
                src,
                scalar,
                out: out.device_buffer()?,
            },
            &[&out],
        )?;
        Ok(Image::new(out).with_channels(image.channels()))
    }

    /// Maximum along `axis`: `0` per column, `1` per row, anything else global.
    pub fn max(&self, image: &Image, axis: i32) -> RuntimeResult<Image> {
        self.reduce_max(image, Axis::from_mode(axis)).map(|(image, _)| image)
    }

    /// Like [`max`](Self::max), also returning the flat offset of each maximum.
    ///
    /// Ties resolve to the first element in row-major order.
    pub fn max_idx(&self, image: &Image, axis: i32) -> RuntimeResult<ImageIndexPair> {
        let (maxima, index) = self.reduce_max(image, Axis::from_mode(axis))?;
        Ok(ImageIndexPair::new(maxima, index, image.shape()))
    }

    /// Gradient magnitude `sqrt(dx² + dy²)`.
    pub fn gradient_magnitude(&self, image: &Image) -> RuntimeResult<Image> {
        let src = self.input(image)?;
        let magnitude = self.output(image.shape())?;
        self.run(
            Kernel::Gradients {
                src,
                shape: image.shape(),
                magnitude: Some(magnitude.device_buffer()?),
                angle: None,
            },
            &[&magnitude],
        )?;
        Ok(Image::new(magnitude).with_channels(image.channels()))
    }

    /// Gradient direction `atan2(dy, dx)` in radians.
    pub fn gradient_angle(&self, image: &Image) -> RuntimeResult<Image> {
        let src = self.input(image)?;
        let angle = self.output(image.shape())?;
        self.run(
            Kernel::Gradients {
                src,
                shape: image.shape(),
                magnitude: None,
                angle: Some(angle.device_buffer()?),
            },
            &[&angle],
        )?;
        Ok(Image::new(angle).with_channels(image.channels()))
    }

    /// Magnitude and angle computed in a single pass.
    pub fn gradients(&self, image: &Image) -> RuntimeResult<ImageGradientVectorPair> {
        let src = self.input(image)?;
        let magnitude = self.output(image.shape())?;
        let angle = self.output(image.shape())?;
        self.run(
            Kernel::Gradients {
                src,
                shape: image.shape(),
                magnitude: Some(magnitude.device_buffer()?),
                angle: Some(angle.device_buffer()?),
            },
            &[&magnitude, &angle],
        )?;
        Ok(ImageGradientVectorPair {
            magnitude: Image::new(magnitude).with_channels(image.channels()),
            angle: Image::new(angle).with_channels(image.channels()),
        })
    }

    /// Unnormalized Gaussian kernel, resident on the accelerator.
    pub fn generate_gaussian(&self, shape: Shape, w: f32, h: f32) -> RuntimeResult<Image> {
        gaussian::generate_gaussian(&self.context, shape, w, h).map(Image::new)
    }

    /// Gaussian kernel scaled to unit mass.
    pub fn generate_gaussian_normalized(&self, shape: Shape, w: f32, h: f32) -> RuntimeResult<Image> {
        gaussian::generate_gaussian_normalized(&self.context, shape, w, h).map(Image::new)
    }

    /// The `k` brightest pixels, brightest first.
    pub fn rank_maxima(&self, image: &Image, k: usize) -> RuntimeResult<Vec<RankedPixel>> {
        self.check_context(image)?;
        ranking::rank_maxima(image, k)
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn check_context(&self, image: &Image) -> RuntimeResult<()> {
        let owner = image.matrix().context();
        if Arc::ptr_eq(owner, &self.context) {
            Ok(())
        } else {
            Err(RuntimeError::ForeignContext {
                device: owner.device_id(),
            })
        }
    }

    /// Device buffer of an operand, uploading if needed.
    fn input(&self, image: &Image) -> RuntimeResult<BufferId> {
        self.check_context(image)?;
        image.matrix().device_buffer()
    }

    fn output(&self, shape: Shape) -> RuntimeResult<Matrix> {
        Matrix::new_device(Arc::clone(&self.context), shape)
    }

    fn run(&self, kernel: Kernel, outputs: &[&Matrix]) -> RuntimeResult<KernelOutput> {
        let result = self.context.launch(&kernel)?;
        for matrix in outputs {
            matrix.mark_device_written();
        }
        Ok(result)
    }

    fn binary<F>(&self, a: &Image, b: &Image, make: F) -> RuntimeResult<Image>
    where
        F: FnOnce(BufferId, BufferId, BufferId) -> Kernel,
    {
        if a.shape() != b.shape() {
            return Err(RuntimeError::ShapeMismatch {
                expected: a.shape(),
                got: b.shape(),
            });
        }
        let (lhs, rhs) = (self.input(a)?, self.input(b)?);
        let out = self.output(a.shape())?;
        self.run(make(lhs, rhs, out.device_buffer()?), &[&out])?;
        Ok(Image::new(out).with_channels(a.channels()))
    }

    fn reduce_max(&self, image: &Image, axis: Axis) -> RuntimeResult<(Image, Vec<usize>)> {
        let src = self.input(image)?;
        let out = self.output(axis.output_shape(image.shape()))?;
        let result = self.run(
            Kernel::ReduceMax {
                src,
                shape: image.shape(),
                axis,
                out: out.device_buffer()?,
            },
            &[&out],
        )?;
        match result {
            KernelOutput::Indices(index) => Ok((Image::new(out), index)),
            KernelOutput::Done => Err(RuntimeError::kernel(
                "reduce_max",
                "accelerator returned no indices",
            )),
        }
    }
}
