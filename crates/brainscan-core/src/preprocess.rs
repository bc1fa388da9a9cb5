// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

/*!
Conversion from pixels to normalized model input.

The output is laid out row-major and channel-last: the value for pixel
`(x, y)` and channel `c` lives at `(y * width + x) * channels + c`.
Alpha is always dropped.

| Mode      | Channels | Value                                          |
| --------- | -------- | ---------------------------------------------- |
| Grayscale | 1        | `(0.299 R + 0.587 G + 0.114 B) / 255`          |
| Rgb       | 3        | `R / 255`, `G / 255`, `B / 255` in that order  |

With the `threaded` feature rows are converted on the rayon pool. Each
output value depends on one pixel only, so the result is identical.
 */

use crate::{
    descriptor::{ChannelMode, ModelDescriptor},
    error::ScanError,
    pixels::{resample, PixelBuffer},
    tensor::Tensor,
};
use image::DynamicImage;

#[cfg(feature = "threaded")]
use rayon::prelude::*;

#[inline]
fn convert(dst: &mut [f32], px: &[u8], mode: ChannelMode) {
    let (r, g, b) = (px[0] as f64, px[1] as f64, px[2] as f64);
    match mode {
        ChannelMode::Grayscale => {
            dst[0] = ((0.299 * r + 0.587 * g + 0.114 * b) / 255.0) as f32;
        }
        ChannelMode::Rgb => {
            dst[0] = (r / 255.0) as f32;
            dst[1] = (g / 255.0) as f32;
            dst[2] = (b / 255.0) as f32;
        }
    }
}

/// Convert `pixels` to a flat NHWC buffer of `width * height * channels` values.
pub fn to_tensor_data(pixels: &PixelBuffer, mode: ChannelMode) -> Vec<f32> {
    let channels = mode.channels();
    let count = pixels.width() as usize * pixels.height() as usize;
    let mut out = vec![0.0f32; count * channels];

    #[cfg(feature = "threaded")]
    out.par_chunks_exact_mut(channels)
        .zip(pixels.as_raw().par_chunks_exact(4))
        .for_each(|(dst, px)| convert(dst, px, mode));

    #[cfg(not(feature = "threaded"))]
    out.chunks_exact_mut(channels)
        .zip(pixels.as_raw().chunks_exact(4))
        .for_each(|(dst, px)| convert(dst, px, mode));

    out
}

/// Resample `image` for `descriptor` and build its input tensor.
///
/// # Errors
///
/// Fails fast with [`ScanError::ConfigMismatch`] if the descriptor is
/// inconsistent, rather than producing a buffer in the wrong layout.
pub fn prepare(descriptor: &ModelDescriptor, image: &DynamicImage) -> Result<Tensor, ScanError> {
    descriptor.validate()?;

    let pixels = resample(image, descriptor.target_size);
    let data = to_tensor_data(&pixels, descriptor.channel_mode());

    Tensor::new(descriptor.input_shape.clone(), data)
        .map_err(|e| ScanError::config(&descriptor.id, e.to_string()))
}
