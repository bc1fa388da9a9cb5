/*!
Image decoding and resampling.

Uploads are restricted to JPEG and PNG. Decoding sniffs the content so
a mislabelled file is still rejected, and resampling always uses the
same bilinear filter so repeated runs produce identical pixels.
 */

use crate::{descriptor::TargetSize, error::ScanError};
use image::{imageops::FilterType, DynamicImage, ImageFormat};

/// The accepted upload types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
}

impl MediaType {
    /// Accept a MIME type string, rejecting anything but JPEG and PNG.
    pub fn from_mime(mime: &str) -> Result<Self, ScanError> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            _ => Err(ScanError::UnsupportedMediaType(mime.to_owned())),
        }
    }

    /// Guess from a file extension, as a file picker would.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.mime())
    }
}

/// A `width * height` grid of RGBA8 samples, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA8 samples.
    ///
    /// # Errors
    ///
    /// Fails when `data` doesn't hold exactly four samples per pixel.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            anyhow::bail!(
                "a {}x{} RGBA buffer needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            );
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw samples as `[R, G, B, A, R, G, B, A, ...]`.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// The `[R, G, B, A]` samples of the pixel at `(x, y)`, or `None`
    /// outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let offset = (y as usize * self.width as usize + x as usize) * 4;
        match self.data.get(offset..offset + 4)? {
            &[r, g, b, a] => Some([r, g, b, a]),
            _ => None,
        }
    }
}

/// Decode JPEG or PNG bytes.
///
/// # Errors
///
/// Returns [`ScanError::Decode`] when the bytes are not a valid image of an accepted type.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ScanError> {
    let format = image::guess_format(bytes).map_err(|e| ScanError::Decode(e.to_string()))?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
        return Err(ScanError::Decode(format!(
            "{:?} images are not accepted",
            format
        )));
    }

    image::load_from_memory_with_format(bytes, format).map_err(|e| ScanError::Decode(e.to_string()))
}

/// Resample to exactly `target` with a bilinear filter, dropping to RGBA8.
pub fn resample(image: &DynamicImage, target: TargetSize) -> PixelBuffer {
    let resized = if image.width() == target.width && image.height() == target.height {
        image.to_rgba8()
    } else {
        image
            .resize_exact(target.width, target.height, FilterType::Triangle)
            .to_rgba8()
    };

    PixelBuffer {
        width: target.width,
        height: target.height,
        data: resized.into_raw(),
    }
}
