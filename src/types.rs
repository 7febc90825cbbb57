//! Contains various types needed across the crate.

use crate::PackedImage;
#[cfg(feature = "image")]
use image::GrayImage;

/// The error type returned when an image cannot be halftoned.
///
/// Every variant is detected before any pixel is modified,
/// so a buffer handed to a failing call is left exactly as it was.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalftoneError {
    /// The image has a width of zero.
    #[error("image width must be greater than zero")]
    ZeroWidth,

    /// `width * height` does not fit in a `usize`.
    #[error("image dimensions {width}x{height} overflow the addressable size")]
    DimensionsOverflow {
        /// The width of the image.
        width: u32,
        /// The height of the image.
        height: u32,
    },

    /// The pixel buffer holds fewer than `width * height` bytes.
    #[error("pixel buffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall {
        /// The number of bytes needed.
        required: usize,
        /// The length of the buffer that was provided.
        actual: usize,
    },

    /// The image width is at or above the scratch capacity of the halftoner.
    #[error("image width {width} is at or above the width limit of {limit}")]
    WidthLimit {
        /// The width of the image.
        width: u32,
        /// The exclusive width limit that was exceeded.
        limit: u32,
    },
}

/// Returns the number of pixels in a `width` by `height` image after validating the dimensions.
pub(crate) fn pixel_count(width: u32, height: u32, len: usize) -> Result<usize, HalftoneError> {
    if width == 0 {
        return Err(HalftoneError::ZeroWidth);
    }

    let required = (width as usize)
        .checked_mul(height as usize)
        .ok_or(HalftoneError::DimensionsOverflow { width, height })?;

    if len < required {
        return Err(HalftoneError::BufferTooSmall { required, actual: len });
    }

    Ok(required)
}

/// A mutable, row-major view of an 8-bit grayscale image.
///
/// This is a simple wrapper around `&'a mut [u8]` with the invariants that
/// the width is non-zero and that the slice holds at least `width * height` samples.
/// Any bytes past `width * height` are ignored.
///
/// # Examples
/// From a raw buffer:
/// ```
/// # use halftone::{GrayBuffer, HalftoneError};
/// # fn main() -> Result<(), HalftoneError> {
/// let mut pixels = vec![128; 4 * 3];
/// let buffer = GrayBuffer::new(&mut pixels, 4, 3)?;
/// assert_eq!(buffer.pixels().len(), 12);
/// # Ok(())
/// # }
/// ```
///
/// From an image (needs the `image` feature to be enabled):
/// ```no_run
/// # use halftone::GrayBuffer;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut img = image::open("some image")?.into_luma8();
/// let buffer = GrayBuffer::try_from(&mut img)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct GrayBuffer<'a> {
    /// The samples of the image, trimmed to exactly `width * height`.
    pixels: &'a mut [u8],
    /// The number of pixels in each row.
    width: u32,
    /// The number of rows.
    height: u32,
}

impl<'a> GrayBuffer<'a> {
    /// Creates a new [`GrayBuffer`] over the first `width * height` bytes of `pixels`.
    ///
    /// # Errors
    /// Returns an error if `width` is zero, if `width * height` overflows,
    /// or if `pixels` is shorter than `width * height`.
    pub fn new(pixels: &'a mut [u8], width: u32, height: u32) -> Result<Self, HalftoneError> {
        let len = pixel_count(width, height, pixels.len())?;
        Ok(Self { pixels: &mut pixels[..len], width, height })
    }

    /// Returns the width of the image.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the samples of the image.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.pixels
    }

    /// Returns the samples of the image as a mutable slice.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.pixels
    }

    /// Reborrows this view for a shorter lifetime.
    pub fn reborrow(&mut self) -> GrayBuffer<'_> {
        GrayBuffer { pixels: self.pixels, width: self.width, height: self.height }
    }

    /// Consumes the view, returning the underlying samples.
    #[must_use]
    pub fn into_inner(self) -> &'a mut [u8] {
        self.pixels
    }

    /// Packs the image into one bit per pixel.
    ///
    /// See [`PackedImage::from_gray`] for the layout.
    #[must_use]
    pub fn pack(&self) -> PackedImage {
        PackedImage::from_validated(self.pixels, self.width, self.height)
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a mut GrayImage> for GrayBuffer<'a> {
    type Error = HalftoneError;

    fn try_from(image: &'a mut GrayImage) -> Result<Self, Self::Error> {
        let (width, height) = image.dimensions();
        Self::new(image, width, height)
    }
}
