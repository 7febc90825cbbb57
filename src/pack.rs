//! Contains the packed one bit per pixel representation of a halftoned image.

use crate::{types::pixel_count, HalftoneError, BLACK, THRESHOLD, WHITE};
use bitvec::{order::Msb0, slice::BitSlice, vec::BitVec};

/// A bilevel image stored as one bit per pixel.
///
/// A set bit is a white pixel (a sample at or above [`THRESHOLD`]) and a cleared bit is black.
/// Bits are stored most significant first within each byte,
/// and each row is padded with cleared bits up to a whole number of bytes.
/// This is the layout expected by most 1-bit display controllers;
/// for PBM (`P4`) output, invert the bytes since PBM uses set bits for black.
///
/// # Examples
/// ```
/// # use halftone::{PackedImage, HalftoneError};
/// # fn main() -> Result<(), HalftoneError> {
/// let pixels = [255, 0, 0, 255, 255, 255, 0, 0, 255, 0];
/// let packed = PackedImage::from_gray(&pixels, 10, 1)?;
/// assert_eq!(packed.row_bytes(), 2);
/// assert_eq!(packed.as_raw_slice(), [0b1001_1100, 0b1000_0000]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedImage {
    /// The packed rows, including padding.
    bits: BitVec<u8, Msb0>,
    /// The number of pixels in each row.
    width: u32,
    /// The number of rows.
    height: u32,
}

impl PackedImage {
    /// Packs the first `width * height` samples of `pixels`.
    ///
    /// # Errors
    /// Returns an error if `width` is zero, if `width * height` overflows,
    /// or if `pixels` is shorter than `width * height`.
    pub fn from_gray(pixels: &[u8], width: u32, height: u32) -> Result<Self, HalftoneError> {
        let len = pixel_count(width, height, pixels.len())?;
        Ok(Self::from_validated(&pixels[..len], width, height))
    }

    /// Packs `pixels`, which must hold exactly `width * height` samples.
    pub(crate) fn from_validated(pixels: &[u8], width: u32, height: u32) -> Self {
        let row_bits = width.div_ceil(8) as usize * 8;
        let mut bits = BitVec::with_capacity(row_bits * height as usize);

        for row in pixels.chunks_exact(width as usize) {
            bits.extend(row.iter().map(|&p| p >= THRESHOLD));
            bits.resize(bits.len().next_multiple_of(row_bits), false);
        }

        Self { bits, width, height }
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

    /// Returns the number of bytes in each packed row.
    #[must_use]
    pub const fn row_bytes(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    /// Returns the packed bytes, row after row.
    #[must_use]
    pub fn as_raw_slice(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// Returns the pixels of row `y`, excluding padding.
    #[must_use]
    pub fn row(&self, y: u32) -> Option<&BitSlice<u8, Msb0>> {
        if y < self.height {
            let start = y as usize * self.row_bytes() * 8;
            Some(&self.bits[start..(start + self.width as usize)])
        } else {
            None
        }
    }

    /// Returns whether the pixel at `(x, y)` is white.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<bool> {
        if x < self.width {
            self.row(y).map(|row| row[x as usize])
        } else {
            None
        }
    }

    /// Returns the number of white pixels.
    #[must_use]
    pub fn count_white(&self) -> usize {
        // padding bits are always cleared
        self.bits.count_ones()
    }

    /// Unpacks the image back to one byte per pixel holding [`BLACK`] or [`WHITE`].
    #[must_use]
    pub fn unpack(&self) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            if let Some(row) = self.row(y) {
                pixels.extend(row.iter().by_vals().map(|white| if white { WHITE } else { BLACK }));
            }
        }
        pixels
    }
}
