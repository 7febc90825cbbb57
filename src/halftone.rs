//! Contains the error diffusion halftoning kernel.
//!
//! The kernel is Floyd–Steinberg with integer arithmetic:
//!
//! ```text
//!        X   7
//!    3   5   1      (/ 16)
//! ```
//!
//! Each diffused share is `(error * weight) >> 4`, which rounds toward negative infinity.
//! Rows are processed strictly top to bottom, left to right, and only two rows of
//! accumulated error are kept at any time.

use crate::{GrayBuffer, HalftoneError};
use log::{debug, trace};
use std::iter;

#[cfg(feature = "image")]
use image::GrayImage;

/// Pre-threshold values below this become [`BLACK`], all others become [`WHITE`].
pub const THRESHOLD: u8 = 128;

/// The output value for black pixels.
pub const BLACK: u8 = 0;

/// The output value for white pixels.
pub const WHITE: u8 = u8::MAX;

/// The default width limit for a [`Halftoner`].
///
/// Images with a width at or above this limit are rejected.
pub const DEFAULT_WIDTH_LIMIT: u32 = 16368;

/// Share of the error given to the pixel on the right.
const RIGHT: i32 = 7;
/// Share of the error given to the pixel below and to the left.
const BELOW_LEFT: i32 = 3;
/// Share of the error given to the pixel below.
const BELOW: i32 = 5;
/// Share of the error given to the pixel below and to the right.
const BELOW_RIGHT: i32 = 1;

const _: () = assert!(RIGHT + BELOW_LEFT + BELOW + BELOW_RIGHT == 16);

/// Returns `weight / 16` of `error`, rounded toward negative infinity.
#[inline]
const fn share(error: i32, weight: i32) -> i32 {
    (error * weight) >> 4
}

/// Maps a pre-threshold value to its output level.
#[inline]
fn quantize(value: i32) -> u8 {
    if value < i32::from(THRESHOLD) {
        BLACK
    } else {
        WHITE
    }
}

/// The accumulated error for the row being thresholded and the row below it.
///
/// Both rows are `width + 2` long: column `x` lives at index `x + 1`,
/// and indices `0` and `width + 1` are sentinels that stay zero.
struct ErrorRows<'a> {
    /// The number of pixels in a row.
    width: usize,
    /// The error for the row being thresholded.
    this_err: &'a mut [i32],
    /// The error for the row below, filled in while scanning.
    next_err: &'a mut [i32],
}

impl<'a> ErrorRows<'a> {
    /// The number of scratch elements needed for an image of the given width.
    const fn buf_len(width: usize) -> usize {
        2 * (width + 2)
    }

    /// Creates new `ErrorRows` over the front of `buf`, seeded with the first row of the image.
    fn new(first_row: &[u8], buf: &'a mut [i32]) -> Self {
        let width = first_row.len();
        let (this_err, next_err) = buf[..Self::buf_len(width)].split_at_mut(width + 2);

        this_err[0] = 0;
        this_err[width + 1] = 0;
        for (e, &p) in this_err[1..=width].iter_mut().zip(first_row) {
            *e = i32::from(p);
        }
        next_err.fill(0);

        Self { width, this_err, next_err }
    }

    /// Thresholds one row in place, accumulating its error into the row below.
    ///
    /// `below` yields the original samples of the next image row,
    /// or nothing if `row` is the last row.
    #[inline]
    fn diffuse_row(&mut self, row: &mut [u8], below: impl Iterator<Item = u8>) {
        let Self { width, this_err, next_err } = self;
        let width = *width;

        // error headed for the next column
        let mut right = 0;
        // error staged for the row below, one and two columns behind
        let mut lag1 = 0;
        let mut lag2 = 0;

        // the baseline of next_err[x] is the sample below x - 1
        let mut baseline = iter::once(0).chain(below).map(i32::from);

        for (x, (pixel, &acc)) in row.iter_mut().zip(&this_err[1..=width]).enumerate() {
            let value = acc + right;
            let level = quantize(value);
            *pixel = level;

            let err = value - i32::from(level);
            right = share(err, RIGHT);
            next_err[x] = baseline.next().unwrap_or(0) + lag1 + share(err, BELOW_LEFT);
            lag1 = lag2 + share(err, BELOW);
            lag2 = share(err, BELOW_RIGHT);
        }

        next_err[width] = baseline.next().unwrap_or(0) + lag1;
        // column 0 deposits its below-left share into the left sentinel
        next_err[0] = 0;
    }

    /// Swaps the error rows for the next row of pixels.
    ///
    /// The new `next_err` needs no reset since every column is written before it is read.
    #[inline]
    fn next_row(&mut self) {
        std::mem::swap(&mut self.this_err, &mut self.next_err);
    }
}

/// Halftones `pixels` in place using `scratch` for the error rows.
///
/// `scratch` must hold at least `ErrorRows::buf_len(width)` elements.
fn halftone_rows(pixels: &mut [u8], width: usize, scratch: &mut [i32]) {
    let Some(first_row) = pixels.get(..width) else {
        return;
    };

    let mut error = ErrorRows::new(first_row, scratch);
    let mut rest = pixels;
    while !rest.is_empty() {
        let (row, below) = std::mem::take(&mut rest).split_at_mut(width);
        let next = below.get(..width).unwrap_or_default();
        error.diffuse_row(row, next.iter().copied());
        error.next_row();
        rest = below;
    }
}

/// Halftones a `width` by `height` grayscale image in place.
///
/// After this returns `Ok`, each of the first `width * height` bytes of `pixels`
/// is either [`BLACK`] or [`WHITE`]. Bytes past `width * height` are not touched.
///
/// This allocates fresh scratch space on every call.
/// To reuse scratch space across calls, see [`Halftoner`] or [`ScratchPool`](crate::ScratchPool).
///
/// # Errors
/// Returns an error, without modifying `pixels`, if `width` is zero,
/// if `width` is at or above [`DEFAULT_WIDTH_LIMIT`],
/// or if `pixels` holds fewer than `width * height` bytes.
///
/// # Examples
/// ```
/// # use halftone::HalftoneError;
/// # fn main() -> Result<(), HalftoneError> {
/// let mut pixels = vec![100, 200];
/// halftone::halftone(2, 1, &mut pixels)?;
/// assert_eq!(pixels, [0, 255]);
/// # Ok(())
/// # }
/// ```
pub fn halftone(width: u32, height: u32, pixels: &mut [u8]) -> Result<(), HalftoneError> {
    Halftoner::new().halftone_slice(width, height, pixels)
}

/// Performs halftoning while holding on to its scratch space between images.
///
/// The scratch space grows to fit the widest image seen so far,
/// but never past what the width limit allows.
/// Because halftoning takes `&mut self`, a [`Halftoner`] can never be used by
/// two images at once. To share scratch space across threads, use a
/// [`ScratchPool`](crate::ScratchPool).
///
/// # Examples
/// ```
/// # use halftone::{GrayBuffer, Halftoner, HalftoneError};
/// # fn main() -> Result<(), HalftoneError> {
/// let mut halftoner = Halftoner::new();
///
/// let mut a = vec![64; 32 * 32];
/// halftoner.halftone(GrayBuffer::new(&mut a, 32, 32)?)?;
///
/// let mut b = vec![192; 8 * 8];
/// halftoner.halftone_slice(8, 8, &mut b)?;
///
/// assert!(a.iter().chain(&b).all(|&p| p == 0 || p == 255));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Halftoner {
    /// Backing storage for the two error rows.
    scratch: Vec<i32>,
    /// Images must have a width strictly less than this.
    width_limit: u32,
}

impl Halftoner {
    /// Creates a new [`Halftoner`] with the [`DEFAULT_WIDTH_LIMIT`].
    #[must_use]
    pub const fn new() -> Self {
        Self::with_width_limit(DEFAULT_WIDTH_LIMIT)
    }

    /// Creates a new [`Halftoner`] that rejects images with a width at or above `width_limit`.
    #[must_use]
    pub const fn with_width_limit(width_limit: u32) -> Self {
        Self { scratch: Vec::new(), width_limit }
    }

    /// Gets the width limit for this [`Halftoner`].
    #[must_use]
    pub const fn width_limit(&self) -> u32 {
        self.width_limit
    }

    /// Creates a new [`Halftoner`] around previously used scratch space.
    pub(crate) const fn from_scratch(scratch: Vec<i32>, width_limit: u32) -> Self {
        Self { scratch, width_limit }
    }

    /// Takes the scratch space, leaving this [`Halftoner`] with none.
    pub(crate) fn take_scratch(&mut self) -> Vec<i32> {
        std::mem::take(&mut self.scratch)
    }

    /// Returns the number of scratch elements currently allocated.
    pub(crate) fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    /// Checks that an image of the given width fits in the scratch space.
    fn check_width(&self, width: u32) -> Result<(), HalftoneError> {
        if width >= self.width_limit {
            Err(HalftoneError::WidthLimit { width, limit: self.width_limit })
        } else {
            Ok(())
        }
    }

    /// Halftones the given image in place.
    ///
    /// # Errors
    /// Returns an error, without modifying the image,
    /// if the image width is at or above [`Halftoner::width_limit`].
    pub fn halftone(&mut self, mut image: GrayBuffer) -> Result<(), HalftoneError> {
        self.check_width(image.width())?;

        let width = image.width() as usize;
        debug!("halftoning {}x{} image", image.width(), image.height());

        let len = ErrorRows::buf_len(width);
        if self.scratch.len() < len {
            trace!("growing halftone scratch from {} to {len} elements", self.scratch.len());
            self.scratch.resize(len, 0);
        }

        halftone_rows(image.pixels_mut(), width, &mut self.scratch);
        Ok(())
    }

    /// Halftones a `width` by `height` grayscale image in place.
    ///
    /// # Errors
    /// Returns an error, without modifying `pixels`, if `width` is zero,
    /// if `width` is at or above [`Halftoner::width_limit`],
    /// or if `pixels` holds fewer than `width * height` bytes.
    pub fn halftone_slice(
        &mut self,
        width: u32,
        height: u32,
        pixels: &mut [u8],
    ) -> Result<(), HalftoneError> {
        self.halftone(GrayBuffer::new(pixels, width, height)?)
    }

    /// Halftones a [`GrayImage`] in place.
    ///
    /// # Errors
    /// Returns an error, without modifying `image`,
    /// if the image width is zero or at or above [`Halftoner::width_limit`].
    #[cfg(feature = "image")]
    pub fn halftone_image(&mut self, image: &mut GrayImage) -> Result<(), HalftoneError> {
        self.halftone(GrayBuffer::try_from(image)?)
    }
}

impl Default for Halftoner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    /// Full-frame Floyd–Steinberg with the same rounding, diffusing into a copy of the whole image.
    fn naive_halftone(width: usize, height: usize, pixels: &mut [u8]) {
        let mut acc = pixels.iter().map(|&p| i32::from(p)).collect::<Vec<_>>();
        for y in 0..height {
            for x in 0..width {
                let value = acc[y * width + x];
                let level = quantize(value);
                pixels[y * width + x] = level;
                let err = value - i32::from(level);

                if x + 1 < width {
                    acc[y * width + x + 1] += share(err, RIGHT);
                }
                if y + 1 < height {
                    if x > 0 {
                        acc[(y + 1) * width + x - 1] += share(err, BELOW_LEFT);
                    }
                    acc[(y + 1) * width + x] += share(err, BELOW);
                    if x + 1 < width {
                        acc[(y + 1) * width + x + 1] += share(err, BELOW_RIGHT);
                    }
                }
            }
        }
    }

    #[test]
    fn worked_example() {
        let mut pixels = vec![100, 200];
        halftone(2, 1, &mut pixels).unwrap();
        assert_eq!(pixels, [0, 255]);
    }

    #[test]
    fn single_pixel_threshold() {
        for value in 0..=u8::MAX {
            let mut pixels = [value];
            halftone(1, 1, &mut pixels).unwrap();
            let expected = if value < THRESHOLD { BLACK } else { WHITE };
            assert_eq!(pixels, [expected], "input {value}");
        }
    }

    #[test]
    fn flat_fields_are_stable() {
        for (width, height) in [(1, 1), (1, 9), (9, 1), (17, 13)] {
            let len = width as usize * height as usize;

            let mut black = vec![BLACK; len];
            halftone(width, height, &mut black).unwrap();
            assert!(black.iter().all(|&p| p == BLACK));

            let mut white = vec![WHITE; len];
            halftone(width, height, &mut white).unwrap();
            assert!(white.iter().all(|&p| p == WHITE));
        }
    }

    #[test]
    fn output_is_binary() {
        for (width, height) in test_sizes() {
            let mut pixels = noise_image(width, height, 1);
            halftone(width, height, &mut pixels).unwrap();
            assert!(pixels.iter().all(|&p| p == BLACK || p == WHITE));
        }
    }

    #[test]
    fn deterministic() {
        let (width, height) = (61, 47);
        let original = noise_image(width, height, 2);

        let mut a = original.clone();
        let mut b = original;
        halftone(width, height, &mut a).unwrap();
        halftone(width, height, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn naive_reference_oracle() {
        for (seed, (width, height)) in (0..).zip(test_sizes()) {
            let original = noise_image(width, height, seed);

            let mut expected = original.clone();
            naive_halftone(width as usize, height as usize, &mut expected);

            let mut actual = original;
            halftone(width, height, &mut actual).unwrap();

            assert_eq!(expected, actual, "{width}x{height}");
        }
    }

    #[test]
    fn gradient_matches_naive_reference() {
        let (width, height) = (256, 64);
        let original = gradient_image(width, height);

        let mut expected = original.clone();
        naive_halftone(width as usize, height as usize, &mut expected);

        let mut actual = original;
        halftone(width, height, &mut actual).unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn preserves_average_brightness() {
        let (width, height) = (64, 64);
        for gray in [32u8, 77, 128, 200] {
            let mut pixels = vec![gray; width as usize * height as usize];
            halftone(width, height, &mut pixels).unwrap();

            #[allow(clippy::cast_precision_loss)]
            let white_ratio =
                pixels.iter().filter(|&&p| p == WHITE).count() as f64 / pixels.len() as f64;
            let expected = f64::from(gray) / 255.0;
            assert!((white_ratio - expected).abs() < 0.05, "{gray}: {white_ratio}");
        }
    }

    #[test]
    fn shares_round_toward_negative_infinity() {
        assert_eq!(share(100, RIGHT), 43);
        assert_eq!(share(-12, RIGHT), -6);
        assert_eq!(share(-1, BELOW_RIGHT), -1);
        assert_eq!(share(15, BELOW_RIGHT), 0);
        assert_eq!(share(-16, BELOW), -5);
    }

    #[test]
    fn shares_conserve_error() {
        for err in -4080..=4080 {
            let total = share(err, RIGHT)
                + share(err, BELOW_LEFT)
                + share(err, BELOW)
                + share(err, BELOW_RIGHT);

            assert!(total <= err && err - total < 4, "{err}: {total}");
        }
    }

    #[test]
    fn zero_height_is_noop() {
        let mut pixels = vec![77; 4];
        halftone(4, 0, &mut pixels).unwrap();
        assert_eq!(pixels, [77; 4]);

        halftone(3, 0, &mut []).unwrap();
    }

    #[test]
    fn trailing_bytes_untouched() {
        let (width, height) = (5, 3);
        let mut pixels = noise_image(width, height + 1, 3);
        let tail = pixels[15..].to_vec();

        halftone(width, height, &mut pixels).unwrap();
        assert_eq!(&pixels[15..], tail.as_slice());
        assert!(pixels[..15].iter().all(|&p| p == BLACK || p == WHITE));
    }

    #[test]
    fn last_row_ignores_read_ahead() {
        let (width, height) = (9, 4);
        let original = noise_image(width, height, 4);

        let mut exact = original.clone();
        halftone(width, height, &mut exact).unwrap();

        // whatever follows the image must not influence it
        for fill in [BLACK, 77, WHITE] {
            let mut padded = original.clone();
            padded.extend(iter::repeat(fill).take(width as usize));
            halftone(width, height, &mut padded).unwrap();
            assert_eq!(&padded[..exact.len()], exact.as_slice());
        }
    }

    #[test]
    fn rejects_without_mutation() {
        let original = noise_image(8, 8, 5);

        let mut pixels = original.clone();
        assert_eq!(halftone(0, 8, &mut pixels), Err(HalftoneError::ZeroWidth));
        assert_eq!(pixels, original);

        assert_eq!(
            halftone(8, 9, &mut pixels),
            Err(HalftoneError::BufferTooSmall { required: 72, actual: 64 })
        );
        assert_eq!(pixels, original);

        let mut halftoner = Halftoner::with_width_limit(8);
        assert_eq!(
            halftoner.halftone_slice(8, 8, &mut pixels),
            Err(HalftoneError::WidthLimit { width: 8, limit: 8 })
        );
        assert_eq!(pixels, original);
    }

    #[test]
    fn width_limit() {
        let width = DEFAULT_WIDTH_LIMIT;
        let mut pixels = vec![128; width as usize];
        assert_eq!(
            halftone(width, 1, &mut pixels),
            Err(HalftoneError::WidthLimit { width, limit: DEFAULT_WIDTH_LIMIT })
        );
        assert!(pixels.iter().all(|&p| p == 128));

        halftone(width - 1, 1, &mut pixels).unwrap();
        assert!(pixels[..(width as usize - 1)].iter().all(|&p| p == BLACK || p == WHITE));
        assert_eq!(pixels[width as usize - 1], 128);
    }

    #[test]
    fn reused_scratch_matches_fresh() {
        let mut halftoner = Halftoner::new();

        // wide, then narrow, then wide again so stale scratch would show up
        for (seed, (width, height)) in (10..).zip([(97, 5), (3, 40), (1, 7), (64, 64), (97, 5)]) {
            let original = noise_image(width, height, seed);

            let mut expected = original.clone();
            halftone(width, height, &mut expected).unwrap();

            let mut actual = original;
            halftoner.halftone_slice(width, height, &mut actual).unwrap();

            assert_eq!(expected, actual, "{width}x{height}");
        }

        assert_eq!(halftoner.scratch_len(), ErrorRows::buf_len(97));
    }

    #[cfg(feature = "image")]
    #[test]
    fn halftone_gray_image() {
        let (width, height) = (33, 21);
        let original = noise_image(width, height, 6);

        let mut expected = original.clone();
        halftone(width, height, &mut expected).unwrap();

        let mut image = GrayImage::from_raw(width, height, original).unwrap();
        Halftoner::new().halftone_image(&mut image).unwrap();

        assert_eq!(image.into_raw(), expected);
    }
}
