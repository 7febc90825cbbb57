//! A library for fast, in-place halftoning of 8-bit grayscale images to pure black and white.
//!
//! `halftone` uses Floyd–Steinberg error diffusion with integer arithmetic:
//! each pixel is thresholded to black or white, and the resulting error is carried
//! to the pixel on the right and to three pixels in the row below.
//! The average local brightness of the output approximates that of the input,
//! despite every output sample being either [`BLACK`] or [`WHITE`].
//!
//! # Features
//! To reduce dependencies and compile times, `halftone` has several `cargo` features
//! that can be turned off or on:
//! - `threads`: exposes a parallel batch API via [`rayon`].
//! - `image`: enables integration with the [`image`] crate.
//!
//! # Usage
//! For a one-off image, use [`halftone()`]:
//! ```
//! # fn main() -> Result<(), halftone::HalftoneError> {
//! let (width, height) = (4, 2);
//! let mut pixels = vec![10, 60, 110, 160, 210, 250, 128, 127];
//!
//! halftone::halftone(width, height, &mut pixels)?;
//! assert!(pixels.iter().all(|&p| p == 0 || p == 255));
//! # Ok(())
//! # }
//! ```
//!
//! To halftone many images without reallocating scratch space, keep a [`Halftoner`] around,
//! or share a [`ScratchPool`] between threads. With the `image` feature enabled:
//! ```no_run
//! # use halftone::Halftoner;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut halftoner = Halftoner::new();
//!
//! let mut img = image::open("some image")?.into_luma8();
//! halftoner.halftone_image(&mut img)?;
//!
//! // one bit per pixel, ready for a display controller
//! let packed = halftone::GrayBuffer::try_from(&mut img)?.pack();
//! # Ok(())
//! # }
//! ```
//!
//! Note that some of the functions above require certain features to be enabled.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::unreadable_literal
)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod halftone;
mod pack;
mod pool;
mod types;

pub use halftone::{halftone, Halftoner, BLACK, DEFAULT_WIDTH_LIMIT, THRESHOLD, WHITE};
pub use pack::PackedImage;
pub use pool::{ScratchGuard, ScratchPool};
pub use types::*;
