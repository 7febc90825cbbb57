#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice
)]

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use clap::Parser;
use halftone::{GrayBuffer, Halftoner, PackedImage, DEFAULT_WIDTH_LIMIT};
use image::imageops::FilterType;
use log::info;

#[derive(Parser)]
pub struct Options {
    /// Any image format the `image` crate can decode. Color images are converted to luma.
    input: PathBuf,

    /// Written as a binary PBM (P4) if the extension is `.pbm`, otherwise by the `image` crate.
    output: PathBuf,

    /// Resize the image to this width before halftoning, keeping the aspect ratio.
    #[arg(long)]
    width: Option<u32>,

    /// Reject images at or above this width.
    #[arg(long, default_value_t = DEFAULT_WIDTH_LIMIT)]
    width_limit: u32,

    /// Invert the image before halftoning.
    #[arg(long)]
    invert: bool,
}

fn write_pbm(path: &Path, packed: &PackedImage) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P4\n{} {}\n", packed.width(), packed.height())?;
    // PBM uses set bits for black
    let bytes = packed.as_raw_slice().iter().map(|&b| !b).collect::<Vec<_>>();
    out.write_all(&bytes)?;
    out.flush()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .format_timestamp_micros()
        .init();

    let options = Options::parse();

    let mut image = image::open(&options.input)?;
    if let Some(width) = options.width {
        let height = (u64::from(image.height()) * u64::from(width) / u64::from(image.width()))
            .try_into()
            .unwrap_or(u32::MAX);
        image = image.resize_exact(width, height.max(1), FilterType::Triangle);
    }
    let mut image = image.into_luma8();
    if options.invert {
        image::imageops::invert(&mut image);
    }

    let (width, height) = image.dimensions();
    info!("loaded {}: {width}x{height}", options.input.display());

    let start = Instant::now();
    Halftoner::with_width_limit(options.width_limit).halftone_image(&mut image)?;
    info!("halftoned in {:?}", start.elapsed());

    let is_pbm = options
        .output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pbm"));

    if is_pbm {
        let packed = GrayBuffer::try_from(&mut image)?.pack();
        write_pbm(&options.output, &packed)?;
    } else {
        image.save(&options.output)?;
    }

    info!("wrote {}", options.output.display());
    Ok(())
}
