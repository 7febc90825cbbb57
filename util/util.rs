#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use image::GrayImage;

/// Set this to a directory of images to benchmark on real photos as well.
pub const IMAGE_DIR_VAR: &str = "HALFTONE_BENCH_IMAGES";

pub fn load_images(images: &[PathBuf]) -> Vec<(String, GrayImage)> {
    images
        .iter()
        .map(|path| {
            image::open(path).map(|image| {
                (
                    path.file_name().unwrap().to_owned().into_string().unwrap(),
                    image.into_luma8(),
                )
            })
        })
        .collect::<Result<_, _>>()
        .expect("loaded each image")
}

pub fn load_image_dir(dir: impl AsRef<Path>) -> Vec<(String, GrayImage)> {
    let mut paths = std::fs::read_dir(dir)
        .expect("read img directory")
        .collect::<Result<Vec<_>, _>>()
        .expect("read each file")
        .iter()
        .map(std::fs::DirEntry::path)
        .collect::<Vec<_>>();

    paths.sort();

    load_images(&paths)
}

/// A horizontal ramp from black to white, repeated on every row.
pub fn gradient(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| {
        image::Luma([(u64::from(x) * 255 / u64::from((width - 1).max(1))) as u8])
    })
}

/// A smooth, non-repeating pattern with detail in both directions.
pub fn rings(width: u32, height: u32) -> GrayImage {
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    GrayImage::from_fn(width, height, |x, y| {
        let (dx, dy) = (f64::from(x) - cx, f64::from(y) - cy);
        let r = (dx * dx + dy * dy).sqrt();
        image::Luma([(127.5 + 127.5 * (r / 12.0).sin()) as u8])
    })
}

pub fn synthetic_images() -> Vec<(String, GrayImage)> {
    [(640, 480), (1448, 1072), (3840, 2160)]
        .into_iter()
        .flat_map(|(w, h)| {
            [
                (format!("gradient_{w}x{h}"), gradient(w, h)),
                (format!("rings_{w}x{h}"), rings(w, h)),
            ]
        })
        .collect()
}

static BENCHMARK_IMAGES: OnceLock<Vec<(String, GrayImage)>> = OnceLock::new();

pub fn load_benchmark_images() -> Vec<(String, GrayImage)> {
    let mut images = synthetic_images();
    if let Some(dir) = std::env::var_os(IMAGE_DIR_VAR) {
        images.extend(load_image_dir(dir));
    }
    images
}

pub fn benchmark_images() -> &'static [(String, GrayImage)] {
    BENCHMARK_IMAGES.get_or_init(load_benchmark_images)
}
