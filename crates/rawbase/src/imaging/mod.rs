//! Pixel-level operations: resize and crop, tile splitting, JPEG compression.

pub mod subsample;
pub mod tiles;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use crate::config::ResizeConfig;
use crate::error::ImageOpError;
use crate::profile::DevelopmentProfile;

pub use subsample::{plan, SubsamplePlan};
pub use tiles::{tile_grid, TileRect};

/// Settings for the subsampling stage that do not vary per image.
#[derive(Debug, Clone)]
pub struct SubsampleSettings {
    pub resize: ResizeConfig,
    pub grayscale: bool,
}

/// Tiles written by [`ImageOps::split_tiles`] and the ones that failed.
#[derive(Debug, Default)]
pub struct TileReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl TileReport {
    /// Size of the grid that was attempted.
    pub fn planned(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

pub trait ImageOps: Send + Sync {
    /// Resizes and crops `input` into `output`, returning the factor applied.
    fn subsample(
        &self,
        input: &Path,
        output: &Path,
        profile: &DevelopmentProfile,
        settings: &SubsampleSettings,
    ) -> Result<f64, ImageOpError>;

    fn compress_jpeg(&self, input: &Path, output: &Path, quality: u8)
        -> Result<(), ImageOpError>;

    /// Writes `<dir>/<base>_<k>.tif` for every tile of the grid.
    fn split_tiles(
        &self,
        input: &Path,
        dir: &Path,
        base: &str,
        count: u32,
    ) -> Result<TileReport, ImageOpError>;
}

/// [`ImageOps`] on top of the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageToolkit;

fn open(path: &Path) -> Result<DynamicImage, ImageOpError> {
    image::open(path).map_err(|e| ImageOpError::Decode {
        path: path.to_path_buf(),
        source: e,
    })
}

fn save_tiff(img: &DynamicImage, path: &Path) -> Result<(), ImageOpError> {
    img.save_with_format(path, ImageFormat::Tiff)
        .map_err(|e| ImageOpError::Encode {
            path: path.to_path_buf(),
            source: e,
        })
}

impl ImageOps for ImageToolkit {
    fn subsample(
        &self,
        input: &Path,
        output: &Path,
        profile: &DevelopmentProfile,
        settings: &SubsampleSettings,
    ) -> Result<f64, ImageOpError> {
        let img = open(input)?;
        let plan = subsample::plan(
            img.width(),
            img.height(),
            profile.subsampling,
            profile.crop,
            profile.resize_weight,
            &settings.resize,
        )?;
        debug!(
            "Subsampling {}x{} by {:.5} to {:?}, crop {}x{} at {:?}",
            img.width(),
            img.height(),
            plan.factor,
            plan.resized,
            plan.crop.width,
            plan.crop.height,
            plan.offset
        );

        let resized = if plan.resizes() {
            img.resize_exact(plan.resized.0, plan.resized.1, profile.kernel.filter())
        } else {
            img
        };
        let mut cropped = resized.crop_imm(
            plan.offset.0,
            plan.offset.1,
            plan.crop.width,
            plan.crop.height,
        );
        if settings.grayscale {
            cropped = DynamicImage::ImageLuma16(cropped.to_luma16());
        }
        save_tiff(&cropped, output)?;
        Ok(plan.factor)
    }

    fn compress_jpeg(
        &self,
        input: &Path,
        output: &Path,
        quality: u8,
    ) -> Result<(), ImageOpError> {
        let img = open(input)?;
        let file = File::create(output).map_err(|e| ImageOpError::Write {
            path: output.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);
        let encoded = {
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            if img.color().has_color() {
                encoder.encode_image(&img.to_rgb8())
            } else {
                encoder.encode_image(&img.to_luma8())
            }
        };
        encoded.map_err(|e| ImageOpError::Encode {
            path: output.to_path_buf(),
            source: e,
        })?;

        // A short write only surfaces here, not in the encoder.
        writer
            .flush()
            .and_then(|_| writer.get_ref().sync_all())
            .map_err(|e| ImageOpError::Write {
                path: output.to_path_buf(),
                source: e,
            })
    }

    fn split_tiles(
        &self,
        input: &Path,
        dir: &Path,
        base: &str,
        count: u32,
    ) -> Result<TileReport, ImageOpError> {
        let img = open(input)?;
        let mut report = TileReport::default();
        for tile in tiles::tile_grid(img.width(), img.height(), count)? {
            let path = dir.join(format!("{}_{}.tif", base, tile.index));
            let part = img.crop_imm(tile.x, tile.y, tile.width, tile.height);
            match save_tiff(&part, &path) {
                Ok(()) => report.written.push(path),
                Err(e) => {
                    warn!("Tile {} failed: {}", path.display(), e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}
