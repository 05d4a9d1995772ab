//! Geometry of the resize-and-crop stage.
//!
//! `lower` is the smallest factor that still lets the crop fit on both axes.
//! Resizing never goes below it, so the crop window always lies inside the
//! resized image.

use crate::config::ResizeConfig;
use crate::error::ImageOpError;
use crate::profile::{CropSize, SubsamplingMode};

/// Where to resize to and which window to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubsamplePlan {
    pub factor: f64,
    /// Dimensions after resizing; equal to the input for crop-only plans.
    pub resized: (u32, u32),
    /// Top-left corner of the crop window in the resized image.
    pub offset: (u32, u32),
    pub crop: CropSize,
}

impl SubsamplePlan {
    pub fn resizes(&self) -> bool {
        self.factor != 1.0
    }
}

fn lower_bound(width: u32, height: u32, crop: CropSize) -> f64 {
    let by_width = crop.width as f64 / width as f64;
    let by_height = crop.height as f64 / height as f64;
    by_width.max(by_height)
}

fn scaled(side: u32, factor: f64, min: u32) -> u32 {
    ((side as f64 * factor).round() as u32).max(min)
}

fn centered(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}

/// Computes the plan for a `width`x`height` input.
pub fn plan(
    width: u32,
    height: u32,
    mode: SubsamplingMode,
    crop: CropSize,
    weight: f64,
    resize: &ResizeConfig,
) -> Result<SubsamplePlan, ImageOpError> {
    let too_small = || ImageOpError::TooSmall {
        width,
        height,
        crop_width: crop.width,
        crop_height: crop.height,
    };
    if width == 0 || height == 0 {
        return Err(too_small());
    }

    let lower = lower_bound(width, height, crop);
    let factor = match mode {
        SubsamplingMode::ResizeAndCrop => match resize.target {
            Some(target) => (target as f64 / width.min(height) as f64).max(lower),
            None if lower >= resize.upper_bound => lower,
            None => lower + weight * (resize.upper_bound - lower),
        },
        SubsamplingMode::ResizeOnly => lower,
        SubsamplingMode::CropOnly => {
            if width < crop.width || height < crop.height {
                return Err(too_small());
            }
            let slack_x = (width - crop.width) as f64;
            let slack_y = (height - crop.height) as f64;
            return Ok(SubsamplePlan {
                factor: 1.0,
                resized: (width, height),
                offset: (
                    (weight * slack_x).floor() as u32,
                    (weight * slack_y).floor() as u32,
                ),
                crop,
            });
        }
    };

    let resized = (
        scaled(width, factor, crop.width),
        scaled(height, factor, crop.height),
    );
    Ok(SubsamplePlan {
        factor,
        resized,
        offset: (
            centered(resized.0, crop.width),
            centered(resized.1, crop.height),
        ),
        crop,
    })
}
