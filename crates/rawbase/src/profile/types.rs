use serde::{Deserialize, Serialize};

use super::sampler::SamplerError;

/// How the demosaiced image is brought down to the crop size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsamplingMode {
    #[default]
    ResizeAndCrop,
    ResizeOnly,
    CropOnly,
}

impl SubsamplingMode {
    /// Label used in the audit log.
    pub fn audit_label(self) -> &'static str {
        match self {
            SubsamplingMode::ResizeAndCrop => "ON_WITH_CROP",
            SubsamplingMode::ResizeOnly => "ON_ALONE",
            SubsamplingMode::CropOnly => "CROP_ONLY",
        }
    }

    pub fn resizes(self) -> bool {
        !matches!(self, SubsamplingMode::CropOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeKernel {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
}

impl ResizeKernel {
    pub fn audit_label(self) -> &'static str {
        match self {
            ResizeKernel::Nearest => "NEAREST",
            ResizeKernel::Bilinear => "BILINEAR",
            ResizeKernel::Bicubic => "BICUBIC",
            ResizeKernel::Lanczos => "LANCZOS",
        }
    }

    pub fn filter(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ResizeKernel::Nearest => FilterType::Nearest,
            ResizeKernel::Bilinear => FilterType::Triangle,
            ResizeKernel::Bicubic => FilterType::CatmullRom,
            ResizeKernel::Lanczos => FilterType::Lanczos3,
        }
    }
}

/// Which of sharpening and denoising is considered first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOrder {
    SharpenFirst,
    DenoiseFirst,
}

impl StageOrder {
    /// `1` for sharpen-first, `0` otherwise, as written in the audit log.
    pub fn audit_flag(self) -> u8 {
        match self {
            StageOrder::SharpenFirst => 1,
            StageOrder::DenoiseFirst => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSize {
    pub width: u32,
    pub height: u32,
}

impl CropSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }
}

/// The four stage switches. Whether a stage actually runs also depends on
/// the [`StageOrder`], see [`DevelopmentProfile::runs_sharpen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageToggles {
    pub sharpen: bool,
    pub denoise: bool,
    pub sharpen_if_denoised: bool,
    pub denoise_if_sharpened: bool,
}

/// Unsharp mask settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharpenParams {
    pub radius: f64,
    pub amount: u32,
}

/// Directional pyramid denoising settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenoiseParams {
    pub luminance: u32,
    pub detail: u32,
}

/// A development step in the order the engine should see it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Sharpen(SharpenParams),
    Denoise(DenoiseParams),
}

/// Every parameter needed to turn one RAW file into one JPEG.
///
/// Built once by the sampler and never mutated afterwards. `sharpening` and
/// `denoising` are `Some` exactly when the corresponding stage runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentProfile {
    pub image_id: String,
    pub demosaicer: String,
    pub subsampling: SubsamplingMode,
    pub kernel: ResizeKernel,
    pub resize_weight: f64,
    pub crop: CropSize,
    pub quality: u8,
    pub toggles: StageToggles,
    pub order: StageOrder,
    pub sharpening: Option<SharpenParams>,
    pub denoising: Option<DenoiseParams>,
}

impl DevelopmentProfile {
    pub fn runs_sharpen(toggles: &StageToggles, order: StageOrder) -> bool {
        match order {
            StageOrder::SharpenFirst => toggles.sharpen,
            StageOrder::DenoiseFirst => toggles.denoise && toggles.sharpen_if_denoised,
        }
    }

    pub fn runs_denoise(toggles: &StageToggles, order: StageOrder) -> bool {
        match order {
            StageOrder::SharpenFirst => toggles.sharpen && toggles.denoise_if_sharpened,
            StageOrder::DenoiseFirst => toggles.denoise,
        }
    }

    /// Stages that run, in application order.
    pub fn stages(&self) -> Vec<Stage> {
        let sharpen = self.sharpening.map(Stage::Sharpen);
        let denoise = self.denoising.map(Stage::Denoise);
        let ordered = match self.order {
            StageOrder::SharpenFirst => [sharpen, denoise],
            StageOrder::DenoiseFirst => [denoise, sharpen],
        };
        ordered.into_iter().flatten().collect()
    }

    /// Rejects profiles that the rest of the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), SamplerError> {
        if !(1..=100).contains(&self.quality) {
            return Err(SamplerError::InvalidProfile(format!(
                "quality {} outside 1..=100",
                self.quality
            )));
        }
        if self.crop.width == 0 || self.crop.height == 0 {
            return Err(SamplerError::InvalidProfile(format!(
                "crop {}x{} is not positive",
                self.crop.width, self.crop.height
            )));
        }
        if !(0.0..=1.0).contains(&self.resize_weight) {
            return Err(SamplerError::InvalidProfile(format!(
                "resize weight {} outside [0, 1]",
                self.resize_weight
            )));
        }
        if self.demosaicer.is_empty() {
            return Err(SamplerError::InvalidProfile(
                "no demosaicer selected".to_string(),
            ));
        }
        let sharpen_expected = Self::runs_sharpen(&self.toggles, self.order);
        let denoise_expected = Self::runs_denoise(&self.toggles, self.order);
        if self.sharpening.is_some() != sharpen_expected
            || self.denoising.is_some() != denoise_expected
        {
            return Err(SamplerError::InvalidProfile(
                "stage parameters disagree with toggles".to_string(),
            ));
        }
        Ok(())
    }

    /// Attaches the subsampling factor measured by the resize stage.
    pub fn realize(self, subsampling_factor: f64) -> RealizedProfile {
        RealizedProfile {
            profile: self,
            subsampling_factor,
        }
    }
}

/// A sampled profile together with the factor the resize stage applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedProfile {
    pub profile: DevelopmentProfile,
    pub subsampling_factor: f64,
}
