use serde::{Deserialize, Serialize};

use crate::profile::{ResizeKernel, SubsamplingMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub paths: PathsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub development: DevelopmentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Directory layout. Output directories are relative to `root` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub root: String,
    pub raw_parent: String,
    pub collections: Vec<String>,
    #[serde(default = "default_demosaic_profiles_dir")]
    pub demosaic_profiles_dir: String,
    #[serde(default = "default_jpeg_dir")]
    pub jpeg_dir: String,
    #[serde(default = "default_multisplit_dir")]
    pub multisplit_dir: String,
    #[serde(default = "default_tif_dir")]
    pub tif_dir: String,
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: String,
    #[serde(default = "default_audit_log")]
    pub audit_log: String,
    /// Put each collection's JPEGs in its own subfolder of `jpeg_dir`.
    #[serde(default = "default_true")]
    pub jpeg_per_collection: bool,
    /// Remove output directories and the audit log before a run.
    #[serde(default)]
    pub clean_on_start: bool,
}

fn default_demosaic_profiles_dir() -> String {
    "demProfiles".to_string()
}

fn default_jpeg_dir() -> String {
    "jpeg".to_string()
}

fn default_multisplit_dir() -> String {
    "jpeg_multisplit".to_string()
}

fn default_tif_dir() -> String {
    "tiff".to_string()
}

fn default_tmp_dir() -> String {
    "tiff_tmp".to_string()
}

fn default_profiles_dir() -> String {
    "profiles_applied".to_string()
}

fn default_audit_log() -> String {
    "list_img_profiles.txt".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Upper bound on jobs per collection; `None` means every candidate.
    #[serde(default)]
    pub max_outputs: Option<usize>,
    #[serde(default = "default_jobs_per_raw")]
    pub jobs_per_raw: usize,
    #[serde(default = "default_raw_extensions")]
    pub raw_extensions: Vec<String>,
    /// Explicit worker count; overrides `worker_fraction`.
    #[serde(default)]
    pub worker_count: Option<usize>,
    #[serde(default = "default_worker_fraction")]
    pub worker_fraction: f64,
    /// Seed for the subset shuffle; unseeded when absent.
    #[serde(default)]
    pub selection_seed: Option<u64>,
}

fn default_jobs_per_raw() -> usize {
    1
}

fn default_raw_extensions() -> Vec<String> {
    [
        "ARW", "CR2", "CR3", "CRW", "DNG", "ERF", "MEF", "MOS", "MRW", "NEF", "NRW", "ORF",
        "PEF", "RAF", "RAW", "RW2", "SRW", "X3F",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_worker_fraction() -> f64 {
    2.0 / 3.0
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_outputs: None,
            jobs_per_raw: default_jobs_per_raw(),
            raw_extensions: default_raw_extensions(),
            worker_count: None,
            worker_fraction: default_worker_fraction(),
            selection_seed: None,
        }
    }
}

impl BatchConfig {
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(count) => count.max(1),
            None => ((num_cpus::get() as f64 * self.worker_fraction).floor() as usize).max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentMode {
    Fixed,
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevelopmentConfig {
    #[serde(default = "default_mode")]
    pub mode: DevelopmentMode,
    /// Keep the final TIFF next to the JPEG.
    #[serde(default)]
    pub keep_uncompressed: bool,
    #[serde(default)]
    pub grayscale: bool,
    #[serde(default)]
    pub tiling: TilingConfig,
    #[serde(default)]
    pub resize: ResizeConfig,
    #[serde(default)]
    pub fixed: FixedDevelopment,
    #[serde(default)]
    pub random: RandomDevelopment,
}

fn default_mode() -> DevelopmentMode {
    DevelopmentMode::Fixed
}

impl Default for DevelopmentConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            keep_uncompressed: false,
            grayscale: false,
            tiling: TilingConfig::default(),
            resize: ResizeConfig::default(),
            fixed: FixedDevelopment::default(),
            random: RandomDevelopment::default(),
        }
    }
}

/// Multi-crop of the final image. Only honoured in fixed mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_tiles")]
    pub tiles: u32,
}

fn default_tiles() -> u32 {
    16
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tiles: default_tiles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeConfig {
    /// Largest scale factor a random resize may reach (1.30 = 30% upsampling).
    #[serde(default = "default_upper_bound")]
    pub upper_bound: f64,
    /// Shorter side after resizing; when set it replaces the weighted factor.
    #[serde(default = "default_resize_target")]
    pub target: Option<u32>,
}

fn default_upper_bound() -> f64 {
    1.30
}

fn default_resize_target() -> Option<u32> {
    Some(1024)
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            upper_bound: default_upper_bound(),
            target: default_resize_target(),
        }
    }
}

/// Settings for fixed mode. Toggles are plain booleans, not probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedDevelopment {
    #[serde(default = "default_demosaicer")]
    pub demosaicer: String,
    #[serde(default)]
    pub subsampling: SubsamplingMode,
    #[serde(default = "default_fixed_kernel")]
    pub kernel: ResizeKernel,
    #[serde(default)]
    pub resize_weight: f64,
    #[serde(default = "default_crop_size")]
    pub crop_size: u32,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_true")]
    pub sharpen: bool,
    #[serde(default = "default_true")]
    pub denoise: bool,
    /// Also decides the ordering: set means denoise runs first.
    #[serde(default)]
    pub sharpen_if_denoised: bool,
    #[serde(default = "default_true")]
    pub denoise_if_sharpened: bool,
    #[serde(default = "default_sharpen_radius")]
    pub sharpen_radius: f64,
    #[serde(default = "default_sharpen_amount")]
    pub sharpen_amount: u32,
    #[serde(default)]
    pub denoise_luminance: u32,
    #[serde(default = "default_denoise_detail")]
    pub denoise_detail: u32,
}

fn default_demosaicer() -> String {
    "dem_amaze.pp3".to_string()
}

fn default_fixed_kernel() -> ResizeKernel {
    ResizeKernel::Lanczos
}

fn default_crop_size() -> u32 {
    1024
}

fn default_quality() -> u8 {
    75
}

fn default_sharpen_radius() -> f64 {
    0.5
}

fn default_sharpen_amount() -> u32 {
    250
}

fn default_denoise_detail() -> u32 {
    50
}

impl Default for FixedDevelopment {
    fn default() -> Self {
        Self {
            demosaicer: default_demosaicer(),
            subsampling: SubsamplingMode::default(),
            kernel: default_fixed_kernel(),
            resize_weight: 0.0,
            crop_size: default_crop_size(),
            quality: default_quality(),
            sharpen: true,
            denoise: true,
            sharpen_if_denoised: false,
            denoise_if_sharpened: true,
            sharpen_radius: default_sharpen_radius(),
            sharpen_amount: default_sharpen_amount(),
            denoise_luminance: 0,
            denoise_detail: default_denoise_detail(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedChoice<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> WeightedChoice<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsamplingWeights {
    #[serde(default = "default_one")]
    pub resize_and_crop: f64,
    #[serde(default)]
    pub resize_only: f64,
    #[serde(default)]
    pub crop_only: f64,
}

fn default_one() -> f64 {
    1.0
}

impl Default for SubsamplingWeights {
    fn default() -> Self {
        Self {
            resize_and_crop: 1.0,
            resize_only: 0.0,
            crop_only: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageProbabilities {
    #[serde(default = "default_one")]
    pub sharpen: f64,
    #[serde(default = "default_one")]
    pub denoise: f64,
    #[serde(default)]
    pub sharpen_if_denoised: f64,
    #[serde(default = "default_one")]
    pub denoise_if_sharpened: f64,
}

impl Default for StageProbabilities {
    fn default() -> Self {
        Self {
            sharpen: 1.0,
            denoise: 1.0,
            sharpen_if_denoised: 0.0,
            denoise_if_sharpened: 1.0,
        }
    }
}

/// JPEG quality source. `Weighted` draws from `weights[i]` for quality `min + i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityConfig {
    Fixed(u8),
    Weighted { min: u8, weights: Vec<f64> },
}

impl Default for QualityConfig {
    fn default() -> Self {
        QualityConfig::Fixed(default_quality())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomDevelopment {
    /// Mixed into every per-image seed to derive independent corpora.
    #[serde(default)]
    pub corpus_seed: Option<u64>,
    #[serde(default = "default_demosaicing")]
    pub demosaicing: Vec<WeightedChoice<String>>,
    #[serde(default)]
    pub subsampling: SubsamplingWeights,
    #[serde(default = "default_kernels")]
    pub kernels: Vec<WeightedChoice<ResizeKernel>>,
    #[serde(default = "default_crop_sizes")]
    pub crop_sizes: Vec<u32>,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub probabilities: StageProbabilities,
}

fn default_demosaicing() -> Vec<WeightedChoice<String>> {
    vec![
        WeightedChoice::new("dem_igv.pp3".to_string(), 0.10),
        WeightedChoice::new("dem_amaze.pp3".to_string(), 0.40),
        WeightedChoice::new("dem_fast.pp3".to_string(), 0.15),
        WeightedChoice::new("dem_dcb_2_amel.pp3".to_string(), 0.35),
    ]
}

fn default_kernels() -> Vec<WeightedChoice<ResizeKernel>> {
    vec![
        WeightedChoice::new(ResizeKernel::Nearest, 0.10),
        WeightedChoice::new(ResizeKernel::Bilinear, 0.15),
        WeightedChoice::new(ResizeKernel::Bicubic, 0.25),
        WeightedChoice::new(ResizeKernel::Lanczos, 0.50),
    ]
}

fn default_crop_sizes() -> Vec<u32> {
    vec![1024]
}

impl Default for RandomDevelopment {
    fn default() -> Self {
        Self {
            corpus_seed: None,
            demosaicing: default_demosaicing(),
            subsampling: SubsamplingWeights::default(),
            kernels: default_kernels(),
            crop_sizes: default_crop_sizes(),
            quality: QualityConfig::default(),
            probabilities: StageProbabilities::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_rawtherapee")]
    pub rawtherapee: String,
    #[serde(default = "default_x3f_extract")]
    pub x3f_extract: String,
    /// Per-invocation timeout for the external converters.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rawtherapee() -> String {
    "rawtherapee-cli".to_string()
}

fn default_x3f_extract() -> String {
    "./x3f_extract".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            rawtherapee: default_rawtherapee(),
            x3f_extract: default_x3f_extract(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
