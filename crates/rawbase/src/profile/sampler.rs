use rand::distributions::{Bernoulli, Distribution, Uniform, WeightedError, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::schema::{
    DevelopmentConfig, DevelopmentMode, FixedDevelopment, QualityConfig, RandomDevelopment,
};

use super::distributions::{self, Empirical, DENOISE_DETAIL_MAX};
use super::types::{
    CropSize, DenoiseParams, DevelopmentProfile, ResizeKernel, SharpenParams, StageOrder,
    StageToggles, SubsamplingMode,
};

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("Sampled profile rejected: {0}")]
    InvalidProfile(String),
}

impl From<WeightedError> for SamplerError {
    fn from(e: WeightedError) -> Self {
        SamplerError::InvalidDistribution(e.to_string())
    }
}

const SUBSAMPLING_MODES: [SubsamplingMode; 3] = [
    SubsamplingMode::ResizeAndCrop,
    SubsamplingMode::ResizeOnly,
    SubsamplingMode::CropOnly,
];

/// Per-image seed: the first eight bytes of SHA-256 over the image base name,
/// optionally salted with a corpus seed.
pub fn image_seed(image_id: &str, corpus_seed: Option<u64>) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(image_id.as_bytes());
    if let Some(seed) = corpus_seed {
        hasher.update(seed.to_be_bytes());
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Tables compiled from [`RandomDevelopment`] once, reused for every image.
struct RandomTables {
    config: RandomDevelopment,
    demosaicer: WeightedIndex<f64>,
    subsampling: WeightedIndex<f64>,
    kernel: WeightedIndex<f64>,
    quality: Option<WeightedIndex<f64>>,
    sharpen: Bernoulli,
    denoise: Bernoulli,
    sharpen_if_denoised: Bernoulli,
    denoise_if_sharpened: Bernoulli,
    radius: Empirical<f64>,
    amount: Empirical<u32>,
    luminance: Empirical<u32>,
}

fn bernoulli(p: f64) -> Result<Bernoulli, SamplerError> {
    Bernoulli::new(p).map_err(|e| SamplerError::InvalidDistribution(e.to_string()))
}

impl RandomTables {
    fn new(config: &RandomDevelopment) -> Result<Self, SamplerError> {
        let sub = &config.subsampling;
        let quality = match &config.quality {
            QualityConfig::Fixed(_) => None,
            QualityConfig::Weighted { weights, .. } => Some(WeightedIndex::new(weights)?),
        };
        let p = &config.probabilities;

        Ok(Self {
            demosaicer: WeightedIndex::new(config.demosaicing.iter().map(|c| c.weight))?,
            subsampling: WeightedIndex::new([sub.resize_and_crop, sub.resize_only, sub.crop_only])?,
            kernel: WeightedIndex::new(config.kernels.iter().map(|c| c.weight))?,
            quality,
            sharpen: bernoulli(p.sharpen)?,
            denoise: bernoulli(p.denoise)?,
            sharpen_if_denoised: bernoulli(p.sharpen_if_denoised)?,
            denoise_if_sharpened: bernoulli(p.denoise_if_sharpened)?,
            radius: distributions::sharpen_radius()?,
            amount: distributions::sharpen_amount()?,
            luminance: distributions::denoise_luminance()?,
            config: config.clone(),
        })
    }

    fn draw_quality(&self, rng: &mut StdRng) -> u8 {
        match (&self.config.quality, &self.quality) {
            (QualityConfig::Weighted { min, .. }, Some(index)) => {
                let offset = index.sample(rng);
                (*min as usize + offset).clamp(1, 100) as u8
            }
            (QualityConfig::Fixed(qf), _) => (*qf).clamp(1, 100),
            (QualityConfig::Weighted { min, .. }, None) => (*min).clamp(1, 100),
        }
    }

    fn sample(&self, image_id: &str) -> DevelopmentProfile {
        let mut rng = StdRng::seed_from_u64(image_seed(image_id, self.config.corpus_seed));

        let demosaicer = self.config.demosaicing[self.demosaicer.sample(&mut rng)]
            .value
            .clone();
        let subsampling = SUBSAMPLING_MODES[self.subsampling.sample(&mut rng)];
        let kernel: ResizeKernel = self.config.kernels[self.kernel.sample(&mut rng)].value;
        let resize_weight: f64 = rng.gen_range(0.0..1.0);

        let sizes = Uniform::from(0..self.config.crop_sizes.len());
        let crop = CropSize::new(
            self.config.crop_sizes[sizes.sample(&mut rng)],
            self.config.crop_sizes[sizes.sample(&mut rng)],
        );
        let quality = self.draw_quality(&mut rng);

        let toggles = StageToggles {
            sharpen: self.sharpen.sample(&mut rng),
            denoise: self.denoise.sample(&mut rng),
            sharpen_if_denoised: self.sharpen_if_denoised.sample(&mut rng),
            denoise_if_sharpened: self.denoise_if_sharpened.sample(&mut rng),
        };
        // Fair coin, independent of the toggle probabilities.
        let order = if rng.gen_bool(0.5) {
            StageOrder::SharpenFirst
        } else {
            StageOrder::DenoiseFirst
        };

        let sharpening = DevelopmentProfile::runs_sharpen(&toggles, order).then(|| SharpenParams {
            radius: self.radius.sample(&mut rng),
            amount: self.amount.sample(&mut rng),
        });
        let denoising = DevelopmentProfile::runs_denoise(&toggles, order).then(|| DenoiseParams {
            luminance: self.luminance.sample(&mut rng),
            detail: rng.gen_range(0..DENOISE_DETAIL_MAX),
        });

        DevelopmentProfile {
            image_id: image_id.to_string(),
            demosaicer,
            subsampling,
            kernel,
            resize_weight,
            crop,
            quality,
            toggles,
            order,
            sharpening,
            denoising,
        }
    }
}

fn sample_fixed(fixed: &FixedDevelopment, image_id: &str) -> DevelopmentProfile {
    let toggles = StageToggles {
        sharpen: fixed.sharpen,
        denoise: fixed.denoise,
        sharpen_if_denoised: fixed.sharpen_if_denoised,
        denoise_if_sharpened: fixed.denoise_if_sharpened,
    };
    // Static ordering: denoise leads only when sharpening is chained after it.
    let order = if fixed.sharpen_if_denoised {
        StageOrder::DenoiseFirst
    } else {
        StageOrder::SharpenFirst
    };

    let sharpening = DevelopmentProfile::runs_sharpen(&toggles, order).then_some(SharpenParams {
        radius: fixed.sharpen_radius,
        amount: fixed.sharpen_amount,
    });
    let denoising = DevelopmentProfile::runs_denoise(&toggles, order).then_some(DenoiseParams {
        luminance: fixed.denoise_luminance,
        detail: fixed.denoise_detail,
    });

    DevelopmentProfile {
        image_id: image_id.to_string(),
        demosaicer: fixed.demosaicer.clone(),
        subsampling: fixed.subsampling,
        kernel: fixed.kernel,
        resize_weight: fixed.resize_weight,
        crop: CropSize::square(fixed.crop_size),
        quality: fixed.quality.clamp(1, 100),
        toggles,
        order,
        sharpening,
        denoising,
    }
}

/// Produces one [`DevelopmentProfile`] per image, either from the fixed
/// settings or from draws on a stream seeded by the image name.
pub struct ParameterSampler {
    mode: DevelopmentMode,
    fixed: FixedDevelopment,
    random: RandomTables,
}

impl ParameterSampler {
    pub fn new(config: &DevelopmentConfig) -> Result<Self, SamplerError> {
        Ok(Self {
            mode: config.mode,
            fixed: config.fixed.clone(),
            random: RandomTables::new(&config.random)?,
        })
    }

    pub fn mode(&self) -> DevelopmentMode {
        self.mode
    }

    pub fn sample(&self, image_id: &str) -> Result<DevelopmentProfile, SamplerError> {
        let profile = match self.mode {
            DevelopmentMode::Fixed => sample_fixed(&self.fixed, image_id),
            DevelopmentMode::Random => self.random.sample(image_id),
        };
        profile.validate()?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::WeightedChoice;

    fn random_config() -> DevelopmentConfig {
        DevelopmentConfig {
            mode: DevelopmentMode::Random,
            ..DevelopmentConfig::default()
        }
    }

    #[test]
    fn test_random_profile_is_deterministic() {
        let sampler = ParameterSampler::new(&random_config()).unwrap();
        let a = sampler.sample("img001").unwrap();
        let b = sampler.sample("img001").unwrap();
        assert_eq!(a, b);

        // A fresh sampler built from the same config reproduces it too.
        let other = ParameterSampler::new(&random_config()).unwrap();
        assert_eq!(other.sample("img001").unwrap(), a);
    }

    #[test]
    fn test_different_images_differ() {
        let sampler = ParameterSampler::new(&random_config()).unwrap();
        let profiles: Vec<DevelopmentProfile> = (0..20)
            .map(|i| sampler.sample(&format!("img{:03}", i)).unwrap())
            .collect();
        let weights: std::collections::HashSet<u64> =
            profiles.iter().map(|p| p.resize_weight.to_bits()).collect();
        assert_eq!(weights.len(), profiles.len());
    }

    #[test]
    fn test_corpus_seed_changes_profile() {
        let base = ParameterSampler::new(&random_config()).unwrap();
        let mut seeded_config = random_config();
        seeded_config.random.corpus_seed = Some(42);
        let seeded = ParameterSampler::new(&seeded_config).unwrap();
        assert_ne!(
            base.sample("img001").unwrap().resize_weight,
            seeded.sample("img001").unwrap().resize_weight
        );
    }

    #[test]
    fn test_random_profiles_are_valid() {
        let mut config = random_config();
        config.random.crop_sizes = vec![512, 640, 720, 1024];
        config.random.quality = QualityConfig::Weighted {
            min: 60,
            weights: vec![1.0; 41],
        };
        config.random.probabilities.sharpen_if_denoised = 0.5;
        config.random.probabilities.denoise = 0.5;
        let sampler = ParameterSampler::new(&config).unwrap();

        for i in 0..300 {
            let p = sampler.sample(&format!("photo_{}", i)).unwrap();
            assert!((60..=100).contains(&p.quality));
            assert!([512, 640, 720, 1024].contains(&p.crop.width));
            assert!([512, 640, 720, 1024].contains(&p.crop.height));
            assert!((0.0..1.0).contains(&p.resize_weight));
            if let Some(denoise) = p.denoising {
                assert!(denoise.detail < DENOISE_DETAIL_MAX);
                assert!(denoise.luminance <= 100);
            }
            if let Some(sharpen) = p.sharpening {
                assert!((0.3..=3.0).contains(&sharpen.radius));
            }
        }
    }

    #[test]
    fn test_random_ordering_is_not_constant() {
        let sampler = ParameterSampler::new(&random_config()).unwrap();
        let orders: std::collections::HashSet<u8> = (0..50)
            .map(|i| sampler.sample(&format!("x{}", i)).unwrap().order.audit_flag())
            .collect();
        assert_eq!(orders.len(), 2);
    }

    #[test]
    fn test_zero_weight_choices_never_drawn() {
        let mut config = random_config();
        config.random.demosaicing = vec![
            WeightedChoice::new("dem_fast.pp3".to_string(), 0.0),
            WeightedChoice::new("dem_amaze.pp3".to_string(), 1.0),
        ];
        let sampler = ParameterSampler::new(&config).unwrap();
        for i in 0..100 {
            assert_eq!(
                sampler.sample(&format!("i{}", i)).unwrap().demosaicer,
                "dem_amaze.pp3"
            );
        }
    }

    #[test]
    fn test_fixed_mode_defaults() {
        let sampler = ParameterSampler::new(&DevelopmentConfig::default()).unwrap();
        let p = sampler.sample("img001").unwrap();
        assert_eq!(p.demosaicer, "dem_amaze.pp3");
        assert_eq!(p.kernel, ResizeKernel::Lanczos);
        assert_eq!(p.resize_weight, 0.0);
        assert_eq!(p.crop, CropSize::square(1024));
        assert_eq!(p.quality, 75);
        assert_eq!(p.order, StageOrder::SharpenFirst);
        assert_eq!(
            p.sharpening,
            Some(SharpenParams {
                radius: 0.5,
                amount: 250
            })
        );
        assert_eq!(
            p.denoising,
            Some(DenoiseParams {
                luminance: 0,
                detail: 50
            })
        );
    }

    #[test]
    fn test_fixed_mode_is_identical_across_images() {
        let sampler = ParameterSampler::new(&DevelopmentConfig::default()).unwrap();
        let mut a = sampler.sample("a").unwrap();
        let b = sampler.sample("b").unwrap();
        a.image_id = b.image_id.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fixed_mode_denoise_first_when_chained_sharpen() {
        let mut config = DevelopmentConfig::default();
        config.fixed.sharpen_if_denoised = true;
        let p = ParameterSampler::new(&config)
            .unwrap()
            .sample("img001")
            .unwrap();
        assert_eq!(p.order, StageOrder::DenoiseFirst);
        assert!(p.denoising.is_some());
        assert!(p.sharpening.is_some());
    }

    #[test]
    fn test_image_seed_depends_on_salt() {
        assert_eq!(image_seed("img001", None), image_seed("img001", None));
        assert_ne!(image_seed("img001", None), image_seed("img001", Some(1)));
        assert_ne!(image_seed("img001", None), image_seed("img002", None));
    }
}
