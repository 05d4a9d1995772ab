use std::path::Path;

use crate::config::schema::{Config, QualityConfig, WeightedChoice};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Checks that go beyond the schema: anything that would let the sampler
/// emit an out-of-range profile is rejected here.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.paths.collections.is_empty() {
        return Err(ConfigError::Validation {
            message: "At least one source collection is required".to_string(),
        });
    }

    let batch = &config.batch;
    if batch.jobs_per_raw == 0 {
        return Err(ConfigError::Validation {
            message: "jobs_per_raw must be at least 1".to_string(),
        });
    }
    if !(batch.worker_fraction > 0.0 && batch.worker_fraction <= 1.0) {
        return Err(ConfigError::Validation {
            message: format!(
                "worker_fraction must be in (0, 1], got {}",
                batch.worker_fraction
            ),
        });
    }

    let dev = &config.development;
    if dev.tiling.tiles == 0 {
        return Err(ConfigError::Validation {
            message: "tiling.tiles must be at least 1".to_string(),
        });
    }
    if !(dev.resize.upper_bound.is_finite() && dev.resize.upper_bound > 0.0) {
        return Err(ConfigError::Validation {
            message: "resize.upper_bound must be positive".to_string(),
        });
    }
    if dev.resize.target == Some(0) {
        return Err(ConfigError::Validation {
            message: "resize.target must be positive".to_string(),
        });
    }

    let fixed = &dev.fixed;
    check_quality("fixed.quality", fixed.quality)?;
    check_unit("fixed.resize_weight", fixed.resize_weight)?;
    if fixed.crop_size == 0 {
        return Err(ConfigError::Validation {
            message: "fixed.crop_size must be positive".to_string(),
        });
    }
    if fixed.demosaicer.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "fixed.demosaicer must not be empty".to_string(),
        });
    }
    if !(fixed.sharpen_radius.is_finite() && fixed.sharpen_radius > 0.0) {
        return Err(ConfigError::Validation {
            message: "fixed.sharpen_radius must be positive".to_string(),
        });
    }

    let random = &dev.random;
    check_weights("demosaicing", &random.demosaicing)?;
    if random.demosaicing.iter().any(|c| c.value.trim().is_empty()) {
        return Err(ConfigError::InvalidDistribution {
            name: "demosaicing".to_string(),
            reason: "demosaicer names must not be empty".to_string(),
        });
    }
    check_weights("kernels", &random.kernels)?;

    let sub = &random.subsampling;
    check_weight_list(
        "subsampling",
        &[sub.resize_and_crop, sub.resize_only, sub.crop_only],
    )?;

    if random.crop_sizes.is_empty() || random.crop_sizes.contains(&0) {
        return Err(ConfigError::InvalidDistribution {
            name: "crop_sizes".to_string(),
            reason: "crop sizes must be a non-empty list of positive integers".to_string(),
        });
    }

    match &random.quality {
        QualityConfig::Fixed(qf) => check_quality("random.quality", *qf)?,
        QualityConfig::Weighted { min, weights } => {
            check_quality("random.quality.min", *min)?;
            let max = *min as usize + weights.len().saturating_sub(1);
            if max > 100 {
                return Err(ConfigError::InvalidDistribution {
                    name: "quality".to_string(),
                    reason: format!("table reaches quality {}, above 100", max),
                });
            }
            check_weight_list("quality", weights)?;
        }
    }

    let p = &random.probabilities;
    check_unit("probabilities.sharpen", p.sharpen)?;
    check_unit("probabilities.denoise", p.denoise)?;
    check_unit("probabilities.sharpen_if_denoised", p.sharpen_if_denoised)?;
    check_unit("probabilities.denoise_if_sharpened", p.denoise_if_sharpened)?;

    Ok(())
}

fn check_quality(name: &str, quality: u8) -> Result<(), ConfigError> {
    if !(1..=100).contains(&quality) {
        return Err(ConfigError::Validation {
            message: format!("{} must be in 1..=100, got {}", name, quality),
        });
    }
    Ok(())
}

fn check_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Validation {
            message: format!("{} must be in [0, 1], got {}", name, value),
        });
    }
    Ok(())
}

fn check_weights<T>(name: &str, choices: &[WeightedChoice<T>]) -> Result<(), ConfigError> {
    let weights: Vec<f64> = choices.iter().map(|c| c.weight).collect();
    check_weight_list(name, &weights)
}

fn check_weight_list(name: &str, weights: &[f64]) -> Result<(), ConfigError> {
    if weights.is_empty() {
        return Err(ConfigError::InvalidDistribution {
            name: name.to_string(),
            reason: "no choices configured".to_string(),
        });
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ConfigError::InvalidDistribution {
            name: name.to_string(),
            reason: "weights must be finite and non-negative".to_string(),
        });
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(ConfigError::InvalidDistribution {
            name: name.to_string(),
            reason: "weights must not all be zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DevelopmentMode;
    use crate::profile::ResizeKernel;

    const MINIMAL: &str = r#"
    {
        "version": "1.0",
        "paths": {
            "root": "/corpus",
            "raw_parent": "/raw",
            "collections": ["Boss_Base"]
        }
    }
    "#;

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.collections, vec!["Boss_Base".to_string()]);
        assert_eq!(config.paths.profiles_dir, "profiles_applied");
        assert!(config.paths.jpeg_per_collection);
        assert_eq!(config.batch.jobs_per_raw, 1);
        assert_eq!(config.development.mode, DevelopmentMode::Fixed);
        assert_eq!(config.development.fixed.quality, 75);
        assert_eq!(config.development.fixed.crop_size, 1024);
        assert_eq!(config.development.random.demosaicing.len(), 4);
        assert_eq!(config.tools.rawtherapee, "rawtherapee-cli");
    }

    #[test]
    fn test_load_random_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "paths": {
                "root": "/corpus",
                "raw_parent": "/raw",
                "collections": ["ALASKA2_Base", "Boss_Base"]
            },
            "development": {
                "mode": "random",
                "random": {
                    "corpus_seed": 7,
                    "kernels": [
                        { "value": "bicubic", "weight": 1.0 }
                    ],
                    "crop_sizes": [512, 640],
                    "quality": { "weighted": { "min": 90, "weights": [0.5, 0.5] } }
                }
            }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.development.mode, DevelopmentMode::Random);
        assert_eq!(config.development.random.corpus_seed, Some(7));
        assert_eq!(
            config.development.random.kernels[0].value,
            ResizeKernel::Bicubic
        );
        assert!(matches!(
            config.development.random.quality,
            QualityConfig::Weighted { min: 90, .. }
        ));
    }

    #[test]
    fn test_invalid_version() {
        let config_json = MINIMAL.replace("\"1.0\"", "\"2.0\"");
        assert!(load_config_from_str(&config_json).is_err());
    }

    #[test]
    fn test_schema_rejects_missing_paths() {
        let result = load_config_from_str(r#"{ "version": "1.0" }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_quality_out_of_range() {
        let mut config = load_config_from_str(MINIMAL).unwrap();
        config.development.fixed.quality = 0;
        assert!(validate_config(&config).is_err());

        config.development.fixed.quality = 101;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_weighted_quality_table_past_100() {
        let mut config = load_config_from_str(MINIMAL).unwrap();
        config.development.random.quality = QualityConfig::Weighted {
            min: 99,
            weights: vec![0.2, 0.3, 0.5],
        };
        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDistribution { ref name, .. }) if name == "quality"
        ));
    }

    #[test]
    fn test_probability_out_of_range() {
        let mut config = load_config_from_str(MINIMAL).unwrap();
        config.development.random.probabilities.sharpen = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let mut config = load_config_from_str(MINIMAL).unwrap();
        for choice in &mut config.development.random.kernels {
            choice.weight = 0.0;
        }
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_crop_size_rejected() {
        let mut config = load_config_from_str(MINIMAL).unwrap();
        config.development.random.crop_sizes = vec![512, 0];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_tiles_rejected() {
        let mut config = load_config_from_str(MINIMAL).unwrap();
        config.development.tiling.tiles = 0;
        assert!(validate_config(&config).is_err());
    }
}
