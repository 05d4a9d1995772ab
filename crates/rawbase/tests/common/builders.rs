//! Builder for test configurations.

#![allow(dead_code)]

use rawbase::config::{
    BatchConfig, Config, DevelopmentConfig, DevelopmentMode, PathsConfig, ToolsConfig,
};

/// Builder for `Config` instances, sized for tiny synthetic images.
pub struct ConfigBuilder {
    root: String,
    collections: Vec<String>,
    batch: BatchConfig,
    development: DevelopmentConfig,
    jpeg_per_collection: bool,
}

impl ConfigBuilder {
    pub fn new(root: &str) -> Self {
        let mut development = DevelopmentConfig::default();
        development.resize.target = Some(16);
        development.fixed.crop_size = 16;
        development.random.crop_sizes = vec![16];

        let batch = BatchConfig {
            worker_count: Some(1),
            selection_seed: Some(42),
            ..BatchConfig::default()
        };

        Self {
            root: root.to_string(),
            collections: vec!["sony".to_string()],
            batch,
            development,
            jpeg_per_collection: true,
        }
    }

    pub fn collections(mut self, names: &[&str]) -> Self {
        self.collections = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.batch.worker_count = Some(count);
        self
    }

    pub fn jobs_per_raw(mut self, count: usize) -> Self {
        self.batch.jobs_per_raw = count;
        self
    }

    pub fn max_outputs(mut self, max: usize) -> Self {
        self.batch.max_outputs = Some(max);
        self
    }

    pub fn random(mut self, corpus_seed: u64) -> Self {
        self.development.mode = DevelopmentMode::Random;
        self.development.random.corpus_seed = Some(corpus_seed);
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.development.fixed.quality = quality;
        self
    }

    pub fn tiles(mut self, count: u32) -> Self {
        self.development.tiling.enabled = true;
        self.development.tiling.tiles = count;
        self
    }

    pub fn keep_uncompressed(mut self) -> Self {
        self.development.keep_uncompressed = true;
        self
    }

    pub fn grayscale(mut self) -> Self {
        self.development.grayscale = true;
        self
    }

    pub fn flat_jpeg_dir(mut self) -> Self {
        self.jpeg_per_collection = false;
        self
    }

    pub fn build(self) -> Config {
        Config {
            version: "1.0".to_string(),
            paths: PathsConfig {
                root: self.root,
                raw_parent: "raw".to_string(),
                collections: self.collections,
                demosaic_profiles_dir: "demProfiles".to_string(),
                jpeg_dir: "jpeg".to_string(),
                multisplit_dir: "jpeg_multisplit".to_string(),
                tif_dir: "tiff".to_string(),
                tmp_dir: "tmp".to_string(),
                profiles_dir: "profiles".to_string(),
                audit_log: "dev_settings.log".to_string(),
                jpeg_per_collection: self.jpeg_per_collection,
                clean_on_start: false,
            },
            batch: self.batch,
            development: self.development,
            tools: ToolsConfig {
                rawtherapee: "/nonexistent/rawtherapee-cli".to_string(),
                x3f_extract: "/nonexistent/x3f_extract".to_string(),
                timeout_secs: 5,
            },
        }
    }
}
