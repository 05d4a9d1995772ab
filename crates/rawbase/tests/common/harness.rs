//! Isolated corpus root for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use rawbase::config::Config;
use rawbase::imaging::ImageToolkit;
use rawbase::{BatchReport, BatchScheduler, Pipeline, PipelineConfig};

use super::builders::ConfigBuilder;
use super::fakes::{FakeEngine, FakeExtractor};

pub struct TestHarness {
    temp_dir: TempDir,
    pub engine: Arc<FakeEngine>,
    pub extractor: Arc<FakeExtractor>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_engine(FakeEngine::new())
    }

    pub fn with_engine(engine: FakeEngine) -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            engine: Arc::new(engine),
            extractor: Arc::new(FakeExtractor::new()),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Builder rooted at this harness.
    pub fn config(&self) -> ConfigBuilder {
        ConfigBuilder::new(&self.root().to_string_lossy())
    }

    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root().join("raw").join(collection)
    }

    /// Drops placeholder RAW files into a collection.
    pub fn write_raws(&self, collection: &str, names: &[&str]) -> Vec<PathBuf> {
        let dir = self.collection_dir(collection);
        std::fs::create_dir_all(&dir).expect("Failed to create collection dir");
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, b"raw sensor data").expect("Failed to write RAW");
                path
            })
            .collect()
    }

    /// Writes the config as JSON under the root and returns its path.
    pub fn write_config(&self, config: &Config) -> PathBuf {
        let path = self.root().join("config.json");
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        std::fs::write(&path, json).expect("Failed to write config");
        path
    }

    /// Prepares the layout and wires the fakes into a pipeline.
    pub fn pipeline(&self, config: &Config) -> Arc<Pipeline> {
        let pipeline_config = Arc::new(PipelineConfig::from_config(config));
        pipeline_config
            .layout
            .prepare(false, pipeline_config.tiling_active())
            .expect("Failed to prepare layout");
        let pipeline = Pipeline::with_components(
            pipeline_config,
            self.engine.clone(),
            self.extractor.clone(),
            Arc::new(ImageToolkit),
        )
        .expect("Failed to build pipeline");
        Arc::new(pipeline)
    }

    pub fn run_batch(&self, config: &Config) -> BatchReport {
        BatchScheduler::new(self.pipeline(config), config.batch.clone())
            .run()
            .expect("Batch failed")
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", relative, e))
    }

    /// Sorted file names directly inside a directory under the root.
    pub fn list(&self, relative: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path(relative))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
