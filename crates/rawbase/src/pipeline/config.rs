use std::time::Duration;

use crate::config::{Config, DevelopmentConfig, DevelopmentMode, ToolsConfig};
use crate::imaging::SubsampleSettings;
use crate::storage::Layout;

/// The slice of [`Config`] the pipeline needs, with paths resolved.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub layout: Layout,
    pub development: DevelopmentConfig,
    pub tools: ToolsConfig,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            layout: Layout::from_config(&config.paths),
            development: config.development.clone(),
            tools: config.tools.clone(),
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.timeout_secs)
    }

    /// Tiling is only honoured for fixed development.
    pub fn tiling_active(&self) -> bool {
        self.development.mode == DevelopmentMode::Fixed && self.development.tiling.enabled
    }

    pub fn tile_count(&self) -> u32 {
        self.development.tiling.tiles
    }

    pub fn subsample_settings(&self) -> SubsampleSettings {
        SubsampleSettings {
            resize: self.development.resize.clone(),
            grayscale: self.development.grayscale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn config(mode: &str, tiling: bool) -> Config {
        load_config_from_str(&format!(
            r#"{{
                "version": "1.0",
                "paths": {{ "root": "/data", "raw_parent": "raw", "collections": ["a"] }},
                "development": {{ "mode": "{}", "tiling": {{ "enabled": {} }} }},
                "tools": {{ "timeout_secs": 42 }}
            }}"#,
            mode, tiling
        ))
        .unwrap()
    }

    #[test]
    fn test_tiling_only_in_fixed_mode() {
        assert!(PipelineConfig::from_config(&config("fixed", true)).tiling_active());
        assert!(!PipelineConfig::from_config(&config("fixed", false)).tiling_active());
        assert!(!PipelineConfig::from_config(&config("random", true)).tiling_active());
    }

    #[test]
    fn test_resolved_values() {
        let pc = PipelineConfig::from_config(&config("fixed", false));
        assert_eq!(pc.tool_timeout(), Duration::from_secs(42));
        assert_eq!(pc.tile_count(), 16);
        assert_eq!(pc.layout.tmp_dir, std::path::PathBuf::from("/data/tiff_tmp"));
        assert!(!pc.subsample_settings().grayscale);
    }
}
