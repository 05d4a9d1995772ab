use std::path::{Path, PathBuf};

use log::info;

use super::filesystem::{ensure_directory, remove_dir_if_exists, remove_file_if_exists};
use crate::config::PathsConfig;
use crate::error::StorageError;

/// Subdirectory of the TIFF output holding per-image tile folders.
pub const MULTI_CROP_DIR: &str = "Multi_Crop";

/// Resolved on-disk layout of a run.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub raw_parent: PathBuf,
    pub collections: Vec<String>,
    pub demosaic_profiles_dir: PathBuf,
    pub jpeg_dir: PathBuf,
    pub multisplit_dir: PathBuf,
    pub tif_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub audit_log: PathBuf,
    pub jpeg_per_collection: bool,
}

/// Every file a single job may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobArtifacts {
    /// Demosaiced 16-bit TIFF.
    pub demosaiced: PathBuf,
    /// Resized and cropped TIFF.
    pub subsampled: PathBuf,
    /// Output of the final development.
    pub final_tiff: PathBuf,
    pub tile_tiff_dir: PathBuf,
    pub tile_jpeg_dir: PathBuf,
    pub jpeg: PathBuf,
    pub profile: PathBuf,
    pub tool_log: PathBuf,
}

impl JobArtifacts {
    pub fn tile_jpeg(&self, tile_tiff: &Path) -> Option<PathBuf> {
        let stem = tile_tiff.file_stem()?;
        Some(
            self.tile_jpeg_dir
                .join(format!("{}.jpg", stem.to_string_lossy())),
        )
    }
}

fn resolve(root: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

impl Layout {
    pub fn from_config(paths: &PathsConfig) -> Self {
        let root = PathBuf::from(&paths.root);
        Self {
            raw_parent: resolve(&root, &paths.raw_parent),
            collections: paths.collections.clone(),
            demosaic_profiles_dir: resolve(&root, &paths.demosaic_profiles_dir),
            jpeg_dir: resolve(&root, &paths.jpeg_dir),
            multisplit_dir: resolve(&root, &paths.multisplit_dir),
            tif_dir: resolve(&root, &paths.tif_dir),
            tmp_dir: resolve(&root, &paths.tmp_dir),
            profiles_dir: resolve(&root, &paths.profiles_dir),
            audit_log: resolve(&root, &paths.audit_log),
            jpeg_per_collection: paths.jpeg_per_collection,
            root,
        }
    }

    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.raw_parent.join(collection)
    }

    pub fn demosaic_profile(&self, demosaicer: &str) -> PathBuf {
        self.demosaic_profiles_dir.join(demosaicer)
    }

    pub fn jpeg_dir_for(&self, collection: &str) -> PathBuf {
        if self.jpeg_per_collection {
            self.jpeg_dir.join(collection)
        } else {
            self.jpeg_dir.clone()
        }
    }

    /// Paths for one job. Everything is namespaced by collection so equal
    /// file names in different collections never meet. Temporaries also carry
    /// the job `tag`, so a worker racing on the same image never touches the
    /// other's intermediates.
    pub fn artifacts(&self, collection: &str, base: &str, tag: &str) -> JobArtifacts {
        let tmp = self.tmp_dir.join(collection);
        JobArtifacts {
            demosaiced: tmp.join(format!("{}_{}_tmp.tif", base, tag)),
            subsampled: tmp.join(format!("{}_{}_tmp2.tif", base, tag)),
            final_tiff: self.tif_dir.join(collection).join(format!("{}.tif", base)),
            tile_tiff_dir: self.tif_dir.join(MULTI_CROP_DIR).join(collection).join(base),
            tile_jpeg_dir: self.multisplit_dir.join(collection),
            jpeg: self.jpeg_dir_for(collection).join(format!("{}.jpg", base)),
            profile: self.profiles_dir.join(collection).join(format!("{}.pp3", base)),
            tool_log: tmp.join(format!("{}_{}.log", base, tag)),
        }
    }

    /// Directories a run writes into. The tile output only exists when
    /// tiling is in effect.
    fn output_dirs(&self, tiling: bool) -> Vec<&Path> {
        let mut dirs = vec![
            self.jpeg_dir.as_path(),
            self.tif_dir.as_path(),
            self.tmp_dir.as_path(),
            self.profiles_dir.as_path(),
        ];
        if tiling {
            dirs.push(self.multisplit_dir.as_path());
        }
        dirs
    }

    /// Creates the output tree. With `clean`, previous outputs and the audit
    /// log are removed first. Safe to call repeatedly.
    pub fn prepare(&self, clean: bool, tiling: bool) -> Result<(), StorageError> {
        if clean {
            for dir in self.output_dirs(true) {
                if remove_dir_if_exists(dir)? {
                    info!("Removed {}", dir.display());
                }
            }
            if remove_file_if_exists(&self.audit_log)? {
                info!("Removed stale audit log {}", self.audit_log.display());
            }
        }

        for dir in self.output_dirs(tiling) {
            ensure_directory(dir)?;
        }
        for collection in &self.collections {
            for dir in [&self.tmp_dir, &self.tif_dir, &self.profiles_dir] {
                ensure_directory(&dir.join(collection))?;
            }
            if self.jpeg_per_collection {
                ensure_directory(&self.jpeg_dir.join(collection))?;
            }
        }
        if let Some(parent) = self.audit_log.parent() {
            ensure_directory(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(root: &Path) -> PathsConfig {
        serde_json::from_value(serde_json::json!({
            "root": root.to_string_lossy(),
            "raw_parent": "raw",
            "collections": ["sony", "sigma"],
        }))
        .unwrap()
    }

    #[test]
    fn test_relative_paths_resolve_under_root() {
        let layout = Layout::from_config(&paths(Path::new("/data/base")));
        assert_eq!(layout.raw_parent, PathBuf::from("/data/base/raw"));
        assert_eq!(layout.jpeg_dir, PathBuf::from("/data/base/jpeg"));
        assert_eq!(
            layout.audit_log,
            PathBuf::from("/data/base/list_img_profiles.txt")
        );
        assert_eq!(
            layout.collection_dir("sony"),
            PathBuf::from("/data/base/raw/sony")
        );
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let mut config = paths(Path::new("/data/base"));
        config.raw_parent = "/mnt/raw".to_string();
        let layout = Layout::from_config(&config);
        assert_eq!(layout.raw_parent, PathBuf::from("/mnt/raw"));
    }

    #[test]
    fn test_artifact_names() {
        let layout = Layout::from_config(&paths(Path::new("/r")));
        let a = layout.artifacts("sony", "img001_2", "0f3a9c21");
        assert_eq!(
            a.demosaiced,
            PathBuf::from("/r/tiff_tmp/sony/img001_2_0f3a9c21_tmp.tif")
        );
        assert_eq!(
            a.subsampled,
            PathBuf::from("/r/tiff_tmp/sony/img001_2_0f3a9c21_tmp2.tif")
        );
        assert_eq!(
            a.tool_log,
            PathBuf::from("/r/tiff_tmp/sony/img001_2_0f3a9c21.log")
        );
        assert_eq!(a.final_tiff, PathBuf::from("/r/tiff/sony/img001_2.tif"));
        assert_eq!(
            a.tile_tiff_dir,
            PathBuf::from("/r/tiff/Multi_Crop/sony/img001_2")
        );
        assert_eq!(a.jpeg, PathBuf::from("/r/jpeg/sony/img001_2.jpg"));
        assert_eq!(
            a.profile,
            PathBuf::from("/r/profiles_applied/sony/img001_2.pp3")
        );
        assert_eq!(
            a.tile_jpeg(Path::new("/r/tiff/Multi_Crop/sony/img001_2/img001_2_7.tif")),
            Some(PathBuf::from("/r/jpeg_multisplit/sony/img001_2_7.jpg"))
        );
    }

    #[test]
    fn test_same_name_in_two_collections_does_not_collide() {
        let layout = Layout::from_config(&paths(Path::new("/r")));
        let sony = layout.artifacts("sony", "img001", "aaaa0000");
        let sigma = layout.artifacts("sigma", "img001", "bbbb1111");

        assert_ne!(sony.profile, sigma.profile);
        assert_ne!(sony.final_tiff, sigma.final_tiff);
        assert_ne!(sony.tile_tiff_dir, sigma.tile_tiff_dir);

        // Two jobs for the same image still share the claim but not the
        // temporaries.
        let rival = layout.artifacts("sony", "img001", "cccc2222");
        assert_eq!(sony.profile, rival.profile);
        assert_ne!(sony.demosaiced, rival.demosaiced);
        assert_ne!(sony.subsampled, rival.subsampled);
        assert_ne!(sony.tool_log, rival.tool_log);
    }

    #[test]
    fn test_flat_jpeg_dir() {
        let mut config = paths(Path::new("/r"));
        config.jpeg_per_collection = false;
        let layout = Layout::from_config(&config);
        assert_eq!(
            layout.artifacts("sony", "img001", "t").jpeg,
            PathBuf::from("/r/jpeg/img001.jpg")
        );
    }

    #[test]
    fn test_prepare_creates_and_cleans() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::from_config(&paths(dir.path()));

        layout.prepare(false, false).unwrap();
        assert!(layout.jpeg_dir.is_dir());
        assert!(layout.profiles_dir.join("sony").is_dir());
        assert!(layout.tmp_dir.join("sigma").is_dir());
        assert!(layout.jpeg_dir.join("sigma").is_dir());
        assert!(!layout.multisplit_dir.exists());

        std::fs::write(layout.profiles_dir.join("old.pp3"), b"x").unwrap();
        std::fs::write(&layout.audit_log, b"line\n").unwrap();

        // Without clean nothing is lost.
        layout.prepare(false, true).unwrap();
        assert!(layout.profiles_dir.join("old.pp3").exists());
        assert!(layout.multisplit_dir.is_dir());

        layout.prepare(true, false).unwrap();
        assert!(!layout.profiles_dir.join("old.pp3").exists());
        assert!(!layout.audit_log.exists());
        assert!(layout.profiles_dir.is_dir());
        assert!(!layout.multisplit_dir.exists());
    }
}
