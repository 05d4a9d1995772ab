//! Stand-ins for the external converters. They write real TIFFs so the
//! image stages downstream run for real.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

use rawbase::tools::{BitDepth, DevelopRequest, FallbackExtractor, RawEngine, X3fExtract};
use rawbase::ToolError;

pub fn write_tiff(path: &Path, width: u32, height: u32) {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 500) as u16, (y * 700) as u16, 20_000u16])
    });
    DynamicImage::ImageRgb16(img)
        .save_with_format(path, ImageFormat::Tiff)
        .expect("Failed to write fake TIFF");
}

/// Demosaics into a 40x30 TIFF and "develops" by copying its input.
/// RAW files with an extension listed in `unreadable` produce nothing.
pub struct FakeEngine {
    calls: AtomicUsize,
    unreadable: Vec<String>,
    profiles_seen: Mutex<Vec<PathBuf>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            unreadable: Vec::new(),
            profiles_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn unreadable(extension: &str) -> Self {
        Self {
            unreadable: vec![extension.to_ascii_lowercase()],
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Profiles handed to the final development, in call order.
    pub fn final_profiles(&self) -> Vec<PathBuf> {
        self.profiles_seen.lock().unwrap().clone()
    }
}

impl RawEngine for FakeEngine {
    fn develop(&self, request: &DevelopRequest<'_>) -> Result<(), ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match request.depth {
            BitDepth::Sixteen => {
                let ext = request
                    .input
                    .extension()
                    .map(|e| e.to_string_lossy().to_ascii_lowercase())
                    .unwrap_or_default();
                if !self.unreadable.contains(&ext) {
                    write_tiff(request.output, 40, 30);
                }
            }
            BitDepth::Eight => {
                self.profiles_seen
                    .lock()
                    .unwrap()
                    .push(request.profile.to_path_buf());
                std::fs::copy(request.input, request.output).expect("Failed to copy TIFF");
            }
        }
        Ok(())
    }
}

/// Writes `<raw>.tif` next to the RAW file, as x3f_extract does.
pub struct FakeExtractor {
    calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FallbackExtractor for FakeExtractor {
    fn extract(&self, raw: &Path, _log: &Path) -> Result<PathBuf, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = X3fExtract::output_for(raw);
        write_tiff(&out, 40, 30);
        Ok(out)
    }
}
