//! Empirically shaped distributions for the sharpening and denoising
//! parameters.
//!
//! The shapes are log-weighted: small sharpening radii dominate, the
//! sharpening amount rises gently up to 250 before decaying, and denoising
//! luminance peaks around 20 with a long tail.

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;

/// Evenly spaced samples over `[start, stop]`, endpoints included.
fn linspace(start: f64, stop: f64, num: usize) -> impl Iterator<Item = f64> {
    let step = if num > 1 {
        (stop - start) / (num - 1) as f64
    } else {
        0.0
    };
    (0..num).map(move |i| start + step * i as f64)
}

/// A finite set of values drawn with fixed weights.
#[derive(Debug, Clone)]
pub struct Empirical<T> {
    values: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T: Copy> Empirical<T> {
    pub fn new(values: Vec<T>, weights: &[f64]) -> Result<Self, WeightedError> {
        debug_assert_eq!(values.len(), weights.len());
        let index = WeightedIndex::new(weights)?;
        Ok(Self { values, index })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.values[self.index.sample(rng)]
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

/// Unsharp-mask radius: 0.30..=3.00 in steps of 0.01, weights 10^x for x
/// falling linearly from 1 to 0.1.
pub fn sharpen_radius() -> Result<Empirical<f64>, WeightedError> {
    let values: Vec<f64> = (30..=300).map(|r| r as f64 / 100.0).collect();
    let weights: Vec<f64> = linspace(1.0, 0.1, values.len())
        .map(|x| 10f64.powf(x))
        .collect();
    Empirical::new(values, &weights)
}

/// Unsharp-mask amount: 0..=1000.
pub fn sharpen_amount() -> Result<Empirical<u32>, WeightedError> {
    let values: Vec<u32> = (0..=1000).collect();
    let peak = 1.005f64.powf(250.0);
    let weights: Vec<f64> = linspace(0.0, 250.0, 250)
        .map(|x| 1.005f64.powf(x))
        .chain(linspace(0.0, 751.0, 751).map(|x| 0.985f64.powf(x) * peak))
        .collect();
    Empirical::new(values, &weights)
}

/// Denoising luminance: 0..=100.
pub fn denoise_luminance() -> Result<Empirical<u32>, WeightedError> {
    let values: Vec<u32> = (0..=100).collect();
    let peak = 1.0025f64.powf(20.0);
    let weights: Vec<f64> = linspace(0.0, 20.0, 20)
        .map(|x| 1.0025f64.powf(x))
        .chain(linspace(0.0, 81.0, 81).map(|x| 0.990f64.powf(x) * peak))
        .collect();
    Empirical::new(values, &weights)
}

/// Exclusive upper bound of the uniform denoising detail draw.
pub const DENOISE_DETAIL_MAX: u32 = 60;
