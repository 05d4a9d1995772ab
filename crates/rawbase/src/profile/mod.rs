pub mod distributions;
pub mod sampler;
pub mod serializer;
pub mod types;

pub use sampler::{image_seed, ParameterSampler, SamplerError};
pub use serializer::{audit_line, render_pp3, Claim, ProfileSerializer, SerializeError};
pub use types::{
    CropSize, DenoiseParams, DevelopmentProfile, RealizedProfile, ResizeKernel, SharpenParams,
    Stage, StageOrder, StageToggles, SubsamplingMode,
};
