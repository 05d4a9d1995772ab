//! Shared utilities for rawbase integration tests.
//!
//! - `TestHarness` owns a temporary corpus root with RAW collections
//! - `ConfigBuilder` assembles configurations without JSON boilerplate
//! - fake converters stand in for RawTherapee and x3f_extract

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use fakes::*;
pub use harness::TestHarness;
