//! # hh-core
//!
//! Shared types for the hh limit-setting drivers: the error taxonomy, limit
//! records and mappings with their JSON persistence, and the typed
//! stat-model descriptor configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Descriptor configuration files (`tools` + `models`).
#[allow(missing_docs)]
pub mod config;
/// Typed stat-model descriptors.
#[allow(missing_docs)]
pub mod descriptor;
/// Error types.
pub mod error;
/// Limit records and mappings.
pub mod types;

pub use config::{ModelConfig, ToolsConfig};
pub use descriptor::{LimitType, Range, RangeWithStep, StatModelDescriptor};
pub use error::{Error, Result};
pub use types::{LimitMap, LimitRecord, Scalar};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
