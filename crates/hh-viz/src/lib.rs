//! # hh-viz
//!
//! Visualization data artifacts for the hh limit drivers.
//!
//! This crate is dependency-light and turns a combined limit mapping into
//! plot-friendly panel structures (parallel arrays instead of nested maps).

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Limit bar panels (expected bands, observed points, reference ratio).
pub mod limits;

/// Panel patterns: which categories go on one page.
pub mod patterns;

pub use limits::{LimitBarsArtifact, RatioPanel, build_panels};
pub use patterns::{PanelPattern, Production, default_patterns, load_patterns};
