//! # hh-sweep
//!
//! Drives the external statistics tools: enumerates a sweep plan into one
//! job per parameter point, runs each job synchronously in its own output
//! directory, merges the per-point limit files and runs the per-point limit
//! pipeline (datacards, workspaces, limits, pulls, goodness of fit, impacts).

#![warn(clippy::all)]

pub mod aggregate;
pub mod exec;
pub mod job;
pub mod pipeline;
pub mod plan;
pub mod sweep;
pub mod template;
pub mod workdir;

pub use aggregate::{AggregateSummary, DEFAULT_CATEGORIES, aggregate, combine_categories};
pub use exec::{CommandRunner, Invocation, ProcessRunner, RecordingRunner, RunStatus};
pub use job::JobDescriptor;
pub use pipeline::{LimitPipeline, PipelineMode, PipelineOptions};
pub use plan::{ParameterPoint, PointGroup, SweepPlan};
pub use sweep::{FailurePolicy, JobStatus, SweepJobReport, SweepOptions, SweepReport, run_sweep};
