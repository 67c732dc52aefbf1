//! Per-point job descriptors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hh_core::Result;

use crate::exec::Invocation;
use crate::plan::{ParameterPoint, SweepPlan};
use crate::template;

/// Everything needed to run one point; built fresh for every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub point: ParameterPoint,
    pub output_dir: PathBuf,
    pub invocation: Invocation,
    /// Glob matching the per-category result files the job is expected to write.
    pub result_pattern: String,
}

impl JobDescriptor {
    /// Build the job for `point`. `output_root` and `cwd` are already resolved.
    pub fn build(
        plan: &SweepPlan,
        point: &ParameterPoint,
        output_root: &Path,
        cwd: &Path,
    ) -> Result<Self> {
        let output_dir = output_root.join(&plan.label).join(point.dir_name());

        let mut vars: BTreeMap<String, String> = plan.variables.clone();
        vars.insert("point".into(), point.value.clone());
        vars.insert("group".into(), point.group.clone().unwrap_or_default());
        vars.insert("output".into(), output_dir.display().to_string());
        vars.insert("label".into(), plan.label.clone());
        if let Some(shapes) = &plan.shapes {
            let rendered = template::render(shapes, &vars)?;
            vars.insert("shapes".into(), rendered);
        }

        let argv = plan
            .command
            .iter()
            .map(|arg| template::render(arg, &vars))
            .collect::<Result<Vec<_>>>()?;
        let (program, args) = argv.split_first().map(|(p, a)| (p.clone(), a.to_vec())).unwrap_or_default();

        Ok(Self {
            point: point.clone(),
            result_pattern: output_dir.join("limits_*.json").display().to_string(),
            output_dir,
            invocation: Invocation { program, args, cwd: cwd.to_path_buf(), stdout: None },
        })
    }
}

impl SweepPlan {
    /// Jobs for every point, in declaration order.
    pub fn jobs(&self, output_root: &Path, cwd: &Path) -> Result<Vec<JobDescriptor>> {
        self.points().iter().map(|p| JobDescriptor::build(self, p, output_root, cwd)).collect()
    }
}
