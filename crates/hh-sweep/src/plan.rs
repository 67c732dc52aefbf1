//! Sweep plans.
//!
//! A plan is the static table the sweep enumerates: a label, the points to
//! visit (optionally grouped, e.g. by mass region) and the argument template
//! of the per-point command.
//!
//! ```yaml
//! label: Res_s2_MVA
//! output_root: output/2018-01-29/Res_newMW
//! command: [hhstat, limits, --cfg, "{cfg}", --model-desc, ttbb_res,
//!           --output, "{output}", --signal-point, "{point}", "{shapes}"]
//! shapes: "shapes/all_mva_score_mhVis_mva_{group}newkinS2M{point}C-1.root"
//! variables:
//!   cfg: LimitSetups/Run2_2016/ttbb.cfg
//! groups:
//!   - name: lm
//!     points: [250, 260, 270]
//!   - name: hm
//!     points: [450, 500]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use hh_core::{Error, Result, Scalar};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::template;

/// Placeholders every plan may use.
pub const BUILTIN_VARS: [&str; 5] = ["point", "group", "output", "label", "shapes"];

/// Points sharing a group label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointGroup {
    pub name: String,
    pub points: Vec<Scalar>,
}

/// One coordinate of the sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub value: String,
}

impl ParameterPoint {
    /// Directory name: `<group>_<value>` or `<value>`.
    pub fn dir_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{group}_{}", self.value),
            None => self.value.clone(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

/// Static sweep table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepPlan {
    pub label: String,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Working directory of every job; defaults to the directory the sweep is started from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    /// Argument vector template; the first element is the program.
    pub command: Vec<String>,
    /// Template of the shapes file, available to `command` as `{shapes}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shapes: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub groups: Vec<PointGroup>,
    /// Ungrouped points (a one-dimensional scan).
    #[serde(default)]
    pub points: Vec<Scalar>,
}

impl SweepPlan {
    /// Load a YAML (or JSON) plan and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let plan = Self::from_yaml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Ok(plan)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let plan: SweepPlan = serde_yaml_ng::from_str(text)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Points in declaration order: groups first, then ungrouped points.
    pub fn points(&self) -> Vec<ParameterPoint> {
        let grouped = self.groups.iter().flat_map(|g| {
            g.points
                .iter()
                .map(|p| ParameterPoint { group: Some(g.name.clone()), value: p.to_string() })
        });
        let loose =
            self.points.iter().map(|p| ParameterPoint { group: None, value: p.to_string() });
        grouped.chain(loose).collect()
    }

    /// Structural checks, including every template placeholder.
    pub fn validate(&self) -> Result<()> {
        if !is_dir_component(&self.label) {
            return Err(Error::Validation(format!("invalid sweep label '{}'", self.label)));
        }
        if self.command.is_empty() {
            return Err(Error::Validation("sweep command is empty".into()));
        }
        for name in self.variables.keys() {
            if BUILTIN_VARS.contains(&name.as_str()) {
                return Err(Error::Validation(format!(
                    "variable '{name}' shadows a built-in placeholder"
                )));
            }
        }

        let points = self.points();
        if points.is_empty() {
            return Err(Error::Validation(format!("sweep '{}' has no points", self.label)));
        }
        let mut seen = BTreeSet::new();
        for p in &points {
            let dir = p.dir_name();
            if !is_dir_component(&dir) {
                return Err(Error::Validation(format!("invalid point directory name '{dir}'")));
            }
            if !seen.insert(dir.clone()) {
                return Err(Error::Validation(format!("duplicate point '{dir}'")));
            }
        }

        let mut known: BTreeSet<&str> = self.variables.keys().map(String::as_str).collect();
        known.extend(BUILTIN_VARS.iter().copied().filter(|v| *v != "shapes"));
        if let Some(shapes) = &self.shapes {
            check_known(shapes, &known)?;
            known.insert("shapes");
        }
        for arg in &self.command {
            check_known(arg, &known)?;
        }
        Ok(())
    }

    /// SHA-256 of the plan's canonical JSON form.
    pub fn hash(&self) -> Result<String> {
        let bytes = serde_json::to_vec(&serde_json::to_value(self)?)?;
        let mut h = Sha256::new();
        h.update(&bytes);
        Ok(h.finalize().iter().map(|b| format!("{b:02x}")).collect())
    }
}

/// `name` names exactly one child directory: no separators, no `.` or `..`.
fn is_dir_component(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}

fn check_known(tmpl: &str, known: &BTreeSet<&str>) -> Result<()> {
    for name in template::placeholders(tmpl)? {
        if !known.contains(name.as_str()) {
            return Err(Error::Validation(format!(
                "unknown placeholder '{{{name}}}' in template '{tmpl}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RES_PLAN: &str = r#"
label: Res_s2_MVA
output_root: out
command: [run_limits, --output, "{output}", --signal-point, "{point}", "{shapes}", --cfg, "{cfg}"]
shapes: "shapes/all_{group}_S2M{point}.root"
variables:
  cfg: ttbb.cfg
groups:
  - name: lm
    points: [250, 260]
  - name: hm
    points: [450]
"#;

    #[test]
    fn points_follow_declaration_order() {
        let plan = SweepPlan::from_yaml_str(RES_PLAN).unwrap();
        let dirs: Vec<String> = plan.points().iter().map(ParameterPoint::dir_name).collect();
        assert_eq!(dirs, ["lm_250", "lm_260", "hm_450"]);
    }

    #[test]
    fn ungrouped_scan_uses_bare_values() {
        let plan = SweepPlan::from_yaml_str(
            "label: kl_scan\ncommand: [run, '{output}']\npoints: [-20, -1, 0, 2.45]\n",
        )
        .unwrap();
        let dirs: Vec<String> = plan.points().iter().map(ParameterPoint::dir_name).collect();
        assert_eq!(dirs, ["-20", "-1", "0", "2.45"]);
        assert_eq!(plan.output_root, PathBuf::from("output"));
    }

    #[test]
    fn unknown_placeholder_is_rejected_at_load() {
        let err = SweepPlan::from_yaml_str("label: x\ncommand: [run, '{spin}']\npoints: [1]\n")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");
        assert!(err.to_string().contains("{spin}"));
    }

    #[test]
    fn shapes_placeholder_needs_a_template() {
        assert!(
            SweepPlan::from_yaml_str("label: x\ncommand: [run, '{shapes}']\npoints: [1]\n").is_err()
        );
    }

    #[test]
    fn duplicates_and_shadowing_are_rejected() {
        assert!(
            SweepPlan::from_yaml_str("label: x\ncommand: [run]\npoints: [1, 1]\n").is_err()
        );
        assert!(
            SweepPlan::from_yaml_str(
                "label: x\ncommand: [run]\npoints: [1]\nvariables: {point: '3'}\n"
            )
            .is_err()
        );
        assert!(SweepPlan::from_yaml_str("label: x\ncommand: [run]\n").is_err());
    }

    #[test]
    fn points_and_labels_must_stay_below_the_output_root() {
        for point in ["'..'", "'.'", "'a/b'", "''"] {
            let yaml = format!("label: x\ncommand: [run]\npoints: [{point}]\n");
            let err = SweepPlan::from_yaml_str(&yaml).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{point}: {err}");
        }
        for label in ["'..'", "'.'", "a/b"] {
            let yaml = format!("label: {label}\ncommand: [run]\npoints: [1]\n");
            assert!(SweepPlan::from_yaml_str(&yaml).is_err(), "{label}");
        }
        // a group turns `..` into an ordinary name
        let plan = SweepPlan::from_yaml_str(
            "label: x\ncommand: [run]\ngroups: [{name: lm, points: ['..']}]\n",
        )
        .unwrap();
        assert_eq!(plan.points()[0].dir_name(), "lm_..");
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = SweepPlan::from_yaml_str(RES_PLAN).unwrap();
        let mut b = a.clone();
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
        assert_eq!(a.hash().unwrap().len(), 64);
        b.variables.insert("cfg".into(), "other.cfg".into());
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }
}
