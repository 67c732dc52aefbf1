//! Merge per-point limit files into per-category files.
//!
//! Layout after a sweep:
//!
//! ```text
//! <root>/lm_250/limits_cmb.json
//! <root>/lm_260/limits_cmb.json
//! ...
//! ```
//!
//! Aggregation writes `<root>/limits_cmb.json` holding the union of the
//! per-point mappings.

use std::path::{Path, PathBuf};

use hh_core::{LimitMap, Result};
use serde::Serialize;

use crate::workdir;

/// Categories produced by the resonant ttbb analysis.
pub const DEFAULT_CATEGORIES: [&str; 7] =
    ["cmb", "eTau", "muTau", "tauTau", "res1b", "res2b", "boosted"];

/// File name of the combined mapping consumed by the plotter.
pub const ALL_LIMITS_FILE: &str = "all_limits.json";

/// `limits_<category>.json`.
pub fn limits_file_name(category: &str) -> String {
    format!("limits_{category}.json")
}

/// One written category file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub category: String,
    pub output: PathBuf,
    pub points: usize,
    pub entries: usize,
}

/// Merge `<root>/<point>/limits_<category>.json` over `points` in order.
///
/// Later points overwrite earlier ones on key collision. A missing or
/// malformed file aborts.
pub fn aggregate_category(root: &Path, points: &[String], category: &str) -> Result<LimitMap> {
    let file_name = limits_file_name(category);
    let mut acc = LimitMap::new();
    for point in points {
        let path = root.join(point).join(&file_name);
        tracing::debug!(path = %path.display(), "merging point result");
        acc.merge(LimitMap::load(&path)?);
    }
    Ok(acc)
}

/// Aggregate every category and write `<root>/limits_<category>.json`.
///
/// Point directories are visited in lexicographic order; the accumulator
/// starts empty for every category.
pub fn aggregate(root: &Path, categories: &[String]) -> Result<Vec<AggregateSummary>> {
    let points = workdir::subdirectories(root)?;
    tracing::info!(root = %root.display(), points = points.len(), "aggregating limits");

    let mut summaries = Vec::with_capacity(categories.len());
    for category in categories {
        let merged = aggregate_category(root, &points, category)?;
        let output = root.join(limits_file_name(category));
        merged.save(&output)?;
        tracing::info!(category = %category, entries = merged.len(), "wrote {}", output.display());
        summaries.push(AggregateSummary {
            category: category.clone(),
            output,
            points: points.len(),
            entries: merged.len(),
        });
    }
    Ok(summaries)
}

/// Build the category → record mapping at `point_label` from the aggregated
/// `<root>/limits_<category>.json` files and write `<root>/all_limits.json`.
///
/// A category file without `point_label` is skipped with a warning.
pub fn combine_categories(root: &Path, categories: &[String], point_label: &str) -> Result<LimitMap> {
    let mut combined = LimitMap::new();
    for category in categories {
        let limits = LimitMap::load(&root.join(limits_file_name(category)))?;
        match limits.get(point_label) {
            Some(record) => {
                combined.insert(category.clone(), record.clone());
            }
            None => {
                tracing::warn!(category = %category, point = point_label, "point missing; category skipped");
            }
        }
    }
    combined.save(&root.join(ALL_LIMITS_FILE))?;
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hh_core::{Error, LimitRecord};

    fn write(root: &Path, point: &str, category: &str, entries: &[(&str, f64)]) {
        let map: LimitMap = entries
            .iter()
            .map(|(k, v)| (k.to_string(), LimitRecord::expected(v - 2.0, v - 1.0, *v, v + 1.0, v + 2.0)))
            .collect();
        map.save(&root.join(point).join(limits_file_name(category))).unwrap();
    }

    fn cats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn later_point_wins_on_collision() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "A", "cmb", &[("1.0", 5.0)]);
        write(tmp.path(), "B", "cmb", &[("1.0", 7.0)]);

        let summary = aggregate(tmp.path(), &cats(&["cmb"])).unwrap();
        assert_eq!(summary[0].entries, 1);
        assert_eq!(summary[0].points, 2);

        let merged = LimitMap::load(&tmp.path().join("limits_cmb.json")).unwrap();
        assert_relative_eq!(merged.get("1.0").unwrap().exp0, 7.0);
    }

    #[test]
    fn categories_do_not_leak_into_each_other() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "lm_250", "cmb", &[("250", 3.0)]);
        write(tmp.path(), "lm_250", "eTau", &[("250", 9.0)]);
        write(tmp.path(), "lm_260", "cmb", &[("260", 2.0)]);
        write(tmp.path(), "lm_260", "eTau", &[("260", 8.0)]);

        aggregate(tmp.path(), &cats(&["cmb", "eTau"])).unwrap();
        let etau = LimitMap::load(&tmp.path().join("limits_eTau.json")).unwrap();
        assert_eq!(etau.keys().collect::<Vec<_>>(), ["250", "260"]);
        assert_relative_eq!(etau.get("250").unwrap().exp0, 9.0);
    }

    #[test]
    fn missing_point_file_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "lm_250", "cmb", &[("250", 3.0)]);
        std::fs::create_dir(tmp.path().join("lm_260")).unwrap();

        match aggregate(tmp.path(), &cats(&["cmb"])) {
            Err(Error::MissingResult { path }) => {
                assert!(path.ends_with("lm_260/limits_cmb.json"), "{}", path.display())
            }
            other => panic!("expected MissingResult, got {other:?}"),
        }
        assert!(!tmp.path().join("limits_cmb.json").exists());
    }

    #[test]
    fn combine_collects_one_point_per_category() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "sm", "cmb", &[("1.0", 20.0)]);
        write(tmp.path(), "sm", "eTau", &[("1.0", 60.0)]);
        write(tmp.path(), "sm", "muTau", &[("2.0", 50.0)]);
        let categories = cats(&["cmb", "eTau", "muTau"]);
        aggregate(tmp.path(), &categories).unwrap();

        let combined = combine_categories(tmp.path(), &categories, "1.0").unwrap();
        assert_eq!(combined.keys().collect::<Vec<_>>(), ["cmb", "eTau"]);
        let on_disk = LimitMap::load(&tmp.path().join(ALL_LIMITS_FILE)).unwrap();
        assert_eq!(on_disk, combined);
    }
}
