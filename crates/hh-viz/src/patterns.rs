use std::path::Path;

use hh_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Ordered category keys drawn side by side on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanelPattern {
    /// Page name (used for per-page file names).
    pub name: String,
    /// Keys looked up in the combined mapping, one bin each.
    pub keys: Vec<String>,
    /// Bin labels; defaults to the keys.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Lower end of the y axis; auto-ranged when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_min: Option<f64>,
    /// Upper end of the y axis; auto-ranged when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_max: Option<f64>,
}

impl PanelPattern {
    /// Pattern whose labels are the keys themselves.
    pub fn new(name: impl Into<String>, keys: Vec<String>) -> Self {
        Self { name: name.into(), labels: keys.clone(), keys, y_min: None, y_max: None }
    }

    /// Fix the y axis to `[y_min, y_max]`.
    pub fn with_range(mut self, y_min: f64, y_max: f64) -> Self {
        self.y_min = Some(y_min);
        self.y_max = Some(y_max);
        self
    }

    /// Replace the bin labels.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Label of bin `i`, falling back to its key.
    pub fn label(&self, i: usize) -> &str {
        self.labels.get(i).unwrap_or(&self.keys[i])
    }

    fn validate(&self) -> Result<()> {
        if self.keys.is_empty() {
            return Err(Error::Validation(format!("panel '{}' has no keys", self.name)));
        }
        if !self.labels.is_empty() && self.labels.len() != self.keys.len() {
            return Err(Error::Validation(format!(
                "panel '{}': {} labels for {} keys",
                self.name,
                self.labels.len(),
                self.keys.len()
            )));
        }
        if let (Some(lo), Some(hi)) = (self.y_min, self.y_max)
            && lo >= hi
        {
            return Err(Error::Validation(format!("panel '{}': y_min must be below y_max", self.name)));
        }
        Ok(())
    }
}

/// Signal production mode of the default pages; it sets their y ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Production {
    /// Gluon fusion.
    #[default]
    Ggf,
    /// Vector-boson fusion, whose limits sit about an order of magnitude higher.
    Vbf,
}

impl Production {
    fn frame_min(self) -> f64 {
        match self {
            Production::Ggf => 1.0,
            Production::Vbf => 100.0,
        }
    }

    /// Upper end of the full-combination pages.
    fn combined_max(self) -> f64 {
        match self {
            Production::Ggf => 400.0,
            Production::Vbf => 4000.0,
        }
    }

    /// Upper end of the page of one year. 2017 is the least sensitive year.
    fn year_max(self, year: u32) -> f64 {
        match (self, year) {
            (Production::Vbf, _) => 10000.0,
            (Production::Ggf, 2017) => 4000.0,
            (Production::Ggf, _) => 1000.0,
        }
    }
}

/// Display label for a channel key.
fn channel_label(channel: &str) -> String {
    match channel {
        "eTau" => "e#tau".to_string(),
        "muTau" => "#mu#tau".to_string(),
        "tauTau" => "#tau#tau".to_string(),
        other => other.to_string(),
    }
}

/// The standard page set for a multi-year combination:
///
/// 1. per-year combinations plus the full combination,
/// 2. per-channel results plus the full combination,
/// 3. for every year, its channels plus that year's combination.
///
/// Every page gets the fixed y range used for `production`.
pub fn default_patterns(years: &[u32], channels: &[String], production: Production) -> Vec<PanelPattern> {
    let min = production.frame_min();
    let mut out = Vec::with_capacity(2 + years.len());

    let mut keys: Vec<String> = years.iter().map(|y| format!("{y}_cmb")).collect();
    let mut labels: Vec<String> = years.iter().map(u32::to_string).collect();
    keys.push("cmb".into());
    labels.push("Run 2".into());
    out.push(PanelPattern::new("years", keys).with_labels(labels).with_range(min, production.combined_max()));

    let mut keys = channels.to_vec();
    let mut labels: Vec<String> = channels.iter().map(|c| channel_label(c)).collect();
    keys.push("cmb".into());
    labels.push("Run 2".into());
    out.push(
        PanelPattern::new("channels", keys).with_labels(labels).with_range(min, production.combined_max()),
    );

    for year in years {
        let mut keys: Vec<String> = channels.iter().map(|c| format!("{year}_{c}")).collect();
        let mut labels: Vec<String> = channels.iter().map(|c| channel_label(c)).collect();
        keys.push(format!("{year}_cmb"));
        labels.push(year.to_string());
        out.push(
            PanelPattern::new(format!("channels_{year}"), keys)
                .with_labels(labels)
                .with_range(min, production.year_max(*year)),
        );
    }
    out
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternFile {
    List(Vec<PanelPattern>),
    Wrapped { panels: Vec<PanelPattern> },
}

/// Load panel patterns from YAML (or JSON): either a list or `{panels: [...]}`.
pub fn load_patterns(path: &Path) -> Result<Vec<PanelPattern>> {
    let text = std::fs::read_to_string(path)?;
    let patterns = match serde_yaml_ng::from_str(&text)? {
        PatternFile::List(p) | PatternFile::Wrapped { panels: p } => p,
    };
    for p in &patterns {
        p.validate()?;
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_run2_combination() {
        let channels: Vec<String> = ["eTau", "muTau", "tauTau"].iter().map(|s| s.to_string()).collect();
        let p = default_patterns(&[2016, 2017, 2018], &channels, Production::Ggf);
        assert_eq!(p.len(), 5);
        assert_eq!(p[0].keys, ["2016_cmb", "2017_cmb", "2018_cmb", "cmb"]);
        assert_eq!(p[0].labels, ["2016", "2017", "2018", "Run 2"]);
        assert_eq!(p[1].keys, ["eTau", "muTau", "tauTau", "cmb"]);
        assert_eq!(p[1].labels, ["e#tau", "#mu#tau", "#tau#tau", "Run 2"]);
        assert_eq!(p[3].keys, ["2017_eTau", "2017_muTau", "2017_tauTau", "2017_cmb"]);
        assert_eq!(p[3].label(3), "2017");
        assert_eq!(p[4].name, "channels_2018");
    }

    #[test]
    fn default_pages_have_fixed_frames() {
        let channels = vec!["eTau".to_string()];
        let ranges = |production: Production| -> Vec<(Option<f64>, Option<f64>)> {
            default_patterns(&[2016, 2017, 2018], &channels, production)
                .iter()
                .map(|p| (p.y_min, p.y_max))
                .collect()
        };
        let ggf = ranges(Production::Ggf);
        assert_eq!(ggf[0], (Some(1.0), Some(400.0)));
        assert_eq!(ggf[1], (Some(1.0), Some(400.0)));
        assert_eq!(ggf[2], (Some(1.0), Some(1000.0)));
        assert_eq!(ggf[3], (Some(1.0), Some(4000.0)));
        assert_eq!(ggf[4], (Some(1.0), Some(1000.0)));

        let vbf = ranges(Production::Vbf);
        assert_eq!(vbf[0], (Some(100.0), Some(4000.0)));
        assert!(vbf[2..].iter().all(|r| *r == (Some(100.0), Some(10000.0))));
    }

    #[test]
    fn loads_list_and_wrapped_forms() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.yaml");
        std::fs::write(&list, "- name: sm\n  keys: [eTau, cmb]\n  y_max: 400\n").unwrap();
        let p = load_patterns(&list).unwrap();
        assert_eq!(p[0].label(0), "eTau");
        assert_eq!(p[0].y_max, Some(400.0));

        let wrapped = dir.path().join("wrapped.json");
        std::fs::write(&wrapped, r#"{"panels": [{"name": "a", "keys": ["x"], "labels": ["X"]}]}"#)
            .unwrap();
        assert_eq!(load_patterns(&wrapped).unwrap()[0].label(0), "X");
    }

    #[test]
    fn label_count_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "- name: sm\n  keys: [a, b]\n  labels: [A]\n").unwrap();
        assert!(load_patterns(&path).is_err());
    }
}
