//! Stat-model descriptors.
//!
//! A descriptor names everything the limit pipeline needs to know about one
//! statistical model: which limit type it produces, whether it is blinded,
//! the scan grids for two-dimensional models and the labels used when the
//! external plotting scripts are invoked.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::deserialize_labels;
use crate::{Error, Result};

/// Kind of limit a model produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LimitType {
    /// Cross-section limits per signal point.
    #[serde(rename = "model_independent")]
    ModelIndependent,
    /// Signal-strength limit relative to the Standard Model.
    #[serde(rename = "SM")]
    Sm,
    /// Two-dimensional (mA, tanβ) exclusion.
    #[serde(rename = "MSSM")]
    Mssm,
    /// Non-resonant anomalous-coupling scan.
    #[serde(rename = "NonResonant_BSM")]
    NonResonantBsm,
}

impl LimitType {
    /// Name as written in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::ModelIndependent => "model_independent",
            LimitType::Sm => "SM",
            LimitType::Mssm => "MSSM",
            LimitType::NonResonantBsm => "NonResonant_BSM",
        }
    }

    /// Whether limits are computed per signal point (as opposed to on a 2D grid).
    pub fn is_pointwise(&self) -> bool {
        !matches!(self, LimitType::Mssm)
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "model_independent" => Ok(LimitType::ModelIndependent),
            "SM" => Ok(LimitType::Sm),
            "MSSM" => Ok(LimitType::Mssm),
            "NonResonant_BSM" => Ok(LimitType::NonResonantBsm),
            other => Err(Error::Config(format!("limit type '{other}' not supported"))),
        }
    }
}

impl<'de> Deserialize<'de> for LimitType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Closed interval used for drawing ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Interval with a scan step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeWithStep {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl RangeWithStep {
    /// `min:max|step`, the grid syntax understood by the asymptotic grid tool.
    pub fn grid_spec(&self) -> String {
        format!("{}:{}|{}", self.min, self.max, self.step)
    }

    /// Number of grid nodes including both ends.
    pub fn n_points(&self) -> usize {
        if self.step <= 0.0 || self.max < self.min {
            return 0;
        }
        ((self.max - self.min) / self.step + 1e-9).floor() as usize + 1
    }
}

/// Typed stat-model descriptor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatModelDescriptor {
    pub name: String,
    pub stat_model: String,
    pub years: Vec<u32>,
    pub channels: Vec<String>,
    pub categories: Vec<String>,
    pub signal_processes: Vec<String>,
    pub model_signal_process: String,
    pub signal_point_prefix: String,
    #[serde(deserialize_with = "deserialize_labels")]
    pub signal_points: Vec<String>,
    pub limit_type: LimitType,
    pub th_model_file: Option<PathBuf>,
    pub blind: bool,
    pub morph: bool,
    pub combine_channels: bool,
    pub per_channel_limits: bool,
    pub per_category_limits: bool,
    pub per_year_limits: bool,
    pub grid_x: Option<RangeWithStep>,
    pub grid_y: Option<RangeWithStep>,
    pub label_status: String,
    pub label_scenario: String,
    pub label_lumi: String,
    pub title_x: String,
    pub title_y: String,
    pub draw_range_x: Option<Range>,
    pub draw_range_y: Option<Range>,
    pub draw_mh_exclusion: bool,
    #[serde(rename = "draw_mH_isolines", alias = "draw_mh_isolines")]
    pub draw_mh_isolines: bool,
    pub iso_label_draw_margin: f64,
    #[serde(alias = "custom_param")]
    pub custom_params: BTreeMap<String, String>,
}

impl Default for StatModelDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            stat_model: String::new(),
            years: Vec::new(),
            channels: Vec::new(),
            categories: Vec::new(),
            signal_processes: Vec::new(),
            model_signal_process: String::new(),
            signal_point_prefix: String::new(),
            signal_points: Vec::new(),
            limit_type: LimitType::ModelIndependent,
            th_model_file: None,
            blind: true,
            morph: false,
            combine_channels: true,
            per_channel_limits: false,
            per_category_limits: false,
            per_year_limits: false,
            grid_x: None,
            grid_y: None,
            label_status: String::new(),
            label_scenario: String::new(),
            label_lumi: String::new(),
            title_x: String::new(),
            title_y: String::new(),
            draw_range_x: None,
            draw_range_y: None,
            draw_mh_exclusion: false,
            draw_mh_isolines: false,
            iso_label_draw_margin: 0.8,
            custom_params: BTreeMap::new(),
        }
    }
}

impl StatModelDescriptor {
    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("model descriptor without a name".into()));
        }
        for (axis, grid) in [("grid_x", &self.grid_x), ("grid_y", &self.grid_y)] {
            if let Some(g) = grid
                && (g.step <= 0.0 || g.max < g.min)
            {
                return Err(Error::Config(format!(
                    "{}: {axis} must satisfy min <= max and step > 0 (got {})",
                    self.name,
                    g.grid_spec()
                )));
            }
        }
        if self.limit_type == LimitType::Mssm {
            let missing: Vec<&str> = [
                ("th_model_file", self.th_model_file.is_none()),
                ("grid_x", self.grid_x.is_none()),
                ("grid_y", self.grid_y.is_none()),
                ("draw_range_x", self.draw_range_x.is_none()),
                ("draw_range_y", self.draw_range_y.is_none()),
            ]
            .into_iter()
            .filter_map(|(key, absent)| absent.then_some(key))
            .collect();
            if !missing.is_empty() {
                return Err(Error::Config(format!(
                    "{}: MSSM limits require {}",
                    self.name,
                    missing.join(", ")
                )));
            }
        }
        if self.draw_mh_isolines && self.signal_points.is_empty() {
            return Err(Error::Config(format!(
                "{}: draw_mH_isolines needs signal_points",
                self.name
            )));
        }
        Ok(())
    }

    /// Typed lookup of a free-form custom parameter.
    pub fn custom<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.custom_params.get(key).ok_or_else(|| {
            Error::Config(format!("custom parameter '{key}' not found in '{}'", self.name))
        })?;
        raw.parse().map_err(|_| {
            Error::Config(format!(
                "unable to parse a value ('{raw}') of the custom parameter '{key}'"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_type_names_round_trip() {
        for lt in [
            LimitType::ModelIndependent,
            LimitType::Sm,
            LimitType::Mssm,
            LimitType::NonResonantBsm,
        ] {
            assert_eq!(lt.as_str().parse::<LimitType>().unwrap(), lt);
        }
    }

    #[test]
    fn unknown_limit_type_is_a_config_error() {
        let err = "Resonant".parse::<LimitType>().unwrap_err();
        assert!(err.to_string().contains("limit type 'Resonant' not supported"), "{err}");
    }

    #[test]
    fn grid_spec_and_points() {
        let g = RangeWithStep { min: 90.0, max: 1000.0, step: 10.0 };
        assert_eq!(g.grid_spec(), "90:1000|10");
        assert_eq!(g.n_points(), 92);
    }

    #[test]
    fn defaults_match_blinded_combination() {
        let d = StatModelDescriptor::default();
        assert!(d.blind);
        assert!(d.combine_channels);
        assert_eq!(d.limit_type, LimitType::ModelIndependent);
    }

    #[test]
    fn mssm_requires_grids() {
        let d = StatModelDescriptor {
            name: "mssm".into(),
            limit_type: LimitType::Mssm,
            ..Default::default()
        };
        let err = d.validate().unwrap_err().to_string();
        assert!(err.contains("grid_x") && err.contains("th_model_file"), "{err}");
    }

    #[test]
    fn custom_params_are_typed() {
        let mut d = StatModelDescriptor { name: "m".into(), ..Default::default() };
        d.custom_params.insert("mass_shift".into(), "2.5".into());
        d.custom_params.insert("tag".into(), "abc".into());
        assert_eq!(d.custom::<f64>("mass_shift").unwrap(), 2.5);
        assert!(d.custom::<f64>("tag").is_err());
        assert!(d.custom::<String>("absent").is_err());
    }
}
