use hh_core::LimitMap;
use serde::{Deserialize, Serialize};

use crate::patterns::PanelPattern;

/// Expected-limit ratio against a reference result, one value per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioPanel {
    /// Reference expected median per bin.
    pub reference_exp0: Vec<f64>,
    /// `exp0 / reference_exp0` per bin.
    pub ratio: Vec<f64>,
}

/// One page of limit bars: categorical bins with ±1σ/±2σ expected bands,
/// the expected median and optionally the observed limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitBarsArtifact {
    /// Page name.
    pub name: String,
    /// Category keys, one per bin.
    pub keys: Vec<String>,
    /// Bin labels aligned with `keys`.
    pub labels: Vec<String>,
    /// Expected median per bin.
    pub exp0: Vec<f64>,
    /// Expected −1σ per bin.
    pub exp_minus1: Vec<f64>,
    /// Expected +1σ per bin.
    pub exp_plus1: Vec<f64>,
    /// Expected −2σ per bin.
    pub exp_minus2: Vec<f64>,
    /// Expected +2σ per bin.
    pub exp_plus2: Vec<f64>,
    /// Observed limit per bin; `None` when blinded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs: Option<Vec<Option<f64>>>,
    /// Fixed y range lower end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_min: Option<f64>,
    /// Fixed y range upper end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_max: Option<f64>,
    /// Reference ratio sub-panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<RatioPanel>,
}

impl LimitBarsArtifact {
    /// Build the panel for `pattern`, or `None` if any key is missing from `limits`.
    pub fn from_pattern(limits: &LimitMap, pattern: &PanelPattern, show_observed: bool) -> Option<Self> {
        let n = pattern.keys.len();
        let mut art = Self {
            name: pattern.name.clone(),
            keys: pattern.keys.clone(),
            labels: (0..n).map(|i| pattern.label(i).to_string()).collect(),
            exp0: Vec::with_capacity(n),
            exp_minus1: Vec::with_capacity(n),
            exp_plus1: Vec::with_capacity(n),
            exp_minus2: Vec::with_capacity(n),
            exp_plus2: Vec::with_capacity(n),
            obs: show_observed.then(|| Vec::with_capacity(n)),
            y_min: pattern.y_min,
            y_max: pattern.y_max,
            ratio: None,
        };

        for key in &pattern.keys {
            let Some(rec) = limits.get(key) else {
                tracing::debug!(panel = %pattern.name, key = %key, "key missing; panel skipped");
                return None;
            };
            art.exp0.push(rec.exp0);
            art.exp_minus1.push(rec.exp_minus1);
            art.exp_plus1.push(rec.exp_plus1);
            art.exp_minus2.push(rec.exp_minus2);
            art.exp_plus2.push(rec.exp_plus2);
            if let Some(obs) = art.obs.as_mut() {
                obs.push(rec.obs);
            }
        }
        Some(art)
    }

    /// Attach the ratio to `reference`, or `None` if the reference lacks a key.
    pub fn with_reference(mut self, reference: &LimitMap) -> Option<Self> {
        let mut reference_exp0 = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let Some(rec) = reference.get(key) else {
                tracing::debug!(panel = %self.name, key = %key, "key missing in reference; panel skipped");
                return None;
            };
            reference_exp0.push(rec.exp0);
        }
        let ratio = self
            .exp0
            .iter()
            .zip(&reference_exp0)
            .map(|(v, r)| if *r != 0.0 { v / r } else { f64::NAN })
            .collect();
        self.ratio = Some(RatioPanel { reference_exp0, ratio });
        Some(self)
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.keys.len()
    }

    /// Smallest and largest drawn value (bands and observed).
    pub fn value_range(&self) -> (f64, f64) {
        let obs = self.obs.iter().flatten().flatten().copied();
        let all = self.exp_minus2.iter().chain(&self.exp_plus2).copied().chain(obs);
        all.filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
    }

    /// Like [`value_range`](Self::value_range) but over the strictly positive
    /// values only, the ones a log axis can show. Infinite bounds when there
    /// are none.
    pub fn positive_range(&self) -> (f64, f64) {
        let obs = self.obs.iter().flatten().flatten().copied();
        let all = self.exp_minus2.iter().chain(&self.exp0).chain(&self.exp_plus2).copied().chain(obs);
        all.filter(|v| v.is_finite() && *v > 0.0)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
    }
}

/// One artifact per complete pattern, in pattern order.
pub fn build_panels(
    limits: &LimitMap,
    patterns: &[PanelPattern],
    reference: Option<&LimitMap>,
    show_observed: bool,
) -> Vec<LimitBarsArtifact> {
    patterns
        .iter()
        .filter_map(|p| LimitBarsArtifact::from_pattern(limits, p, show_observed))
        .filter_map(|art| match reference {
            Some(r) => art.with_reference(r),
            None => Some(art),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hh_core::LimitRecord;

    fn limits(entries: &[(&str, f64)]) -> LimitMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), LimitRecord::expected(v * 0.5, v * 0.7, *v, v * 1.4, v * 2.0)))
            .collect()
    }

    fn keys(k: &[&str]) -> Vec<String> {
        k.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn complete_panel_yields_one_artifact() {
        let map = limits(&[("eTau", 40.0), ("muTau", 30.0), ("cmb", 20.0)]);
        let patterns = vec![
            PanelPattern::new("channels", keys(&["eTau", "muTau", "cmb"])),
            PanelPattern::new("years", keys(&["2016_cmb", "cmb"])),
        ];
        let panels = build_panels(&map, &patterns, None, false);
        assert_eq!(panels.len(), 1);
        let p = &panels[0];
        assert_eq!(p.name, "channels");
        assert_eq!(p.exp0, [40.0, 30.0, 20.0]);
        assert_relative_eq!(p.exp_plus2[2], 40.0);
        assert!(p.obs.is_none());
    }

    #[test]
    fn observed_series_keeps_gaps() {
        let mut map = limits(&[("a", 1.0), ("b", 2.0)]);
        let rec = map.get("a").unwrap().clone().with_observed(1.5);
        map.insert("a", rec);
        let art = LimitBarsArtifact::from_pattern(&map, &PanelPattern::new("p", keys(&["a", "b"])), true)
            .unwrap();
        assert_eq!(art.obs, Some(vec![Some(1.5), None]));
        let (lo, hi) = art.value_range();
        assert_relative_eq!(lo, 0.5);
        assert_relative_eq!(hi, 4.0);
    }

    #[test]
    fn ratio_requires_every_reference_key() {
        let map = limits(&[("eTau", 40.0), ("cmb", 20.0)]);
        let reference = limits(&[("eTau", 80.0), ("cmb", 10.0)]);
        let pattern = PanelPattern::new("p", keys(&["eTau", "cmb"]));

        let panels = build_panels(&map, std::slice::from_ref(&pattern), Some(&reference), false);
        let ratio = panels[0].ratio.as_ref().unwrap();
        assert_relative_eq!(ratio.ratio[0], 0.5);
        assert_relative_eq!(ratio.ratio[1], 2.0);

        let partial = limits(&[("eTau", 80.0)]);
        assert!(build_panels(&map, &[pattern], Some(&partial), false).is_empty());
    }

    #[test]
    fn positive_range_ignores_zero_bands() {
        let mut map = limits(&[("a", 2.0), ("b", 8.0)]);
        map.insert("a", LimitRecord::expected(0.0, 1.0, 2.0, 3.0, 4.0));
        let art = LimitBarsArtifact::from_pattern(&map, &PanelPattern::new("p", keys(&["a", "b"])), false)
            .unwrap();
        assert_relative_eq!(art.value_range().0, 0.0);
        let (lo, hi) = art.positive_range();
        assert_relative_eq!(lo, 2.0);
        assert_relative_eq!(hi, 16.0);
    }
}
