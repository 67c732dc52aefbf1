//! Limit records and result mappings
//!
//! The on-disk shape is the one produced by the limit collection tool:
//!
//! ```json
//! {
//!     "1.0": {
//!         "exp+1": 31.2,
//!         "exp+2": 45.9,
//!         "exp-1": 15.7,
//!         "exp-2": 11.6,
//!         "exp0": 21.8,
//!         "obs": 24.3
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Scalar label as written in YAML (`250`, `1.0`, `kl_2p45`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Integer label.
    Int(i64),
    /// Floating-point label.
    Float(f64),
    /// Free text label.
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            // Whole floats keep their decimal point: `1.0`, not `1`.
            Scalar::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Deserialize a list of scalars into their textual labels.
pub fn deserialize_labels<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Scalar> = Vec::deserialize(deserializer)?;
    Ok(raw.iter().map(Scalar::to_string).collect())
}

/// Expected and (optionally) observed upper limits for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitRecord {
    /// Expected median limit.
    #[serde(rename = "exp0")]
    pub exp0: f64,
    /// Expected −1σ bound.
    #[serde(rename = "exp-1")]
    pub exp_minus1: f64,
    /// Expected +1σ bound.
    #[serde(rename = "exp+1")]
    pub exp_plus1: f64,
    /// Expected −2σ bound.
    #[serde(rename = "exp-2")]
    pub exp_minus2: f64,
    /// Expected +2σ bound.
    #[serde(rename = "exp+2")]
    pub exp_plus2: f64,
    /// Observed limit; absent in blinded runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs: Option<f64>,
    /// Keys written by the collection tool that this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl LimitRecord {
    /// Record holding only expected values (blinded).
    pub fn expected(exp_minus2: f64, exp_minus1: f64, exp0: f64, exp_plus1: f64, exp_plus2: f64) -> Self {
        Self {
            exp0,
            exp_minus1,
            exp_plus1,
            exp_minus2,
            exp_plus2,
            obs: None,
            extra: BTreeMap::new(),
        }
    }

    /// Attach an observed limit.
    pub fn with_observed(mut self, obs: f64) -> Self {
        self.obs = Some(obs);
        self
    }

    /// `[−2σ, −1σ, median, +1σ, +2σ]`.
    pub fn expected_band(&self) -> [f64; 5] {
        [self.exp_minus2, self.exp_minus1, self.exp0, self.exp_plus1, self.exp_plus2]
    }

    /// Largest value the record would draw (used for axis auto-ranging).
    pub fn max_value(&self) -> f64 {
        self.expected_band()
            .into_iter()
            .chain(self.obs)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest value the record would draw.
    pub fn min_value(&self) -> f64 {
        self.expected_band()
            .into_iter()
            .chain(self.obs)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Mapping from a category or point label to its [`LimitRecord`].
///
/// Keys are kept in lexicographic order so serialisation is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LimitMap(BTreeMap<String, LimitRecord>);

impl LimitMap {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow update: every entry of `other` replaces the entry with the same key.
    pub fn merge(&mut self, other: LimitMap) {
        for (key, record) in other.0 {
            if self.0.contains_key(&key) {
                tracing::debug!(key = %key, "overwriting existing limit entry");
            }
            self.0.insert(key, record);
        }
    }

    /// Insert one record, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, record: LimitRecord) -> Option<LimitRecord> {
        self.0.insert(key.into(), record)
    }

    /// Record for `key`.
    pub fn get(&self, key: &str) -> Option<&LimitRecord> {
        self.0.get(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Entries in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LimitRecord)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse a mapping from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a mapping from `path`.
    ///
    /// A missing file maps to [`Error::MissingResult`] and a parse failure to
    /// [`Error::MalformedResult`], both carrying the path.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingResult { path: path.to_path_buf() });
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map_err(|source| Error::MalformedResult { path: path.to_path_buf(), source })
    }

    /// Serialise with sorted keys and 4-space indentation.
    pub fn to_json_string(&self) -> Result<String> {
        let mut buf = Vec::with_capacity(256 * self.len().max(1));
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        // Going through `Value` sorts the record keys as well as the labels.
        serde_json::to_value(self)?.serialize(&mut ser)?;
        // serde_json only emits valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the mapping to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        file.write_all(self.to_json_string()?.as_bytes())?;
        Ok(())
    }
}

impl FromIterator<(String, LimitRecord)> for LimitMap {
    fn from_iter<I: IntoIterator<Item = (String, LimitRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for LimitMap {
    type Item = (String, LimitRecord);
    type IntoIter = std::collections::btree_map::IntoIter<String, LimitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(exp0: f64) -> LimitRecord {
        LimitRecord::expected(exp0 * 0.5, exp0 * 0.7, exp0, exp0 * 1.4, exp0 * 1.9)
    }

    #[test]
    fn record_uses_collection_tool_keys() {
        let json = serde_json::to_value(record(10.0)).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["exp0", "exp-1", "exp+1", "exp-2", "exp+2"] {
            assert!(obj.contains_key(key), "missing {key}: {json}");
        }
        assert!(!obj.contains_key("obs"), "blinded record must not carry obs");
    }

    #[test]
    fn record_keeps_unknown_keys() {
        let text = r#"{"1.0": {"exp0": 2.0, "exp-1": 1.5, "exp+1": 2.8,
                      "exp-2": 1.1, "exp+2": 3.9, "obs": 2.2, "quantile": 0.5}}"#;
        let map = LimitMap::from_json_str(text).unwrap();
        let rec = map.get("1.0").unwrap();
        assert_eq!(rec.obs, Some(2.2));
        assert_eq!(rec.extra.get("quantile").and_then(|v| v.as_f64()), Some(0.5));
        let back = map.to_json_string().unwrap();
        assert!(back.contains("\"quantile\": 0.5"));
    }

    #[test]
    fn merge_is_last_writer_wins() {
        let mut acc = LimitMap::new();
        acc.insert("1.0", record(5.0));
        acc.insert("2.0", record(9.0));

        let mut later = LimitMap::new();
        later.insert("1.0", record(7.0));
        acc.merge(later);

        assert_eq!(acc.len(), 2);
        assert_relative_eq!(acc.get("1.0").unwrap().exp0, 7.0);
        assert_relative_eq!(acc.get("2.0").unwrap().exp0, 9.0);
    }

    #[test]
    fn json_is_sorted_with_four_space_indent() {
        let mut map = LimitMap::new();
        map.insert("b", record(1.0));
        map.insert("a", record(2.0));
        let text = map.to_json_string().unwrap();
        assert!(text.starts_with("{\n    \"a\": {\n        \"exp+1\""), "{text}");
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
    }

    #[test]
    fn save_then_load_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/limits_cmb.json");
        let mut map = LimitMap::new();
        map.insert("300", record(3.25).with_observed(3.5));
        map.insert("250", record(12.0));
        map.save(&path).unwrap();

        let loaded = LimitMap::load(&path).unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("limits_eTau.json");
        assert!(matches!(LimitMap::load(&missing), Err(Error::MissingResult { .. })));

        let bad = dir.path().join("limits_muTau.json");
        std::fs::write(&bad, "{\"1.0\": [1, 2]}").unwrap();
        match LimitMap::load(&bad) {
            Err(Error::MalformedResult { path, .. }) => assert_eq!(path, bad),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn scalar_labels_keep_their_yaml_spelling() {
        let labels: Vec<Scalar> = serde_yaml_ng::from_str("[250, 1.0, 2.45, kl_m1]").unwrap();
        let text: Vec<String> = labels.iter().map(Scalar::to_string).collect();
        assert_eq!(text, ["250", "1.0", "2.45", "kl_m1"]);
    }

    #[test]
    fn min_max_include_observed() {
        let rec = record(4.0).with_observed(20.0);
        assert_relative_eq!(rec.max_value(), 20.0);
        assert_relative_eq!(rec.min_value(), 2.0);
    }
}
