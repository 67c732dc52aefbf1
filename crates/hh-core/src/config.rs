//! Descriptor configuration files.
//!
//! ```yaml
//! tools:
//!   combine_tool: combineTool.py
//! models:
//!   - name: res_base
//!     limit_type: model_independent
//!     channels: [eTau, muTau, tauTau]
//!   - name: res_lm
//!     extends: res_base
//!     signal_points: [250, 260, 270]
//! ```
//!
//! `extends` names an earlier model; its keys are copied and then overridden
//! key by key by the child. Nested mappings are replaced, not merged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml_ng::{Mapping, Value};

use crate::descriptor::StatModelDescriptor;
use crate::{Error, Result};

/// Locations of the external tools the pipeline invokes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub combine_tool: String,
    pub combine: String,
    pub hadd: String,
    pub create_datacards: String,
    pub plot_limits: String,
    pub plot_impacts: String,
    pub python: String,
    /// Overrides `$CMSSW_BASE`.
    pub cmssw_base: Option<PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            combine_tool: "combineTool.py".into(),
            combine: "combine".into(),
            hadd: "hadd".into(),
            create_datacards: "create_hh_datacards".into(),
            plot_limits: "plotLimits.py".into(),
            plot_impacts: "plotImpacts.py".into(),
            python: "python".into(),
            cmssw_base: None,
        }
    }
}

impl ToolsConfig {
    /// Release area holding the combine helper scripts.
    pub fn cmssw_base(&self) -> Result<PathBuf> {
        if let Some(base) = &self.cmssw_base {
            return Ok(base.clone());
        }
        match std::env::var_os("CMSSW_BASE") {
            Some(base) if !base.is_empty() => Ok(PathBuf::from(base)),
            _ => Err(Error::Config(
                "CMSSW_BASE is not set and tools.cmssw_base is not configured".into(),
            )),
        }
    }

    pub fn diff_nuisances(&self) -> Result<PathBuf> {
        Ok(self.cmssw_base()?.join("src/HiggsAnalysis/CombinedLimit/test/diffNuisances.py"))
    }

    pub fn plot_gof(&self) -> Result<PathBuf> {
        Ok(self.cmssw_base()?.join("src/CombineHarvester/CombineTools/scripts/plotGof.py"))
    }

    pub fn plot_limit_grid(&self) -> Result<PathBuf> {
        Ok(self.cmssw_base()?.join("src/CombineHarvester/CombineTools/scripts/plotLimitGrid.py"))
    }
}

/// Parsed configuration file: tool locations plus named model descriptors.
#[derive(Debug, Clone, Default)]
pub struct ModelConfig {
    pub tools: ToolsConfig,
    models: Vec<StatModelDescriptor>,
}

impl ModelConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Parse a configuration document (JSON is accepted as YAML).
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let root: Value = serde_yaml_ng::from_str(text)?;
        let Value::Mapping(mut root) = root else {
            return Err(Error::Config("top level must be a mapping".into()));
        };

        let tools = match root.remove("tools") {
            Some(v) => serde_yaml_ng::from_value(v)?,
            None => ToolsConfig::default(),
        };
        let entries = match root.remove("models") {
            Some(Value::Sequence(seq)) => seq,
            Some(_) => return Err(Error::Config("'models' must be a list".into())),
            None => Vec::new(),
        };
        if let Some(key) = root.keys().next() {
            return Err(Error::Config(format!("unknown top-level key {key:?}")));
        }

        let mut resolved: HashMap<String, Mapping> = HashMap::new();
        let mut models = Vec::with_capacity(entries.len());
        for entry in entries {
            let Value::Mapping(mut entry) = entry else {
                return Err(Error::Config("model entries must be mappings".into()));
            };
            let name = match entry.get("name") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                _ => return Err(Error::Config("model entry without a 'name'".into())),
            };
            if resolved.contains_key(&name) {
                return Err(Error::Config(format!("duplicate model '{name}'")));
            }

            let merged = match entry.remove("extends") {
                None => entry,
                Some(Value::String(base)) => {
                    let Some(parent) = resolved.get(&base) else {
                        return Err(Error::Config(format!(
                            "model '{name}' extends unknown model '{base}' (bases must be declared first)"
                        )));
                    };
                    let mut merged = parent.clone();
                    for (k, v) in entry {
                        merged.insert(k, v);
                    }
                    merged
                }
                Some(_) => {
                    return Err(Error::Config(format!("model '{name}': 'extends' must be a name")));
                }
            };

            let desc: StatModelDescriptor =
                serde_yaml_ng::from_value(Value::Mapping(merged.clone()))
                    .map_err(|e| Error::Config(format!("model '{name}': {e}")))?;
            desc.validate()?;
            tracing::debug!(model = %name, limit_type = %desc.limit_type, "loaded model descriptor");
            resolved.insert(name, merged);
            models.push(desc);
        }

        Ok(Self { tools, models })
    }

    /// Descriptor called `name`.
    pub fn descriptor(&self, name: &str) -> Result<&StatModelDescriptor> {
        self.models.iter().find(|m| m.name == name).ok_or_else(|| {
            Error::Config(format!("stat model descriptor '{name}' not found"))
        })
    }

    /// Descriptor names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::LimitType;

    const CFG: &str = r#"
tools:
  combine_tool: /opt/combine/combineTool.py
  cmssw_base: /cvmfs/cmssw
models:
  - name: res_base
    limit_type: model_independent
    years: [2016]
    channels: [eTau, muTau, tauTau]
    blind: true
  - name: res_lm
    extends: res_base
    signal_points: [250, 260, 270]
  - name: sm_unblind
    extends: res_base
    limit_type: SM
    blind: false
"#;

    #[test]
    fn extends_copies_and_overrides() {
        let cfg = ModelConfig::from_yaml_str(CFG).unwrap();
        let lm = cfg.descriptor("res_lm").unwrap();
        assert_eq!(lm.channels, ["eTau", "muTau", "tauTau"]);
        assert_eq!(lm.signal_points, ["250", "260", "270"]);
        assert!(lm.blind);

        let sm = cfg.descriptor("sm_unblind").unwrap();
        assert_eq!(sm.limit_type, LimitType::Sm);
        assert!(!sm.blind);
        assert!(sm.signal_points.is_empty());
        assert_eq!(cfg.names().collect::<Vec<_>>(), ["res_base", "res_lm", "sm_unblind"]);
    }

    #[test]
    fn tools_section_overrides_defaults() {
        let cfg = ModelConfig::from_yaml_str(CFG).unwrap();
        assert_eq!(cfg.tools.combine_tool, "/opt/combine/combineTool.py");
        assert_eq!(cfg.tools.hadd, "hadd");
        assert_eq!(
            cfg.tools.plot_gof().unwrap(),
            PathBuf::from("/cvmfs/cmssw/src/CombineHarvester/CombineTools/scripts/plotGof.py")
        );
    }

    #[test]
    fn unsupported_limit_type_is_rejected() {
        let err = ModelConfig::from_yaml_str("models:\n  - name: x\n    limit_type: Resonant_BSM\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("limit type 'Resonant_BSM' not supported"), "{err}");
    }

    #[test]
    fn unknown_keys_and_bases_are_errors() {
        assert!(ModelConfig::from_yaml_str("models:\n  - name: x\n    colour: red\n").is_err());
        assert!(ModelConfig::from_yaml_str("models:\n  - name: y\n    extends: x\n").is_err());
        assert!(ModelConfig::from_yaml_str("modles: []\n").is_err());
    }

    #[test]
    fn missing_descriptor_is_a_config_error() {
        let cfg = ModelConfig::from_yaml_str(CFG).unwrap();
        assert!(matches!(cfg.descriptor("nope"), Err(Error::Config(_))));
    }
}
