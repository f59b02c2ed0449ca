//! Profiles and run configuration.
//!
//! A profile names the rules of a run and carries the immutable
//! configuration every one of those rules sees. Profiles come from the
//! built-in catalogue (one per document status) or from JSON files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::document::DocStatus;
use crate::RuleId;

/// Profile and configuration errors
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid rule identifier '{0}', expected category/name")]
    InvalidRuleId(String),

    #[error("unknown rule '{0}'")]
    UnknownRule(RuleId),

    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("cannot read profile {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse profile {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Immutable per-run configuration visible to every rule.
///
/// Absent settings stay `None`; rules decide what absence means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patent_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_sheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amended: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cr_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rec_track_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editorial: Option<bool>,
    /// Any other override, by its camelCase key
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RunConfig {
    /// Apply a `key=value` override.
    ///
    /// `value` is read as JSON when it parses (`true`, `3`), as a plain
    /// string otherwise.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ProfileError> {
        let invalid = |reason: String| ProfileError::InvalidSetting {
            key: key.to_string(),
            reason,
        };

        let parsed = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));

        let mut map = match serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))? {
            Value::Object(map) => map,
            _ => return Err(invalid("configuration is not an object".to_string())),
        };
        map.insert(key.to_string(), parsed);

        *self = serde_json::from_value(Value::Object(map)).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }

    /// Raw value of an arbitrary override
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Names accepted by [`Profile::builtin`]
pub const BUILTIN_PROFILES: &[&str] = &[
    "WD", "CR", "CRD", "PR", "REC", "NOTE", "DNOTE", "STMT", "minimal",
];

const COMMON_RULES: &[&str] = &[
    "headers/div-head",
    "headers/hr",
    "headers/title",
    "headers/logo",
    "headers/h1-title",
    "headers/h2-status",
    "headers/dl",
    "headers/h2-toc",
    "headers/ol-toc",
    "headers/secno",
    "headers/copyright",
    "headers/errata",
    "style/sheet",
    "style/meta",
    "style/script",
    "style/back-to-top",
    "style/body-toc-sidebar",
    "links/internal",
    "links/reliability",
    "links/linkchecker",
    "structure/h2",
    "structure/section-ids",
    "structure/canonical",
    "structure/neutral",
    "sotd/supersedable",
    "heuristic/date-format",
];

const MINIMAL_RULES: &[&str] = &[
    "headers/div-head",
    "headers/title",
    "headers/h1-title",
    "structure/h2",
];

/// A named selection of rules plus their configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub rules: Vec<RuleId>,
    #[serde(default)]
    pub config: RunConfig,
}

impl Profile {
    pub fn new(name: impl Into<String>, rules: Vec<RuleId>, config: RunConfig) -> Self {
        Profile {
            name: name.into(),
            rules,
            config,
        }
    }

    /// Look up a catalogue profile by name (case-insensitive status codes)
    pub fn builtin(name: &str) -> Result<Profile, ProfileError> {
        if name.eq_ignore_ascii_case("minimal") {
            return Ok(Self::minimal());
        }
        DocStatus::from_code(name)
            .and_then(Self::catalogue_entry)
            .ok_or_else(|| ProfileError::UnknownProfile(name.to_string()))
    }

    /// Catalogue profile for a detected document status
    pub fn for_status(status: DocStatus) -> Profile {
        let code = match status {
            DocStatus::ED => DocStatus::WD,
            other => other,
        };
        Self::catalogue_entry(code).unwrap_or_else(Self::minimal)
    }

    fn minimal() -> Profile {
        Profile::new("minimal", parse_ids(MINIMAL_RULES), RunConfig::default())
    }

    fn catalogue_entry(status: DocStatus) -> Option<Profile> {
        let rec_track = status.is_rec_track();
        let known = rec_track
            || matches!(
                status,
                DocStatus::WD | DocStatus::NOTE | DocStatus::DNOTE | DocStatus::STMT
            );
        if !known {
            return None;
        }

        let mut rules = parse_ids(COMMON_RULES);
        if rec_track || status == DocStatus::WD {
            rules.push(RuleId::new("sotd", "pp"));
        }

        let config = RunConfig {
            status: Some(status.as_str().to_string()),
            long_status: Some(status.long_name().to_string()),
            previous_version: rec_track.then_some(true),
            patent_policy: (rec_track || status == DocStatus::WD).then(|| "pp2020".to_string()),
            style_sheet: Some(format!("W3C-{}", status.as_str())),
            cr_type: match status {
                DocStatus::CR => Some("Snapshot".to_string()),
                DocStatus::CRD => Some("Draft".to_string()),
                _ => None,
            },
            rec_track_status: rec_track.then_some(true),
            ..RunConfig::default()
        };

        Some(Profile::new(status.as_str(), rules, config))
    }

    /// Read a JSON profile file
    pub fn from_file(path: &Path) -> Result<Profile, ProfileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ProfileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve a profile argument: a `.json` path or a catalogue name
    pub fn load(name_or_path: &str) -> Result<Profile, ProfileError> {
        let path = Path::new(name_or_path);
        if path.extension().is_some_and(|ext| ext == "json") || path.is_file() {
            return Self::from_file(path);
        }
        Self::builtin(name_or_path)
    }

    /// Replace the rule list, keeping name and config
    pub fn with_rules(mut self, rules: Vec<RuleId>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Rule list with repeats removed, first occurrence wins
    pub fn rule_ids(&self) -> Vec<RuleId> {
        let mut seen = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !seen.contains(rule) {
                seen.push(rule.clone());
            }
        }
        seen
    }
}

fn parse_ids(ids: &[&str]) -> Vec<RuleId> {
    ids.iter()
        .filter_map(|id| id.split_once('/'))
        .map(|(category, name)| RuleId::new(category, name))
        .collect()
}
