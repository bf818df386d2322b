//! Named rulesets

use crate::error::AuditError;
use crate::rules::{ComplianceRule, RuleDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Name of the built-in ruleset
pub const GOLDEN: &str = "golden";

/// Ruleset as written in YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetSpec {
    /// Ruleset name
    pub name: String,
    /// Rules in evaluation order
    pub rules: Vec<RuleDefinition>,
}

/// Ordered, executable rules
#[derive(Debug)]
pub struct Ruleset {
    name: String,
    rules: Vec<Box<dyn ComplianceRule>>,
}

impl Ruleset {
    /// Empty ruleset
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Built-in golden rules
    #[must_use]
    pub fn golden() -> Self {
        Self {
            name: GOLDEN.to_string(),
            rules: golden_definitions()
                .iter()
                .filter_map(|d| d.build().ok())
                .collect(),
        }
    }

    /// Build from a spec, rejecting duplicate ids and bad patterns
    pub fn from_spec(spec: &RulesetSpec) -> Result<Self, AuditError> {
        let mut seen = HashSet::new();
        let mut ruleset = Self::new(spec.name.clone());
        for def in &spec.rules {
            if !seen.insert(def.id.as_str()) {
                return Err(AuditError::DuplicateRule(def.id.clone()));
            }
            ruleset.rules.push(def.build()?);
        }
        Ok(ruleset)
    }

    /// Parse from YAML
    pub fn from_yaml(text: &str) -> Result<Self, AuditError> {
        let spec: RulesetSpec = serde_yaml::from_str(text)?;
        Self::from_spec(&spec)
    }

    /// Append a rule
    pub fn push(&mut self, rule: Box<dyn ComplianceRule>) {
        self.rules.push(rule);
    }

    /// Name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rules in order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[Box<dyn ComplianceRule>] {
        &self.rules
    }
}

fn golden_definitions() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::presence(
            "password-encryption",
            "service password-encryption",
            "Passwords must be encrypted",
        ),
        RuleDefinition::presence("ntp", "ntp server", "NTP must be configured"),
        RuleDefinition::presence(
            "no-http-server",
            "no ip http server",
            "HTTP server must be disabled",
        ),
    ]
}

/// Rulesets by name
#[derive(Debug, Clone)]
pub struct RulesetCatalog {
    sets: BTreeMap<String, Arc<Ruleset>>,
}

impl Default for RulesetCatalog {
    fn default() -> Self {
        let mut catalog = Self {
            sets: BTreeMap::new(),
        };
        catalog.insert(Ruleset::golden());
        catalog
    }
}

impl RulesetCatalog {
    /// Add or replace a ruleset
    pub fn insert(&mut self, ruleset: Ruleset) {
        self.sets.insert(ruleset.name.clone(), Arc::new(ruleset));
    }

    /// Load a YAML ruleset file and add it
    pub fn load_file(&mut self, path: &Path) -> Result<String, AuditError> {
        let text = std::fs::read_to_string(path).map_err(|e| AuditError::io_error(path, e))?;
        let ruleset = Ruleset::from_yaml(&text)?;
        let name = ruleset.name.clone();
        self.insert(ruleset);
        Ok(name)
    }

    /// Ruleset by name
    pub fn get(&self, name: &str) -> Result<Arc<Ruleset>, AuditError> {
        self.sets
            .get(name)
            .cloned()
            .ok_or_else(|| AuditError::UnknownRuleset(name.to_string()))
    }

    /// Known names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.sets.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_has_three_rules() {
        let golden = Ruleset::golden();
        let ids: Vec<_> = golden.rules().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["password-encryption", "ntp", "no-http-server"]);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let yaml = "\
name: strict
rules:
  - id: ntp
    description: NTP
    kind: presence
    pattern: ntp server
  - id: ntp
    description: NTP again
    kind: presence
    pattern: ntp source
";
        assert!(matches!(Ruleset::from_yaml(yaml), Err(AuditError::DuplicateRule(id)) if id == "ntp"));
    }

    #[test]
    fn catalog_lookup() {
        let catalog = RulesetCatalog::default();
        assert_eq!(catalog.names(), vec![GOLDEN]);
        assert!(matches!(catalog.get("missing"), Err(AuditError::UnknownRuleset(_))));
    }
}
