//! Compliance rules
//!
//! Rules implement [`ComplianceRule`]. The serialisable [`RuleSpec`] covers
//! the built-in kinds; other kinds can be added by implementing the trait and
//! pushing them into a [`Ruleset`](crate::Ruleset).

use crate::error::AuditError;
use crate::vulnerability::VulnerabilityDatabase;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Context passed to every rule
#[derive(Debug, Clone, Copy)]
pub struct AuditContext<'a> {
    /// Vulnerability data for version lookups
    pub vulnerabilities: &'a VulnerabilityDatabase,
}

/// A failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule id
    pub rule: String,
    /// Human-readable message
    pub message: String,
}

/// A single compliance rule
pub trait ComplianceRule: Send + Sync + std::fmt::Debug {
    /// Unique id within a ruleset
    fn id(&self) -> &str;

    /// Description quoted in violations
    fn description(&self) -> &str;

    /// Violations for `config`; empty when the rule passes
    fn evaluate(&self, config: &str, ctx: &AuditContext<'_>) -> Vec<Violation>;
}

/// Serialisable rule kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Substring must appear
    Presence {
        /// Literal text
        pattern: String,
    },
    /// Substring must not appear
    Absence {
        /// Literal text
        pattern: String,
    },
    /// Some line must match (multi-line mode)
    Regex {
        /// Regular expression
        pattern: String,
    },
    /// `version <tag>` must be known and free of advisories
    VersionLookup,
}

/// A rule as written in a ruleset file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique id
    pub id: String,
    /// Description quoted in violations
    pub description: String,
    /// Kind and parameters
    #[serde(flatten)]
    pub spec: RuleSpec,
}

impl RuleDefinition {
    /// Presence rule
    #[must_use]
    pub fn presence(id: &str, pattern: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            spec: RuleSpec::Presence {
                pattern: pattern.to_string(),
            },
        }
    }

    /// Build the executable rule
    pub fn build(&self) -> Result<Box<dyn ComplianceRule>, AuditError> {
        let id = self.id.clone();
        let description = self.description.clone();
        Ok(match &self.spec {
            RuleSpec::Presence { pattern } => Box::new(PresenceRule {
                id,
                description,
                pattern: pattern.clone(),
            }),
            RuleSpec::Absence { pattern } => Box::new(AbsenceRule {
                id,
                description,
                pattern: pattern.clone(),
            }),
            RuleSpec::Regex { pattern } => {
                let regex = RegexBuilder::new(pattern)
                    .multi_line(true)
                    .build()
                    .map_err(|source| AuditError::InvalidPattern {
                        rule: self.id.clone(),
                        source,
                    })?;
                Box::new(RegexRule {
                    id,
                    description,
                    regex,
                })
            }
            RuleSpec::VersionLookup => Box::new(VersionLookupRule { id, description }),
        })
    }
}

fn violation(rule: &str, message: String) -> Vec<Violation> {
    vec![Violation {
        rule: rule.to_string(),
        message,
    }]
}

/// Fails when `pattern` is missing
#[derive(Debug, Clone)]
pub struct PresenceRule {
    id: String,
    description: String,
    pattern: String,
}

impl ComplianceRule for PresenceRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn evaluate(&self, config: &str, _ctx: &AuditContext<'_>) -> Vec<Violation> {
        if config.contains(&self.pattern) {
            return Vec::new();
        }
        violation(
            &self.id,
            format!("VIOLATION: Missing '{}' ({})", self.pattern, self.description),
        )
    }
}

/// Fails when `pattern` is present
#[derive(Debug, Clone)]
pub struct AbsenceRule {
    id: String,
    description: String,
    pattern: String,
}

impl ComplianceRule for AbsenceRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn evaluate(&self, config: &str, _ctx: &AuditContext<'_>) -> Vec<Violation> {
        let Some(line) = config.lines().position(|l| l.contains(&self.pattern)) else {
            return Vec::new();
        };
        violation(
            &self.id,
            format!(
                "VIOLATION: Forbidden '{}' present at line {} ({})",
                self.pattern,
                line + 1,
                self.description
            ),
        )
    }
}

/// Fails when no line matches
#[derive(Debug, Clone)]
pub struct RegexRule {
    id: String,
    description: String,
    regex: Regex,
}

impl ComplianceRule for RegexRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn evaluate(&self, config: &str, _ctx: &AuditContext<'_>) -> Vec<Violation> {
        if self.regex.is_match(config) {
            return Vec::new();
        }
        violation(
            &self.id,
            format!(
                "VIOLATION: No line matches /{}/ ({})",
                self.regex.as_str(),
                self.description
            ),
        )
    }
}

/// Looks up the configured `version` in the vulnerability database
#[derive(Debug, Clone)]
pub struct VersionLookupRule {
    id: String,
    description: String,
}

/// First top-level `version <tag>` statement
#[must_use]
pub fn extract_version(config: &str) -> Option<&str> {
    config.lines().find_map(|line| {
        let tag = line.strip_prefix("version ")?.trim().trim_end_matches(';');
        (!tag.is_empty()).then_some(tag)
    })
}

impl ComplianceRule for VersionLookupRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn evaluate(&self, config: &str, ctx: &AuditContext<'_>) -> Vec<Violation> {
        let Some(version) = extract_version(config) else {
            return violation(
                &self.id,
                format!("VIOLATION: Missing 'version' statement ({})", self.description),
            );
        };
        match ctx.vulnerabilities.lookup(version) {
            None => violation(
                &self.id,
                format!(
                    "VIOLATION: Version '{version}' not in vulnerability database ({})",
                    self.description
                ),
            ),
            Some(advisories) => advisories
                .iter()
                .map(|advisory| Violation {
                    rule: self.id.clone(),
                    message: format!(
                        "VIOLATION: Version '{version}' affected by {advisory} ({})",
                        self.description
                    ),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(db: &VulnerabilityDatabase) -> AuditContext<'_> {
        AuditContext { vulnerabilities: db }
    }

    #[test]
    fn presence_message_format() {
        let db = VulnerabilityDatabase::new();
        let rule = RuleDefinition::presence("ntp", "ntp server", "NTP must be configured")
            .build()
            .unwrap();
        assert!(rule.evaluate("ntp server 10.0.0.1\n", &ctx(&db)).is_empty());
        let v = rule.evaluate("hostname r1\n", &ctx(&db));
        assert_eq!(v[0].message, "VIOLATION: Missing 'ntp server' (NTP must be configured)");
    }

    #[test]
    fn absence_reports_line() {
        let db = VulnerabilityDatabase::new();
        let rule = RuleDefinition {
            id: "no-telnet".into(),
            description: "Telnet must be disabled".into(),
            spec: RuleSpec::Absence {
                pattern: "transport input telnet".into(),
            },
        }
        .build()
        .unwrap();
        let v = rule.evaluate("line vty 0 4\n transport input telnet\n", &ctx(&db));
        assert!(v[0].message.contains("line 2"));
    }

    #[test]
    fn regex_rule_is_multiline() {
        let db = VulnerabilityDatabase::new();
        let rule = RuleDefinition {
            id: "banner".into(),
            description: "Login banner required".into(),
            spec: RuleSpec::Regex {
                pattern: r"^banner (motd|login) ".into(),
            },
        }
        .build()
        .unwrap();
        assert!(rule.evaluate("hostname r1\nbanner motd ^C hi ^C\n", &ctx(&db)).is_empty());
        assert_eq!(rule.evaluate("hostname r1\n", &ctx(&db)).len(), 1);
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let def = RuleDefinition {
            id: "broken".into(),
            description: String::new(),
            spec: RuleSpec::Regex {
                pattern: "(unclosed".into(),
            },
        };
        assert!(matches!(def.build(), Err(AuditError::InvalidPattern { .. })));
    }

    #[test]
    fn version_lookup() {
        let db = VulnerabilityDatabase::builtin();
        let rule = RuleDefinition {
            id: "os-version".into(),
            description: "OS must be free of known advisories".into(),
            spec: RuleSpec::VersionLookup,
        }
        .build()
        .unwrap();

        assert_eq!(rule.evaluate("version 16.03.01\n", &ctx(&db)).len(), 1);
        assert!(rule.evaluate("version 4.21.0F\n", &ctx(&db)).is_empty());
        assert!(rule.evaluate("version 99.1\n", &ctx(&db))[0]
            .message
            .contains("not in vulnerability database"));
        assert!(rule.evaluate("hostname r1\n", &ctx(&db))[0]
            .message
            .contains("Missing 'version'"));
    }

    #[test]
    fn spec_yaml_shape() {
        let def: RuleDefinition =
            serde_yaml::from_str("id: ntp\ndescription: NTP\nkind: presence\npattern: ntp server\n")
                .unwrap();
        assert_eq!(
            def.spec,
            RuleSpec::Presence {
                pattern: "ntp server".into()
            }
        );
    }
}
