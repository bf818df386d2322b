//! Per-dialect checkers
//!
//! - Netplan (declarative YAML) via serde_yaml
//! - Debian `/etc/network/interfaces` (line-oriented)

use netgate_model::{Dialect, ValidationIssue};
use std::collections::HashMap;

mod interfaces;
mod netplan;

pub use interfaces::InterfacesChecker;
pub use netplan::NetplanChecker;

/// Checker for one configuration dialect
///
/// Implement this trait to add support for new dialects.
pub trait DialectChecker: Send + Sync + 'static {
    /// Dialect handled
    fn dialect(&self) -> Dialect;

    /// Identity recorded as the source of each issue
    fn name(&self) -> &'static str {
        self.dialect().as_str()
    }

    /// Check `content`; all findings are returned as issues
    fn check(&self, content: &str) -> Vec<ValidationIssue>;
}

/// Checkers keyed by dialect
pub struct CheckerRegistry {
    checkers: HashMap<Dialect, Box<dyn DialectChecker>>,
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerRegistry")
            .field("dialects", &self.dialects())
            .finish()
    }
}

impl CheckerRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            checkers: HashMap::new(),
        }
    }

    /// Register a checker, replacing any previous one for its dialect
    pub fn register<C: DialectChecker>(&mut self, checker: C) {
        self.checkers.insert(checker.dialect(), Box::new(checker));
    }

    /// Checker for a dialect
    #[must_use]
    pub fn get(&self, dialect: Dialect) -> Option<&dyn DialectChecker> {
        self.checkers.get(&dialect).map(|c| &**c)
    }

    /// Registered dialects, in declaration order
    #[must_use]
    pub fn dialects(&self) -> Vec<Dialect> {
        Dialect::ALL
            .iter()
            .copied()
            .filter(|d| self.checkers.contains_key(d))
            .collect()
    }
}

/// Create default registry with the built-in host checkers
#[inline]
#[must_use]
pub fn default_checkers() -> CheckerRegistry {
    let mut registry = CheckerRegistry::new();
    registry.register(NetplanChecker);
    registry.register(InterfacesChecker);
    registry
}

/// First 1-based line containing `needle`
pub(crate) fn locate(content: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopChecker;

    impl DialectChecker for NoopChecker {
        fn dialect(&self) -> Dialect {
            Dialect::Junos
        }

        fn check(&self, _content: &str) -> Vec<ValidationIssue> {
            Vec::new()
        }
    }

    #[test]
    fn default_registry_covers_host_dialects() {
        let registry = default_checkers();
        assert_eq!(registry.dialects(), vec![Dialect::Netplan, Dialect::Interfaces]);
        assert!(registry.get(Dialect::CiscoIos).is_none());
    }

    #[test]
    fn custom_checker_registers_by_dialect() {
        let mut registry = default_checkers();
        registry.register(NoopChecker);
        let checker = registry.get(Dialect::Junos).unwrap();
        assert_eq!(checker.name(), "junos");
        assert!(checker.check("anything").is_empty());
    }

    #[test]
    fn locate_is_one_based() {
        assert_eq!(locate("a\nb\nc", "b"), Some(2));
        assert_eq!(locate("a\nb", "z"), None);
    }
}
