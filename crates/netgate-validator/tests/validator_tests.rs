use netgate_model::Dialect;
use netgate_validator::{ConfigValidator, ValidationReport};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const NETPLAN_OK: &str = "network:\n  version: 2\n  ethernets:\n    eth0:\n      dhcp4: true\n";
const INTERFACES_OK: &str = "auto lo\niface lo inet loopback\n";

#[test]
fn test_netplan_without_network_is_invalid() {
    let validator = ConfigValidator::default();
    let report = validator.report("version: 2\nethernets:\n  eth0:\n    dhcp4: true\n", Dialect::Netplan);

    assert!(!report.valid);
    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("missing top-level 'network' key"));
}

#[test]
fn test_device_dialect_has_no_host_checker() {
    let validator = ConfigValidator::default();
    let issues = validator.validate("hostname r1\n", Dialect::CiscoIos);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].message, "no host checker for dialect cisco_ios");
    assert!(!validator.supports(Dialect::CiscoIos));
}

#[test]
fn test_batch_preserves_order() {
    let validator = ConfigValidator::default();
    let items = vec![
        (NETPLAN_OK.to_string(), Dialect::Netplan),
        ("garbage".to_string(), Dialect::Interfaces),
        (INTERFACES_OK.to_string(), Dialect::Interfaces),
        ("nope: [".to_string(), Dialect::Netplan),
    ];
    let valid: Vec<bool> = validator
        .validate_batch(&items)
        .into_iter()
        .map(|r| r.valid)
        .collect();
    assert_eq!(valid, vec![true, false, true, false]);
}

#[test]
fn test_report_serializes_flat() {
    let report = ValidationReport::from_issues(Vec::new());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json, serde_json::json!({ "valid": true, "issues": [] }));
}

proptest! {
    #[test]
    fn prop_validate_is_total_and_deterministic(text in "(?s).{0,300}", netplan in any::<bool>()) {
        let validator = ConfigValidator::default();
        let dialect = if netplan { Dialect::Netplan } else { Dialect::Interfaces };
        let first = validator.validate(&text, dialect);
        let second = validator.validate(&text, dialect);
        prop_assert_eq!(first, second);
    }
}
