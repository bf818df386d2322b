//! Debian `/etc/network/interfaces` checker

use super::DialectChecker;
use crate::cidr::is_address_or_cidr;
use netgate_model::{Dialect, ValidationIssue};
use std::net::IpAddr;

const SOURCE: &str = "interfaces";

const INET_METHODS: &[&str] = &[
    "loopback", "static", "manual", "dhcp", "bootp", "tunnel", "ppp", "wvdial", "ipv4ll",
];

const INET6_METHODS: &[&str] = &[
    "auto", "loopback", "static", "manual", "dhcp", "v4tunnel", "6to4",
];

/// Checker for ifupdown interface files
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfacesChecker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stanza {
    None,
    Iface,
    Mapping,
}

impl DialectChecker for InterfacesChecker {
    fn dialect(&self) -> Dialect {
        Dialect::Interfaces
    }

    fn name(&self) -> &'static str {
        SOURCE
    }

    fn check(&self, content: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut declared = false;
        let mut stanza = Stanza::None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            let keyword = parts[0];

            match keyword {
                "auto" => {
                    declared = true;
                    stanza = Stanza::None;
                }
                "iface" => {
                    declared = true;
                    stanza = Stanza::Iface;
                    check_iface(&parts, line_no, &mut issues);
                }
                "mapping" => stanza = Stanza::Mapping,
                "source" | "source-directory" => stanza = Stanza::None,
                kw if kw.starts_with("allow-") => stanza = Stanza::None,
                option => match stanza {
                    Stanza::None => issues.push(
                        ValidationIssue::warning(
                            SOURCE,
                            format!("option '{option}' outside of any iface stanza"),
                        )
                        .at_line(line_no),
                    ),
                    Stanza::Mapping => {}
                    Stanza::Iface => check_option(&parts, line_no, &mut issues),
                },
            }
        }

        if !declared {
            issues.push(ValidationIssue::error(
                SOURCE,
                "file does not appear to contain valid interface definitions",
            ));
        }
        issues
    }
}

fn check_iface(parts: &[&str], line_no: usize, issues: &mut Vec<ValidationIssue>) {
    if parts.len() < 4 {
        issues.push(ValidationIssue::error(SOURCE, "incomplete iface definition").at_line(line_no));
        return;
    }
    let (family, method) = (parts[2], parts[3]);
    let methods = match family {
        "inet" => INET_METHODS,
        "inet6" => INET6_METHODS,
        other => {
            issues.push(
                ValidationIssue::error(SOURCE, format!("invalid address family '{other}'"))
                    .at_line(line_no),
            );
            return;
        }
    };
    if !methods.contains(&method) {
        issues.push(
            ValidationIssue::warning(SOURCE, format!("unknown {family} method '{method}'"))
                .at_line(line_no),
        );
    }
}

fn check_option(parts: &[&str], line_no: usize, issues: &mut Vec<ValidationIssue>) {
    let value = parts.get(1).copied();
    match (parts[0], value) {
        ("address", Some(addr)) if !is_address_or_cidr(addr) => issues.push(
            ValidationIssue::error(SOURCE, format!("invalid address '{addr}'")).at_line(line_no),
        ),
        ("gateway", Some(gw)) if gw.parse::<IpAddr>().is_err() => issues.push(
            ValidationIssue::error(SOURCE, format!("invalid gateway '{gw}'")).at_line(line_no),
        ),
        ("address" | "gateway", None) => issues.push(
            ValidationIssue::error(SOURCE, format!("'{}' requires a value", parts[0]))
                .at_line(line_no),
        ),
        _ => {}
    }
}
