//! Netplan YAML checker

use super::{locate, DialectChecker};
use crate::cidr::{is_ipv4, is_ipv6, Cidr};
use crate::error::CheckError;
use netgate_model::{Dialect, ValidationIssue};
use serde_yaml::Value;
use std::net::IpAddr;

const SOURCE: &str = "netplan";

/// Interface sections under `network`
const SECTIONS: [&str; 5] = ["ethernets", "bonds", "bridges", "vlans", "wifis"];

/// Renderers netplan understands
const RENDERERS: [&str; 2] = ["networkd", "NetworkManager"];

/// Checker for netplan version 2 documents
#[derive(Debug, Clone, Copy, Default)]
pub struct NetplanChecker;

impl DialectChecker for NetplanChecker {
    fn dialect(&self) -> Dialect {
        Dialect::Netplan
    }

    fn name(&self) -> &'static str {
        SOURCE
    }

    fn check(&self, content: &str) -> Vec<ValidationIssue> {
        let mut doc = Document {
            content,
            issues: Vec::new(),
        };
        if let Err(err) = doc.check() {
            doc.issues.push(err.into_issue(SOURCE));
        }
        doc.issues
    }
}

struct Document<'a> {
    content: &'a str,
    issues: Vec<ValidationIssue>,
}

impl Document<'_> {
    fn error(&mut self, message: String, anchor: &str) {
        let issue = ValidationIssue::error(SOURCE, message);
        self.issues.push(match locate(self.content, anchor) {
            Some(line) => issue.at_line(line),
            None => issue,
        });
    }

    fn check(&mut self) -> Result<(), CheckError> {
        let root: Value = serde_yaml::from_str(self.content)?;
        let network = root
            .get("network")
            .ok_or_else(|| CheckError::semantic("missing top-level 'network' key"))?;

        let empty = Value::Mapping(serde_yaml::Mapping::new());
        let network = match network {
            Value::Mapping(_) => network,
            Value::Null => &empty,
            _ => {
                return Err(CheckError::Semantic {
                    line: locate(self.content, "network"),
                    message: "'network' must be a mapping".to_string(),
                })
            }
        };

        match network.get("version") {
            Some(Value::Number(n)) if n.as_u64() == Some(2) => {}
            other => self.error(
                format!(
                    "unsupported or missing network version: {}; expected 2",
                    other.map_or_else(|| "none".to_string(), scalar_text)
                ),
                "version",
            ),
        }

        if let Some(renderer) = network.get("renderer") {
            let name = scalar_text(renderer);
            if !RENDERERS.contains(&name.as_str()) {
                self.error(format!("unknown renderer: {name}"), "renderer");
            }
        }

        let mut any_section = false;
        for section in SECTIONS {
            let Some(entries) = network.get(section) else {
                continue;
            };
            any_section = true;
            match entries {
                Value::Mapping(map) => {
                    for (name, cfg) in map {
                        self.check_interface(&scalar_text(name), cfg);
                    }
                }
                Value::Null => {}
                _ => self.error(format!("'{section}' must be a mapping"), section),
            }
        }

        if !any_section {
            self.issues.push(ValidationIssue::warning(
                SOURCE,
                "no interface sections defined under 'network'",
            ));
        }
        Ok(())
    }

    fn check_interface(&mut self, iface: &str, cfg: &Value) {
        match cfg {
            Value::Mapping(_) => {}
            Value::Null => return,
            _ => {
                self.error(format!("invalid configuration for interface {iface}"), iface);
                return;
            }
        }

        match cfg.get("addresses") {
            None | Some(Value::Null) => {}
            Some(Value::Sequence(addresses)) => {
                for entry in addresses {
                    let addr = address_text(entry);
                    if Cidr::parse(&addr).is_none() {
                        self.error(
                            format!("interface {iface}: invalid IP address format '{addr}'"),
                            &addr,
                        );
                    }
                }
            }
            Some(_) => self.error(
                format!("interface {iface}: addresses must be a list"),
                "addresses",
            ),
        }

        if let Some(gw) = cfg.get("gateway4") {
            let gw = scalar_text(gw);
            if !is_ipv4(&gw) {
                self.error(
                    format!("interface {iface}: gateway4 must be an IPv4 address, got '{gw}'"),
                    "gateway4",
                );
            }
        }

        if let Some(gw) = cfg.get("gateway6") {
            let gw = scalar_text(gw);
            if !is_ipv6(&gw) {
                self.error(
                    format!("interface {iface}: gateway6 must be an IPv6 address, got '{gw}'"),
                    "gateway6",
                );
            }
        }

        if let Some(Value::Sequence(servers)) =
            cfg.get("nameservers").and_then(|ns| ns.get("addresses"))
        {
            for server in servers {
                let server = scalar_text(server);
                if server.parse::<IpAddr>().is_err() {
                    self.error(
                        format!("interface {iface}: invalid nameserver address '{server}'"),
                        &server,
                    );
                }
            }
        }
    }
}

/// Address entries are plain strings or single-key mappings carrying options
fn address_text(entry: &Value) -> String {
    match entry {
        Value::Mapping(map) if map.len() == 1 => {
            map.keys().next().map(scalar_text).unwrap_or_default()
        }
        other => scalar_text(other),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "none".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
