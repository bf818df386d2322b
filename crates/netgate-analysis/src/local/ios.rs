//! IOS-style (Cisco IOS, Arista EOS) configuration model

use super::model::FileBuilder;
use crate::types::StructureKind;
use std::collections::HashMap;

/// Top-level keywords the model understands
const KNOWN: &[&str] = &[
    "aaa", "access-list", "alias", "archive", "banner", "bfd", "boot", "call-home", "cdp",
    "class-map", "clock", "control-plane", "crypto", "daemon", "diagnostic", "dot1x", "enable",
    "end", "errdisable", "event", "exit", "feature", "hardware", "hostname", "interface", "ip",
    "ipv6", "key", "license", "line", "lldp", "logging", "mac", "management", "monitor", "mpls",
    "multilink", "no", "ntp", "object-group", "platform", "policy-map", "power", "qos",
    "radius-server", "redundancy", "route-map", "router", "service", "sflow", "snmp-server",
    "spanning-tree", "system", "tacacs-server", "track", "transceiver", "username", "version",
    "vlan", "vrf",
];

#[derive(Debug)]
enum Block {
    None,
    Interface(String),
    Line(String),
    RouteMap(String),
    Router(String),
    AccessList { name: String, catch_all: Option<usize> },
}

/// Parse one IOS/EOS file into `file`
pub(crate) fn parse(file: &mut FileBuilder, content: &str) {
    let mut block = Block::None;
    let mut numbered_catch_all: HashMap<String, usize> = HashMap::new();
    let mut saw_statement = false;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('!') {
            continue;
        }
        saw_statement = true;
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();

        if raw.starts_with(' ') || raw.starts_with('\t') {
            sub_statement(file, &mut block, &tokens, line_no);
        } else {
            block = top_level(file, &tokens, line_no, &mut numbered_catch_all);
        }
    }

    if !saw_statement {
        file.parse_error(None, "configuration is empty");
    }
}

fn top_level(
    file: &mut FileBuilder,
    tokens: &[&str],
    line_no: usize,
    numbered_catch_all: &mut HashMap<String, usize>,
) -> Block {
    let rest = tokens.get(1..).map(|r| r.join(" ")).unwrap_or_default();
    match tokens {
        ["interface", _, ..] => Block::Interface(rest),
        ["interface"] => {
            file.parse_error(Some(line_no), "interface requires a name");
            Block::None
        }
        ["line", ..] => Block::Line(rest),
        ["route-map", name, ..] => {
            file.define(StructureKind::RouteMap, name);
            Block::RouteMap((*name).to_string())
        }
        ["router", ..] => Block::Router(rest),
        ["ip" | "ipv6", "access-list", tail @ ..] => {
            let name = match tail {
                ["standard" | "extended", name, ..] => Some(*name),
                ["standard" | "extended"] | [] => None,
                [name, ..] => Some(*name),
            };
            match name {
                Some(name) => {
                    file.define(StructureKind::AccessList, name);
                    Block::AccessList {
                        name: name.to_string(),
                        catch_all: None,
                    }
                }
                None => {
                    file.parse_error(Some(line_no), "access-list requires a name");
                    Block::None
                }
            }
        }
        ["ip" | "ipv6", "prefix-list", name, ..] => {
            file.define(StructureKind::PrefixList, name);
            Block::None
        }
        ["access-list", number, entry @ ..] => {
            file.define(StructureKind::AccessList, number);
            if let Some(first) = numbered_catch_all.get(*number).copied() {
                file.unreachable(
                    line_no,
                    format!("access-list {number}: statement unreachable, shadowed by line {first}"),
                );
            } else if is_catch_all(entry) {
                numbered_catch_all.insert((*number).to_string(), line_no);
            }
            Block::None
        }
        [keyword, ..] if KNOWN.contains(keyword) => Block::None,
        [keyword, ..] => {
            file.unrecognized(line_no, keyword);
            Block::None
        }
        [] => Block::None,
    }
}

fn sub_statement(file: &mut FileBuilder, block: &mut Block, tokens: &[&str], line_no: usize) {
    match block {
        Block::Interface(name) => match tokens {
            ["ip", "access-group", acl, ..] | ["ipv6", "traffic-filter", acl, ..] => {
                let context = format!("interface {name} {} {}", tokens[0], tokens[1]);
                file.reference(StructureKind::AccessList, acl, context, line_no);
            }
            _ => {}
        },
        Block::Line(name) => match tokens {
            ["access-class", acl, ..] | ["ipv6", "access-class", acl, ..] => {
                let context = format!("line {name} access-class");
                file.reference(StructureKind::AccessList, acl, context, line_no);
            }
            _ => {}
        },
        Block::RouteMap(name) => match tokens {
            ["match", "ip" | "ipv6", "address", "prefix-list", lists @ ..] => {
                for list in lists {
                    let context = format!("route-map {name} match ip address prefix-list");
                    file.reference(StructureKind::PrefixList, list, context, line_no);
                }
            }
            ["match", "ip" | "ipv6", "address", acls @ ..] => {
                for acl in acls {
                    let context = format!("route-map {name} match ip address");
                    file.reference(StructureKind::AccessList, acl, context, line_no);
                }
            }
            _ => {}
        },
        Block::Router(name) => match tokens {
            ["neighbor", peer, "route-map", map, ..] => {
                let context = format!("router {name} neighbor {peer} route-map");
                file.reference(StructureKind::RouteMap, map, context, line_no);
            }
            ["neighbor", peer, "prefix-list", list, ..] => {
                let context = format!("router {name} neighbor {peer} prefix-list");
                file.reference(StructureKind::PrefixList, list, context, line_no);
            }
            ["distribute-list", "prefix", list, ..] => {
                let context = format!("router {name} distribute-list prefix");
                file.reference(StructureKind::PrefixList, list, context, line_no);
            }
            ["distribute-list", acl, ..] => {
                let context = format!("router {name} distribute-list");
                file.reference(StructureKind::AccessList, acl, context, line_no);
            }
            ["redistribute", ..] => {
                if let Some(pos) = tokens.iter().position(|t| *t == "route-map") {
                    if let Some(map) = tokens.get(pos + 1) {
                        let context = format!("router {name} redistribute");
                        file.reference(StructureKind::RouteMap, map, context, line_no);
                    }
                }
            }
            _ => {}
        },
        Block::AccessList { name, catch_all } => {
            let entry = match tokens {
                [seq, rest @ ..] if seq.bytes().all(|b| b.is_ascii_digit()) => rest,
                _ => tokens,
            };
            if !matches!(entry.first(), Some(&"permit" | &"deny")) {
                return;
            }
            if let Some(first) = *catch_all {
                file.unreachable(
                    line_no,
                    format!("access-list {name}: statement unreachable, shadowed by line {first}"),
                );
            } else if is_catch_all(entry) {
                *catch_all = Some(line_no);
            }
        }
        Block::None => {}
    }
}

/// `permit|deny [ip|ipv6] any [any] [log]` matches every packet
fn is_catch_all(entry: &[&str]) -> bool {
    let entry = match entry {
        [head @ .., "log" | "log-input"] => head,
        _ => entry,
    };
    matches!(
        entry,
        ["permit" | "deny", "any"] | ["permit" | "deny", "ip" | "ipv6", "any", "any"]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InitIssueKind, ParseStatus};
    use crate::local::model::NetworkModel;
    use crate::types::SnapshotFile;
    use netgate_model::Platform;

    fn model(text: &str) -> NetworkModel {
        NetworkModel::build(&[SnapshotFile {
            name: "r1.cfg".into(),
            content: text.into(),
            platform: Platform::CiscoIos,
        }])
    }

    const CLEAN: &str = "\
hostname r1
!
ip access-list extended MGMT
 permit tcp 10.0.0.0 0.0.0.255 any eq 22
 deny ip any any
!
interface GigabitEthernet0/1
 ip address 10.0.0.1 255.255.255.0
 ip access-group MGMT in
!
ip prefix-list PL-OUT seq 5 permit 10.0.0.0/8
route-map RM-OUT permit 10
 match ip address prefix-list PL-OUT
!
router bgp 65000
 neighbor 192.0.2.1 route-map RM-OUT out
!
line vty 0 4
 access-class MGMT in
end
";

    #[test]
    fn clean_config_passes() {
        let m = model(CLEAN);
        assert_eq!(m.parse_status()[0].status, ParseStatus::Passed);
        assert!(m.init_issues().is_empty());
        assert!(m.undefined_references().is_empty());
    }

    #[test]
    fn undefined_acl_is_reported() {
        let m = model("interface Gi0/1\n ip access-group MISSING in\n");
        let refs = m.undefined_references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "MISSING");
        assert_eq!(refs[0].line, 2);
        assert_eq!(refs[0].context, "interface Gi0/1 ip access-group");
    }

    #[test]
    fn unknown_keyword_downgrades_status() {
        let m = model("hostname r1\nfrobnicate all the things\n");
        assert_eq!(m.parse_status()[0].status, ParseStatus::PartiallyUnrecognized);
        let issues = m.init_issues();
        assert_eq!(issues[0].kind, InitIssueKind::UnrecognizedSyntax);
        assert_eq!(issues[0].line, Some(2));
    }

    #[test]
    fn shadowed_acl_entry() {
        let m = model("ip access-list extended EDGE\n 10 permit ip any any\n 20 deny tcp any any eq 23\n");
        let issues = m.init_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, InitIssueKind::UnreachableStatement);
        assert_eq!(issues[0].line, Some(3));
    }

    #[test]
    fn numbered_acl_shadowing() {
        let m = model("access-list 10 permit any\naccess-list 10 deny 10.0.0.0 0.255.255.255\n");
        assert_eq!(m.init_issues().len(), 1);
    }

    #[test]
    fn empty_file_fails() {
        let m = model("!\n!\n");
        assert_eq!(m.parse_status()[0].status, ParseStatus::Failed);
    }

    #[test]
    fn route_map_references() {
        let m = model("router bgp 1\n neighbor 10.0.0.2 route-map NOPE in\n redistribute static route-map ALSO-NOPE\n");
        let names: Vec<_> = m.undefined_references().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["NOPE", "ALSO-NOPE"]);
    }
}
