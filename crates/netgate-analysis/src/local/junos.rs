//! Junos configuration model (brace and `set` styles)

use super::model::FileBuilder;
use crate::types::StructureKind;

/// Top-level hierarchy names the model understands
const KNOWN: &[&str] = &[
    "access", "applications", "apply-groups", "bridge-domains", "chassis", "class-of-service",
    "ethernet-switching-options", "event-options", "firewall", "forwarding-options", "groups",
    "interfaces", "logical-systems", "multi-chassis", "poe", "policy-options", "protocols",
    "routing-instances", "routing-options", "schedulers", "security", "services", "snmp",
    "switch-options", "system", "version", "virtual-chassis", "vlans",
];

/// Parse one Junos file into `file`
pub(crate) fn parse(file: &mut FileBuilder, content: &str) {
    let mut depth: usize = 0;
    let mut path: Vec<String> = Vec::new();
    let mut saw_statement = false;
    let mut in_comment = false;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if in_comment {
            in_comment = !trimmed.contains("*/");
            continue;
        }
        if trimmed.starts_with("/*") {
            in_comment = !trimmed.contains("*/");
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        saw_statement = true;
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();

        match tokens.first() {
            Some(&("set" | "delete" | "deactivate" | "activate")) => {
                set_statement(file, &tokens, line_no);
                continue;
            }
            _ => {}
        }

        let statement = statement_tokens(trimmed);
        let opens = trimmed.ends_with('{');
        if depth == 0 && opens {
            if let Some(keyword) = statement.first() {
                if !KNOWN.contains(keyword) {
                    file.unrecognized(line_no, keyword);
                }
            }
        }
        brace_statement(file, &statement, opens, &path, line_no);

        for ch in braces(trimmed) {
            if ch == '{' {
                depth += 1;
                path.push(statement.join(" "));
            } else if depth == 0 {
                file.parse_error(Some(line_no), "unbalanced '}'");
            } else {
                depth -= 1;
                path.pop();
            }
        }
    }

    if depth > 0 {
        file.parse_error(None, format!("unbalanced braces: {depth} block(s) left open"));
    }
    if !saw_statement {
        file.parse_error(None, "configuration is empty");
    }
}

/// Braces outside quoted strings, in order
fn braces(line: &str) -> Vec<char> {
    let mut in_quote = false;
    let mut out = Vec::new();
    for ch in line.chars() {
        match ch {
            '"' => in_quote = !in_quote,
            '{' | '}' if !in_quote => out.push(ch),
            '#' if !in_quote => break,
            _ => {}
        }
    }
    out
}

/// Words of a brace-style line without the trailing `{`, `}` or `;`
fn statement_tokens(line: &str) -> Vec<&str> {
    line.split_whitespace()
        .map(|t| t.trim_end_matches(';'))
        .filter(|t| !t.is_empty() && *t != "{" && *t != "}")
        .collect()
}

fn policy_names<'a>(tokens: &'a [&'a str]) -> impl Iterator<Item = &'a str> + 'a {
    tokens
        .iter()
        .copied()
        .filter(|t| *t != "[" && *t != "]" && *t != "];")
        .map(|t| t.trim_matches(|c| c == '[' || c == ']' || c == ';'))
        .filter(|t| !t.is_empty())
}

fn brace_statement(file: &mut FileBuilder, statement: &[&str], opens: bool, path: &[String], line_no: usize) {
    let scope = path.last().map_or("top", String::as_str);
    match statement {
        ["policy-statement", name, ..] if opens => {
            file.define(StructureKind::PolicyStatement, name);
        }
        ["prefix-list", name, ..] if opens => {
            file.define(StructureKind::PrefixList, name);
        }
        ["prefix-list", name] | ["from", "prefix-list", name] => {
            let context = format!("{scope} from prefix-list");
            file.reference(StructureKind::PrefixList, name, context, line_no);
        }
        [kw @ ("import" | "export"), rest @ ..] => {
            let context = format!("{scope} {kw}");
            for policy in policy_names(rest) {
                file.reference(StructureKind::PolicyStatement, policy, context.clone(), line_no);
            }
        }
        _ => {}
    }
}

fn set_statement(file: &mut FileBuilder, tokens: &[&str], line_no: usize) {
    let Some(top) = tokens.get(1) else {
        file.parse_error(Some(line_no), format!("incomplete '{}' statement", tokens[0]));
        return;
    };
    if !KNOWN.contains(top) {
        file.unrecognized(line_no, top);
        return;
    }
    if tokens[0] != "set" {
        return;
    }

    for (i, window) in tokens.windows(2).enumerate() {
        let next = tokens.get(i + 2).copied();
        match (window[0], window[1], next) {
            ("policy-options", "policy-statement", Some(name)) => {
                file.define(StructureKind::PolicyStatement, name);
            }
            ("policy-options", "prefix-list", Some(name)) => {
                file.define(StructureKind::PrefixList, name);
            }
            ("from", "prefix-list", Some(name)) => {
                let context = format!("{} from prefix-list", tokens[1..i].join(" "));
                file.reference(StructureKind::PrefixList, name, context, line_no);
            }
            _ => {}
        }
    }

    if let Some(pos) = tokens.iter().position(|t| *t == "import" || *t == "export") {
        let context = tokens[1..=pos].join(" ");
        for policy in policy_names(&tokens[pos + 1..]) {
            file.reference(StructureKind::PolicyStatement, policy, context.clone(), line_no);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::local::model::NetworkModel;
    use crate::types::{ParseStatus, SnapshotFile};
    use netgate_model::Platform;

    fn model(text: &str) -> NetworkModel {
        NetworkModel::build(&[SnapshotFile {
            name: "mx1.conf".into(),
            content: text.into(),
            platform: Platform::Junos,
        }])
    }

    const BRACES: &str = "\
system {
    host-name mx1;
}
policy-options {
    prefix-list CUSTOMERS {
        198.51.100.0/24;
    }
    policy-statement EXPORT-CUST {
        term 1 {
            from {
                prefix-list CUSTOMERS;
            }
            then accept;
        }
    }
}
protocols {
    bgp {
        group upstream {
            export EXPORT-CUST;
            import [ IMPORT-ANY ];
        }
    }
}
";

    #[test]
    fn brace_style_references() {
        let m = model(BRACES);
        assert_eq!(m.parse_status()[0].status, ParseStatus::Passed);
        let refs = m.undefined_references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "IMPORT-ANY");
        assert_eq!(refs[0].context, "group upstream import");
    }

    #[test]
    fn unbalanced_braces_fail() {
        let m = model("system {\n    host-name mx1;\n");
        assert_eq!(m.parse_status()[0].status, ParseStatus::Failed);

        let m = model("system {\n}\n}\n");
        assert_eq!(m.parse_status()[0].status, ParseStatus::Failed);
    }

    #[test]
    fn set_style_definitions() {
        let text = "\
set system host-name mx1
set policy-options prefix-list PEERS 192.0.2.0/24
set policy-options policy-statement FROM-PEERS term 1 from prefix-list PEERS
set policy-options policy-statement FROM-PEERS term 1 then accept
set protocols bgp group peers import FROM-PEERS
set protocols bgp group peers export [ FROM-PEERS MISSING ]
";
        let m = model(text);
        assert_eq!(m.parse_status()[0].status, ParseStatus::Passed);
        let names: Vec<_> = m.undefined_references().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["MISSING"]);
    }

    #[test]
    fn unknown_hierarchy_is_partial() {
        let m = model("set frobnicator enabled\n");
        assert_eq!(m.parse_status()[0].status, ParseStatus::PartiallyUnrecognized);
    }

    #[test]
    fn quoted_braces_are_ignored() {
        let m = model("system {\n    login {\n        message \"welcome {user}\";\n    }\n}\n");
        assert_eq!(m.parse_status()[0].status, ParseStatus::Passed);
    }
}
