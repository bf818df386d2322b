//! In-process network model built from staged files

use super::{ios, junos};
use crate::types::{
    FileParseStatus, InitIssue, InitIssueKind, ParseStatus, Reference, SnapshotFile,
    StructureKind,
};
use netgate_model::Severity;
use std::collections::HashSet;

/// Everything learned from one file
#[derive(Debug, Clone)]
pub(crate) struct FileModel {
    name: String,
    status: ParseStatus,
    issues: Vec<InitIssue>,
    definitions: HashSet<(StructureKind, String)>,
    references: Vec<Reference>,
}

/// Accumulates findings while a file is parsed
#[derive(Debug)]
pub(crate) struct FileBuilder {
    name: String,
    issues: Vec<InitIssue>,
    definitions: HashSet<(StructureKind, String)>,
    references: Vec<Reference>,
    failed: bool,
    unrecognized: bool,
}

impl FileBuilder {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issues: Vec::new(),
            definitions: HashSet::new(),
            references: Vec::new(),
            failed: false,
            unrecognized: false,
        }
    }

    fn issue(&mut self, line: Option<usize>, severity: Severity, kind: InitIssueKind, description: String) {
        self.issues.push(InitIssue {
            file_name: self.name.clone(),
            line,
            severity,
            kind,
            description,
        });
    }

    /// Malformed input; the file is `FAILED`
    pub(crate) fn parse_error(&mut self, line: Option<usize>, description: impl Into<String>) {
        self.failed = true;
        self.issue(line, Severity::Error, InitIssueKind::ParseError, description.into());
    }

    /// Statement outside the model; the file is at best `PARTIALLY_UNRECOGNIZED`
    pub(crate) fn unrecognized(&mut self, line: usize, statement: &str) {
        self.unrecognized = true;
        self.issue(
            Some(line),
            Severity::Warning,
            InitIssueKind::UnrecognizedSyntax,
            format!("unrecognized statement '{statement}'"),
        );
    }

    /// Statement that can never take effect
    pub(crate) fn unreachable(&mut self, line: usize, description: impl Into<String>) {
        self.issue(
            Some(line),
            Severity::Warning,
            InitIssueKind::UnreachableStatement,
            description.into(),
        );
    }

    pub(crate) fn define(&mut self, kind: StructureKind, name: &str) {
        self.definitions.insert((kind, clean_name(name)));
    }

    pub(crate) fn reference(&mut self, kind: StructureKind, name: &str, context: impl Into<String>, line: usize) {
        let name = clean_name(name);
        if name.is_empty() {
            return;
        }
        self.references.push(Reference {
            file_name: self.name.clone(),
            kind,
            name,
            context: context.into(),
            line,
        });
    }

    pub(crate) fn finish(self) -> FileModel {
        let status = if self.failed {
            ParseStatus::Failed
        } else if self.unrecognized {
            ParseStatus::PartiallyUnrecognized
        } else {
            ParseStatus::Passed
        };
        FileModel {
            name: self.name,
            status,
            issues: self.issues,
            definitions: self.definitions,
            references: self.references,
        }
    }
}

fn clean_name(name: &str) -> String {
    name.trim_matches(|c| c == ';' || c == '"' || c == '[' || c == ']')
        .to_string()
}

/// Model of one snapshot
#[derive(Debug, Clone)]
pub(crate) struct NetworkModel {
    files: Vec<FileModel>,
}

impl NetworkModel {
    pub(crate) fn build(files: &[SnapshotFile]) -> Self {
        let files = files
            .iter()
            .map(|file| {
                let mut builder = FileBuilder::new(file.name.clone());
                if file.platform.is_ios_like() {
                    ios::parse(&mut builder, &file.content);
                } else {
                    junos::parse(&mut builder, &file.content);
                }
                builder.finish()
            })
            .collect();
        Self { files }
    }

    pub(crate) fn parse_status(&self) -> Vec<FileParseStatus> {
        self.files
            .iter()
            .map(|f| FileParseStatus {
                file_name: f.name.clone(),
                status: f.status,
            })
            .collect()
    }

    pub(crate) fn init_issues(&self) -> Vec<InitIssue> {
        self.files.iter().flat_map(|f| f.issues.iter().cloned()).collect()
    }

    /// References whose target is defined in no file of the snapshot
    pub(crate) fn undefined_references(&self) -> Vec<Reference> {
        let defined: HashSet<(StructureKind, &str)> = self
            .files
            .iter()
            .flat_map(|f| f.definitions.iter().map(|(k, n)| (*k, n.as_str())))
            .collect();
        self.files
            .iter()
            .flat_map(|f| f.references.iter())
            .filter(|r| !defined.contains(&(r.kind, r.name.as_str())))
            .cloned()
            .collect()
    }
}
