//! Line-level configuration diffs
//!
//! [`diff`] compares a device's recorded configuration with a candidate and
//! returns a [`DiffRecord`]: hunks of add/remove/context lines in original
//! line order, with three lines of context. Both inputs are normalised first
//! (CRLF to LF, a terminal newline is added when missing), so `diff(x, x)` is always empty
//! and a missing trailing newline is never reported as a change.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, DiffTag, TextDiff};
use std::fmt::Write as _;

/// Lines of unchanged context kept around each change
pub const CONTEXT_LINES: usize = 3;

/// Operation applied to a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOp {
    /// Present only in the candidate
    Add,
    /// Present only in the current config
    Remove,
    /// Unchanged, kept for context
    Context,
}

impl LineOp {
    fn sign(self) -> char {
        match self {
            LineOp::Add => '+',
            LineOp::Remove => '-',
            LineOp::Context => ' ',
        }
    }
}

/// One line of a hunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    /// Operation
    pub op: LineOp,
    /// 1-based line in the current config
    pub old_line: Option<usize>,
    /// 1-based line in the candidate
    pub new_line: Option<usize>,
    /// Line text without the newline
    pub text: String,
}

/// A contiguous region of change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// 0-based start in the current config
    pub old_start: usize,
    /// Lines covered in the current config
    pub old_len: usize,
    /// 0-based start in the candidate
    pub new_start: usize,
    /// Lines covered in the candidate
    pub new_len: usize,
    /// Lines in order
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    fn header(&self) -> String {
        // Unified format: 1-based starts, except an empty range points at the
        // line before it.
        let old_start = if self.old_len == 0 { self.old_start } else { self.old_start + 1 };
        let new_start = if self.new_len == 0 { self.new_start } else { self.new_start + 1 };
        format!(
            "@@ -{},{} +{},{} @@",
            old_start, self.old_len, new_start, self.new_len
        )
    }
}

/// Ordered line operations between two configurations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRecord {
    hunks: Vec<DiffHunk>,
}

impl DiffRecord {
    /// The empty diff
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// No changes at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Hunks in order
    #[inline]
    #[must_use]
    pub fn hunks(&self) -> &[DiffHunk] {
        &self.hunks
    }

    /// All lines across hunks, in order
    pub fn lines(&self) -> impl Iterator<Item = &DiffLine> {
        self.hunks.iter().flat_map(|h| h.lines.iter())
    }

    /// Number of added lines
    #[must_use]
    pub fn added(&self) -> usize {
        self.lines().filter(|l| l.op == LineOp::Add).count()
    }

    /// Number of removed lines
    #[must_use]
    pub fn removed(&self) -> usize {
        self.lines().filter(|l| l.op == LineOp::Remove).count()
    }

    /// Render as unified diff text. Empty diff renders as an empty string.
    #[must_use]
    pub fn to_unified(&self, from_label: &str, to_label: &str) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        let _ = writeln!(out, "--- {from_label}");
        let _ = writeln!(out, "+++ {to_label}");
        for hunk in &self.hunks {
            let _ = writeln!(out, "{}", hunk.header());
            for line in &hunk.lines {
                let _ = writeln!(out, "{}{}", line.op.sign(), line.text);
            }
        }
        out
    }
}

/// Normalise line endings and the terminal newline
fn normalize(text: &str) -> String {
    let mut out = text.replace("\r\n", "\n");
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Compute the line diff from `current` to `candidate`
#[must_use]
pub fn diff(current: &str, candidate: &str) -> DiffRecord {
    let old = normalize(current);
    let new = normalize(candidate);
    if old == new {
        return DiffRecord::empty();
    }

    let text_diff = TextDiff::from_lines(old.as_str(), new.as_str());
    let mut hunks = Vec::new();

    for group in text_diff.grouped_ops(CONTEXT_LINES) {
        if group.iter().all(|op| op.tag() == DiffTag::Equal) {
            continue;
        }
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let new_start = first.new_range().start;
        let old_len = last.old_range().end - old_start;
        let new_len = last.new_range().end - new_start;

        let lines = group
            .iter()
            .flat_map(|op| text_diff.iter_changes(op))
            .map(|change| DiffLine {
                op: match change.tag() {
                    ChangeTag::Insert => LineOp::Add,
                    ChangeTag::Delete => LineOp::Remove,
                    ChangeTag::Equal => LineOp::Context,
                },
                old_line: change.old_index().map(|i| i + 1),
                new_line: change.new_index().map(|i| i + 1),
                text: change.value().trim_end_matches('\n').to_string(),
            })
            .collect();

        hunks.push(DiffHunk {
            old_start,
            old_len,
            new_start,
            new_len,
            lines,
        });
    }

    DiffRecord { hunks }
}
