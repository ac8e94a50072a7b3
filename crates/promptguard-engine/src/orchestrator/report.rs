//! Per-file outcome summary of a run.

use std::collections::BTreeSet;

use promptguard_core::{PromptGuardErrorCode, Provider};
use serde::Serialize;

use crate::detectors::{Match, Warning};
use crate::envscan::EnvReport;
use crate::errors::{FileError, FileErrorKind};
use crate::scanner::SkippedEntry;
use crate::transform::TransformPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Scan,
    Init,
    Apply,
    Disable,
    Enable,
    Revert,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Init => "init",
            Self::Apply => "apply",
            Self::Disable => "disable",
            Self::Enable => "enable",
            Self::Revert => "revert",
        }
    }
}

/// One edit as a dry run shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEdit {
    pub start: usize,
    pub end: usize,
    /// 1-based line of `start`.
    pub line: usize,
    pub original: String,
    pub replacement: String,
}

impl PlannedEdit {
    pub fn from_plan(plan: &TransformPlan, source: &str) -> Vec<Self> {
        plan.edits()
            .iter()
            .map(|edit| Self {
                start: edit.range.start,
                end: edit.range.end,
                line: source
                    .get(..edit.range.start)
                    .map_or(1, |s| s.matches('\n').count() + 1),
                original: source.get(edit.range.clone()).unwrap_or("").to_string(),
                replacement: edit.text.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Proxy edits written.
    Applied { edits: usize },
    /// Proxy edits removed.
    Disabled { edits: usize },
    /// Pristine bytes restored and verified.
    Restored,
    /// Dry run: what would be written.
    Planned { edits: Vec<PlannedEdit> },
    /// Nothing to change.
    Unchanged,
    Skipped { reason: String },
    Failed {
        code: &'static str,
        kind: FileErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub providers: BTreeSet<Provider>,
    #[serde(flatten)]
    pub result: OutcomeKind,
}

impl FileOutcome {
    pub fn new(path: impl Into<String>, providers: BTreeSet<Provider>, result: OutcomeKind) -> Self {
        Self {
            path: path.into(),
            providers,
            result,
        }
    }

    pub fn failed(path: impl Into<String>, providers: BTreeSet<Provider>, err: &FileError) -> Self {
        Self::new(
            path,
            providers,
            OutcomeKind::Failed {
                code: err.error_code(),
                kind: err.kind(),
                message: err.to_string(),
            },
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.result, OutcomeKind::Failed { .. })
    }
}

/// Summary of a scan or a mutating operation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub operation: Operation,
    pub dry_run: bool,
    pub outcomes: Vec<FileOutcome>,
    pub warnings: Vec<Warning>,
    pub skipped_entries: Vec<SkippedEntry>,
}

impl RunReport {
    pub fn new(operation: Operation, dry_run: bool) -> Self {
        Self {
            operation,
            dry_run,
            outcomes: Vec::new(),
            warnings: Vec::new(),
            skipped_entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    pub(crate) fn note_skipped(&mut self, skipped: &[SkippedEntry]) {
        self.skipped_entries.extend_from_slice(skipped);
    }

    pub fn outcome(&self, path: &str) -> Option<&FileOutcome> {
        self.outcomes.iter().find(|o| o.path == path)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn count(&self, pred: impl Fn(&OutcomeKind) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.result)).count()
    }

    /// Warnings never count as errors.
    pub fn has_errors(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_errors())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Read-only detection results for the whole tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub files_scanned: usize,
    pub matches: Vec<Match>,
    pub warnings: Vec<Warning>,
    /// Files that could not be read or parsed.
    pub errors: Vec<FileOutcome>,
    pub skipped_entries: Vec<SkippedEntry>,
    /// LLM-related environment variables: env file definitions and code reads.
    pub env: EnvReport,
}

impl ScanReport {
    pub fn files_with_matches(&self) -> BTreeSet<&str> {
        self.matches.iter().map(|m| m.path.as_str()).collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Edit;

    #[test]
    fn exit_code_ignores_warnings() {
        let mut report = RunReport::new(Operation::Apply, false);
        report.push(FileOutcome::new("a.ts", BTreeSet::new(), OutcomeKind::Applied { edits: 2 }));
        assert_eq!(report.exit_code(), 0);

        let err = FileError::ChangedDuringRun { path: "b.ts".into() };
        report.push(FileOutcome::failed("b.ts", BTreeSet::new(), &err));
        assert!(report.has_errors());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn outcomes_serialize_flat() {
        let mut report = RunReport::new(Operation::Disable, false);
        report.push(FileOutcome::new("a.py", BTreeSet::new(), OutcomeKind::Disabled { edits: 2 }));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["operation"], "disable");
        assert_eq!(value["outcomes"][0]["path"], "a.py");
        assert_eq!(value["outcomes"][0]["result"], "disabled");
        assert_eq!(value["outcomes"][0]["edits"], 2);
    }

    #[test]
    fn planned_edit_lines() {
        let source = "a\nb\nc";
        let plan = TransformPlan::new(vec![Edit::replace(2..3, "B")]).unwrap();
        let edits = PlannedEdit::from_plan(&plan, source);
        assert_eq!(edits[0].line, 2);
        assert_eq!(edits[0].original, "b");
        assert_eq!(edits[0].replacement, "B");
    }
}
