//! Detector output types.

use std::ops::Range;

use promptguard_core::{Language, Provider};
use serde::Serialize;

/// Location of a constructor's argument node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgsRef {
    pub range: Range<usize>,
    /// Grammar kind: `arguments`, `argument_list`, or `generator_expression`.
    pub kind: &'static str,
}

/// A located provider constructor call. Built and discarded per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub path: String,
    pub provider: Provider,
    pub language: Language,
    pub class_name: String,
    pub call_range: Range<usize>,
    /// `None` for `new Client` written without parentheses.
    pub args: Option<ArgsRef>,
    /// 1-based.
    pub line: usize,
    pub column: usize,
    /// A recognized base-URL key is already among the arguments.
    pub already_proxied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Skipped: the callee binding or the argument shape is ambiguous.
    PatternAmbiguous,
    /// Proxied, but the credential expression was left as written.
    CredentialNotRewritten,
}

/// A non-fatal finding. Never affects the exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub provider: Option<Provider>,
    pub kind: WarningKind,
    pub message: String,
}
