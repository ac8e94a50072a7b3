//! Read-only diagnostics over config, state, lock, env files, and backups.

use std::collections::BTreeSet;

use promptguard_core::workspace::{BackupManager, StateStore, WorkspaceError};
use promptguard_core::{PromptGuardConfig, PromptGuardErrorCode};
use serde::Serialize;

use crate::envscan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<Check>,
}

impl DoctorReport {
    fn push(&mut self, name: impl Into<String>, status: CheckStatus, detail: impl Into<String>) {
        self.checks.push(Check {
            name: name.into(),
            status,
            detail: detail.into(),
        });
    }

    pub fn check(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// No check failed. Warnings are allowed.
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }
}

pub(crate) fn run_doctor(store: &StateStore, backups: &BackupManager) -> DoctorReport {
    let mut report = DoctorReport::default();
    let layout = store.layout();

    match PromptGuardConfig::load(layout.root()) {
        Ok(_) => report.push("config", CheckStatus::Pass, "configuration is valid"),
        Err(e) => report.push("config", CheckStatus::Fail, e.to_string()),
    }

    let state = match store.load() {
        Ok(Some(state)) => {
            report.push("state", CheckStatus::Pass, format!("{} managed file(s)", state.files.len()));
            Some(state)
        }
        Ok(None) => {
            report.push("state", CheckStatus::Warn, "project is not initialized");
            None
        }
        Err(e) => {
            report.push("state", CheckStatus::Fail, format!("{} ({})", e, e.error_code()));
            None
        }
    };

    // Opening the lock would create the state directory; skip it when absent.
    if layout.state_dir().is_dir() {
        match store.open_lock() {
            Ok(mut lock) => match lock.read() {
                Ok(_guard) => report.push("lock", CheckStatus::Pass, "lock is free"),
                Err(e) => report.push("lock", CheckStatus::Warn, e.to_string()),
            },
            Err(e) => report.push("lock", CheckStatus::Fail, e.to_string()),
        }
    }

    let Some(state) = state else {
        return report;
    };

    let key = &state.api_key;
    if key.is_test_key() {
        report.push("api_key", CheckStatus::Warn, format!("{} is a test key", key.masked()));
    } else {
        report.push("api_key", CheckStatus::Pass, key.masked());
    }

    let env_var = state.env_var_name.as_str();
    let (_, definitions) = envscan::load_definitions(layout.root(), layout.state_dir());
    let defined: Vec<_> = definitions.iter().filter(|d| d.name == env_var).collect();
    if let Some(def) = defined.iter().find(|d| d.has_value) {
        report.push("env", CheckStatus::Pass, format!("{env_var} is set in {}", def.path));
    } else if std::env::var_os(env_var).is_some() {
        report.push("env", CheckStatus::Pass, format!("{env_var} is set in the environment"));
    } else if let Some(def) = defined.first() {
        report.push(
            "env",
            CheckStatus::Warn,
            format!("{env_var} is empty in {}:{}", def.path, def.line),
        );
    } else {
        report.push(
            "env",
            CheckStatus::Warn,
            format!("{env_var} is not defined in any env file or in the environment"),
        );
    }

    for file in &state.files {
        let name = format!("file:{}", file.path);
        let exists = layout.resolve(&file.path).is_ok_and(|p| p.is_file());
        if !exists {
            report.push(name, CheckStatus::Fail, "managed file is missing");
            continue;
        }
        match backups.verify(&file.path) {
            Ok(record) => report.push(
                name,
                CheckStatus::Pass,
                format!("{}, backup {}", file.status.as_str(), record.checksum),
            ),
            Err(WorkspaceError::BackupNotFound(_)) => report.push(
                name,
                CheckStatus::Warn,
                format!("{}, no backup yet", file.status.as_str()),
            ),
            Err(e) => report.push(name, CheckStatus::Fail, e.to_string()),
        }
    }

    let roster: BTreeSet<&str> = state.files.iter().map(|f| f.path.as_str()).collect();
    match backups.records() {
        Ok(records) => {
            let orphans: Vec<String> = records
                .into_iter()
                .filter(|r| !roster.contains(r.path.as_str()))
                .map(|r| r.path)
                .collect();
            if orphans.is_empty() {
                report.push("backups", CheckStatus::Pass, "every backup belongs to a managed file");
            } else {
                report.push(
                    "backups",
                    CheckStatus::Warn,
                    format!("backups without a managed file: {}", orphans.join(", ")),
                );
            }
        }
        Err(e) => report.push("backups", CheckStatus::Fail, e.to_string()),
    }

    report
}
