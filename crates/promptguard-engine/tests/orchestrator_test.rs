//! Orchestrator tests over a temporary project tree.

use std::fs;
use std::path::Path;

use promptguard_core::config::WorkspaceConfig;
use promptguard_core::workspace::{FileStatus, StateStore, WorkspaceError, WorkspaceLayout};
use promptguard_core::{PromptGuardConfig, PromptGuardErrorCode};
use promptguard_engine::errors::{EngineError, FileErrorKind};
use promptguard_engine::orchestrator::{CheckStatus, OutcomeKind, Phase};
use promptguard_engine::{InitOptions, Orchestrator, RevertOptions};

const KEY: &str = "pg_sk_test_0123456789abcdef";

const APP_TS: &str = "import OpenAI from \"openai\";\n\nexport const client = new OpenAI({ apiKey: process.env.OPENAI_API_KEY });\n";
const APP_TS_PROXIED: &str = "import OpenAI from \"openai\";\n\nexport const client = new OpenAI({ apiKey: process.env.PROMPTGUARD_API_KEY, baseURL: \"https://api.promptguard.co/api/v1/proxy\" });\n";
const LEGACY_JS: &str = "const OpenAI = require(\"openai\");\nmodule.exports = new OpenAI();\n";
const MAIN_PY: &str = "import os\nfrom anthropic import Anthropic\n\nclient = Anthropic(api_key=os.environ.get(\"ANTHROPIC_API_KEY\"))\n";
const BROKEN_TS: &str = "import OpenAI from \"openai\";\nconst = new OpenAI({ apiKey: ;\n";
const PLAIN_TS: &str = "export const answer = 42;\n";

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

fn project(with_broken: bool) -> tempfile::TempDir {
    promptguard_core::tracing::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/app.ts", APP_TS);
    write(root, "src/legacy.js", LEGACY_JS);
    write(root, "src/plain.ts", PLAIN_TS);
    write(root, "bot/main.py", MAIN_PY);
    write(root, "src/app.test.ts", APP_TS);
    write(root, "node_modules/openai/index.js", LEGACY_JS);
    if with_broken {
        write(root, "src/broken.ts", BROKEN_TS);
    }
    dir
}

fn orchestrator(root: &Path) -> Orchestrator {
    Orchestrator::new(root, PromptGuardConfig::default())
}

fn init_opts() -> InitOptions {
    InitOptions {
        api_key: KEY.to_string(),
        ..InitOptions::default()
    }
}

fn store(root: &Path) -> StateStore {
    StateStore::new(WorkspaceLayout::new(root, &WorkspaceConfig::default()))
}

// ---- Scan ----

#[test]
fn scan_finds_calls_and_respects_ignores() {
    let dir = project(true);
    let report = orchestrator(dir.path()).scan().unwrap();

    let paths = report.files_with_matches();
    assert_eq!(
        paths.into_iter().collect::<Vec<_>>(),
        vec!["bot/main.py", "src/app.ts", "src/legacy.js"]
    );
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, "src/broken.ts");
    assert!(!dir.path().join(".promptguard").exists());
}

#[test]
fn scan_reports_env_definitions_and_reads() {
    let dir = project(false);
    let root = dir.path();
    write(root, ".env", "OPENAI_API_KEY=sk-live-secret\nNODE_ENV=development\n");
    write(root, "node_modules/pkg/.env", "ANTHROPIC_API_KEY=ignored\n");

    let report = orchestrator(root).scan().unwrap();
    let env = &report.env;
    assert_eq!(env.env_files, vec![".env"]);

    let openai = env.variable("OPENAI_API_KEY").unwrap();
    assert!(openai.has_value);
    assert_eq!(openai.defined_in[0].line, 1);
    let readers: Vec<&str> = openai.used_in.iter().map(|u| u.path.as_str()).collect();
    assert_eq!(readers, vec!["src/app.ts"]);

    let anthropic = env.variable("ANTHROPIC_API_KEY").unwrap();
    assert!(anthropic.defined_in.is_empty());
    assert_eq!(anthropic.used_in[0].path, "bot/main.py");
    assert!(env.variable("NODE_ENV").is_none());

    let json = report.to_json().unwrap();
    assert!(!json.contains("sk-live-secret"));
}

// ---- Init / apply ----

#[test]
fn dry_run_plans_without_writing() {
    let dir = project(false);
    let report = orchestrator(dir.path())
        .init(InitOptions {
            dry_run: true,
            ..init_opts()
        })
        .unwrap();

    assert!(report.dry_run);
    match &report.outcome("src/app.ts").unwrap().result {
        OutcomeKind::Planned { edits } => {
            assert_eq!(edits.len(), 2);
            assert_eq!(edits[0].line, 3);
            assert_eq!(edits[0].original, "OPENAI_API_KEY");
        }
        other => panic!("expected a plan, got {other:?}"),
    }
    assert_eq!(read(dir.path(), "src/app.ts"), APP_TS);
    assert!(!dir.path().join(".promptguard").exists());
}

#[test]
fn init_applies_and_isolates_the_unparsable_file() {
    let dir = project(true);
    let root = dir.path();
    let report = orchestrator(root).init(init_opts()).unwrap();

    assert_eq!(report.failures().count(), 1);
    let failed = report.failures().next().unwrap();
    assert_eq!(failed.path, "src/broken.ts");
    assert!(matches!(
        failed.result,
        OutcomeKind::Failed { kind: FileErrorKind::ParseError, .. }
    ));
    assert_eq!(report.exit_code(), 1);
    assert_eq!(
        report.count(|r| matches!(r, OutcomeKind::Applied { .. })),
        3
    );

    assert_eq!(read(root, "src/app.ts"), APP_TS_PROXIED);
    assert!(read(root, "bot/main.py").contains(
        "Anthropic(api_key=os.environ.get(\"PROMPTGUARD_API_KEY\"), base_url=\"https://api.promptguard.co/api/v1/proxy\")"
    ));
    assert!(read(root, "src/legacy.js").contains("new OpenAI({ apiKey: process.env.PROMPTGUARD_API_KEY"));
    assert_eq!(read(root, "src/app.test.ts"), APP_TS);
    assert_eq!(read(root, "node_modules/openai/index.js"), LEGACY_JS);
    assert_eq!(read(root, "src/plain.ts"), PLAIN_TS);

    let status = orchestrator(root).status().unwrap();
    assert_eq!(status.phase, Phase::Enabled);
    assert_eq!(status.counts.applied, 3);
    assert!(status.files.iter().all(|f| f.has_backup));
    assert_eq!(status.api_key.as_deref(), Some("pg_sk_test_****cdef"));
}

#[test]
fn second_apply_is_a_no_op() {
    let dir = project(false);
    let root = dir.path();
    let orch = orchestrator(root);
    orch.init(init_opts()).unwrap();
    let before = read(root, "src/app.ts");

    let report = orch.apply().unwrap();
    assert!(!report.has_errors());
    assert_eq!(
        report.count(|r| matches!(r, OutcomeKind::Unchanged)),
        3
    );
    assert_eq!(read(root, "src/app.ts"), before);
}

#[test]
fn init_twice_requires_force() {
    let dir = project(false);
    let orch = orchestrator(dir.path());
    orch.init(init_opts()).unwrap();

    let err = orch.init(init_opts()).unwrap_err();
    assert_eq!(err.error_code(), "ALREADY_INITIALIZED");

    let report = orch
        .init(InitOptions {
            force: true,
            ..init_opts()
        })
        .unwrap();
    assert!(!report.has_errors());
}

#[test]
fn force_reinit_moves_files_to_the_new_proxy_url() {
    let dir = project(false);
    let root = dir.path();
    let orch = orchestrator(root);
    orch.init(init_opts()).unwrap();
    assert_eq!(read(root, "src/app.ts"), APP_TS_PROXIED);

    let report = orch
        .init(InitOptions {
            force: true,
            proxy_url: Some("https://new.example.com/proxy".to_string()),
            ..init_opts()
        })
        .unwrap();
    assert!(!report.has_errors());

    let app = read(root, "src/app.ts");
    assert!(app.contains("baseURL: \"https://new.example.com/proxy\""));
    assert!(!app.contains("api.promptguard.co"));
    assert_eq!(app.matches("baseURL").count(), 1);
    let py = read(root, "bot/main.py");
    assert!(py.contains("base_url=\"https://new.example.com/proxy\""));
    assert!(!py.contains("api.promptguard.co"));
    assert_eq!(orch.status().unwrap().counts.applied, 3);

    let report = orch.disable().unwrap();
    assert!(!report.has_errors());
    assert_eq!(read(root, "src/app.ts"), APP_TS);
    assert_eq!(read(root, "bot/main.py"), MAIN_PY);
    assert_eq!(
        store(root).load_required().unwrap().status_of("src/app.ts"),
        Some(FileStatus::Disabled)
    );
}

#[test]
fn disable_keeps_status_when_a_foreign_proxy_entry_would_remain() {
    let dir = project(false);
    let root = dir.path();
    let orch = orchestrator(root);
    orch.init(init_opts()).unwrap();

    // The entry no longer holds the configured URL, so unproxy cannot remove it.
    let edited = APP_TS_PROXIED.replace(
        "https://api.promptguard.co/api/v1/proxy",
        "https://old.example.com/proxy",
    );
    write(root, "src/app.ts", &edited);

    let report = orch.disable().unwrap();
    let outcome = report.outcome("src/app.ts").unwrap();
    assert!(matches!(
        outcome.result,
        OutcomeKind::Failed { kind: FileErrorKind::Transform, .. }
    ));
    assert_eq!(read(root, "src/app.ts"), edited);
    assert_eq!(
        store(root).load_required().unwrap().status_of("src/app.ts"),
        Some(FileStatus::Applied)
    );
    assert_eq!(read(root, "bot/main.py"), MAIN_PY);
}

#[test]
fn invalid_key_is_rejected_before_any_write() {
    let dir = project(false);
    let err = orchestrator(dir.path())
        .init(InitOptions {
            api_key: "sk-live-123".to_string(),
            ..InitOptions::default()
        })
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_API_KEY");
    assert_eq!(read(dir.path(), "src/app.ts"), APP_TS);
    assert!(!dir.path().join(".promptguard").exists());
}

#[test]
fn apply_reconciles_an_interrupted_run() {
    let dir = project(false);
    let root = dir.path();
    let orch = orchestrator(root);
    orch.init(init_opts()).unwrap();

    // File written and backed up, status never advanced past pending.
    let store = store(root);
    let mut lock = store.open_lock().unwrap();
    {
        let guard = lock.write().unwrap();
        store
            .update(&guard, |s| {
                s.set_status("src/app.ts", FileStatus::Pending);
                Ok(())
            })
            .unwrap();
    }
    drop(lock);

    let report = orch.apply().unwrap();
    assert_eq!(
        report.outcome("src/app.ts").unwrap().result,
        OutcomeKind::Applied { edits: 0 }
    );
    assert_eq!(read(root, "src/app.ts"), APP_TS_PROXIED);
    assert_eq!(
        store.load_required().unwrap().status_of("src/app.ts"),
        Some(FileStatus::Applied)
    );
}

// ---- Disable / enable ----

#[test]
fn disable_and_enable_toggle_edits() {
    let dir = project(false);
    let root = dir.path();
    let orch = orchestrator(root);
    orch.init(init_opts()).unwrap();

    let report = orch.disable().unwrap();
    assert!(!report.has_errors());
    assert_eq!(read(root, "src/app.ts"), APP_TS);
    assert_eq!(read(root, "bot/main.py"), MAIN_PY);
    let status = orch.status().unwrap();
    assert_eq!(status.phase, Phase::Disabled);
    assert_eq!(status.counts.disabled, 3);
    assert!(status.files.iter().all(|f| f.has_backup));

    let again = orch.disable().unwrap();
    assert!(again.outcomes.is_empty());
    assert_eq!(read(root, "src/app.ts"), APP_TS);

    assert!(matches!(orch.apply(), Err(EngineError::ProjectDisabled)));

    orch.enable().unwrap();
    assert_eq!(read(root, "src/app.ts"), APP_TS_PROXIED);
    assert_eq!(orch.status().unwrap().phase, Phase::Enabled);
}

// ---- Revert ----

#[test]
fn revert_restores_every_file_byte_for_byte() {
    let dir = project(true);
    let root = dir.path();
    let orch = orchestrator(root);
    let legacy_before = read(root, "src/legacy.js");
    orch.init(init_opts()).unwrap();
    orch.disable().unwrap();
    orch.enable().unwrap();

    let report = orch.revert(RevertOptions { prune_backups: true }).unwrap();
    assert!(!report.has_errors());
    assert_eq!(report.count(|r| *r == OutcomeKind::Restored), 3);

    assert_eq!(read(root, "src/app.ts"), APP_TS);
    assert_eq!(read(root, "src/legacy.js"), legacy_before);
    assert_eq!(read(root, "bot/main.py"), MAIN_PY);
    assert_eq!(read(root, "src/broken.ts"), BROKEN_TS);
    assert_eq!(orch.status().unwrap().phase, Phase::Uninitialized);
    assert!(!root.join(".promptguard/backups").exists());
}

#[test]
fn tampered_backup_fails_only_that_file() {
    let dir = project(false);
    let root = dir.path();
    let orch = orchestrator(root);
    orch.init(init_opts()).unwrap();
    fs::write(root.join(".promptguard/backups/src/app.ts"), "tampered").unwrap();

    let report = orch.revert(RevertOptions::default()).unwrap();
    assert_eq!(report.failures().count(), 1);
    assert!(matches!(
        report.outcome("src/app.ts").unwrap().result,
        OutcomeKind::Failed { kind: FileErrorKind::ChecksumMismatchOnRevert, .. }
    ));
    assert_eq!(read(root, "src/app.ts"), APP_TS_PROXIED);
    assert_eq!(read(root, "bot/main.py"), MAIN_PY);

    let state = store(root).load_required().unwrap();
    assert_eq!(state.status_of("src/app.ts"), Some(FileStatus::Applied));
    assert_eq!(state.status_of("bot/main.py"), Some(FileStatus::Reverted));
}

#[test]
fn revert_requires_initialization() {
    let dir = project(false);
    let err = orchestrator(dir.path())
        .revert(RevertOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Workspace(WorkspaceError::NotInitialized)
    ));
}

// ---- Doctor ----

#[test]
fn doctor_reports_missing_managed_file() {
    let dir = project(false);
    let root = dir.path();
    let orch = orchestrator(root);
    assert_eq!(orch.doctor().check("state").unwrap().status, CheckStatus::Warn);

    orch.init(init_opts()).unwrap();
    let report = orch.doctor();
    assert!(report.is_healthy());
    assert_eq!(report.check("api_key").unwrap().status, CheckStatus::Warn);

    fs::remove_file(root.join("src/legacy.js")).unwrap();
    let report = orch.doctor();
    assert!(!report.is_healthy());
    assert_eq!(
        report.check("file:src/legacy.js").unwrap().status,
        CheckStatus::Fail
    );
}

#[test]
fn doctor_checks_the_proxied_env_var() {
    if std::env::var_os("PROMPTGUARD_API_KEY").is_some() {
        return;
    }
    let dir = project(false);
    let root = dir.path();
    let orch = orchestrator(root);
    orch.init(init_opts()).unwrap();
    assert_eq!(orch.doctor().check("env").unwrap().status, CheckStatus::Warn);

    write(root, ".env.local", "PROMPTGUARD_API_KEY=\n");
    let check = orch.doctor().check("env").cloned().unwrap();
    assert_eq!(check.status, CheckStatus::Warn);
    assert!(check.detail.contains(".env.local:1"));

    write(root, ".env", format!("PROMPTGUARD_API_KEY={KEY}\n").as_str());
    let report = orch.doctor();
    assert_eq!(report.check("env").unwrap().status, CheckStatus::Pass);
    assert!(!report.check("env").unwrap().detail.contains(KEY));
}

#[test]
fn corrupt_state_aborts_mutations() {
    let dir = project(false);
    let root = dir.path();
    let orch = orchestrator(root);
    orch.init(init_opts()).unwrap();
    fs::write(root.join(".promptguard/state.json"), "{ not json").unwrap();
    let proxied = read(root, "src/app.ts");

    let err = orch.disable().unwrap_err();
    assert_eq!(err.error_code(), "STATE_STORE_CORRUPT");
    assert_eq!(read(root, "src/app.ts"), proxied);
}
