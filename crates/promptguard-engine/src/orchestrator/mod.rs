//! Orchestrator: the per-project workflows.
//!
//! ```text
//! Uninitialized --init--> Enabled <--disable/enable--> Disabled
//!        ^                    |                            |
//!        +------- revert -----+----------------------------+
//! ```
//!
//! Analysis runs in parallel. Every mutation (backup, file write, state
//! save) happens sequentially while the exclusive project lock is held.
//! File-scoped failures become `Failed` outcomes; project-scoped failures
//! are returned as `Err` before anything else is written.

pub mod doctor;
pub mod report;
pub mod status;

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use promptguard_core::config::proxy_config::{validate_env_var_name, validate_proxy_url};
use promptguard_core::fs::write_atomic;
use promptguard_core::hashing::hash_content;
use promptguard_core::workspace::{
    now_timestamp, BackupManager, FileStatus, ProjectState, StateStore, WorkspaceError,
    WorkspaceLayout, WriteGuard,
};
use promptguard_core::{ApiKey, Language, PromptGuardConfig, Provider};
use tracing::{debug, info, warn};

use crate::envscan::{self, EnvReport};
use crate::errors::{EngineError, EngineResult, FileError};
use crate::parsers::SourceFile;
use crate::pipeline::{FileAnalysis, Pipeline};
use crate::scanner::{DiscoveredFile, ScanOutcome, Scanner};
use crate::transform::{PlanMode, ProxySettings};

pub use doctor::{Check, CheckStatus, DoctorReport};
pub use report::{
    FileOutcome, Operation, OutcomeKind, PlannedEdit, RunReport, ScanReport,
};
pub use status::{FileStatusEntry, Phase, StatusCounts, StatusReport};

/// Options for [`Orchestrator::init`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub api_key: String,
    /// Defaults to `proxy.base_url` from the config.
    pub proxy_url: Option<String>,
    /// Defaults to `proxy.env_var_name` from the config.
    pub env_var_name: Option<String>,
    /// Empty means every provider.
    pub providers: Vec<Provider>,
    /// Report the plan without writing anything.
    pub dry_run: bool,
    /// Re-initialize an existing project, keeping its roster. Files applied
    /// under a different proxy URL or variable name are re-applied.
    pub force: bool,
}

/// Options for [`Orchestrator::revert`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RevertOptions {
    /// Delete backups once every file has been restored and verified.
    pub prune_backups: bool,
}

/// Drives every workflow for one project root.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: PromptGuardConfig,
    store: StateStore,
    backups: BackupManager,
}

impl Orchestrator {
    pub fn new(root: &Path, config: PromptGuardConfig) -> Self {
        let layout = WorkspaceLayout::new(root, &config.workspace);
        Self {
            store: StateStore::new(layout.clone()),
            backups: BackupManager::new(layout),
            config,
        }
    }

    /// Load `promptguard.toml` from `root` and build an orchestrator.
    pub fn open(root: &Path) -> EngineResult<Self> {
        let config = PromptGuardConfig::load(root)?;
        Ok(Self::new(root, config))
    }

    pub fn root(&self) -> &Path {
        self.layout().root()
    }

    pub fn config(&self) -> &PromptGuardConfig {
        &self.config
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        self.store.layout()
    }

    // ---- Read-only ----

    /// Detect constructor calls across the tree without changing anything.
    pub fn scan(&self) -> EngineResult<ScanReport> {
        let state = self.store.load()?;
        let (providers, settings) = match &state {
            Some(state) => (state.providers.clone(), self.settings_for(state)),
            None => (Provider::ALL.into_iter().collect(), self.default_settings()),
        };
        let pipeline = Pipeline::new(providers.iter().copied(), settings, self.config.scan.effective_threads());
        let scanned = self.collect_files()?;

        let mut report = ScanReport {
            files_scanned: scanned.files.len(),
            skipped_entries: scanned.skipped.clone(),
            ..ScanReport::default()
        };
        let mut usages = Vec::new();
        for (path, result) in pipeline.analyze_files(&scanned.files, PlanMode::Proxy) {
            match result {
                Ok(analysis) => {
                    report.matches.extend(analysis.matches);
                    report.warnings.extend(analysis.warnings);
                    usages.extend(analysis.env_usages);
                }
                Err(err) => report
                    .errors
                    .push(FileOutcome::failed(path, BTreeSet::new(), &err)),
            }
        }

        let (env_files, definitions) = envscan::load_definitions(self.root(), self.layout().state_dir());
        let watched = watched_env_vars(&pipeline.settings().env_var_name, &providers);
        report.env = EnvReport::build(env_files, definitions, usages, &watched);

        info!(
            files = report.files_scanned,
            matches = report.matches.len(),
            env_vars = report.env.variables.len(),
            warnings = report.warnings.len(),
            errors = report.errors.len(),
            "scan complete"
        );
        Ok(report)
    }

    pub fn status(&self) -> EngineResult<StatusReport> {
        Ok(status::project_status(&self.store, &self.backups)?)
    }

    pub fn doctor(&self) -> DoctorReport {
        doctor::run_doctor(&self.store, &self.backups)
    }

    // ---- Lifecycle ----

    /// Initialize the project and apply. A dry run reports planned edits and
    /// takes neither the lock nor any write.
    pub fn init(&self, opts: InitOptions) -> EngineResult<RunReport> {
        let api_key = ApiKey::parse(&opts.api_key)?;
        let proxy_url = opts
            .proxy_url
            .unwrap_or_else(|| self.config.proxy.effective_base_url().to_string());
        let env_var_name = opts
            .env_var_name
            .unwrap_or_else(|| self.config.proxy.effective_env_var_name().to_string());
        validate_proxy_url(&proxy_url)?;
        validate_env_var_name(&env_var_name)?;
        let providers: BTreeSet<Provider> = if opts.providers.is_empty() {
            Provider::ALL.into_iter().collect()
        } else {
            opts.providers.into_iter().collect()
        };

        if opts.dry_run {
            if !opts.force && self.store.load()?.is_some() {
                return Err(self.already_initialized());
            }
            let state = ProjectState::new(api_key, proxy_url, env_var_name, providers);
            return self.plan_only(Operation::Init, &state);
        }

        let mut lock = self.store.open_lock()?;
        let guard = lock.write()?;

        let mut withdrawn_failures = Vec::new();
        let state = match self.store.load()? {
            Some(_) if !opts.force => return Err(self.already_initialized()),
            Some(mut previous) => {
                if previous.proxy_url != proxy_url || previous.env_var_name != env_var_name {
                    withdrawn_failures = self.withdraw_applied(&guard, &mut previous)?;
                }
                ProjectState {
                    api_key,
                    proxy_url,
                    env_var_name,
                    providers,
                    ..previous
                }
            }
            None => {
                // Backups left by an earlier lifecycle describe files that are
                // no longer managed and may since have been edited.
                let stale = self.backups.prune(&guard)?;
                if stale > 0 {
                    info!(count = stale, "discarded backups from a previous lifecycle");
                }
                ProjectState::new(api_key, proxy_url, env_var_name, providers)
            }
        };
        self.store.save(&guard, &state)?;
        info!(
            key = %state.api_key.masked(),
            proxy_url = %state.proxy_url,
            providers = state.providers.len(),
            "project initialized"
        );

        let mut report = if state.enabled {
            self.apply_locked(&guard, state, Operation::Init)?
        } else {
            RunReport::new(Operation::Init, false)
        };
        if !withdrawn_failures.is_empty() {
            report
                .outcomes
                .retain(|o| withdrawn_failures.iter().all(|f: &FileOutcome| f.path != o.path));
            report.outcomes.extend(withdrawn_failures);
        }
        Ok(report)
    }

    /// Proxy every detected constructor call that is not yet proxied.
    pub fn apply(&self) -> EngineResult<RunReport> {
        let mut lock = self.store.open_lock()?;
        let guard = lock.write()?;
        let state = self.store.load_required()?;
        if !state.enabled {
            return Err(EngineError::ProjectDisabled);
        }
        self.apply_locked(&guard, state, Operation::Apply)
    }

    /// Remove proxy edits from every applied file. Backups and the roster
    /// are kept.
    pub fn disable(&self) -> EngineResult<RunReport> {
        self.toggle(Operation::Disable)
    }

    /// Re-apply proxy edits to every disabled file.
    pub fn enable(&self) -> EngineResult<RunReport> {
        self.toggle(Operation::Enable)
    }

    /// Restore every managed file from its backup and return the project to
    /// uninitialized. On partial failure the state is kept: restored files
    /// become `reverted` and failed ones keep their status.
    pub fn revert(&self, opts: RevertOptions) -> EngineResult<RunReport> {
        let mut lock = self.store.open_lock()?;
        let guard = lock.write()?;
        let mut state = self.store.load_required()?;
        let mut report = RunReport::new(Operation::Revert, false);

        for file in state.files.clone() {
            let rel = file.path.as_str();
            let outcome = match self.backups.record(rel) {
                Ok(None) => {
                    debug!(path = rel, "never modified; dropping from roster");
                    state.remove_file(rel);
                    FileOutcome::new(rel, file.providers.clone(), OutcomeKind::Unchanged)
                }
                Ok(Some(_)) => match self.backups.restore(&guard, rel) {
                    Ok(_) => {
                        state.set_status(rel, FileStatus::Reverted);
                        FileOutcome::new(rel, file.providers.clone(), OutcomeKind::Restored)
                    }
                    Err(err) => {
                        warn!(path = rel, error = %err, "restore failed");
                        FileOutcome::failed(rel, file.providers.clone(), &FileError::from(err))
                    }
                },
                Err(err) => FileOutcome::failed(rel, file.providers.clone(), &FileError::from(err)),
            };
            report.push(outcome);
        }

        if report.has_errors() {
            self.store.save(&guard, &state)?;
            warn!(failed = report.failures().count(), "revert incomplete; state kept");
        } else {
            self.store.delete(&guard)?;
            if opts.prune_backups {
                self.backups.prune(&guard)?;
            }
            info!(restored = report.outcomes.len(), "project reverted");
        }
        Ok(report)
    }

    // ---- Internals ----

    /// Remove the proxy edits that `previous` settings wrote, so the files
    /// can be re-applied with new ones. Withdrawn files go back to
    /// `pending`; files that could not be withdrawn are returned as failures
    /// and keep their status.
    fn withdraw_applied(
        &self,
        guard: &WriteGuard<'_>,
        previous: &mut ProjectState,
    ) -> EngineResult<Vec<FileOutcome>> {
        let pipeline = self.pipeline_for(previous);
        let mut failures = Vec::new();

        let mut files = Vec::new();
        for rel in previous.paths_with_status(FileStatus::Applied) {
            match self.roster_file(&rel) {
                Ok(file) => files.push(file),
                Err(err) => failures.push(FileOutcome::failed(rel, BTreeSet::new(), &err)),
            }
        }

        for (rel, result) in pipeline.analyze_files(&files, PlanMode::Unproxy) {
            let providers = previous
                .file(&rel)
                .map(|f| f.providers.clone())
                .unwrap_or_default();
            let written = result.and_then(|analysis| {
                if analysis.plan.is_empty() {
                    Ok(0)
                } else {
                    self.write_plan(guard, &analysis)
                }
            });
            match written {
                Ok(edits) => {
                    previous.set_status(&rel, FileStatus::Pending);
                    self.store.save(guard, previous)?;
                    debug!(path = %rel, edits, "withdrew proxy edits for re-initialization");
                }
                Err(err) => {
                    warn!(path = %rel, error = %err, "could not withdraw previous proxy edits");
                    failures.push(FileOutcome::failed(rel, providers, &err));
                }
            }
        }
        Ok(failures)
    }

    fn apply_locked(
        &self,
        guard: &WriteGuard<'_>,
        mut state: ProjectState,
        operation: Operation,
    ) -> EngineResult<RunReport> {
        let pipeline = self.pipeline_for(&state);
        let scanned = self.collect_files()?;
        let mut report = RunReport::new(operation, false);
        report.note_skipped(&scanned.skipped);

        for (rel, result) in pipeline.analyze_files(&scanned.files, PlanMode::Proxy) {
            let analysis = match result {
                Ok(analysis) => analysis,
                Err(err) => {
                    warn!(path = %rel, error = %err, "skipping file");
                    report.push(FileOutcome::failed(rel, BTreeSet::new(), &err));
                    continue;
                }
            };
            report.warnings.extend(analysis.warnings.iter().cloned());
            if let Some(outcome) = self.apply_file(guard, &mut state, &analysis)? {
                report.push(outcome);
            }
        }

        info!(
            operation = operation.as_str(),
            applied = report.count(|r| matches!(r, OutcomeKind::Applied { .. })),
            failed = report.failures().count(),
            warnings = report.warnings.len(),
            "apply complete"
        );
        Ok(report)
    }

    /// One file of an apply. `Err` only for project-scoped failures.
    fn apply_file(
        &self,
        guard: &WriteGuard<'_>,
        state: &mut ProjectState,
        analysis: &FileAnalysis,
    ) -> EngineResult<Option<FileOutcome>> {
        let rel = analysis.rel_path();
        let providers = analysis.providers.clone();

        match state.status_of(rel) {
            Some(FileStatus::Applied) => {
                return Ok(Some(FileOutcome::new(rel, providers, OutcomeKind::Unchanged)));
            }
            Some(FileStatus::Disabled) => {
                return Ok(Some(FileOutcome::new(
                    rel,
                    providers,
                    OutcomeKind::Skipped {
                        reason: "disabled; run enable to re-apply".to_string(),
                    },
                )));
            }
            _ => {}
        }
        if analysis.matches.is_empty() {
            return Ok(None);
        }

        if analysis.plan.is_empty() {
            // An interrupted run may have written the file but not the status.
            let backed_up = matches!(self.backups.record(rel), Ok(Some(_)));
            if state.status_of(rel) == Some(FileStatus::Pending) && backed_up {
                state.upsert_file(rel, providers.iter().copied(), FileStatus::Applied);
                self.store.save(guard, state)?;
                info!(path = rel, "reconciled interrupted apply");
                return Ok(Some(FileOutcome::new(rel, providers, OutcomeKind::Applied { edits: 0 })));
            }
            return Ok(Some(FileOutcome::new(rel, providers, OutcomeKind::Unchanged)));
        }

        state.upsert_file(rel, providers.iter().copied(), FileStatus::Pending);
        self.store.save(guard, state)?;

        match self.write_plan(guard, analysis) {
            Ok(edits) => {
                state.upsert_file(rel, providers.iter().copied(), FileStatus::Applied);
                state.last_applied_at = Some(now_timestamp());
                self.store.save(guard, state)?;
                info!(path = rel, edits, "applied");
                Ok(Some(FileOutcome::new(rel, providers, OutcomeKind::Applied { edits })))
            }
            Err(err) => {
                warn!(path = rel, error = %err, "apply failed");
                Ok(Some(FileOutcome::failed(rel, providers, &err)))
            }
        }
    }

    /// Backup, then splice and write. The file must still hold the bytes
    /// the plan was computed from.
    fn write_plan(&self, guard: &WriteGuard<'_>, analysis: &FileAnalysis) -> Result<usize, FileError> {
        let rel = analysis.rel_path();
        self.backups.backup(guard, rel)?;

        let path = &analysis.source.path;
        let current = fs::read(path).map_err(|e| FileError::io(path.clone(), e))?;
        if hash_content(&current) != analysis.source.content_hash {
            return Err(FileError::ChangedDuringRun {
                path: rel.to_string(),
            });
        }

        let rewritten = analysis.plan.apply(&analysis.source.text)?;
        write_atomic(path, rewritten.as_bytes()).map_err(|e| FileError::io(path.clone(), e))?;
        Ok(analysis.plan.len())
    }

    /// Shared body of disable and enable.
    fn toggle(&self, operation: Operation) -> EngineResult<RunReport> {
        let (from, to, mode, enabled) = match operation {
            Operation::Disable => (FileStatus::Applied, FileStatus::Disabled, PlanMode::Unproxy, false),
            _ => (FileStatus::Disabled, FileStatus::Applied, PlanMode::Proxy, true),
        };

        let mut lock = self.store.open_lock()?;
        let guard = lock.write()?;
        let mut state = self.store.load_required()?;
        let pipeline = self.pipeline_for(&state);
        let mut report = RunReport::new(operation, false);

        let mut files = Vec::new();
        for rel in state.paths_with_status(from) {
            match self.roster_file(&rel) {
                Ok(file) => files.push(file),
                Err(err) => report.push(FileOutcome::failed(rel, BTreeSet::new(), &err)),
            }
        }

        for (rel, result) in pipeline.analyze_files(&files, mode) {
            let providers = state
                .file(&rel)
                .map(|f| f.providers.clone())
                .unwrap_or_default();
            let analysis = match result {
                Ok(analysis) => analysis,
                Err(err) => {
                    warn!(path = %rel, error = %err, "skipping file");
                    report.push(FileOutcome::failed(rel, providers, &err));
                    continue;
                }
            };
            report.warnings.extend(analysis.warnings.iter().cloned());

            if operation == Operation::Disable {
                let left_behind = match self.proxy_left_behind(&pipeline, &analysis) {
                    Ok(true) => Some(FileError::ProxyEntryRemains { path: rel.clone() }),
                    Ok(false) => None,
                    Err(err) => Some(err),
                };
                if let Some(err) = left_behind {
                    warn!(path = %rel, error = %err, "disable failed; file keeps its status");
                    report.push(FileOutcome::failed(rel, providers, &err));
                    continue;
                }
            }

            let outcome = if analysis.plan.is_empty() {
                Ok(OutcomeKind::Unchanged)
            } else {
                self.write_plan(&guard, &analysis).map(|edits| match operation {
                    Operation::Disable => OutcomeKind::Disabled { edits },
                    _ => OutcomeKind::Applied { edits },
                })
            };
            match outcome {
                Ok(result) => {
                    state.set_status(&rel, to);
                    self.store.save(&guard, &state)?;
                    report.push(FileOutcome::new(rel, providers, result));
                }
                Err(err) => {
                    warn!(path = %rel, error = %err, "{} failed", operation.as_str());
                    report.push(FileOutcome::failed(rel, providers, &err));
                }
            }
        }

        if state.enabled != enabled {
            state.enabled = enabled;
            if enabled {
                state.last_applied_at = Some(now_timestamp());
            }
            self.store.save(&guard, &state)?;
        }
        info!(
            operation = operation.as_str(),
            files = report.outcomes.len(),
            failed = report.failures().count(),
            "toggle complete"
        );
        Ok(report)
    }

    /// Whether the unproxy plan would leave a base-URL entry that the
    /// pristine backup did not have.
    fn proxy_left_behind(&self, pipeline: &Pipeline, analysis: &FileAnalysis) -> Result<bool, FileError> {
        let rel = analysis.rel_path();
        let language = analysis.source.language;
        let proxied = |text: String| -> Result<usize, FileError> {
            let after = pipeline.analyze_source(SourceFile::from_text(rel, language, text), PlanMode::Unproxy)?;
            Ok(after.matches.iter().filter(|m| m.already_proxied).count())
        };

        let remaining = proxied(analysis.plan.apply(&analysis.source.text)?)?;
        if remaining == 0 {
            return Ok(false);
        }
        let pristine = match self.backups.read(rel)? {
            Some(bytes) => proxied(String::from_utf8_lossy(&bytes).into_owned())?,
            None => 0,
        };
        Ok(remaining > pristine)
    }

    /// A roster entry as a scan candidate.
    fn roster_file(&self, rel: &str) -> Result<DiscoveredFile, FileError> {
        let path = self.layout().resolve(rel)?;
        let language = Language::from_path(&path).ok_or_else(|| {
            FileError::Workspace(WorkspaceError::InvalidPath(rel.to_string()))
        })?;
        let file_size = fs::metadata(&path)
            .map_err(|e| FileError::io(path.clone(), e))?
            .len();
        Ok(DiscoveredFile {
            path,
            rel_path: rel.to_string(),
            language,
            file_size,
        })
    }

    /// Dry run: plans for every file, nothing written.
    fn plan_only(&self, operation: Operation, state: &ProjectState) -> EngineResult<RunReport> {
        let pipeline = self.pipeline_for(state);
        let scanned = self.collect_files()?;
        let mut report = RunReport::new(operation, true);
        report.note_skipped(&scanned.skipped);

        for (rel, result) in pipeline.analyze_files(&scanned.files, PlanMode::Proxy) {
            match result {
                Ok(analysis) => {
                    report.warnings.extend(analysis.warnings.iter().cloned());
                    if analysis.matches.is_empty() {
                        continue;
                    }
                    let result = if analysis.plan.is_empty() {
                        OutcomeKind::Unchanged
                    } else {
                        OutcomeKind::Planned {
                            edits: PlannedEdit::from_plan(&analysis.plan, &analysis.source.text),
                        }
                    };
                    report.push(FileOutcome::new(rel, analysis.providers, result));
                }
                Err(err) => report.push(FileOutcome::failed(rel, BTreeSet::new(), &err)),
            }
        }
        Ok(report)
    }

    fn collect_files(&self) -> EngineResult<ScanOutcome> {
        let scanner = Scanner::new(
            self.root(),
            &self.config.scan,
            self.config.workspace.effective_state_dir(),
        )?;
        Ok(scanner.collect()?)
    }

    fn pipeline_for(&self, state: &ProjectState) -> Pipeline {
        Pipeline::new(
            state.providers.iter().copied(),
            self.settings_for(state),
            self.config.scan.effective_threads(),
        )
    }

    fn settings_for(&self, state: &ProjectState) -> ProxySettings {
        ProxySettings {
            proxy_url: state.proxy_url.clone(),
            env_var_name: state.env_var_name.clone(),
            inject_missing_credential: self.config.proxy.effective_inject_missing_credential(),
        }
    }

    fn default_settings(&self) -> ProxySettings {
        ProxySettings {
            proxy_url: self.config.proxy.effective_base_url().to_string(),
            env_var_name: self.config.proxy.effective_env_var_name().to_string(),
            inject_missing_credential: self.config.proxy.effective_inject_missing_credential(),
        }
    }

    fn already_initialized(&self) -> EngineError {
        EngineError::Workspace(WorkspaceError::AlreadyInitialized(
            self.layout().state_file().display().to_string(),
        ))
    }
}

/// Variables a proxied project depends on: the proxied one and each
/// provider's defaults.
fn watched_env_vars<'a>(env_var_name: &'a str, providers: &BTreeSet<Provider>) -> Vec<&'a str> {
    let mut names = vec![env_var_name];
    names.extend(providers.iter().flat_map(|p| p.default_env_vars().iter().copied()));
    names
}
