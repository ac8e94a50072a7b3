//! Per-file analysis: load, parse, detect, plan.
//!
//! Files are independent, so analysis runs on a rayon pool. Nothing here
//! touches the workspace; mutations happen afterwards, one file at a time,
//! under the project lock.

use std::collections::BTreeSet;

use promptguard_core::{Language, Provider};
use rayon::prelude::*;

use crate::detectors::{Detector, Match, Warning};
use crate::envscan::{env_usages, EnvUsage};
use crate::errors::FileError;
use crate::parsers::source::LoadError;
use crate::parsers::{AstProvider, SourceFile};
use crate::scanner::DiscoveredFile;
use crate::transform::{self, PlanMode, ProxySettings, TransformPlan};

/// Everything learned about one file in one run.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub source: SourceFile,
    pub matches: Vec<Match>,
    pub warnings: Vec<Warning>,
    pub plan: TransformPlan,
    /// Providers with at least one match in the file.
    pub providers: BTreeSet<Provider>,
    /// Direct environment reads anywhere in the file.
    pub env_usages: Vec<EnvUsage>,
}

impl FileAnalysis {
    pub fn rel_path(&self) -> &str {
        &self.source.rel_path
    }
}

/// Detector and proxy settings shared by every file of a run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    detector: Detector,
    settings: ProxySettings,
    threads: usize,
}

impl Pipeline {
    /// `threads == 0` uses rayon's global pool.
    pub fn new(
        providers: impl IntoIterator<Item = Provider>,
        settings: ProxySettings,
        threads: usize,
    ) -> Self {
        Self {
            detector: Detector::new(providers),
            settings,
            threads,
        }
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    /// Parse, detect, and plan an already-loaded source file.
    pub fn analyze_source(&self, source: SourceFile, mode: PlanMode) -> Result<FileAnalysis, FileError> {
        let tree = AstProvider::for_language(source.language).parse(&source.text, &source.path)?;
        let detection = self.detector.detect(&source, &tree);
        let file_plan = transform::plan_file(&source, &tree, &detection, &self.settings, mode);
        let env_usages = env_usages(&source, &tree, &detection.bindings);

        let mut warnings = detection.warnings.clone();
        warnings.extend(file_plan.warnings);
        let providers = detection.matches.iter().map(|m| m.provider).collect();

        tracing::trace!(
            path = %source.rel_path,
            matches = detection.matches.len(),
            edits = file_plan.plan.len(),
            "analyzed"
        );

        Ok(FileAnalysis {
            matches: detection.matches,
            warnings,
            plan: file_plan.plan,
            providers,
            env_usages,
            source,
        })
    }

    /// Load a file from disk and analyze it.
    pub fn analyze_path(
        &self,
        path: &std::path::Path,
        rel_path: &str,
        language: Language,
        mode: PlanMode,
    ) -> Result<FileAnalysis, FileError> {
        let source = SourceFile::load(path, rel_path, language).map_err(|e| match e {
            LoadError::Io(err) => FileError::io(path, err),
            LoadError::Parse(err) => FileError::Parse(err),
        })?;
        self.analyze_source(source, mode)
    }

    /// Analyze every discovered file in parallel. Output order matches input.
    pub fn analyze_files(
        &self,
        files: &[DiscoveredFile],
        mode: PlanMode,
    ) -> Vec<(String, Result<FileAnalysis, FileError>)> {
        let run = || {
            files
                .par_iter()
                .map(|file| {
                    let result = self.analyze_path(&file.path, &file.rel_path, file.language, mode);
                    if let Err(err) = &result {
                        tracing::debug!(path = %file.rel_path, error = %err, "analysis failed");
                    }
                    (file.rel_path.clone(), result)
                })
                .collect::<Vec<_>>()
        };

        if self.threads == 0 {
            return run();
        }
        match rayon::ThreadPoolBuilder::new().num_threads(self.threads).build() {
            Ok(pool) => pool.install(run),
            Err(err) => {
                tracing::warn!(threads = self.threads, error = %err, "falling back to the global thread pool");
                run()
            }
        }
    }
}
