//! Two-phase build pipeline.
//!
//! # Phases
//!
//! ```text
//! first pass (per file, breadth-first)
//!   plain asset ─────────────────────────────> copy
//!   template, no groups ─────────────────────> copy original bytes
//!   template, groups ──> write rewritten markup
//!                        └─ per group: resolve action
//!                             minify | concat | delete ──> write key
//!                             transform ─────────────────> stage
//! deferred pass (once, only when something was staged)
//!   external transform (staging in -> staging out)
//!   per staged key: minify transformed file ──> write key
//! ```
//!
//! Group-local failures (no action, transform step disabled, conflicting
//! key, minifier rejection) skip the group and land in the [`BuildReport`];
//! parse and I/O failures abort the build.

mod action;
mod error;
mod external;
mod staging;


pub use action::{Action, ActionPolicy, RulePolicy};
pub use error::{PipelineError, Result};
pub use external::{TransformOutcome, TransformRunner};
pub use staging::{StagedSource, StagingSet};

use crate::asset::{Asset, Concatenator, Minifier, OutputWriter, PlainAsset};
use crate::config::{OnFailure, PipelineConfig};
use crate::logger::ProgressLine;
use crate::template::{ScriptGroup, Template, Traversal, Visitor};
use crate::utils::path::relative_display;
use crate::utils::plural_count;
use crate::{debug, log};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Report
// ============================================================================

/// A group that was skipped.
#[derive(Debug, Clone, Serialize)]
pub struct GroupFailure {
    /// Template that declared the group, or the staged source in the
    /// deferred pass.
    pub origin: PathBuf,
    pub key: String,
    pub message: String,
}

/// What one build did.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildReport {
    pub assets: usize,
    pub templates_copied: usize,
    pub templates_rewritten: usize,
    pub minified: usize,
    pub concatenated: usize,
    pub deleted: usize,
    pub staged: usize,
    pub transformed: usize,
    pub failures: Vec<GroupFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, action: Action) {
        match action {
            Action::Minify => self.minified += 1,
            Action::Concatenate => self.concatenated += 1,
            Action::Delete => self.deleted += 1,
            Action::Transform => self.staged += 1,
        }
    }

    /// One-line summary for the final log line.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            plural_count(self.assets, "asset"),
            format!(
                "{} rewritten, {} copied",
                plural_count(self.templates_rewritten, "template"),
                self.templates_copied
            ),
        ];
        for (count, label) in [
            (self.minified, "minified"),
            (self.concatenated, "concatenated"),
            (self.deleted, "deleted"),
            (self.transformed, "transformed"),
        ] {
            if count > 0 {
                parts.push(format!("{count} {label}"));
            }
        }
        if !self.failures.is_empty() {
            parts.push(plural_count(self.failures.len(), "failed group"));
        }
        parts.join(", ")
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Drives both passes over one source tree.
pub struct Orchestrator<'a, P: ActionPolicy = RulePolicy> {
    config: &'a PipelineConfig,
    policy: P,
    writer: OutputWriter,
    concat: Concatenator,
    minifier: Minifier,
    staging: StagingSet,
    /// Sources each key was produced from, to catch cross-template clashes.
    produced: FxHashMap<String, Vec<String>>,
    progress: Option<ProgressLine>,
    report: BuildReport,
}

impl<'a> Orchestrator<'a, RulePolicy> {
    /// Orchestrator using the configured `[build.actions]` policy.
    pub fn new(config: &'a PipelineConfig) -> Result<Self> {
        let policy = RulePolicy::from_config(config.build.actions.as_ref())
            .map_err(|err| PipelineError::config("build.actions", err.to_string()))?;
        Ok(Self::with_policy(config, policy))
    }
}

impl<'a, P: ActionPolicy> Orchestrator<'a, P> {
    pub fn with_policy(config: &'a PipelineConfig, policy: P) -> Self {
        let build = &config.build;
        Self {
            config,
            policy,
            writer: OutputWriter::new(&build.source, &build.output),
            concat: Concatenator::new(&build.source, build.separator.as_str()),
            minifier: Minifier::new(&build.source, build.processor),
            staging: StagingSet::new(&config.transform.source, &config.transform.output),
            produced: FxHashMap::default(),
            progress: None,
            report: BuildReport::default(),
        }
    }

    /// Run the first pass and, if needed, the deferred pass.
    pub fn run(mut self) -> Result<BuildReport> {
        let config = self.config;
        if config.transform.enable {
            self.staging.reset()?;
        }

        let traversal = Traversal::new(&config.build)
            .exclude(&config.build.output)
            .exclude(&config.transform.source)
            .exclude(&config.transform.output);
        let files = traversal.files()?;

        if !crate::logger::is_quiet() {
            let templates = files.iter().filter(|p| traversal.is_template(p)).count();
            self.progress = Some(ProgressLine::new(&[
                ("templates", templates),
                ("assets", files.len() - templates),
            ]));
        }

        traversal.walk_files(&files, &mut self)?;
        if let Some(progress) = self.progress.take() {
            progress.finish();
        }

        self.deferred_pass()?;
        Ok(self.report)
    }

    fn tick(&self, counter: &str) {
        if let Some(progress) = &self.progress {
            progress.inc(counter);
        }
    }

    fn display(&self, path: &Path) -> String {
        relative_display(path, &self.config.build.source)
    }

    // ------------------------------------------------------------------------
    // first pass
    // ------------------------------------------------------------------------

    /// Run one group, turning group-local errors into report entries.
    fn process_group(&mut self, template: &Path, group: &ScriptGroup) -> Result<()> {
        match self.run_group(group) {
            Ok(()) => Ok(()),
            Err(err) if err.is_group_local() => {
                self.fail(template, &group.key, &err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn fail(&mut self, origin: &Path, key: &str, err: &PipelineError) {
        log!("error"; "{}: {}", self.display(origin), err);
        self.report.failures.push(GroupFailure {
            origin: origin.to_path_buf(),
            key: key.to_owned(),
            message: err.to_string(),
        });
    }

    fn run_group(&mut self, group: &ScriptGroup) -> Result<()> {
        let ScriptGroup { key, sources } = group;
        let action = self.policy.resolve(key)?;

        if action != Action::Transform && self.already_produced(key, sources)? {
            debug!(action.as_str(); "{} already produced", key);
            return Ok(());
        }

        let dest = self.writer.map_key(key)?;
        match action {
            Action::Concatenate => {
                let bytes = self.concat.concat(sources)?;
                self.writer.write(&dest, &bytes)?;
            }
            Action::Minify => {
                let bytes = self.minifier.minify(sources)?;
                self.writer.write(&dest, &bytes)?;
            }
            Action::Delete => self.writer.write(&dest, &[])?,
            Action::Transform => {
                if !self.config.transform.is_available() {
                    return Err(PipelineError::config(key, "the transform step is disabled"));
                }
                if sources.len() > 1 {
                    log!("warning"; "`{}` has {} sources, only `{}` is transformed", key, sources.len(), sources[0]);
                }
                let staged = self
                    .staging
                    .stage(&self.config.build.source, key, &sources[0])?;
                debug!("stage"; "{} -> {}", sources[0], staged.staged.display());
            }
        }

        debug!(action.as_str(); "{} <- {}", key, sources.join(", "));
        self.report.record(action);
        Ok(())
    }

    /// Whether `key` was already written from the same sources. A key
    /// reused with different sources is rejected.
    fn already_produced(&mut self, key: &str, sources: &[String]) -> Result<bool> {
        match self.produced.get(key) {
            Some(previous) if previous.as_slice() == sources => Ok(true),
            Some(_) => Err(PipelineError::config(
                key,
                "already produced from different sources in another template",
            )),
            None => {
                self.produced.insert(key.to_owned(), sources.to_vec());
                Ok(false)
            }
        }
    }

    // ------------------------------------------------------------------------
    // deferred pass
    // ------------------------------------------------------------------------

    fn deferred_pass(&mut self) -> Result<()> {
        if self.staging.is_empty() {
            return Ok(());
        }

        let config = self.config;
        log!("transform"; "{} staged", plural_count(self.staging.len(), "source"));

        let runner = TransformRunner::new(&config.transform, &config.root);
        match runner
            .run(self.staging.input(), self.staging.output())
            .and_then(TransformOutcome::into_result)
        {
            Ok(outcome) => {
                let output = outcome.output.trim();
                if !output.is_empty() {
                    debug!("transform"; "{}", output);
                }
            }
            Err(err) => match config.transform.on_failure {
                OnFailure::Fail => return Err(err),
                OnFailure::Warn => {
                    log!("warning"; "{}", err);
                    if let PipelineError::ExternalProcess { output, .. } = &err
                        && !output.trim().is_empty()
                    {
                        log!("warning"; "{}", output.trim());
                    }
                }
            },
        }

        let entries: Vec<StagedSource> = self.staging.iter().cloned().collect();
        for entry in &entries {
            if let Err(err) = self.finish_staged(entry) {
                if !err.is_group_local() {
                    return Err(err);
                }
                self.fail(&entry.staged, &entry.key, &err);
            }
        }
        Ok(())
    }

    fn finish_staged(&mut self, entry: &StagedSource) -> Result<()> {
        let transformed = self.staging.transformed(entry);
        if !transformed.is_file() {
            return Err(PipelineError::Transform {
                path: transformed,
                message: "the external transform produced no output".into(),
            });
        }

        let bytes = self.minifier.minify_paths(&[transformed])?;
        self.writer.write(&self.writer.map_key(&entry.key)?, &bytes)?;
        debug!("minify"; "{} <- {} (transformed)", entry.key, entry.source);
        self.report.transformed += 1;
        Ok(())
    }
}

impl<P: ActionPolicy> Visitor for Orchestrator<'_, P> {
    fn on_asset(&mut self, asset: &mut PlainAsset) -> Result<()> {
        self.writer.copy(asset.path())?;
        debug!("copy"; "{}", self.display(asset.path()));
        self.report.assets += 1;
        self.tick("assets");
        Ok(())
    }

    fn on_template(&mut self, template: &mut Template) -> Result<()> {
        let groups = template.scripts()?.clone();
        let path = template.path().to_path_buf();

        if groups.is_empty() {
            self.writer.copy(&path)?;
            debug!("copy"; "{}", self.display(&path));
            self.report.templates_copied += 1;
        } else {
            let dest = self.writer.map(&path)?;
            self.writer.write(&dest, &template.stream()?)?;
            debug!("template"; "{} ({})", self.display(&path), plural_count(groups.len(), "group"));
            self.report.templates_rewritten += 1;

            for group in &groups {
                self.process_group(&path, group)?;
            }
        }

        self.tick("templates");
        Ok(())
    }
}

/// Build with the configured action policy.
pub fn build(config: &PipelineConfig) -> Result<BuildReport> {
    Orchestrator::new(config)?.run()
}
