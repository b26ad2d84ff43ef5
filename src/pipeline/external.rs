//! External source-to-source transform over the staging directories.

use super::{PipelineError, Result};
use crate::config::TransformConfig;
use crate::utils::exec::Cmd;
use rustc_hash::FxHashMap;
use std::path::Path;

const SOURCE_VAR: &str = "SCRIPTMIN_SOURCE_DIR";
const OUTPUT_VAR: &str = "SCRIPTMIN_OUTPUT_DIR";
const ROOT_VAR: &str = "SCRIPTMIN_ROOT";

/// Exit status and merged stdout/stderr of one run.
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub program: String,
    pub code: Option<i32>,
    pub output: String,
}

impl TransformOutcome {
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// `Err` for a non-zero (or signal) exit.
    pub fn into_result(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let status = match self.code {
            Some(code) => format!("exited with status {code}"),
            None => "was terminated by a signal".to_owned(),
        };
        Err(PipelineError::ExternalProcess {
            program: self.program,
            status,
            output: self.output,
        })
    }
}

pub struct TransformRunner<'a> {
    config: &'a TransformConfig,
    root: &'a Path,
}

impl<'a> TransformRunner<'a> {
    pub const fn new(config: &'a TransformConfig, root: &'a Path) -> Self {
        Self { config, root }
    }

    /// `$SCRIPTMIN_*` values for a run over `input` → `output`.
    fn vars(&self, input: &Path, output: &Path) -> FxHashMap<String, String> {
        let mut vars = FxHashMap::default();
        vars.insert(SOURCE_VAR.into(), input.display().to_string());
        vars.insert(OUTPUT_VAR.into(), output.display().to_string());
        vars.insert(ROOT_VAR.into(), self.root.display().to_string());
        vars
    }

    /// Full command line. Staging directories are appended unless the
    /// configured command already mentions them.
    pub fn command(&self, input: &Path, output: &Path) -> Vec<String> {
        let vars = self.vars(input, output);
        let mentions_staging = self
            .config
            .command
            .iter()
            .any(|arg| arg.contains(&format!("${SOURCE_VAR}")) || arg.contains(&format!("${OUTPUT_VAR}")));

        let mut args = resolve_args(&self.config.command, &vars);
        if !mentions_staging {
            args.push(input.display().to_string());
            args.push(output.display().to_string());
        }
        args
    }

    /// Run the transform and wait for it. A non-zero exit is reported in
    /// the outcome; only a failure to start is an error.
    pub fn run(&self, input: &Path, output: &Path) -> Result<TransformOutcome> {
        let args = self.command(input, output);
        let Some(program) = args.first().cloned() else {
            return Err(PipelineError::ExternalProcess {
                program: String::new(),
                status: "is not configured".into(),
                output: String::new(),
            });
        };

        if which::which(&program).is_err() {
            return Err(PipelineError::ExternalProcess {
                program,
                status: "was not found in PATH".into(),
                output: String::new(),
            });
        }

        crate::log!("transform"; "running `{}`", args.join(" "));
        let result = Cmd::from_slice(&args)
            .cwd(&self.config.workdir)
            .envs(&self.vars(input, output))
            .pty(self.config.pty)
            .run();

        match result {
            Ok(out) => Ok(TransformOutcome {
                program,
                code: out.code,
                output: out.output,
            }),
            Err(err) => Err(PipelineError::ExternalProcess {
                program,
                status: "could not be started".into(),
                output: format!("{err:#}"),
            }),
        }
    }
}

/// Replace `$VAR` occurrences with their values.
fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for (key, value) in vars {
                result = result.replace(&format!("${key}"), value);
            }
            result
        })
        .collect()
}
