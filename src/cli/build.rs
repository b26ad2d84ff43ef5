//! `build` command.
//!
//! Cleans the output tree when asked, runs both pipeline passes, and logs
//! the outcome. Group failures do not abort; the caller decides the exit
//! status from the returned report.

use crate::config::PipelineConfig;
use crate::pipeline::{self, BuildReport};
use crate::utils::path::relative_display;
use crate::{debug, log};
use anyhow::{Context, Result};
use std::fs;

/// Build every template of the source tree into the output tree.
pub fn build_templates(config: &PipelineConfig) -> Result<BuildReport> {
    let output = &config.build.output;
    if config.build.clean && output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("failed to clean output directory `{}`", output.display()))?;
        debug!("build"; "cleaned {}", output.display());
    }

    log!(
        "build";
        "{} -> {}",
        relative_display(&config.build.source, &config.root),
        relative_display(output, &config.root)
    );

    let report = pipeline::build(config)?;

    if report.is_success() {
        log!("build"; "done: {}", report.summary());
    } else {
        log!("error"; "finished with errors: {}", report.summary());
    }
    Ok(report)
}
