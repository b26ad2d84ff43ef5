//! `scan` command.
//!
//! Parses every template and lists its script groups with the action the
//! configured policy picks for each key. Nothing is written.

use crate::asset::Asset;
use crate::cli::args::ScanArgs;
use crate::config::PipelineConfig;
use crate::log;
use crate::pipeline::{Action, ActionPolicy, Result as PipelineResult, RulePolicy};
use crate::template::{Template, Traversal, Visitor};
use crate::utils::path::relative_display;
use crate::utils::plural_count;
use anyhow::{Context, Result};
use crate::logger::styled;
use owo_colors::{Stream, Style};
use serde::Serialize;
use std::path::Path;

/// One group of a scanned template.
#[derive(Debug, Serialize)]
pub struct GroupEntry {
    pub key: String,
    /// Resolved action, absent when the policy has no answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sources: Vec<String>,
}

/// A template with at least one group.
#[derive(Debug, Serialize)]
pub struct TemplateEntry {
    /// Path relative to the source directory.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub groups: Vec<GroupEntry>,
}

struct Collector<'a, P: ActionPolicy> {
    policy: &'a P,
    source: &'a Path,
    entries: Vec<TemplateEntry>,
}

impl<P: ActionPolicy> Visitor for Collector<'_, P> {
    fn on_template(&mut self, template: &mut Template) -> PipelineResult<()> {
        let groups = template
            .scripts()?
            .iter()
            .map(|group| {
                let (action, error) = match self.policy.resolve(&group.key) {
                    Ok(action) => (Some(action), None),
                    Err(err) => (None, Some(err.to_string())),
                };
                GroupEntry {
                    key: group.key.clone(),
                    action,
                    error,
                    sources: group.sources.clone(),
                }
            })
            .collect::<Vec<_>>();

        if !groups.is_empty() {
            self.entries.push(TemplateEntry {
                path: relative_display(template.path(), self.source),
                url: template.url().map(String::from),
                groups,
            });
        }
        Ok(())
    }
}

/// Templates with groups, in traversal order.
pub fn collect_groups(config: &PipelineConfig) -> Result<Vec<TemplateEntry>> {
    let policy = RulePolicy::from_config(config.build.actions.as_ref())
        .context("invalid pattern in `[build.actions]`")?;

    let mut collector = Collector {
        policy: &policy,
        source: &config.build.source,
        entries: Vec::new(),
    };
    let stats = Traversal::new(&config.build)
        .exclude(&config.build.output)
        .exclude(&config.transform.source)
        .exclude(&config.transform.output)
        .walk(&mut collector)?;

    let groups: usize = collector.entries.iter().map(|e| e.groups.len()).sum();
    log!(
        "scan";
        "{} in {} of {}",
        plural_count(groups, "group"),
        plural_count(collector.entries.len(), "template"),
        stats.templates
    );
    Ok(collector.entries)
}

/// Execute the scan command.
pub fn run_scan(args: &ScanArgs, config: &PipelineConfig) -> Result<()> {
    let entries = collect_groups(config)?;

    if args.json {
        let formatted = if args.pretty {
            serde_json::to_string_pretty(&entries)?
        } else {
            serde_json::to_string(&entries)?
        };
        println!("{}", formatted);
    } else {
        print!("{}", format_listing(&entries));
    }
    Ok(())
}

fn format_listing(entries: &[TemplateEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{}\n", styled(Stream::Stdout, &entry.path, Style::new().bold())));
        for group in &entry.groups {
            let label = match (&group.action, &group.error) {
                (Some(action), _) => styled(Stream::Stdout, action, Style::new().green()),
                (None, Some(error)) => styled(Stream::Stdout, error, Style::new().red()),
                (None, None) => String::new(),
            };
            out.push_str(&format!("  {} [{}]\n", group.key, label));
            for source in &group.sources {
                out.push_str(&format!("    {}\n", styled(Stream::Stdout, source, Style::new().dimmed())));
            }
        }
    }
    out
}
