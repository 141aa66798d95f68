use std::path::PathBuf;

use clap::Parser;

use crate::config::{HeadingPolicy, IdStrategy, MigrateConfig};

/// logseq-roam - Migrate a Logseq graph into an org-roam directory
///
/// # Quick Reference
///
/// ```bash
/// logseq-roam ~/logseq ~/org-roam              # Convert pages, journals, assets
/// logseq-roam ~/logseq ~/org-roam --dry-run    # Report only, write nothing
/// logseq-roam ~/logseq ~/org-roam --json       # Summary as JSON
/// logseq-roam ~/logseq ~/org-roam -v           # Per-note debug logging
/// ```
///
/// ## Layout
///
/// - `pages/foo.md`          -> `pages/foo.org`
/// - `pages/proj___design.md` -> `pages/proj___design.org` (title "proj/design")
/// - `journals/2024_03_05.md` -> `journals/2024-03-05.org`
/// - `assets/*`              -> `assets/*`
///
/// Pages that are linked but do not exist are written as placeholder
/// pages tagged `:stub:`, so every `[[id:...]]` link has a target.
///
/// ## Headings
///
/// ```bash
/// logseq-roam IN OUT --headings addressable    # Default: referenced blocks, tasks
///                                              # and blocks with properties
/// logseq-roam IN OUT --headings every          # Every block is a heading
/// ```
///
/// ## Identifiers
///
/// ```bash
/// logseq-roam IN OUT --ids random              # Default: uuid v4
/// logseq-roam IN OUT --ids hashed              # Reproducible across runs
/// ```
///
/// ## Environment Variables
///
/// - `LOGSEQ_ROAM_HEADINGS`: default for --headings
/// - `LOGSEQ_ROAM_IDS`: default for --ids
/// - `LOGSEQ_ROAM_EXCERPT`: default for --excerpt
/// - `LOGSEQ_ROAM_TASK_KEYWORDS`: comma separated extra task keywords
/// - `RUST_LOG`: log filter, overrides -v / -q
///
#[derive(Parser, Debug)]
#[command(name = "logseq-roam")]
#[command(version = "0.1.0")]
#[command(about = "Migrate a Logseq graph into an org-roam directory")]
pub struct Cli {
    /// Logseq graph directory (contains pages/ and journals/)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output org-roam directory
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the summary as JSON
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Convert and report without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Do not copy the assets directory
    #[arg(long)]
    pub no_assets: bool,

    /// Which blocks become headings: addressable | every
    #[arg(long, value_name = "POLICY")]
    pub headings: Option<HeadingPolicy>,

    /// Identifier generation: random | hashed
    #[arg(long, value_name = "STRATEGY")]
    pub ids: Option<IdStrategy>,

    /// Maximum characters of block excerpts used as link text
    #[arg(long, value_name = "N")]
    pub excerpt: Option<usize>,

    /// Extra task keyword passed through unchanged (repeatable)
    #[arg(long = "task-keyword", value_name = "KEYWORD")]
    pub task_keywords: Vec<String>,
}

impl Cli {
    /// Configuration from flags layered over the environment
    pub fn config(&self) -> MigrateConfig {
        let mut config = MigrateConfig::from_env();
        if let Some(policy) = self.headings {
            config.heading_policy = policy;
        }
        if let Some(strategy) = self.ids {
            config.id_strategy = strategy;
        }
        if let Some(len) = self.excerpt.filter(|len| *len > 0) {
            config.excerpt_len = len;
        }
        for keyword in &self.task_keywords {
            if !config.extra_task_keywords.contains(keyword) {
                config.extra_task_keywords.push(keyword.clone());
            }
        }
        config
    }

    /// Log level implied by -v / -q
    pub fn log_level(&self) -> log::LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => log::LevelFilter::Error,
            (false, 0) => log::LevelFilter::Warn,
            (false, 1) => log::LevelFilter::Debug,
            (false, _) => log::LevelFilter::Trace,
        }
    }
}
