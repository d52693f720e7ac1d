use clap::{Parser, ValueEnum};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::compiler::OutputStyle;

#[derive(Parser)]
#[command(name = "sasspipe")]
#[command(about = "Compile SCSS/Sass files with source-map reconciliation")]
pub struct Cli {
    /// Path to config file (sasspipe.json or sasspipe.jsonc)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Input files or glob patterns
    #[arg(short, long)]
    pub entry: Vec<String>,

    /// Output directory [default: dist]
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Working directory
    #[arg(short = 'C', long, default_value = ".")]
    pub cwd: PathBuf,

    /// Use the legacy compiler API
    #[arg(long, default_value = "false")]
    pub legacy: bool,

    /// Generate source maps alongside the CSS output
    #[arg(long, default_value = "false")]
    pub source_map: bool,

    /// Output style
    #[arg(long, default_value = "expanded")]
    pub style: StyleArg,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum StyleArg {
    #[default]
    Expanded,
    Compressed,
}

impl From<StyleArg> for OutputStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Expanded => OutputStyle::Expanded,
            StyleArg::Compressed => OutputStyle::Compressed,
        }
    }
}

/// Config file structure for sasspipe.json / sasspipe.jsonc
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub entry: Vec<String>,

    #[serde(default)]
    pub out: Option<PathBuf>,

    #[serde(default)]
    pub source_map: bool,
}

/// Merge the output directory: CLI args override file config, and the
/// default applies only when neither names one
pub fn resolve_out_dir(cli_out: Option<PathBuf>, config_out: Option<PathBuf>) -> PathBuf {
    cli_out.or(config_out).unwrap_or_else(|| PathBuf::from("dist"))
}

/// Expand brace patterns like `**/*.{scss,sass}` into multiple patterns
fn expand_brace_pattern(pattern: &str) -> Vec<String> {
    if let Some(start) = pattern.find('{') {
        if let Some(end) = pattern[start..].find('}') {
            let end = start + end;
            let prefix = &pattern[..start];
            let suffix = &pattern[end + 1..];
            let alternatives = &pattern[start + 1..end];

            return alternatives
                .split(',')
                .flat_map(|alt| {
                    let expanded = format!("{prefix}{alt}{suffix}");
                    expand_brace_pattern(&expanded)
                })
                .collect();
        }
    }
    vec![pattern.to_string()]
}

fn compile_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        for expanded in expand_brace_pattern(pattern) {
            if let Ok(glob) = Glob::new(&expanded) {
                builder.add(glob);
            }
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Walk `cwd` and collect the files matching the entry patterns, sorted for
/// stable processing order
pub fn collect_entries(cwd: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let matcher = compile_globset(patterns);
    let mut entries = Vec::new();

    for result in WalkBuilder::new(cwd).hidden(false).build() {
        let Ok(entry) = result else { continue };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(cwd).unwrap_or(path);
        if matcher.is_match(relative) {
            entries.push(path.to_path_buf());
        }
    }

    entries.sort();
    entries
}
