//! Configuration file handling
//!
//! Settings are read from `hourbook.toml`. Every field has a default, so a
//! missing file or a missing section behaves like an empty one:
//!
//! ```toml
//! [report]
//! granularity = "month"
//! first_year = 2008
//! group_by = "group"
//!
//! [render]
//! format = "text"
//! precision = 2
//! show_users = true
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use hourbook_core::{GroupByKey, Granularity, SectionRule, SingleSection};
use hourbook_report::DEFAULT_FIRST_YEAR;
use serde::{Deserialize, Serialize};

/// File looked for in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "hourbook.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the explicit config file, or `hourbook.toml` in `dir` if present
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let default = dir.join(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            Self::from_file(&default)
        } else {
            Ok(Self::default())
        }
    }
}

/// `[report]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub granularity: Granularity,

    /// Start year of the default range when the dataset is empty
    #[serde(default = "default_first_year")]
    pub first_year: i32,

    #[serde(default)]
    pub group_by: GroupBy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            first_year: default_first_year(),
            group_by: GroupBy::default(),
        }
    }
}

fn default_first_year() -> i32 {
    DEFAULT_FIRST_YEAR
}

/// `[render]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Decimal places for hour figures
    #[serde(default = "default_precision")]
    pub precision: usize,

    #[serde(default = "default_show_users")]
    pub show_users: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            precision: default_precision(),
            show_users: default_show_users(),
        }
    }
}

fn default_precision() -> usize {
    2
}

fn default_show_users() -> bool {
    true
}

/// How rows are split into sections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    /// A new section whenever the task group changes
    #[default]
    Group,
    /// One section for the whole report
    #[serde(rename = "none")]
    #[value(name = "none")]
    Ungrouped,
}

impl GroupBy {
    pub fn rule(self) -> &'static dyn SectionRule {
        match self {
            GroupBy::Group => &GroupByKey,
            GroupBy::Ungrouped => &SingleSection,
        }
    }
}

/// Output format of the `report` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Xlsx,
}
