//! Run configuration.
//!
//! Every setting has a built-in default. A TOML file can override any of
//! them, and command-line flags override the file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::merge::MergeConfig;
use crate::partition::MissingYearPolicy;
use crate::render::RenderConfig;
use crate::writer::EntryOrder;

/// Configuration file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "bib2md.toml";

/// Errors that can occur when loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// How rendered output is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// One bibliography and one Markdown file per year, joined into the output.
    #[default]
    ByYear,
    /// One normalized bibliography rendered straight to the output.
    Single,
}

/// Everything a run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input files; empty means every regular file in `bib_root`.
    pub inputs: Vec<PathBuf>,
    pub bib_root: PathBuf,
    pub build_root: PathBuf,
    /// File name of the final Markdown inside the build directory.
    pub output: String,
    pub layout: Layout,
    pub missing_year: MissingYearPolicy,
    pub entry_order: EntryOrder,
    pub merge: MergeConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            inputs: Vec::new(),
            bib_root: PathBuf::from("bib"),
            build_root: PathBuf::from("build"),
            output: "publications.md".to_string(),
            layout: Layout::default(),
            missing_year: MissingYearPolicy::default(),
            entry_order: EntryOrder::default(),
            merge: MergeConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text; `origin` names it in errors.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads the configuration file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Loads `explicit` if given, else [`DEFAULT_CONFIG_FILE`] from the
    /// working directory if it exists, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
