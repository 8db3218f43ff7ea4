//! Configuration management
//!
//! Settings come from three layers: command-line flags override the optional
//! TOML file, which overrides the built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use model2code_skills::pipeline::DEFAULT_TEMPLATE_DIR;
use model2code_skills::{Pipeline, PipelineBuilder, PipelineMode};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Contents of a TOML configuration file
///
/// ```toml
/// template_path = "templates/skills/template_skill"
/// interface_path = "interfaces"
/// datamodel_mode = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Template directory
    pub template_path: Option<PathBuf>,
    /// Output directory
    pub output_path: Option<PathBuf>,
    /// Root of the interface definitions
    pub interface_path: Option<PathBuf>,
    /// Generate the data-model sources
    pub datamodel_mode: Option<bool>,
    /// Print the run log
    pub verbose_mode: Option<bool>,
}

impl FileConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse configuration text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Fully resolved run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Input statechart
    pub input: PathBuf,
    /// Output directory; derived from the input when absent
    pub output_path: Option<PathBuf>,
    /// Template directory
    pub template_path: PathBuf,
    /// Root of the interface definitions
    pub interface_path: Option<PathBuf>,
    /// Interface model XML
    pub interface_model: Option<PathBuf>,
    /// Component model XML
    pub component_model: Option<PathBuf>,
    /// Stages to run
    pub mode: PipelineMode,
    /// Generate the data-model sources
    pub data_model: bool,
    /// Print the run log
    pub verbose: bool,
}

impl Settings {
    /// Load the file named by `--config` (if any) and merge it under the flags
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    /// Merge flags over file values over defaults
    #[must_use]
    pub fn merge(cli: Cli, file: FileConfig) -> Self {
        let mode = cli.mode();
        Self {
            input: cli.input_filename,
            output_path: cli.output_path.or(file.output_path),
            template_path: cli
                .template_path
                .or(file.template_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR)),
            interface_path: cli.interface_path.or(file.interface_path),
            interface_model: cli.interface_filename,
            component_model: cli.model_filename,
            mode,
            data_model: cli.datamodel_mode || file.datamodel_mode.unwrap_or(false),
            verbose: cli.verbose_mode || file.verbose_mode.unwrap_or(false),
        }
    }

    /// Pipeline builder carrying these settings
    #[must_use]
    pub fn pipeline_builder(&self) -> PipelineBuilder {
        let mut builder = Pipeline::builder()
            .input(&self.input)
            .template_dir(&self.template_path)
            .mode(self.mode)
            .data_model(self.data_model);
        if let Some(dir) = &self.output_path {
            builder = builder.output_dir(dir);
        }
        if let Some(dir) = &self.interface_path {
            builder = builder.interface_dir(dir);
        }
        if let Some(path) = &self.interface_model {
            builder = builder.interface_model(path);
        }
        if let Some(path) = &self.component_model {
            builder = builder.component_model(path);
        }
        builder
    }
}
