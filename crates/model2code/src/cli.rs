//! Command-line interface

use std::path::PathBuf;

use clap::Parser;
use model2code_skills::PipelineMode;

/// Compile a high-level ROS skill statechart into a canonical statechart and
/// the C++ sources of its skill component
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "model2code")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// High-level skill statechart (canonical statechart with --generate_mode)
    #[arg(long = "input_filename", value_name = "FILE")]
    pub input_filename: PathBuf,

    /// Output directory [default: two levels above the input file]
    #[arg(long = "output_path", value_name = "DIR")]
    pub output_path: Option<PathBuf>,

    /// Component model XML
    #[arg(long = "model_filename", value_name = "FILE")]
    pub model_filename: Option<PathBuf>,

    /// Interface model XML
    #[arg(long = "interface_filename", value_name = "FILE")]
    pub interface_filename: Option<PathBuf>,

    /// Root of the interface definitions (`<package>/srv/<Name>.srv`, ...)
    #[arg(long = "interface_path", value_name = "DIR", env = "MODEL2CODE_INTERFACE_PATH")]
    pub interface_path: Option<PathBuf>,

    /// Template directory [default: ./templates/skills/template_skill/]
    #[arg(long = "template_path", value_name = "DIR", env = "MODEL2CODE_TEMPLATE_PATH")]
    pub template_path: Option<PathBuf>,

    /// Also generate the data-model sources
    #[arg(long = "datamodel_mode")]
    pub datamodel_mode: bool,

    /// Only write the canonical statechart
    #[arg(long = "translate_mode")]
    pub translate_mode: bool,

    /// Only generate sources, reading the input as a canonical statechart
    #[arg(long = "generate_mode")]
    pub generate_mode: bool,

    /// Print the run log to stdout
    #[arg(long = "verbose_mode")]
    pub verbose_mode: bool,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse the process arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Stages selected by the mode switches
    #[must_use]
    pub fn mode(&self) -> PipelineMode {
        PipelineMode::from_flags(self.translate_mode, self.generate_mode)
    }
}
