#![deny(unsafe_code)]

//! # model2code
//!
//! Command-line front end of the skill compiler. Flags and an optional TOML
//! file resolve into [`Settings`], which configure a
//! [`model2code_skills::Pipeline`].
//!
//! ```text
//! model2code --input_filename skills/nav_skill/src/NavSkill.scxml \
//!            --interface_path interfaces --datamodel_mode
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod config;
pub mod log;

pub use cli::Cli;
pub use config::{FileConfig, Settings};
pub use log::LogBuffer;

use anyhow::Context;
use model2code_skills::PipelineReport;
use tracing::{info, warn};

/// Run the compiler with resolved settings
pub fn run(settings: &Settings) -> anyhow::Result<PipelineReport> {
    let pipeline = settings
        .pipeline_builder()
        .build()
        .context("Invalid pipeline configuration")?;
    let output_dir = pipeline.output_dir().to_path_buf();

    let report = pipeline
        .run()
        .with_context(|| format!("Failed to compile {}", settings.input.display()))?;

    if let Some(path) = &report.canonical_path {
        info!(path = %path.display(), "wrote canonical statechart");
    }
    for path in &report.written {
        info!(path = %path.display(), "wrote artifact");
    }
    if !report.is_success() {
        warn!(
            unclassified = report.registration.unclassified.len(),
            "some events have no interface declaration"
        );
    }
    info!(
        output = %output_dir.display(),
        files = report.total(),
        state = %report.state,
        "done"
    );
    Ok(report)
}
