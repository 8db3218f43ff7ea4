//! End-to-end skill compilation
//!
//! A pipeline run moves through `Start → Canonicalized → Classified →
//! Synthesized → Written`. Each step checks the state it needs, so steps can
//! be driven one at a time (tests, tools) or all at once with [`Pipeline::run`].

use std::fmt;
use std::path::{Path, PathBuf};

use model2code_core::Document;
use tracing::{info, warn};

use crate::canonicalizer::canonicalize;
use crate::classifier::Classifier;
use crate::error::{Result, SkillError};
use crate::event::collect_events;
use crate::interface::InterfaceLibrary;
use crate::model::{ComponentModel, InterfaceModel};
use crate::naming::SkillNames;
use crate::registry::{EventRegistry, RegistrationReport};
use crate::synthesizer::{Artifacts, Synthesizer, TemplateSet};

/// Default template directory, relative to the working directory
pub const DEFAULT_TEMPLATE_DIR: &str = "./templates/skills/template_skill/";

/// Progress of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    /// Nothing done yet
    Start,
    /// Canonical statechart available
    Canonicalized,
    /// Events registered and classified
    Classified,
    /// Artifacts rendered in memory
    Synthesized,
    /// Artifacts written to disk
    Written,
}

impl PipelineState {
    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Canonicalized => "canonicalized",
            Self::Classified => "classified",
            Self::Synthesized => "synthesized",
            Self::Written => "written",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stages a run performs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineMode {
    /// Canonicalize, then generate from the canonical statechart
    #[default]
    Full,
    /// Only write the canonical statechart
    TranslateOnly,
    /// Treat the input as an already canonical statechart and generate
    GenerateOnly,
}

impl PipelineMode {
    /// Mode from the translate / generate switches; neither means both
    #[must_use]
    pub fn from_flags(translate: bool, generate: bool) -> Self {
        match (translate, generate) {
            (true, false) => Self::TranslateOnly,
            (false, true) => Self::GenerateOnly,
            _ => Self::Full,
        }
    }

    /// Whether the canonicalizer runs
    #[must_use]
    pub fn translates(self) -> bool {
        !matches!(self, Self::GenerateOnly)
    }

    /// Whether sources are generated
    #[must_use]
    pub fn generates(self) -> bool {
        !matches!(self, Self::TranslateOnly)
    }
}

/// Skill compilation pipeline
#[derive(Debug)]
pub struct Pipeline {
    input: PathBuf,
    output_dir: PathBuf,
    template_dir: PathBuf,
    interface_dir: Option<PathBuf>,
    interface_model: Option<PathBuf>,
    component_model: Option<PathBuf>,
    mode: PipelineMode,
    data_model: bool,

    state: PipelineState,
    /// Document declarations are classified against
    declarations: Option<Document>,
    canonical: Option<Document>,
    canonical_path: Option<PathBuf>,
    registry: EventRegistry,
    registration: Option<RegistrationReport>,
    artifacts: Option<Artifacts>,
    written: Vec<PathBuf>,
}

impl Pipeline {
    /// Create a new pipeline builder
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Configured mode
    #[must_use]
    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Output directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Events registered so far
    #[must_use]
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Canonical statechart, once available
    #[must_use]
    pub fn canonical(&self) -> Option<&Document> {
        self.canonical.as_ref()
    }

    /// Rendered artifacts, once synthesized
    #[must_use]
    pub fn artifacts(&self) -> Option<&Artifacts> {
        self.artifacts.as_ref()
    }

    /// Produce the canonical statechart
    ///
    /// When translating, the input is canonicalized and written to
    /// `<output>/src/<ClassName>SM.scxml`. In generate-only mode the input is
    /// read as the canonical statechart and also serves for classification.
    ///
    /// # Errors
    ///
    /// Returns error if the input cannot be read or canonicalized, or the
    /// canonical statechart cannot be written.
    pub fn canonicalize(&mut self) -> Result<()> {
        self.expect_state("canonicalize", PipelineState::Start)?;
        let input = Document::from_file(&self.input)?;

        if self.mode.translates() {
            let canonical = canonicalize(&input)?;
            let path = canonical.write_in(self.output_dir.join("src"))?;
            self.canonical = Some(canonical.document);
            self.canonical_path = Some(path);
        } else {
            info!(input = %self.input.display(), "using input as canonical statechart");
            self.canonical = Some(input.clone());
        }
        self.declarations = Some(input);
        self.state = PipelineState::Canonicalized;
        Ok(())
    }

    /// Register and classify every event of the canonical statechart
    ///
    /// # Errors
    ///
    /// Returns error if a side-car definition or model file cannot be read, or
    /// a matched declaration lacks its paired element.
    pub fn classify(&mut self) -> Result<&RegistrationReport> {
        self.expect_state("classify", PipelineState::Canonicalized)?;
        let (Some(declarations), Some(canonical)) = (&self.declarations, &self.canonical) else {
            return Err(self.invalid_state("classify", PipelineState::Canonicalized));
        };

        let library = match &self.interface_dir {
            Some(dir) => InterfaceLibrary::scan(dir)?,
            None => InterfaceLibrary::empty(),
        };
        let interfaces = self
            .interface_model
            .as_ref()
            .map(InterfaceModel::from_file)
            .transpose()?;
        let components = self
            .component_model
            .as_ref()
            .map(ComponentModel::from_file)
            .transpose()?;

        let mut classifier = Classifier::new(declarations).with_library(&library);
        if let Some(model) = &interfaces {
            classifier = classifier.with_interface_model(model);
        }
        if let Some(model) = &components {
            classifier = classifier.with_component_model(model);
        }

        let report = self.registry.populate(collect_events(canonical), &classifier)?;
        if !report.is_fully_classified() {
            warn!(events = ?report.unclassified, "events without a matching declaration");
        }
        info!(
            registered = report.registered,
            duplicates = report.duplicates,
            reserved = report.reserved,
            "classified events"
        );
        self.state = PipelineState::Classified;
        Ok(self.registration.insert(report))
    }

    /// Render every artifact in memory
    ///
    /// # Errors
    ///
    /// Returns error if the canonical root name has no skill type or a
    /// template is missing.
    pub fn synthesize(&mut self) -> Result<&Artifacts> {
        self.expect_state("synthesize", PipelineState::Classified)?;
        let Some(canonical) = &self.canonical else {
            return Err(self.invalid_state("synthesize", PipelineState::Classified));
        };

        let root_name = canonical
            .attribute(canonical.root(), "name")
            .ok_or(SkillError::MissingRootName)?;
        let names = SkillNames::from_root_name(root_name)?;
        let templates = TemplateSet::load(&self.template_dir, self.data_model)?;
        let artifacts = Synthesizer::new(&templates)
            .with_data_model(self.data_model)
            .synthesize(&names, &self.registry);

        self.state = PipelineState::Synthesized;
        Ok(self.artifacts.insert(artifacts))
    }

    /// Write the rendered artifacts below the output directory
    ///
    /// # Errors
    ///
    /// Returns error if a file cannot be written. Files already written are
    /// left in place.
    pub fn write(&mut self) -> Result<&[PathBuf]> {
        self.expect_state("write", PipelineState::Synthesized)?;
        let Some(artifacts) = &self.artifacts else {
            return Err(self.invalid_state("write", PipelineState::Synthesized));
        };
        self.written = artifacts.write_to(&self.output_dir)?;
        self.state = PipelineState::Written;
        Ok(&self.written)
    }

    /// Run every step the mode calls for
    ///
    /// # Errors
    ///
    /// Returns the first step's error.
    pub fn run(mut self) -> Result<PipelineReport> {
        info!(input = %self.input.display(), mode = ?self.mode, "starting pipeline");
        self.canonicalize()?;
        if self.mode.generates() {
            self.classify()?;
            self.synthesize()?;
            self.write()?;
        }
        Ok(self.into_report())
    }

    /// Summary of what the run produced
    #[must_use]
    pub fn into_report(self) -> PipelineReport {
        PipelineReport {
            state: self.state,
            canonical_path: self.canonical_path,
            registration: self.registration.unwrap_or_default(),
            written: self.written,
        }
    }

    fn expect_state(&self, step: &'static str, expected: PipelineState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(step, expected))
        }
    }

    fn invalid_state(&self, step: &'static str, expected: PipelineState) -> SkillError {
        SkillError::InvalidState {
            step,
            expected: expected.to_string(),
            found: self.state.to_string(),
        }
    }
}

/// Report from a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// State the run ended in
    pub state: PipelineState,

    /// Canonical statechart written, if the run translated
    pub canonical_path: Option<PathBuf>,

    /// Event registration summary
    pub registration: RegistrationReport,

    /// Generated files
    pub written: Vec<PathBuf>,
}

impl PipelineReport {
    /// Check if every event the run saw was classified
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.registration.is_fully_classified()
    }

    /// Get total files written, canonical statechart included
    #[must_use]
    pub fn total(&self) -> usize {
        self.written.len() + usize::from(self.canonical_path.is_some())
    }
}

/// Builder for configuring a `Pipeline`
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    template_dir: Option<PathBuf>,
    interface_dir: Option<PathBuf>,
    interface_model: Option<PathBuf>,
    component_model: Option<PathBuf>,
    mode: PipelineMode,
    data_model: bool,
}

impl PipelineBuilder {
    /// High-level skill (or, in generate-only mode, canonical statechart)
    #[must_use]
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    /// Directory receiving `src/`, `include/` and the manifests
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Template directory
    #[must_use]
    pub fn template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    /// Root of the side-car interface definitions
    #[must_use]
    pub fn interface_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.interface_dir = Some(dir.into());
        self
    }

    /// Interface model XML
    #[must_use]
    pub fn interface_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.interface_model = Some(path.into());
        self
    }

    /// Component model XML
    #[must_use]
    pub fn component_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.component_model = Some(path.into());
        self
    }

    /// Stages to run
    #[must_use]
    pub fn mode(mut self, mode: PipelineMode) -> Self {
        self.mode = mode;
        self
    }

    /// Emit the data-model pair and keep `DATAMODEL` regions
    #[must_use]
    pub fn data_model(mut self, enabled: bool) -> Self {
        self.data_model = enabled;
        self
    }

    /// Build the pipeline
    ///
    /// Without an output directory, the directory two levels above the input
    /// is used.
    ///
    /// # Errors
    ///
    /// Returns error if no input was set or no output directory can be derived.
    pub fn build(self) -> Result<Pipeline> {
        let input = self
            .input
            .ok_or_else(|| SkillError::Other(anyhow::anyhow!("No input file configured")))?;
        let output_dir = match self.output_dir {
            Some(dir) => dir,
            None => default_output_dir(&input).ok_or_else(|| {
                SkillError::Other(anyhow::anyhow!(
                    "Cannot derive an output directory from '{}'",
                    input.display()
                ))
            })?,
        };

        Ok(Pipeline {
            input,
            output_dir,
            template_dir: self
                .template_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR)),
            interface_dir: self.interface_dir,
            interface_model: self.interface_model,
            component_model: self.component_model,
            mode: self.mode,
            data_model: self.data_model,
            state: PipelineState::Start,
            declarations: None,
            canonical: None,
            canonical_path: None,
            registry: EventRegistry::new(),
            registration: None,
            artifacts: None,
            written: Vec::new(),
        })
    }
}

/// Directory two levels above the input file (`skill/src/Skill.scxml` → `skill/..`)
#[must_use]
pub fn default_output_dir(input: &Path) -> Option<PathBuf> {
    let parent = input.parent()?;
    let grandparent = parent.parent()?;
    if grandparent.as_os_str().is_empty() {
        return Some(PathBuf::from("."));
    }
    Some(grandparent.to_path_buf())
}
