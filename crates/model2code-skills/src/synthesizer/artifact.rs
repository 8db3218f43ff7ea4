//! Generated files and the templates they are rendered from

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{Result, SkillError};
use crate::naming::SkillNames;

/// One generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// `include/<Class>.h`
    Header,
    /// `src/<Class>.cpp`
    Source,
    /// `include/<Class>DataModel.h`
    DataModelHeader,
    /// `src/<Class>DataModel.cpp`
    DataModelSource,
    /// `src/main.cpp`
    Main,
    /// `CMakeLists.txt`
    CMakeLists,
    /// `package.xml`
    PackageManifest,
}

impl ArtifactKind {
    /// Every artifact, in the order they are processed
    pub const ALL: [Self; 7] = [
        Self::Header,
        Self::Source,
        Self::DataModelHeader,
        Self::DataModelSource,
        Self::Main,
        Self::CMakeLists,
        Self::PackageManifest,
    ];

    /// Template file relative to the template directory
    #[must_use]
    pub fn template_path(self) -> &'static str {
        match self {
            Self::Header => "include/TemplateSkill.h",
            Self::Source => "src/TemplateSkill.cpp",
            Self::DataModelHeader => "include/TemplateSkillDataModel.h",
            Self::DataModelSource => "src/TemplateSkillDataModel.cpp",
            Self::Main => "src/main.cpp",
            Self::CMakeLists => "CMakeLists.txt",
            Self::PackageManifest => "package.xml",
        }
    }

    /// Generated file relative to the output directory
    #[must_use]
    pub fn output_path(self, names: &SkillNames) -> PathBuf {
        let class = &names.class_name;
        match self {
            Self::Header => PathBuf::from("include").join(format!("{class}.h")),
            Self::Source => PathBuf::from("src").join(format!("{class}.cpp")),
            Self::DataModelHeader => PathBuf::from("include").join(format!("{class}DataModel.h")),
            Self::DataModelSource => PathBuf::from("src").join(format!("{class}DataModel.cpp")),
            Self::Main => PathBuf::from("src").join("main.cpp"),
            Self::CMakeLists => PathBuf::from("CMakeLists.txt"),
            Self::PackageManifest => PathBuf::from("package.xml"),
        }
    }

    /// Whether the artifact only exists in data-model mode
    #[must_use]
    pub fn is_data_model(self) -> bool {
        matches!(self, Self::DataModelHeader | Self::DataModelSource)
    }
}

/// Template texts, read once per run
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    sources: IndexMap<ArtifactKind, String>,
}

impl TemplateSet {
    /// Read every template from `dir`
    ///
    /// Data-model templates are only read when `data_model` is set.
    ///
    /// # Errors
    ///
    /// Returns `TemplateNotFound` for the first missing template.
    pub fn load(dir: impl AsRef<Path>, data_model: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let mut sources = IndexMap::new();
        for kind in ArtifactKind::ALL {
            if kind.is_data_model() && !data_model {
                continue;
            }
            let path = dir.join(kind.template_path());
            if !path.is_file() {
                return Err(SkillError::TemplateNotFound(path));
            }
            let text = std::fs::read_to_string(&path).map_err(|e| SkillError::file(&path, e))?;
            debug!(path = %path.display(), bytes = text.len(), "read template");
            sources.insert(kind, text);
        }
        info!(dir = %dir.display(), count = sources.len(), "loaded templates");
        Ok(Self { sources })
    }

    /// Build from in-memory texts
    pub fn from_sources<S: Into<String>>(sources: impl IntoIterator<Item = (ArtifactKind, S)>) -> Self {
        Self {
            sources: sources
                .into_iter()
                .map(|(kind, text)| (kind, text.into()))
                .collect(),
        }
    }

    /// Template text for an artifact
    #[must_use]
    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        self.sources.get(&kind).map(String::as_str)
    }

    /// Templates in processing order
    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        self.sources.iter().map(|(kind, text)| (*kind, text.as_str()))
    }

    /// Number of templates
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if no template was loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Rendered artifacts, ready to write
#[derive(Debug, Clone)]
pub struct Artifacts {
    names: SkillNames,
    files: IndexMap<ArtifactKind, String>,
}

impl Artifacts {
    pub(crate) fn new(names: SkillNames, files: IndexMap<ArtifactKind, String>) -> Self {
        Self { names, files }
    }

    /// Names of the skill the artifacts were rendered for
    #[must_use]
    pub fn names(&self) -> &SkillNames {
        &self.names
    }

    /// Rendered text of an artifact
    #[must_use]
    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        self.files.get(&kind).map(String::as_str)
    }

    /// Rendered artifacts in order
    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        self.files.iter().map(|(kind, text)| (*kind, text.as_str()))
    }

    /// Number of artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if nothing was rendered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every artifact below `output_dir`, creating directories as needed
    ///
    /// Files already written stay in place if a later write fails.
    ///
    /// # Errors
    ///
    /// Returns error if a directory or file cannot be written.
    pub fn write_to(&self, output_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let output_dir = output_dir.as_ref();
        let mut written = Vec::with_capacity(self.files.len());
        for (kind, text) in &self.files {
            let path = output_dir.join(kind.output_path(&self.names));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SkillError::file(parent, e))?;
            }
            std::fs::write(&path, text).map_err(|e| SkillError::file(&path, e))?;
            debug!(path = %path.display(), "wrote artifact");
            written.push(path);
        }
        info!(dir = %output_dir.display(), count = written.len(), "wrote artifacts");
        Ok(written)
    }
}
