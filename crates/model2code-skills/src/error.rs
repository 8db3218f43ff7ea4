//! Error types for the skill compiler

use std::path::PathBuf;
use thiserror::Error;

use model2code_core::XmlError;

/// Result type for skill compiler operations
pub type Result<T> = std::result::Result<T, SkillError>;

/// Errors that can occur while compiling a skill
#[derive(Debug, Error)]
pub enum SkillError {
    // Document errors
    /// Input or canonical document could not be parsed or written
    #[error("Document error: {0}")]
    Xml(#[from] XmlError),

    // Naming errors
    /// Root element has no `name` attribute
    #[error("Root element has no 'name' attribute or it is empty")]
    MissingRootName,

    /// Root name does not contain the `Skill` marker
    #[error("Invalid skill name: '{0}'. The root name must contain 'Skill' (e.g. 'NavSkill')")]
    InvalidSkillName(String),

    /// Canonical root name carries no skill type after `Skill`
    #[error("Missing skill type in '{0}'. Expected a suffix after 'Skill' (e.g. 'NavSkillAction')")]
    MissingSkillType(String),

    // Classification errors
    /// A matched interaction kind lacks its paired element
    #[error("No <{element}> element found for '{address}'")]
    MissingDeclaration {
        /// Tag that was searched for
        element: String,
        /// Address or alias it should carry
        address: String,
    },

    /// A required attribute is absent
    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        /// Element tag
        element: String,
        /// Attribute name
        attribute: String,
    },

    /// A side-car interface definition is malformed
    #[error("Invalid interface definition {path}:{line}: {message}")]
    InvalidInterfaceDefinition {
        /// Definition file
        path: PathBuf,
        /// One-based line number
        line: usize,
        /// What is wrong with the line
        message: String,
    },

    // Template errors
    /// A template file expected in the template directory is absent
    #[error("Template not found: {0}")]
    TemplateNotFound(PathBuf),

    // Pipeline errors
    /// A pipeline step was called out of order
    #[error("Pipeline step '{step}' requires state {expected}, but the pipeline is {found}")]
    InvalidState {
        /// Step that was attempted
        step: &'static str,
        /// State the step needs
        expected: String,
        /// Current state
        found: String,
    },

    // I/O errors
    /// Filesystem I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem error tied to a path
    #[error("IO error on '{path}': {source}")]
    File {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Walkdir error while scanning interface definitions
    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    // Composed errors
    /// Generic error with context
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SkillError {
    /// Create a new `InvalidSkillName` error
    pub fn invalid_skill_name(name: impl Into<String>) -> Self {
        Self::InvalidSkillName(name.into())
    }

    /// Create a new `MissingSkillType` error
    pub fn missing_skill_type(name: impl Into<String>) -> Self {
        Self::MissingSkillType(name.into())
    }

    /// Create a new `MissingDeclaration` error
    pub fn missing_declaration(element: impl Into<String>, address: impl Into<String>) -> Self {
        Self::MissingDeclaration {
            element: element.into(),
            address: address.into(),
        }
    }

    /// Create a new `MissingAttribute` error
    pub fn missing_attribute(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    /// Create a new `InvalidInterfaceDefinition` error
    pub fn invalid_definition(
        path: impl Into<PathBuf>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidInterfaceDefinition {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a new `File` error
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}
