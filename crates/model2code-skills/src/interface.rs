//! Side-car interface definitions (`.srv`, `.msg`, `.action`)
//!
//! Definitions are plain text, one `type name` pair per line. Services split the
//! request from the response with a line holding only `---`; actions use two
//! separators (goal, result, feedback); messages have a single section.
//! Comments start with `#`, and lines such as `int32 OK=0` declare constants,
//! which are skipped.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, SkillError};
use crate::naming::{interface_type_name, package_name};

/// Type used when a field has no known declaration
pub const DEFAULT_FIELD_TYPE: &str = "string";

/// Middleware family a definition belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceFamily {
    /// Request/response call
    Service,
    /// Publish/subscribe message
    Topic,
    /// Goal/result/feedback action
    Action,
}

impl InterfaceFamily {
    /// Directory and file extension used for definitions of this family
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Service => "srv",
            Self::Topic => "msg",
            Self::Action => "action",
        }
    }

    /// Family for a definition file extension
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "srv" => Some(Self::Service),
            "msg" => Some(Self::Topic),
            "action" => Some(Self::Action),
            _ => None,
        }
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Declared type (`string`, `float64`, `geometry_msgs/Pose`, ...)
    pub field_type: String,
    /// Field name
    pub name: String,
}

/// Parsed interface definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceDefinition {
    sections: Vec<Vec<FieldDecl>>,
}

impl InterfaceDefinition {
    /// Parse definition text
    ///
    /// # Errors
    ///
    /// Returns the one-based line number and a message for a line that is
    /// neither blank, a comment, a constant, a separator nor a `type name` pair.
    pub fn parse(text: &str) -> std::result::Result<Self, (usize, String)> {
        let mut sections = vec![Vec::new()];

        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            if line == "---" {
                sections.push(Vec::new());
                continue;
            }

            let mut parts = line.split_whitespace();
            let (Some(field_type), Some(name)) = (parts.next(), parts.next()) else {
                return Err((index + 1, format!("expected 'type name', found '{line}'")));
            };
            if name.contains('=') {
                continue;
            }
            if let Some(section) = sections.last_mut() {
                section.push(FieldDecl {
                    field_type: field_type.to_string(),
                    name: name.to_string(),
                });
            }
        }

        Ok(Self { sections })
    }

    /// Number of `---`-separated sections
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Fields of one section (empty when absent)
    #[must_use]
    pub fn section(&self, index: usize) -> &[FieldDecl] {
        self.sections.get(index).map_or(&[], Vec::as_slice)
    }

    /// Service request or action goal
    #[must_use]
    pub fn request(&self) -> &[FieldDecl] {
        self.section(0)
    }

    /// Service response or action result
    #[must_use]
    pub fn response(&self) -> &[FieldDecl] {
        self.section(1)
    }

    /// Action feedback
    #[must_use]
    pub fn feedback(&self) -> &[FieldDecl] {
        self.section(2)
    }

    /// Field name → type across all sections, first declaration wins
    #[must_use]
    pub fn field_types(&self) -> IndexMap<String, String> {
        let mut types = IndexMap::new();
        for field in self.sections.iter().flatten() {
            types
                .entry(field.name.clone())
                .or_insert_with(|| field.field_type.clone());
        }
        types
    }
}

/// Index of definition files under a root directory
///
/// Files are expected at `<root>/.../<package>/<srv|msg|action>/<Name>.<ext>`
/// and are keyed as `package/Name`. They are read on demand.
#[derive(Debug, Clone, Default)]
pub struct InterfaceLibrary {
    files: HashMap<String, PathBuf>,
}

impl InterfaceLibrary {
    /// Library with no definitions
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scan a directory tree for definition files
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be traversed.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut files = HashMap::new();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(key) = definition_key(path) else {
                continue;
            };
            debug!(key = %key, path = %path.display(), "indexed interface definition");
            files.entry(key).or_insert_with(|| path.to_path_buf());
        }

        debug!(root = %root.display(), count = files.len(), "scanned interface definitions");
        Ok(Self { files })
    }

    /// Register a single definition file under an explicit key
    pub fn insert(&mut self, message_type: &str, path: impl Into<PathBuf>) {
        self.files.insert(library_key(message_type), path.into());
    }

    /// Number of indexed definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no definitions are indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Load the definition for a message type, if indexed
    ///
    /// Accepts `package/Name`, `package/srv/Name` and `package::srv::Name`.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is malformed.
    pub fn definition(&self, message_type: &str) -> Result<Option<InterfaceDefinition>> {
        let key = library_key(message_type);
        let Some(path) = self.files.get(&key) else {
            warn!(message_type = %message_type, "no interface definition found");
            return Ok(None);
        };
        let text = fs::read_to_string(path).map_err(|e| SkillError::file(path, e))?;
        InterfaceDefinition::parse(&text)
            .map(Some)
            .map_err(|(line, message)| SkillError::invalid_definition(path, line, message))
    }
}

fn library_key(message_type: &str) -> String {
    format!(
        "{}/{}",
        package_name(message_type),
        interface_type_name(message_type)
    )
}

fn definition_key(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?;
    InterfaceFamily::from_extension(extension)?;
    let name = path.file_stem()?.to_str()?;
    let family_dir = path.parent()?;
    let package = if family_dir.file_name()?.to_str()? == extension {
        family_dir.parent()?.file_name()?.to_str()?
    } else {
        family_dir.file_name()?.to_str()?
    };
    Some(format!("{package}/{name}"))
}
