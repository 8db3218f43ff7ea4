//! Optional system model files
//!
//! The component model maps each component to the interface package it
//! implements:
//!
//! ```xml
//! <componentDeclaration id="Nav" interface="nav_interfaces"/>
//! ```
//!
//! The interface model describes those packages, flags virtual ones and
//! declares the data carried by each function:
//!
//! ```xml
//! <interface id="nav_interfaces" virtual="true">
//!     <function id="GetPose">
//!         <interface type="async-service"/>
//!         <dataField>pose</dataField>
//!         <dataType>geometry_msgs::msg::Pose</dataType>
//!     </function>
//! </interface>
//! ```

use std::path::Path;

use indexmap::IndexMap;
use model2code_core::{Document, NodeId, query};
use tracing::debug;

use crate::error::Result;

/// Declared data of one interface function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionModel {
    /// Middleware pattern (`async-service`, `topic`, ...)
    pub interface_type: Option<String>,
    /// Carried field name
    pub data_field: Option<String>,
    /// Type of the carried field
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct InterfaceEntry {
    is_virtual: bool,
    functions: IndexMap<String, FunctionModel>,
}

/// Interface model: package → virtual flag and function data
#[derive(Debug, Clone, Default)]
pub struct InterfaceModel {
    interfaces: IndexMap<String, InterfaceEntry>,
}

impl InterfaceModel {
    /// Parse interface model XML
    ///
    /// # Errors
    ///
    /// Returns error if the text is not well-formed XML.
    pub fn parse(source: &str) -> Result<Self> {
        let doc = Document::parse(source)?;
        Ok(Self::from_document(&doc))
    }

    /// Read and parse an interface model file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let doc = Document::from_file(path)?;
        Ok(Self::from_document(&doc))
    }

    fn from_document(doc: &Document) -> Self {
        let mut interfaces = IndexMap::new();
        for node in interface_nodes(doc) {
            let Some(id) = doc.attribute(node, "id") else {
                continue;
            };
            let entry = InterfaceEntry {
                is_virtual: doc.attribute(node, "virtual") == Some("true"),
                functions: function_models(doc, node),
            };
            debug!(interface = %id, is_virtual = entry.is_virtual, functions = entry.functions.len(), "loaded interface model");
            interfaces.entry(id.to_string()).or_insert(entry);
        }
        Self { interfaces }
    }

    /// Whether the package is declared with `virtual="true"`
    #[must_use]
    pub fn is_virtual(&self, interface: &str) -> bool {
        self.interfaces
            .get(interface)
            .is_some_and(|entry| entry.is_virtual)
    }

    /// Declared data for a function of a package
    #[must_use]
    pub fn function(&self, interface: &str, function: &str) -> Option<&FunctionModel> {
        self.interfaces.get(interface)?.functions.get(function)
    }

    /// Number of declared packages
    #[must_use]
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Whether no packages are declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

fn interface_nodes(doc: &Document) -> Vec<NodeId> {
    let root = doc.root();
    let mut nodes = Vec::new();
    if doc.has_tag(root, "interface") && doc.attribute(root, "id").is_some() {
        nodes.push(root);
    }
    nodes.extend(query::collect_by_tag_with_attribute(doc, root, "interface", "id"));
    nodes
}

fn function_models(doc: &Document, interface: NodeId) -> IndexMap<String, FunctionModel> {
    let mut functions = IndexMap::new();
    for node in query::collect_by_tag_with_attribute(doc, interface, "function", "id") {
        let Some(id) = doc.attribute(node, "id") else {
            continue;
        };
        let text_of = |tag: &str| {
            query::find_first_by_tag(doc, node, tag)
                .and_then(|child| doc.text(child))
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
        };
        let model = FunctionModel {
            interface_type: query::find_first_by_tag(doc, node, "interface")
                .and_then(|child| doc.attribute(child, "type"))
                .map(str::to_string),
            data_field: text_of("dataField"),
            data_type: text_of("dataType"),
        };
        functions.entry(id.to_string()).or_insert(model);
    }
    functions
}

/// Component model: component → interface package
#[derive(Debug, Clone, Default)]
pub struct ComponentModel {
    components: IndexMap<String, String>,
}

impl ComponentModel {
    /// Parse component model XML
    ///
    /// # Errors
    ///
    /// Returns error if the text is not well-formed XML.
    pub fn parse(source: &str) -> Result<Self> {
        let doc = Document::parse(source)?;
        Ok(Self::from_document(&doc))
    }

    /// Read and parse a component model file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let doc = Document::from_file(path)?;
        Ok(Self::from_document(&doc))
    }

    fn from_document(doc: &Document) -> Self {
        let mut components = IndexMap::new();
        for node in query::collect_by_tag_with_attribute(doc, doc.root(), "componentDeclaration", "id")
        {
            if let (Some(id), Some(interface)) =
                (doc.attribute(node, "id"), doc.attribute(node, "interface"))
            {
                components
                    .entry(id.to_string())
                    .or_insert_with(|| interface.to_string());
            }
        }
        Self { components }
    }

    /// Interface package implemented by a component
    #[must_use]
    pub fn interface_for(&self, component: &str) -> Option<&str> {
        self.components.get(component).map(String::as_str)
    }

    /// Number of declared components
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether no components are declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERFACES: &str = r#"<interfaces>
    <interface id="nav_interfaces" virtual="true">
        <function id="GetPose">
            <interface type="async-service"/>
            <dataField>pose</dataField>
            <dataType>geometry_msgs::msg::Pose</dataType>
        </function>
        <function id="Stop">
            <interface type="async-service"/>
        </function>
    </interface>
    <interface id="battery_interfaces">
        <function id="Level"/>
    </interface>
</interfaces>"#;

    #[test]
    fn test_interface_model() {
        let model = InterfaceModel::parse(INTERFACES).unwrap();
        assert_eq!(model.len(), 2);
        assert!(model.is_virtual("nav_interfaces"));
        assert!(!model.is_virtual("battery_interfaces"));
        assert!(!model.is_virtual("unknown"));

        let get_pose = model.function("nav_interfaces", "GetPose").unwrap();
        assert_eq!(get_pose.interface_type.as_deref(), Some("async-service"));
        assert_eq!(get_pose.data_field.as_deref(), Some("pose"));
        assert_eq!(get_pose.data_type.as_deref(), Some("geometry_msgs::msg::Pose"));

        let stop = model.function("nav_interfaces", "Stop").unwrap();
        assert_eq!(stop.data_field, None);
        assert!(model.function("battery_interfaces", "GetPose").is_none());
    }

    #[test]
    fn test_component_model() {
        let model = ComponentModel::parse(
            r#"<components>
    <componentDeclaration id="Nav" interface="nav_interfaces"/>
    <componentDeclaration id="Broken"/>
</components>"#,
        )
        .unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.interface_for("Nav"), Some("nav_interfaces"));
        assert_eq!(model.interface_for("Broken"), None);
    }
}
