//! Interface classification
//!
//! An event address `/Component/Function` is matched against the declarations
//! of the high-level skill document to find which middleware pattern carries
//! it and which fields flow through it.

use std::fmt;

use indexmap::IndexMap;
use model2code_core::{Document, NodeId, query};
use tracing::{debug, info, warn};

use crate::error::{Result, SkillError};
use crate::event::EventAddress;
use crate::interface::{DEFAULT_FIELD_TYPE, InterfaceFamily, InterfaceLibrary};
use crate::model::{ComponentModel, InterfaceModel};
use crate::naming::{interface_type_name, package_name};

/// Middleware pattern carrying an event
///
/// Variants are declared in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// `ros_service_server`
    ServiceServer,
    /// `ros_service_client`
    ServiceClient,
    /// `ros_topic_publisher`
    TopicPublisher,
    /// `ros_topic_subscriber`
    TopicSubscriber,
    /// `ros_action_server`
    ActionServer,
    /// `ros_action_client`
    ActionClient,
    /// No declaration matched
    Unclassified,
}

impl InteractionKind {
    /// Kinds tried by the classifier, in order
    pub const PRIORITY: [Self; 6] = [
        Self::ServiceServer,
        Self::ServiceClient,
        Self::TopicPublisher,
        Self::TopicSubscriber,
        Self::ActionServer,
        Self::ActionClient,
    ];

    /// Tag of the declaring element
    #[must_use]
    pub fn declaring_tag(self) -> Option<&'static str> {
        match self {
            Self::ServiceServer => Some("ros_service_server"),
            Self::ServiceClient => Some("ros_service_client"),
            Self::TopicPublisher => Some("ros_topic_publisher"),
            Self::TopicSubscriber => Some("ros_topic_subscriber"),
            Self::ActionServer => Some("ros_action_server"),
            Self::ActionClient => Some("ros_action_client"),
            Self::Unclassified => None,
        }
    }

    /// Attribute of the declaring element holding the address
    #[must_use]
    pub fn address_attribute(self) -> Option<&'static str> {
        match self {
            Self::ServiceServer | Self::ServiceClient => Some("service_name"),
            Self::TopicPublisher | Self::TopicSubscriber => Some("topic"),
            Self::ActionServer | Self::ActionClient => Some("action_name"),
            Self::Unclassified => None,
        }
    }

    /// Interface family, `None` when unclassified
    #[must_use]
    pub fn family(self) -> Option<InterfaceFamily> {
        match self {
            Self::ServiceServer | Self::ServiceClient => Some(InterfaceFamily::Service),
            Self::TopicPublisher | Self::TopicSubscriber => Some(InterfaceFamily::Topic),
            Self::ActionServer | Self::ActionClient => Some(InterfaceFamily::Action),
            Self::Unclassified => None,
        }
    }

    /// Whether `.` in the address is read as a path separator before matching
    #[must_use]
    pub fn uses_hierarchical_address(self) -> bool {
        matches!(self, Self::ServiceClient | Self::TopicSubscriber)
    }

    /// Kebab-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServiceServer => "service-server",
            Self::ServiceClient => "service-client",
            Self::TopicPublisher => "topic-publisher",
            Self::TopicSubscriber => "topic-subscriber",
            Self::ActionServer => "action-server",
            Self::ActionClient => "action-client",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceClassification {
    /// Matched pattern
    pub kind: InteractionKind,
    /// Declared message type (`nav_interfaces/srv/GetPose`)
    pub message_type: String,
    /// Package providing the interface
    pub interface_name: String,
    /// Interface name without its package (`GetPose`)
    pub service_type_name: String,
    /// Topic of a publisher or subscriber
    pub topic_name: Option<String>,
    /// Local name of a publisher in the statechart
    pub alias: Option<String>,
    /// Service request fields
    pub request_fields: Vec<String>,
    /// Service response fields
    pub response_fields: Vec<String>,
    /// Published or received message fields
    pub topic_fields: Vec<String>,
    /// Action feedback fields
    pub feedback_fields: Vec<String>,
    /// Field name → declared type
    pub field_types: IndexMap<String, String>,
    /// Whether the interface model marks the package virtual
    pub is_virtual: bool,
}

impl InterfaceClassification {
    /// Classification for an event no declaration matched
    #[must_use]
    pub fn unclassified() -> Self {
        Self::new(InteractionKind::Unclassified, String::new())
    }

    fn new(kind: InteractionKind, message_type: String) -> Self {
        Self {
            kind,
            interface_name: package_name(&message_type).to_string(),
            service_type_name: interface_type_name(&message_type).to_string(),
            message_type,
            topic_name: None,
            alias: None,
            request_fields: Vec::new(),
            response_fields: Vec::new(),
            topic_fields: Vec::new(),
            feedback_fields: Vec::new(),
            field_types: IndexMap::new(),
            is_virtual: false,
        }
    }

    /// Whether a declaration matched
    #[must_use]
    pub fn is_classified(&self) -> bool {
        self.kind != InteractionKind::Unclassified
    }

    /// Type of a field, `string` when undeclared
    #[must_use]
    pub fn field_type(&self, field: &str) -> &str {
        self.field_types
            .get(field)
            .map_or(DEFAULT_FIELD_TYPE, String::as_str)
    }

    fn referenced_fields(&self) -> impl Iterator<Item = &String> {
        self.request_fields
            .iter()
            .chain(&self.response_fields)
            .chain(&self.topic_fields)
            .chain(&self.feedback_fields)
    }
}

/// Resolves event addresses to interaction kinds
///
/// Implementations may rewrite the address to the form that matched.
#[cfg_attr(test, mockall::automock)]
pub trait Classify {
    /// Classify one address
    ///
    /// # Errors
    ///
    /// Returns error when a declaration matches but its paired elements or
    /// required attributes are missing.
    fn classify(&self, address: &mut EventAddress) -> Result<InterfaceClassification>;
}

/// Classifier over a high-level skill document
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    doc: &'a Document,
    library: Option<&'a InterfaceLibrary>,
    interfaces: Option<&'a InterfaceModel>,
    components: Option<&'a ComponentModel>,
}

impl<'a> Classifier<'a> {
    /// Classifier reading declarations from `doc`
    #[must_use]
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            library: None,
            interfaces: None,
            components: None,
        }
    }

    /// Resolve field types from side-car definitions
    #[must_use]
    pub fn with_library(mut self, library: &'a InterfaceLibrary) -> Self {
        self.library = Some(library);
        self
    }

    /// Read virtual flags and function data from an interface model
    #[must_use]
    pub fn with_interface_model(mut self, model: &'a InterfaceModel) -> Self {
        self.interfaces = Some(model);
        self
    }

    /// Override interface packages from a component model
    #[must_use]
    pub fn with_component_model(mut self, model: &'a ComponentModel) -> Self {
        self.components = Some(model);
        self
    }

    fn find_declaration(&self, kind: InteractionKind, path: &str) -> Option<NodeId> {
        query::find_first_by_tag_and_attribute(
            self.doc,
            self.doc.root(),
            kind.declaring_tag()?,
            kind.address_attribute()?,
            path,
        )
    }

    fn paired(&self, tag: &str, name: &str) -> Result<NodeId> {
        query::find_first_by_tag_and_attribute(self.doc, self.doc.root(), tag, "name", name)
            .ok_or_else(|| SkillError::missing_declaration(tag, name))
    }

    fn required_attribute(&self, node: NodeId, kind: InteractionKind, name: &str) -> Result<String> {
        self.doc
            .attribute(node, name)
            .map(str::to_string)
            .ok_or_else(|| SkillError::missing_attribute(kind.declaring_tag().unwrap_or_default(), name))
    }

    fn optional_attribute(&self, node: NodeId, kind: InteractionKind, name: &str) -> String {
        match self.doc.attribute(node, name) {
            Some(value) => value.to_string(),
            None => {
                warn!(element = kind.declaring_tag().unwrap_or_default(), attribute = name, "missing attribute");
                String::new()
            }
        }
    }

    /// `name` of every direct `field` child
    fn field_names(&self, parent: NodeId) -> Vec<String> {
        self.doc
            .child_elements(parent, "field")
            .filter_map(|field| self.doc.attribute(field, "name"))
            .map(str::to_string)
            .collect()
    }

    /// `expr` after its first dot, for every direct `assign` child
    fn assigned_fields(&self, parent: NodeId) -> Vec<String> {
        self.doc
            .child_elements(parent, "assign")
            .filter_map(|assign| self.doc.attribute(assign, "expr"))
            .filter_map(|expr| expr.split_once('.').map(|(_, field)| field.to_string()))
            .collect()
    }

    fn extract(
        &self,
        kind: InteractionKind,
        node: NodeId,
        path: &str,
    ) -> Result<InterfaceClassification> {
        let mut result = match kind {
            InteractionKind::ServiceServer => {
                let message_type = self.required_attribute(node, kind, "type")?;
                let mut result = InterfaceClassification::new(kind, message_type);
                let request = self.paired("ros_service_handle_request", path)?;
                let response = self.paired("ros_service_send_response", path)?;
                result.request_fields = self.field_names(request);
                result.response_fields = self.assigned_fields(response);
                result
            }
            InteractionKind::ServiceClient => {
                let message_type = self.required_attribute(node, kind, "type")?;
                let mut result = InterfaceClassification::new(kind, message_type);
                let request = self.paired("ros_service_send_request", path)?;
                let response = self.paired("ros_service_handle_response", path)?;
                result.request_fields = self.field_names(request);
                result.response_fields = self.assigned_fields(response);
                result
            }
            InteractionKind::TopicPublisher => {
                let message_type = self.optional_attribute(node, kind, "type");
                let mut result = InterfaceClassification::new(kind, message_type);
                let alias = self.required_attribute(node, kind, "name")?;
                let publish = self.paired("ros_topic_publish", &alias)?;
                result.topic_fields = self.assigned_fields(publish);
                result.topic_name = self.doc.attribute(node, "topic").map(str::to_string);
                result.alias = Some(alias);
                result
            }
            InteractionKind::TopicSubscriber => {
                let message_type = self.optional_attribute(node, kind, "type");
                let mut result = InterfaceClassification::new(kind, message_type);
                let topic = self.required_attribute(node, kind, "topic")?;
                let callback = self.paired("ros_topic_callback", &topic)?;
                result.topic_fields = self.field_names(callback);
                result.topic_name = Some(topic);
                result
            }
            InteractionKind::ActionServer | InteractionKind::ActionClient => {
                let message_type = self.optional_attribute(node, kind, "type");
                InterfaceClassification::new(kind, message_type)
            }
            InteractionKind::Unclassified => InterfaceClassification::unclassified(),
        };
        self.resolve_types(&mut result)?;
        Ok(result)
    }

    /// Secondary pass: side-car types, model overrides, string defaults
    fn resolve_types(&self, result: &mut InterfaceClassification) -> Result<()> {
        if let Some(library) = self.library {
            if let Some(definition) = library.definition(&result.message_type)? {
                if result.kind.family() == Some(InterfaceFamily::Action) {
                    result.feedback_fields = definition
                        .feedback()
                        .iter()
                        .map(|field| field.name.clone())
                        .collect();
                }
                result.field_types = definition.field_types();
            }
        }

        let missing: Vec<String> = result
            .referenced_fields()
            .filter(|field| !result.field_types.contains_key(*field))
            .cloned()
            .collect();
        for field in missing {
            warn!(
                field = %field,
                message_type = %result.message_type,
                "no type information for field, defaulting to string"
            );
            result
                .field_types
                .insert(field, DEFAULT_FIELD_TYPE.to_string());
        }
        Ok(())
    }

    fn apply_models(&self, address: &EventAddress, result: &mut InterfaceClassification) {
        if let Some(interface) = self
            .components
            .and_then(|model| model.interface_for(&address.component))
        {
            debug!(component = %address.component, interface = %interface, "interface package from component model");
            result.interface_name = interface.to_string();
        }

        let Some(model) = self.interfaces else {
            return;
        };
        result.is_virtual = model.is_virtual(&result.interface_name);
        if let Some(function) = model.function(&result.interface_name, &address.function) {
            if let (Some(field), Some(data_type)) = (&function.data_field, &function.data_type) {
                result
                    .field_types
                    .entry(field.clone())
                    .or_insert_with(|| data_type.clone());
            }
        }
    }
}

impl Classify for Classifier<'_> {
    fn classify(&self, address: &mut EventAddress) -> Result<InterfaceClassification> {
        for kind in InteractionKind::PRIORITY {
            let path = if kind.uses_hierarchical_address() {
                address.hierarchical_path()
            } else {
                address.path()
            };
            let Some(node) = self.find_declaration(kind, &path) else {
                continue;
            };

            if kind.uses_hierarchical_address() {
                address.make_hierarchical();
            }
            let mut result = self.extract(kind, node, &path)?;
            self.apply_models(address, &mut result);
            info!(
                address = %path,
                kind = %kind,
                message_type = %result.message_type,
                "classified interface"
            );
            return Ok(result);
        }

        warn!(address = %address.path(), "no interface declaration matches, leaving unclassified");
        Ok(InterfaceClassification::unclassified())
    }
}
