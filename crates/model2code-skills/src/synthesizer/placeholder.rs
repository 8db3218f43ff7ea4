//! `$name$` placeholder substitution

use indexmap::IndexMap;

use crate::naming::{SkillNames, to_snake_case};
use crate::registry::EventRecord;

/// Package whose functions get a `_blackboard` snake-case suffix
pub const BLACKBOARD_PACKAGE: &str = "blackboard_interfaces";

/// Placeholder of a per-field fragment naming the field
pub const FIELD_PLACEHOLDER: &str = "$eventData.interfaceDataField$";
/// Placeholder of a per-field fragment naming the field type
pub const FIELD_TYPE_PLACEHOLDER: &str = "$eventData.interfaceDataType$";
/// Placeholder of a per-parameter fragment naming the parameter
pub const PARAM_PLACEHOLDER: &str = "$IT->FIRST$";
/// Message name placeholder, snake-cased only in topic includes
pub const MESSAGE_NAME_PLACEHOLDER: &str = "$eventData.messageNameSnakeCase$";

/// Ordered placeholder → value table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    values: IndexMap<&'static str, String>,
}

impl Placeholders {
    /// Skill-level placeholders, replaced in raw templates before parsing
    #[must_use]
    pub fn for_skill(names: &SkillNames) -> Self {
        Self::default()
            .with("$className$", &names.class_name)
            .with("$projectName$", &names.class_name_snake_case)
            .with("$SMName$", &names.sm_name)
            .with("$skillName$", &names.skill_name)
            .with("$skillTypeLC$", &names.skill_type_lc)
            .with("$skillType$", &names.skill_type)
            .with("$dataModelClassName$", names.data_model_class_name())
    }

    /// Placeholders describing one classified event
    #[must_use]
    pub fn for_event(record: &EventRecord) -> Self {
        let classification = &record.classification;
        let (component, function) = record
            .address
            .as_ref()
            .map_or(("", ""), |a| (a.component.as_str(), a.function.as_str()));

        let mut function_snake = to_snake_case(function);
        if classification.interface_name == BLACKBOARD_PACKAGE {
            function_snake.push_str("_blackboard");
        }

        Self::default()
            .with("$eventData.event$", &record.event.name)
            .with("$eventData.componentName$", component)
            .with("$eventData.functionName$", function)
            .with("$eventData.functionNameSnakeCase$", function_snake)
            .with("$eventData.serviceTypeName$", &classification.service_type_name)
            .with(
                "$eventData.serviceTypeNameSnakeCase$",
                to_snake_case(&classification.service_type_name),
            )
            .with("$eventData.nodeName$", format!("node{function}"))
            .with("$eventData.clientName$", format!("client{function}"))
            .with("$eventData.serverName$", format!("\"/{component}/{function}\""))
            .with("$eventData.interfaceName$", &classification.interface_name)
            .with("$interfaceName$", &classification.interface_name)
            .with(
                "$eventData.topicName$",
                classification.topic_name.as_deref().unwrap_or_default(),
            )
            .with(MESSAGE_NAME_PLACEHOLDER, &classification.service_type_name)
    }

    /// Set a value, replacing an earlier one for the same placeholder
    #[must_use]
    pub fn with(mut self, placeholder: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(placeholder, value.into());
        self
    }

    /// Value of a placeholder
    #[must_use]
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.values.get(placeholder).map(String::as_str)
    }

    /// Replace every placeholder occurrence in `text`
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        self.values
            .iter()
            .fold(text.to_string(), |text, (placeholder, value)| {
                if text.contains(placeholder) {
                    text.replace(placeholder, value)
                } else {
                    text
                }
            })
    }
}

/// Expression reading a response field, with `.c_str()` for strings
#[must_use]
pub fn response_accessor(field: &str, field_type: &str) -> String {
    if field_type == "string" {
        format!("response->{field}.c_str()")
    } else {
        format!("response->{field}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{InteractionKind, InterfaceClassification};
    use crate::event::{Event, EventAddress};

    fn record(interface_name: &str) -> EventRecord {
        let mut classification = InterfaceClassification::unclassified();
        classification.kind = InteractionKind::ServiceClient;
        classification.interface_name = interface_name.to_string();
        classification.service_type_name = "GetPose".to_string();
        EventRecord {
            event: Event::send("Nav.GetPose.Call"),
            address: EventAddress::parse("Nav.GetPose.Call"),
            classification,
        }
    }

    #[test]
    fn test_event_placeholders() {
        let placeholders = Placeholders::for_event(&record("nav_interfaces"));
        let text = "$eventData.nodeName$ $eventData.clientName$ $eventData.serverName$ \
                    $eventData.serviceTypeNameSnakeCase$ $eventData.topicName$|";
        assert_eq!(
            placeholders.apply(text),
            "nodeGetPose clientGetPose \"/Nav/GetPose\" get_pose |"
        );
        assert_eq!(
            placeholders.get("$eventData.functionNameSnakeCase$"),
            Some("get_pose")
        );
    }

    #[test]
    fn test_blackboard_suffix() {
        let placeholders = Placeholders::for_event(&record(BLACKBOARD_PACKAGE));
        assert_eq!(
            placeholders.get("$eventData.functionNameSnakeCase$"),
            Some("get_pose_blackboard")
        );
    }

    #[test]
    fn test_skill_placeholders() {
        let names = SkillNames::from_root_name("NavSkillAction").unwrap();
        let placeholders = Placeholders::for_skill(&names);
        assert_eq!(
            placeholders.apply("$className$ $projectName$ $SMName$ $skillTypeLC$ $skillType$"),
            "NavSkill nav_skill NavSkillAction action Action"
        );
    }

    #[test]
    fn test_with_overrides() {
        let placeholders = Placeholders::default()
            .with(MESSAGE_NAME_PLACEHOLDER, "BatteryState")
            .with(MESSAGE_NAME_PLACEHOLDER, "battery_state");
        assert_eq!(placeholders.apply(MESSAGE_NAME_PLACEHOLDER), "battery_state");
    }

    #[test]
    fn test_response_accessor() {
        assert_eq!(response_accessor("name", "string"), "response->name.c_str()");
        assert_eq!(response_accessor("pose", "geometry_msgs::msg::Pose"), "response->pose");
    }
}
