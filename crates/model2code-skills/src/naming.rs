//! Skill and identifier naming rules

use std::fmt;

use crate::error::{Result, SkillError};

/// Literal that separates the skill name from its type in a root name
pub const SKILL_MARKER: &str = "Skill";

/// Whether the skill is a stateless condition or a stateful, haltable action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillKind {
    /// Long-running skill that can be halted
    Action,
    /// Immediate check with no halt support
    Condition,
}

impl SkillKind {
    /// Name as it appears in class and state machine names
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "Action",
            Self::Condition => "Condition",
        }
    }

    /// Kind encoded by a skill type string (`Action` or anything else)
    #[must_use]
    pub fn from_skill_type(skill_type: &str) -> Self {
        if skill_type == Self::Action.as_str() {
            Self::Action
        } else {
            Self::Condition
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names derived from a root element name such as `NavSkillCondition`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillNames {
    /// Full state machine name (`NavSkillCondition`)
    pub sm_name: String,
    /// Prefix before the marker (`Nav`)
    pub skill_name: String,
    /// Prefix plus marker (`NavSkill`)
    pub class_name: String,
    /// Snake case of the class name (`nav_skill`)
    pub class_name_snake_case: String,
    /// Remainder after the marker (`Condition`)
    pub skill_type: String,
    /// Lowercase skill type (`condition`)
    pub skill_type_lc: String,
}

impl SkillNames {
    /// Split a canonical root name into its parts
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The name is empty
    /// - The name does not contain `Skill`
    /// - Nothing follows `Skill` (the skill type is required)
    pub fn from_root_name(root_name: &str) -> Result<Self> {
        let (skill_name, skill_type) = split_root_name(root_name)?;
        if skill_type.is_empty() {
            return Err(SkillError::missing_skill_type(root_name));
        }
        Ok(Self::build(root_name.to_string(), skill_name, skill_type))
    }

    /// Names for a high-level root name once its kind is known
    ///
    /// Anything after `Skill` in `root_name` is replaced by the kind, so both
    /// `NavSkill` and `NavSkillCondition` yield `NavSkillCondition`.
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or does not contain `Skill`.
    pub fn with_kind(root_name: &str, kind: SkillKind) -> Result<Self> {
        let (skill_name, _) = split_root_name(root_name)?;
        let sm_name = format!("{skill_name}{SKILL_MARKER}{kind}");
        Ok(Self::build(sm_name, skill_name, kind.as_str()))
    }

    /// Kind encoded by the skill type
    #[must_use]
    pub fn kind(&self) -> SkillKind {
        SkillKind::from_skill_type(&self.skill_type)
    }

    /// Class name of the generated data model
    #[must_use]
    pub fn data_model_class_name(&self) -> String {
        format!("{}DataModel", self.class_name)
    }

    /// File name of the canonical statechart
    #[must_use]
    pub fn canonical_file_name(&self) -> String {
        format!("{}SM.scxml", self.class_name)
    }

    fn build(sm_name: String, skill_name: &str, skill_type: &str) -> Self {
        let class_name = format!("{skill_name}{SKILL_MARKER}");
        Self {
            sm_name,
            skill_name: skill_name.to_string(),
            class_name_snake_case: to_snake_case(&class_name),
            class_name,
            skill_type: skill_type.to_string(),
            skill_type_lc: skill_type.to_lowercase(),
        }
    }
}

fn split_root_name(root_name: &str) -> Result<(&str, &str)> {
    if root_name.is_empty() {
        return Err(SkillError::MissingRootName);
    }
    let position = root_name
        .find(SKILL_MARKER)
        .ok_or_else(|| SkillError::invalid_skill_name(root_name))?;
    Ok((
        &root_name[..position],
        &root_name[position + SKILL_MARKER.len()..],
    ))
}

/// Convert `CamelCase` to `snake_case`
///
/// An underscore is inserted before every uppercase letter except the first
/// character, then the result is lowercased: `GetPose` → `get_pose`.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, c) in name.chars().enumerate() {
        if index > 0 && c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Convert a slash-delimited address to dotted form
///
/// One leading `/` is dropped, every remaining `/` becomes `.`:
/// `/Nav/GetPose` → `Nav.GetPose`.
#[must_use]
pub fn slash_to_dot(address: &str) -> String {
    address
        .strip_prefix('/')
        .unwrap_or(address)
        .replace('/', ".")
}

/// Package part of a message type (`nav_interfaces/srv/GetPose` → `nav_interfaces`)
#[must_use]
pub fn package_name(message_type: &str) -> &str {
    type_segments(message_type).next().unwrap_or(message_type)
}

/// Interface name of a message type (`nav_interfaces/srv/GetPose` → `GetPose`)
#[must_use]
pub fn interface_type_name(message_type: &str) -> &str {
    type_segments(message_type).last().unwrap_or(message_type)
}

fn type_segments(message_type: &str) -> impl Iterator<Item = &str> {
    message_type
        .split(['/', ':'])
        .filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_canonical_root_name() {
        let names = SkillNames::from_root_name("NavSkillCondition").unwrap();
        assert_eq!(names.sm_name, "NavSkillCondition");
        assert_eq!(names.skill_name, "Nav");
        assert_eq!(names.class_name, "NavSkill");
        assert_eq!(names.class_name_snake_case, "nav_skill");
        assert_eq!(names.skill_type, "Condition");
        assert_eq!(names.skill_type_lc, "condition");
        assert_eq!(names.kind(), SkillKind::Condition);
        assert_eq!(names.data_model_class_name(), "NavSkillDataModel");
        assert_eq!(names.canonical_file_name(), "NavSkillSM.scxml");
    }

    #[test]
    fn test_root_name_errors() {
        assert!(matches!(
            SkillNames::from_root_name(""),
            Err(SkillError::MissingRootName)
        ));
        assert!(matches!(
            SkillNames::from_root_name("Navigator"),
            Err(SkillError::InvalidSkillName(_))
        ));
        assert!(matches!(
            SkillNames::from_root_name("NavSkill"),
            Err(SkillError::MissingSkillType(_))
        ));
    }

    #[rstest]
    #[case("NavSkill", SkillKind::Action, "NavSkillAction")]
    #[case("NavSkillCondition", SkillKind::Action, "NavSkillAction")]
    #[case("BatteryLevelSkill", SkillKind::Condition, "BatteryLevelSkillCondition")]
    fn test_with_kind(#[case] root: &str, #[case] kind: SkillKind, #[case] expected: &str) {
        let names = SkillNames::with_kind(root, kind).unwrap();
        assert_eq!(names.sm_name, expected);
        assert_eq!(names.kind(), kind);
    }

    #[rstest]
    #[case("GetPose", "get_pose")]
    #[case("NavSkill", "nav_skill")]
    #[case("already_snake", "already_snake")]
    #[case("HTTPServer", "h_t_t_p_server")]
    #[case("", "")]
    fn test_to_snake_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(to_snake_case(input), expected);
    }

    #[rstest]
    #[case("/Nav/GetPose", "Nav.GetPose")]
    #[case("Nav/GetPose", "Nav.GetPose")]
    #[case("/Robot/Arm/Move", "Robot.Arm.Move")]
    #[case("//a", ".a")]
    #[case("CMD_TICK", "CMD_TICK")]
    fn test_slash_to_dot(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slash_to_dot(input), expected);
    }

    #[rstest]
    #[case("nav_interfaces/srv/GetPose", "nav_interfaces", "GetPose")]
    #[case("nav_interfaces/GetPose", "nav_interfaces", "GetPose")]
    #[case("std_msgs::msg::Int32", "std_msgs", "Int32")]
    #[case("Bare", "Bare", "Bare")]
    fn test_message_type_parts(
        #[case] message_type: &str,
        #[case] package: &str,
        #[case] name: &str,
    ) {
        assert_eq!(package_name(message_type), package);
        assert_eq!(interface_type_name(message_type), name);
    }
}
