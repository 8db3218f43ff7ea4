//! High-level skill → canonical statechart
//!
//! The high-level document uses middleware tags (`ros_service_send_request`,
//! `ros_topic_callback`, ...). The canonical statechart keeps only
//! `transition` and `send` elements whose event names encode the interaction:
//! `/Nav/GetPose` sent as a request becomes `Nav.GetPose.Call`.
//!
//! Rules run in a fixed order over a copy of the input; tags no rule names pass
//! through untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use model2code_core::{Document, NodeId, query};
use tracing::{debug, info, warn};

use crate::error::{Result, SkillError};
use crate::event::{EventSuffix, ReservedEvent};
use crate::naming::{SkillKind, SkillNames, slash_to_dot};

/// Namespace set on the canonical root
pub const SCXML_NAMESPACE: &str = "http://www.w3.org/2005/07/scxml";

/// Declarations dropped from the canonical statechart
pub const DECLARATION_TAGS: [&str; 5] = [
    "ros_service_server",
    "ros_service_client",
    "ros_topic_publisher",
    "ros_topic_subscriber",
    "ros_action_client",
];

/// Service types whose presence makes a skill an action skill
const HALT_SERVICE_TYPES: [&str; 2] = ["bt_interfaces/HaltAction", "bt_interfaces_dummy/HaltAction"];

/// Expression prefixes rewritten to the runtime event payload
const PAYLOAD_PREFIXES: [&str; 4] = ["_msg.", "_res.", "_feedback.", "_wrapped_result.result."];

/// Runtime event payload prefix
pub const EVENT_DATA_PREFIX: &str = "_event.data.";

/// Goal-response split: one handler becomes an accept and a reject transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalResponseSplit {
    /// Attribute naming the state entered on acceptance
    pub accept: &'static str,
    /// Attribute naming the state entered on rejection
    pub reject: &'static str,
    /// Guard of the accept transition
    pub accept_cond: &'static str,
    /// Guard of the reject transition
    pub reject_cond: &'static str,
}

/// One tag rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteRule {
    /// High-level tag
    pub source: &'static str,
    /// Canonical tag (`transition` or `send`)
    pub target: &'static str,
    /// Attribute renames applied first
    pub renames: &'static [(&'static str, &'static str)],
    /// Suffix appended after slash→dot normalization
    pub suffix: Option<EventSuffix>,
    /// Lifecycle events substituted for names containing `tick` / `halt`
    pub command_alias: Option<(ReservedEvent, ReservedEvent)>,
    /// Replace client aliases with their action name
    pub action_alias: bool,
    /// Rename nested `field` elements to `param`
    pub fields_to_params: bool,
    /// Rewrite `_res.` in the `cond` attribute
    pub rewrite_cond: bool,
    /// One-to-two expansion
    pub split: Option<GoalResponseSplit>,
}

const NAME_TO_EVENT: &[(&str, &str)] = &[("name", "event")];

const fn rule(source: &'static str, target: &'static str, suffix: Option<EventSuffix>) -> RewriteRule {
    RewriteRule {
        source,
        target,
        renames: NAME_TO_EVENT,
        suffix,
        command_alias: None,
        action_alias: false,
        fields_to_params: false,
        rewrite_cond: false,
        split: None,
    }
}

/// Rewrite rules in application order
pub const RULES: [RewriteRule; 11] = [
    RewriteRule {
        command_alias: Some((ReservedEvent::CmdTick, ReservedEvent::CmdHalt)),
        ..rule("ros_service_handle_request", "transition", None)
    },
    RewriteRule {
        fields_to_params: true,
        ..rule("ros_service_send_request", "send", Some(EventSuffix::Call))
    },
    RewriteRule {
        rewrite_cond: true,
        ..rule("ros_service_handle_response", "transition", Some(EventSuffix::Return))
    },
    RewriteRule {
        command_alias: Some((ReservedEvent::TickResponse, ReservedEvent::HaltResponse)),
        fields_to_params: true,
        ..rule("ros_service_send_response", "send", None)
    },
    rule("ros_topic_callback", "transition", Some(EventSuffix::Sub)),
    RewriteRule {
        action_alias: true,
        fields_to_params: true,
        ..rule("ros_action_send_goal", "send", Some(EventSuffix::SendGoal))
    },
    RewriteRule {
        action_alias: true,
        split: Some(GoalResponseSplit {
            accept: "accept",
            reject: "reject",
            accept_cond: "_event.data.is_ok",
            reject_cond: "_event.data.is_ok == false",
        }),
        ..rule("ros_action_handle_goal_response", "transition", Some(EventSuffix::GoalResponse))
    },
    RewriteRule {
        action_alias: true,
        ..rule("ros_action_handle_feedback", "transition", Some(EventSuffix::FeedbackReturn))
    },
    RewriteRule {
        action_alias: true,
        ..rule("ros_action_handle_success_result", "transition", Some(EventSuffix::ResultResponse))
    },
    RewriteRule {
        action_alias: true,
        ..rule("ros_action_handle_cancel_result", "transition", Some(EventSuffix::CancelResult))
    },
    RewriteRule {
        action_alias: true,
        ..rule("ros_action_send_cancel", "send", Some(EventSuffix::SendCancel))
    },
];

/// Output of canonicalization
#[derive(Debug, Clone)]
pub struct Canonicalized {
    /// Canonical statechart
    pub document: Document,
    /// Names derived from the root
    pub names: SkillNames,
}

impl Canonicalized {
    /// Action or condition skill
    #[must_use]
    pub fn kind(&self) -> SkillKind {
        self.names.kind()
    }

    /// `<dir>/<ClassName>SM.scxml`
    #[must_use]
    pub fn path_in(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(self.names.canonical_file_name())
    }

    /// Write the statechart to `<dir>/<ClassName>SM.scxml`, creating `dir`
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be written.
    pub fn write_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| SkillError::file(dir, e))?;
        let path = self.path_in(dir);
        self.document.write_to_file(&path)?;
        info!(path = %path.display(), "wrote canonical statechart");
        Ok(path)
    }
}

/// Canonicalize a high-level skill document
///
/// The input is left untouched; classification later reads its declarations.
///
/// # Errors
///
/// Returns error if:
/// - The root has no `name` attribute
/// - The root name does not contain `Skill`
pub fn canonicalize(high_level: &Document) -> Result<Canonicalized> {
    let mut doc = high_level.clone();
    let root = doc.root();

    let root_name = doc
        .attribute(root, "name")
        .filter(|name| !name.is_empty())
        .ok_or(SkillError::MissingRootName)?
        .to_string();
    let kind = skill_kind(&doc);
    let names = SkillNames::with_kind(&root_name, kind)?;
    info!(skill = %names.skill_name, kind = %kind, sm_name = %names.sm_name, "canonicalizing skill");
    doc.set_attribute(root, "name", names.sm_name.clone())?;

    let aliases = action_aliases(&doc);
    for tag in DECLARATION_TAGS {
        for node in query::collect_by_tag(&doc, root, tag) {
            doc.detach(node)?;
        }
    }
    doc.set_attribute(root, "xmlns", SCXML_NAMESPACE)?;
    for data in query::collect_by_tag(&doc, root, "data") {
        doc.remove_attribute(data, "type");
    }

    for rule in &RULES {
        apply_rule(&mut doc, rule, &aliases)?;
    }
    rewrite_payload_expressions(&mut doc)?;

    Ok(Canonicalized {
        document: doc,
        names,
    })
}

fn skill_kind(doc: &Document) -> SkillKind {
    let halt_server = HALT_SERVICE_TYPES.iter().any(|halt_type| {
        query::find_first_by_tag_and_attribute_containing(
            doc,
            doc.root(),
            "ros_service_server",
            "type",
            halt_type,
        )
        .is_some()
    });
    if halt_server {
        SkillKind::Action
    } else {
        SkillKind::Condition
    }
}

/// `ros_action_client` local name → action name
fn action_aliases(doc: &Document) -> HashMap<String, String> {
    let mut aliases = HashMap::new();
    for node in query::collect_by_tag(doc, doc.root(), "ros_action_client") {
        match (doc.attribute(node, "name"), doc.attribute(node, "action_name")) {
            (Some(name), Some(action_name)) => {
                aliases.insert(name.to_string(), action_name.to_string());
            }
            _ => warn!("ros_action_client without name and action_name"),
        }
    }
    aliases
}

fn apply_rule(doc: &mut Document, rule: &RewriteRule, aliases: &HashMap<String, String>) -> Result<()> {
    let nodes = query::collect_by_tag(doc, doc.root(), rule.source);
    if nodes.is_empty() {
        return Ok(());
    }
    debug!(tag = rule.source, count = nodes.len(), "applying rewrite rule");

    for node in nodes {
        for (from, to) in rule.renames {
            doc.rename_attribute(node, from, to);
        }

        match doc.attribute(node, "event").map(str::to_string) {
            Some(value) => {
                let event = canonical_event(&value, rule, aliases);
                debug!(from = %value, to = %event, "renamed event");
                doc.set_attribute(node, "event", event)?;
            }
            None => warn!(tag = rule.source, "element has no name, leaving event unset"),
        }

        if rule.fields_to_params {
            for field in query::collect_by_tag(doc, node, "field") {
                doc.set_tag(field, "param")?;
            }
        }
        if rule.rewrite_cond {
            if let Some(cond) = doc.attribute(node, "cond").map(str::to_string) {
                doc.set_attribute(node, "cond", cond.replacen("_res.", EVENT_DATA_PREFIX, 1))?;
            }
        }

        match rule.split {
            Some(split) => split_goal_response(doc, node, rule.target, split)?,
            None => doc.set_tag(node, rule.target)?,
        }
    }
    Ok(())
}

fn canonical_event(value: &str, rule: &RewriteRule, aliases: &HashMap<String, String>) -> String {
    if let Some((tick, halt)) = rule.command_alias {
        if value.contains("tick") {
            return tick.as_str().to_string();
        }
        if value.contains("halt") {
            return halt.as_str().to_string();
        }
    }

    let value = if rule.action_alias {
        aliases.get(value).map_or(value, String::as_str)
    } else {
        value
    };
    let dotted = slash_to_dot(value);
    match rule.suffix {
        Some(suffix) => format!("{dotted}.{suffix}"),
        None => dotted,
    }
}

fn split_goal_response(
    doc: &mut Document,
    node: NodeId,
    target_tag: &str,
    split: GoalResponseSplit,
) -> Result<()> {
    let event = doc.attribute(node, "event").unwrap_or_default().to_string();
    let (Some(accept), Some(reject)) = (
        doc.attribute(node, split.accept).map(str::to_string),
        doc.attribute(node, split.reject).map(str::to_string),
    ) else {
        warn!(event = %event, "goal response handler without accept and reject targets");
        return doc.set_tag(node, target_tag).map_err(Into::into);
    };

    let accepted = doc.create_element(
        target_tag,
        [
            ("event", event.as_str()),
            ("cond", split.accept_cond),
            ("target", accept.as_str()),
        ],
    );
    let rejected = doc.create_element(
        target_tag,
        [
            ("event", event.as_str()),
            ("cond", split.reject_cond),
            ("target", reject.as_str()),
        ],
    );
    doc.insert_after(node, accepted)?;
    doc.insert_after(accepted, rejected)?;
    doc.detach(node)?;
    debug!(event = %event, accept = %accept, reject = %reject, "expanded goal response");
    Ok(())
}

fn rewrite_payload_expressions(doc: &mut Document) -> Result<()> {
    for assign in query::collect_by_tag(doc, doc.root(), "assign") {
        let Some(expr) = doc.attribute(assign, "expr") else {
            continue;
        };
        let rewritten = PAYLOAD_PREFIXES
            .iter()
            .fold(expr.to_string(), |expr, prefix| {
                expr.replacen(prefix, EVENT_DATA_PREFIX, 1)
            });
        if rewritten != expr {
            doc.set_attribute(assign, "expr", rewritten)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn wrap(body: &str) -> Document {
        Document::parse(&format!(r#"<scxml name="NavSkill"><state id="s">{body}</state></scxml>"#))
            .unwrap()
    }

    fn only(doc: &Document, tag: &str) -> NodeId {
        let found = query::collect_by_tag(doc, doc.root(), tag);
        assert_eq!(found.len(), 1, "expected exactly one <{tag}>");
        found[0]
    }

    #[rstest]
    #[case("ros_service_send_request", "send", "A.B.Call")]
    #[case("ros_service_handle_response", "transition", "A.B.Return")]
    #[case("ros_topic_callback", "transition", "A.B.Sub")]
    #[case("ros_action_send_goal", "send", "A.B.SendGoal")]
    #[case("ros_action_handle_feedback", "transition", "A.B.FeedbackReturn")]
    #[case("ros_action_handle_success_result", "transition", "A.B.ResultResponse")]
    #[case("ros_action_handle_cancel_result", "transition", "A.B.CancelResult")]
    #[case("ros_action_send_cancel", "send", "A.B.SendCancel")]
    #[case("ros_service_handle_request", "transition", "A.B")]
    fn test_suffix_convention(#[case] source: &str, #[case] target: &str, #[case] event: &str) {
        let doc = wrap(&format!(r#"<{source} name="/A/B" target="s"/>"#));
        let out = canonicalize(&doc).unwrap().document;

        let node = only(&out, target);
        assert_eq!(out.attribute(node, "event"), Some(event));
        assert_eq!(out.attribute(node, "name"), None);
        assert!(query::find_first_by_tag(&out, out.root(), source).is_none());
    }

    #[rstest]
    #[case("ros_service_handle_request", "/NavSkill/tick", "CMD_TICK")]
    #[case("ros_service_handle_request", "/NavSkill/halt", "CMD_HALT")]
    #[case("ros_service_send_response", "/NavSkill/tick", "TICK_RESPONSE")]
    #[case("ros_service_send_response", "/NavSkill/halt", "HALT_RESPONSE")]
    fn test_command_aliasing(#[case] source: &str, #[case] name: &str, #[case] event: &str) {
        let doc = wrap(&format!(r#"<{source} name="{name}"/>"#));
        let out = canonicalize(&doc).unwrap().document;
        let node = query::find_first_by_tag_and_attribute(&out, out.root(), "transition", "event", event)
            .or_else(|| query::find_first_by_tag_and_attribute(&out, out.root(), "send", "event", event));
        assert!(node.is_some(), "no element with event {event}");
    }

    #[test]
    fn test_goal_response_expands_to_two() {
        let doc = wrap(
            r#"<transition event="before" target="s"/>
<ros_action_handle_goal_response name="nav_goal" accept="moving" reject="failed"/>
<transition event="after" target="s"/>"#,
        );
        let doc = {
            let mut doc = doc;
            let root = doc.root();
            let client = doc.create_element(
                "ros_action_client",
                [("name", "nav_goal"), ("action_name", "/Nav/Goto")],
            );
            doc.append_child(root, client).unwrap();
            doc
        };
        let out = canonicalize(&doc).unwrap().document;

        let state = only(&out, "state");
        let events: Vec<_> = out
            .child_elements(state, "transition")
            .map(|t| {
                (
                    out.attribute(t, "event").unwrap_or_default(),
                    out.attribute(t, "cond"),
                    out.attribute(t, "target").unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(
            events,
            vec![
                ("before", None, "s"),
                ("Nav.Goto.GoalResponse", Some("_event.data.is_ok"), "moving"),
                ("Nav.Goto.GoalResponse", Some("_event.data.is_ok == false"), "failed"),
                ("after", None, "s"),
            ]
        );
        assert!(query::find_first_by_tag(&out, out.root(), "ros_action_client").is_none());
    }

    #[test]
    fn test_root_and_declarations() {
        let doc = Document::parse(
            r#"<scxml name="NavSkill">
    <ros_service_server service_name="/NavSkill/halt" type="bt_interfaces_dummy/HaltAction"/>
    <ros_topic_subscriber topic="/Battery/Level" type="sensor_msgs/BatteryState"/>
    <datamodel><data id="x" type="int32" expr="0"/></datamodel>
</scxml>"#,
        )
        .unwrap();
        let canonical = canonicalize(&doc).unwrap();
        let out = &canonical.document;

        assert_eq!(canonical.kind(), SkillKind::Action);
        assert_eq!(out.attribute(out.root(), "name"), Some("NavSkillAction"));
        assert_eq!(out.attribute(out.root(), "xmlns"), Some(SCXML_NAMESPACE));
        assert!(query::find_first_by_tag(out, out.root(), "ros_service_server").is_none());
        assert!(query::find_first_by_tag(out, out.root(), "ros_topic_subscriber").is_none());
        let data = only(out, "data");
        assert_eq!(out.attribute(data, "type"), None);
        assert_eq!(out.attribute(data, "expr"), Some("0"));
        assert_eq!(canonical.path_in("out/src"), PathBuf::from("out/src/NavSkillSM.scxml"));

        // input is untouched
        assert!(query::find_first_by_tag(&doc, doc.root(), "ros_service_server").is_some());
    }

    #[test]
    fn test_condition_skill_keeps_condition_name() {
        let doc = Document::parse(r#"<scxml name="NavSkillCondition"/>"#).unwrap();
        let canonical = canonicalize(&doc).unwrap();
        assert_eq!(canonical.names.sm_name, "NavSkillCondition");
        assert_eq!(canonical.kind(), SkillKind::Condition);
    }

    #[test]
    fn test_fields_and_expressions() {
        let doc = wrap(
            r#"<onentry>
    <ros_service_send_request name="/Nav/GetPose"><field name="frame_id" expr="'map'"/></ros_service_send_request>
</onentry>
<ros_service_handle_response name="/Nav/GetPose" cond="_res.is_ok" target="s">
    <assign location="pose" expr="_res.pose"/>
</ros_service_handle_response>
<ros_topic_callback name="/Battery/Level" target="s">
    <assign location="level" expr="_msg.percentage"/>
</ros_topic_callback>"#,
        );
        let out = canonicalize(&doc).unwrap().document;

        let param = only(&out, "param");
        assert_eq!(out.attribute(param, "name"), Some("frame_id"));
        assert!(query::find_first_by_tag(&out, out.root(), "field").is_none());

        let response = query::find_first_by_tag_and_attribute(
            &out,
            out.root(),
            "transition",
            "event",
            "Nav.GetPose.Return",
        )
        .unwrap();
        assert_eq!(out.attribute(response, "cond"), Some("_event.data.is_ok"));

        let exprs: Vec<_> = query::collect_by_tag(&out, out.root(), "assign")
            .into_iter()
            .filter_map(|a| out.attribute(a, "expr"))
            .collect();
        assert_eq!(exprs, vec!["_event.data.pose", "_event.data.percentage"]);
    }

    #[rstest]
    #[case("")]
    #[case("Navigator")]
    fn test_invalid_root_names(#[case] name: &str) {
        let doc = Document::parse(&format!(r#"<scxml name="{name}"/>"#)).unwrap();
        assert!(canonicalize(&doc).is_err());
    }

    proptest! {
        /// `/A/B` sent as a request always becomes `A.B.Call`
        #[test]
        fn prop_request_suffix(component in "[A-Za-z][A-Za-z0-9]{0,8}", function in "[A-Za-z][A-Za-z0-9]{0,8}") {
            let doc = wrap(&format!(r#"<ros_service_send_request name="/{component}/{function}"/>"#));
            let out = canonicalize(&doc).unwrap().document;
            let send = query::find_first_by_tag(&out, out.root(), "send").unwrap();
            let expected = format!("{component}.{function}.Call");
            prop_assert_eq!(out.attribute(send, "event"), Some(expected.as_str()));
        }
    }
}
