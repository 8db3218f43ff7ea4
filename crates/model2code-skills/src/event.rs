//! Statechart events and their addressing

use std::fmt;

use indexmap::IndexMap;
use model2code_core::{Document, query};
use tracing::{debug, warn};

/// Whether an event is consumed by a transition or emitted by a send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `<transition event=...>`
    Transition,
    /// `<send event=...>`
    Send,
}

impl EventKind {
    /// Tag name of the statechart element
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transition => "transition",
            Self::Send => "send",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle events exchanged with the behavior-tree caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedEvent {
    /// Tick request received
    CmdTick,
    /// Halt request received
    CmdHalt,
    /// Tick answered
    TickResponse,
    /// Halt answered
    HaltResponse,
}

impl ReservedEvent {
    /// Every reserved event
    pub const ALL: [Self; 4] = [
        Self::CmdTick,
        Self::CmdHalt,
        Self::TickResponse,
        Self::HaltResponse,
    ];

    /// Literal event name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CmdTick => "CMD_TICK",
            Self::CmdHalt => "CMD_HALT",
            Self::TickResponse => "TICK_RESPONSE",
            Self::HaltResponse => "HALT_RESPONSE",
        }
    }

    /// Reserved event with this exact name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

impl fmt::Display for ReservedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suffix appended to canonical event names, one per interaction phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSuffix {
    /// Service request sent
    Call,
    /// Service response received
    Return,
    /// Topic message received
    Sub,
    /// Action goal sent
    SendGoal,
    /// Action goal accepted or rejected
    GoalResponse,
    /// Action feedback received
    FeedbackReturn,
    /// Action result received
    ResultResponse,
    /// Action cancellation answered
    CancelResult,
    /// Action cancellation sent
    SendCancel,
}

impl EventSuffix {
    /// Every suffix
    pub const ALL: [Self; 9] = [
        Self::Call,
        Self::Return,
        Self::Sub,
        Self::SendGoal,
        Self::GoalResponse,
        Self::FeedbackReturn,
        Self::ResultResponse,
        Self::CancelResult,
        Self::SendCancel,
    ];

    /// Suffix text without the leading dot
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "Call",
            Self::Return => "Return",
            Self::Sub => "Sub",
            Self::SendGoal => "SendGoal",
            Self::GoalResponse => "GoalResponse",
            Self::FeedbackReturn => "FeedbackReturn",
            Self::ResultResponse => "ResultResponse",
            Self::CancelResult => "CancelResult",
            Self::SendCancel => "SendCancel",
        }
    }

    /// Suffix matching a name segment
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == segment)
    }
}

impl fmt::Display for EventSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Component.Function.Suffix` split into its parts
///
/// The component may itself be dotted (`Robot.Arm.Move.Call` has component
/// `Robot.Arm`), which is why the function is read from the right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAddress {
    /// Component name (may contain `.` or, after hierarchical matching, `/`)
    pub component: String,
    /// Function name
    pub function: String,
    /// Interaction phase, if the name ends with a known suffix
    pub suffix: Option<EventSuffix>,
}

impl EventAddress {
    /// Split an event name, or `None` when it has no component/function pair
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let mut segments: Vec<&str> = name.split('.').collect();
        let suffix = segments
            .last()
            .and_then(|last| EventSuffix::from_segment(last));
        if suffix.is_some() {
            segments.pop();
        }
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        let function = segments.pop()?.to_string();
        Some(Self {
            component: segments.join("."),
            function,
            suffix,
        })
    }

    /// `/Component/Function`, exactly as named
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}/{}", self.component, self.function)
    }

    /// `/Component/Function` with every `.` turned into `/`
    #[must_use]
    pub fn hierarchical_path(&self) -> String {
        format!(
            "/{}/{}",
            self.component.replace('.', "/"),
            self.function.replace('.', "/")
        )
    }

    /// Rewrite component and function to their slash-delimited form
    pub fn make_hierarchical(&mut self) {
        self.component = self.component.replace('.', "/");
        self.function = self.function.replace('.', "/");
    }
}

/// An event enumerated from the canonical statechart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event name
    pub name: String,
    /// Transition or send
    pub kind: EventKind,
    /// Target state of a transition
    pub target: Option<String>,
    /// Send parameters, name → expression, in document order
    pub params: IndexMap<String, String>,
}

impl Event {
    /// Transition event
    pub fn transition(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EventKind::Transition,
            target: Some(target.into()),
            params: IndexMap::new(),
        }
    }

    /// Send event without parameters
    pub fn send(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EventKind::Send,
            target: None,
            params: IndexMap::new(),
        }
    }

    /// Add a send parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.params.insert(name.into(), expr.into());
        self
    }

    /// Reserved lifecycle event this is, if any
    #[must_use]
    pub fn reserved(&self) -> Option<ReservedEvent> {
        ReservedEvent::from_name(&self.name)
    }
}

/// Enumerate events of a canonical statechart
///
/// Transitions come first, then sends, each in document order. A transition
/// without both `event` and `target` is skipped with a warning.
#[must_use]
pub fn collect_events(doc: &Document) -> Vec<Event> {
    let root = doc.root();
    let mut events = Vec::new();

    for id in query::collect_by_tag_with_attribute(doc, root, "transition", "event") {
        match (doc.attribute(id, "event"), doc.attribute(id, "target")) {
            (Some(name), Some(target)) => {
                debug!(event = %name, target = %target, "found transition");
                events.push(Event::transition(name, target));
            }
            (name, _) => {
                warn!(event = ?name, "skipping <transition> without event and target");
            }
        }
    }

    for id in query::collect_by_tag_with_attribute(doc, root, "send", "event") {
        let Some(name) = doc.attribute(id, "event") else {
            continue;
        };
        let mut event = Event::send(name);
        for param in query::collect_by_tag(doc, id, "param") {
            let key = doc.attribute(param, "name").unwrap_or_default();
            let expr = doc.attribute(param, "expr").unwrap_or_default();
            event.params.insert(key.to_string(), expr.to_string());
        }
        debug!(event = %name, params = event.params.len(), "found send");
        events.push(event);
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Nav.GetPose.Call", "Nav", "GetPose", Some(EventSuffix::Call))]
    #[case("Nav.GetPose.Return", "Nav", "GetPose", Some(EventSuffix::Return))]
    #[case("Robot.Arm.Move.SendGoal", "Robot.Arm", "Move", Some(EventSuffix::SendGoal))]
    #[case("Battery.Level", "Battery", "Level", None)]
    #[case("Nav.GetPose.Unknown", "Nav.GetPose", "Unknown", None)]
    fn test_parse_address(
        #[case] name: &str,
        #[case] component: &str,
        #[case] function: &str,
        #[case] suffix: Option<EventSuffix>,
    ) {
        let address = EventAddress::parse(name).unwrap();
        assert_eq!(address.component, component);
        assert_eq!(address.function, function);
        assert_eq!(address.suffix, suffix);
    }

    #[rstest]
    #[case("CMD_TICK")]
    #[case("Nav.Call")]
    #[case("")]
    #[case("Nav..Call")]
    fn test_parse_address_rejects(#[case] name: &str) {
        assert!(EventAddress::parse(name).is_none());
    }

    #[test]
    fn test_paths() {
        let mut address = EventAddress::parse("Robot.Arm.Move.Call").unwrap();
        assert_eq!(address.path(), "/Robot.Arm/Move");
        assert_eq!(address.hierarchical_path(), "/Robot/Arm/Move");

        address.make_hierarchical();
        assert_eq!(address.component, "Robot/Arm");
        assert_eq!(address.path(), "/Robot/Arm/Move");
    }

    #[test]
    fn test_reserved_events() {
        assert_eq!(ReservedEvent::from_name("CMD_TICK"), Some(ReservedEvent::CmdTick));
        assert_eq!(ReservedEvent::from_name("HALT_RESPONSE"), Some(ReservedEvent::HaltResponse));
        assert_eq!(ReservedEvent::from_name("cmd_tick"), None);
        assert_eq!(Event::send("TICK_RESPONSE").reserved(), Some(ReservedEvent::TickResponse));
    }

    #[test]
    fn test_collect_events() {
        let doc = Document::parse(
            r#"<scxml name="NavSkillCondition">
    <state id="idle">
        <transition event="CMD_TICK" target="call"/>
        <transition event="Broken"/>
    </state>
    <state id="call">
        <onentry>
            <send event="Nav.GetPose.Call">
                <param name="frame_id" expr="'map'"/>
            </send>
        </onentry>
        <transition event="Nav.GetPose.Return" target="idle"/>
    </state>
</scxml>"#,
        )
        .unwrap();

        let events = collect_events(&doc);
        let names: Vec<_> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["CMD_TICK", "Nav.GetPose.Return", "Nav.GetPose.Call"]);

        let send = &events[2];
        assert_eq!(send.kind, EventKind::Send);
        assert_eq!(send.params.get("frame_id").map(String::as_str), Some("'map'"));
        assert_eq!(events[0].target.as_deref(), Some("call"));
    }
}
