//! Skill synthesis
//!
//! Renders the integration sources of a skill from a template set and the
//! classified events of its canonical statechart. Per artifact:
//!
//! 1. Skill-level placeholders and toggles (`ACTION` in every style, `DATAMODEL`)
//! 2. Lifecycle toggles from the registered reserved events
//! 3. Fragment regions saved into a side table and deleted
//! 4. One fragment set rendered per registered event, in registration order
//! 5. Every anchor cleared
//!
//! Steps 1 to 3 run over all templates before any event is rendered, so a
//! fragment may live in a different template than the anchor it targets.

mod artifact;
mod fragment;
mod placeholder;

pub use artifact::{ArtifactKind, Artifacts, TemplateSet};
pub use fragment::{Anchor, Fragment, FragmentTable};
pub use placeholder::{BLACKBOARD_PACKAGE, Placeholders, response_accessor};

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, warn};

use crate::classifier::InterfaceClassification;
use crate::event::{EventKind, EventSuffix, ReservedEvent};
use crate::interface::InterfaceFamily;
use crate::naming::{SkillKind, SkillNames, to_snake_case};
use crate::registry::{EventRecord, EventRegistry};
use crate::template::{Region, Template};

use placeholder::{
    FIELD_PLACEHOLDER, FIELD_TYPE_PLACEHOLDER, MESSAGE_NAME_PLACEHOLDER, PARAM_PLACEHOLDER,
};

/// Regions kept when a reserved event is registered, deleted otherwise
#[must_use]
pub fn lifecycle_regions(event: ReservedEvent) -> Vec<Region> {
    match event {
        ReservedEvent::CmdTick => {
            let mut regions = vec![Region::block("TICK_CMD")];
            regions.extend(Region::every_style("TICK"));
            regions
        }
        ReservedEvent::CmdHalt => {
            let mut regions = vec![Region::block("HALT_CMD")];
            regions.extend(Region::every_style("HALT"));
            regions
        }
        ReservedEvent::TickResponse => Region::every_style("TICK_RESPONSE").to_vec(),
        ReservedEvent::HaltResponse => Region::every_style("HALT_RESPONSE").to_vec(),
    }
}

/// Renders artifacts from a template set
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
    templates: &'a TemplateSet,
    data_model: bool,
}

impl<'a> Synthesizer<'a> {
    /// Synthesizer over loaded templates
    #[must_use]
    pub fn new(templates: &'a TemplateSet) -> Self {
        Self {
            templates,
            data_model: false,
        }
    }

    /// Keep `DATAMODEL` regions and render the data-model pair
    #[must_use]
    pub fn with_data_model(mut self, enabled: bool) -> Self {
        self.data_model = enabled;
        self
    }

    /// Render every artifact
    #[must_use]
    pub fn synthesize(&self, names: &SkillNames, registry: &EventRegistry) -> Artifacts {
        let skill = Placeholders::for_skill(names);
        let is_action = names.kind() == SkillKind::Action;

        let mut templates: Vec<(ArtifactKind, Template)> = self
            .templates
            .iter()
            .filter(|(kind, _)| self.data_model || !kind.is_data_model())
            .map(|(kind, text)| {
                let mut template = Template::parse(&skill.apply(text));
                for region in Region::every_style("ACTION") {
                    template.toggle(&region, is_action);
                }
                for region in [Region::block("DATAMODEL"), Region::hash("DATAMODEL")] {
                    template.toggle(&region, self.data_model);
                }
                for event in ReservedEvent::ALL {
                    let keep = registry.contains_reserved(event);
                    for region in lifecycle_regions(event) {
                        template.toggle(&region, keep);
                    }
                }
                (kind, template)
            })
            .collect();

        let mut fragments = FragmentTable::new();
        for (_, template) in &mut templates {
            fragments.collect(template);
        }
        debug!(fragments = fragments.len(), "collected fragments");

        let mut files = IndexMap::new();
        for (kind, mut template) in templates {
            let mut renderer = EventRenderer::new(&fragments);
            let rendered = registry
                .records()
                .filter(|record| renderer.render(&mut template, record))
                .count();
            close_anchors(&mut template, kind);
            debug!(artifact = ?kind, events = rendered, "rendered artifact");
            files.insert(kind, template.render());
        }

        info!(
            class = %names.class_name,
            artifacts = files.len(),
            events = registry.len(),
            "synthesized skill"
        );
        Artifacts::new(names.clone(), files)
    }
}

/// Clear every anchor, then any marker no step consumed
fn close_anchors(template: &mut Template, kind: ArtifactKind) {
    for anchor in Anchor::ALL {
        template.clear_anchor(&anchor.marker());
    }
    let leftover: IndexSet<_> = template.markers().cloned().collect();
    for marker in leftover {
        warn!(artifact = ?kind, marker = %marker, "removing unknown marker");
        template.clear_anchor(&marker);
    }
}

/// Per-event list items keyed by the anchor they fill
type Lists = Vec<(Anchor, Vec<String>)>;

/// Renders events into one artifact
struct EventRenderer<'a> {
    fragments: &'a FragmentTable,
    /// Dependencies already inserted, per anchor
    listed: HashSet<(Anchor, String)>,
}

impl<'a> EventRenderer<'a> {
    fn new(fragments: &'a FragmentTable) -> Self {
        Self {
            fragments,
            listed: HashSet::new(),
        }
    }

    /// Render the fragments of one event into an artifact
    ///
    /// Returns `false` when the event has no fragments (reserved, unclassified
    /// or a phase that generates no code).
    fn render(&mut self, artifact: &mut Template, record: &EventRecord) -> bool {
        if record.reserved().is_some() {
            return false;
        }
        let Some(family) = record.classification.kind.family() else {
            debug!(event = %record.event.name, "skipping unclassified event");
            return false;
        };
        let values = Placeholders::for_event(record);
        let suffix = record.address.as_ref().and_then(|address| address.suffix);

        match (record.event.kind, family, suffix) {
            (EventKind::Send, InterfaceFamily::Service, _) => {
                self.service_call(artifact, record, &values);
            }
            (EventKind::Send, InterfaceFamily::Action, Some(EventSuffix::SendGoal)) => {
                self.send_goal(artifact, record, &values);
            }
            (EventKind::Transition, InterfaceFamily::Topic, _) => {
                self.topic_subscription(artifact, record, &values);
            }
            (EventKind::Transition, InterfaceFamily::Action, Some(EventSuffix::FeedbackReturn)) => {
                self.feedback(artifact, record, &values);
            }
            (EventKind::Transition, InterfaceFamily::Action, Some(EventSuffix::GoalResponse)) => {
                self.place(artifact, Fragment::ActionResponseCallbackFnc, Anchor::ActionFncList, &values, &[]);
            }
            (EventKind::Transition, InterfaceFamily::Action, Some(EventSuffix::ResultResponse)) => {
                self.place(artifact, Fragment::ActionResultCallbackFnc, Anchor::ActionFncList, &values, &[]);
                self.place(artifact, Fragment::ActionResultRequest, Anchor::ActionLambdaList, &values, &[]);
            }
            _ => {
                debug!(event = %record.event.name, kind = %record.event.kind, "no fragments for event");
                return false;
            }
        }
        true
    }

    fn service_call(&mut self, artifact: &mut Template, record: &EventRecord, values: &Placeholders) {
        let classification = &record.classification;
        let params = self.items(Fragment::Param, values, record.event.params.keys(), |text, name| {
            text.replace(PARAM_PLACEHOLDER, name)
        });
        let returns = self.items(
            Fragment::ReturnParam,
            values,
            &classification.response_fields,
            |text, field| {
                let accessor = response_accessor(field, classification.field_type(field));
                text.replace(&format!("response->{FIELD_PLACEHOLDER}"), &accessor)
                    .replace(FIELD_PLACEHOLDER, field)
            },
        );
        let sends = self.items(
            Fragment::ReturnParam,
            values,
            &classification.request_fields,
            |text, field| text.replace(FIELD_PLACEHOLDER, field),
        );
        let lists = vec![
            (Anchor::ParamList, params),
            (Anchor::ReturnParamList, returns),
            (Anchor::SendParamList, sends),
        ];

        self.place(artifact, Fragment::SendEventService, Anchor::SendEventList, values, &lists);
        self.place(artifact, Fragment::Interface, Anchor::InterfacesList, values, &[]);
        self.dependencies(artifact, classification, values);
    }

    fn send_goal(&mut self, artifact: &mut Template, record: &EventRecord, values: &Placeholders) {
        let params = self.items(Fragment::SendParam, values, record.event.params.keys(), |text, name| {
            text.replace(PARAM_PLACEHOLDER, name)
        });
        let lists = vec![(Anchor::SendParamList, params)];

        self.place(artifact, Fragment::ActionSendGoal, Anchor::ActionLambdaList, values, &lists);
        self.place(artifact, Fragment::ActionSendGoalFnc, Anchor::ActionFncList, values, &lists);
        self.place(artifact, Fragment::ActionHeader, Anchor::ActionListHeader, values, &lists);
        self.place(artifact, Fragment::ActionSource, Anchor::ActionListSource, values, &lists);
        self.place(artifact, Fragment::ActionInterface, Anchor::InterfacesList, values, &[]);
        self.dependencies(artifact, &record.classification, values);
        fill(artifact, &lists);
    }

    fn topic_subscription(&mut self, artifact: &mut Template, record: &EventRecord, values: &Placeholders) {
        let classification = &record.classification;
        let params = self.items(
            Fragment::TopicParam,
            values,
            &classification.topic_fields,
            |text, field| text.replace(FIELD_PLACEHOLDER, field),
        );
        let lists = vec![(Anchor::TopicParamList, params)];
        let include_values = values.clone().with(
            MESSAGE_NAME_PLACEHOLDER,
            to_snake_case(&classification.service_type_name),
        );

        self.place(artifact, Fragment::TopicSubscription, Anchor::TopicSubscriptionsList, values, &lists);
        self.place(artifact, Fragment::TopicCallback, Anchor::TopicCallbackList, values, &lists);
        self.place(artifact, Fragment::TopicInterface, Anchor::InterfacesList, &include_values, &[]);
        self.place(
            artifact,
            Fragment::TopicSubscriptionHeader,
            Anchor::TopicSubscriptionsListHeader,
            values,
            &[],
        );
        self.place(artifact, Fragment::TopicCallbackHeader, Anchor::TopicCallbackListHeader, values, &[]);
        self.dependencies(artifact, classification, values);
        fill(artifact, &lists);
    }

    fn feedback(&self, artifact: &mut Template, record: &EventRecord, values: &Placeholders) {
        let classification = &record.classification;
        let fields = &classification.feedback_fields;
        let by_name = |text: &str, field: &String| text.replace(FIELD_PLACEHOLDER, field);
        let lists = vec![
            (
                Anchor::FeedbackParamList,
                self.items(Fragment::FeedbackParam, values, fields, by_name),
            ),
            (
                Anchor::FeedbackParamListFnc,
                self.items(Fragment::FeedbackParamFnc, values, fields, by_name),
            ),
            (
                Anchor::FeedbackDataList,
                self.items(Fragment::FeedbackData, values, fields, |text, field| {
                    text.replace(FIELD_TYPE_PLACEHOLDER, classification.field_type(field))
                        .replace(FIELD_PLACEHOLDER, field)
                }),
            ),
        ];

        self.place(artifact, Fragment::ActionFeedbackFnc, Anchor::ActionFncList, values, &lists);
        self.place(artifact, Fragment::ActionFeedback, Anchor::ActionLambdaList, values, &lists);
        fill(artifact, &lists);
    }

    /// Package dependencies, each inserted once per anchor
    fn dependencies(
        &mut self,
        artifact: &mut Template,
        classification: &InterfaceClassification,
        values: &Placeholders,
    ) {
        if classification.is_virtual {
            debug!(interface = %classification.interface_name, "virtual interface, no package dependency");
            return;
        }
        for (fragment, anchor) in [
            (Fragment::BuildInterface, Anchor::BuildInterfaceList),
            (Fragment::BuildPackage, Anchor::BuildPackageList),
            (Fragment::PackageInterface, Anchor::PackageInterfaceList),
        ] {
            let Some(text) = self.compose(fragment, values, &[]) else {
                continue;
            };
            if !self.listed.insert((anchor, text.clone())) {
                debug!(interface = %classification.interface_name, fragment = ?fragment, "dependency already listed");
                continue;
            }
            artifact.insert_after(&anchor.marker(), &text);
        }
    }

    /// One rendered copy of `fragment` per item
    fn items<'i, I>(
        &self,
        fragment: Fragment,
        values: &Placeholders,
        items: impl IntoIterator<Item = &'i I>,
        substitute: impl Fn(&str, &I) -> String,
    ) -> Vec<String>
    where
        I: ?Sized + 'i,
    {
        let Some(text) = self.fragments.get(fragment) else {
            return Vec::new();
        };
        items
            .into_iter()
            .map(|item| values.apply(&substitute(text, item)))
            .collect()
    }

    /// Fragment text with its nested lists filled and placeholders applied
    fn compose(&self, fragment: Fragment, values: &Placeholders, lists: &[(Anchor, Vec<String>)]) -> Option<String> {
        let Some(text) = self.fragments.get(fragment) else {
            debug!(fragment = ?fragment, "fragment not present in any template");
            return None;
        };
        let mut template = Template::parse(text);
        for (anchor, items) in lists {
            let marker = anchor.marker();
            for item in items {
                template.insert_after(&marker, item);
            }
            template.clear_anchor(&marker);
        }
        Some(values.apply(&template.render()))
    }

    fn place(
        &self,
        artifact: &mut Template,
        fragment: Fragment,
        anchor: Anchor,
        values: &Placeholders,
        lists: &[(Anchor, Vec<String>)],
    ) {
        if let Some(text) = self.compose(fragment, values, lists) {
            artifact.insert_after(&anchor.marker(), &text);
        }
    }
}

/// List items for anchors placed directly in the artifact
fn fill(artifact: &mut Template, lists: &Lists) {
    for (anchor, items) in lists {
        let marker = anchor.marker();
        for item in items {
            artifact.insert_after(&marker, item);
        }
    }
}
