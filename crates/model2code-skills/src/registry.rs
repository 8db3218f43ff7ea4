//! Event registry for one pipeline run

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::classifier::{Classify, InterfaceClassification};
use crate::error::Result;
use crate::event::{Event, EventAddress, ReservedEvent};

/// A registered event and what it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// The event as first encountered
    pub event: Event,
    /// Parsed address, `None` for reserved or unaddressable names
    pub address: Option<EventAddress>,
    /// Classification (unclassified for reserved or unaddressable names)
    pub classification: InterfaceClassification,
}

impl EventRecord {
    /// Reserved lifecycle event this record stands for, if any
    #[must_use]
    pub fn reserved(&self) -> Option<ReservedEvent> {
        self.event.reserved()
    }
}

/// Registry of events encountered in a canonical statechart
///
/// Provides:
/// - Insertion-ordered iteration (first encounter wins)
/// - At-most-once classification per event name
/// - Lifecycle membership checks for template toggles
///
/// A name is recorded before classification is attempted, so a name whose
/// classification failed is still treated as processed.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    /// Event name → record, `None` while classification is pending or failed
    records: IndexMap<String, Option<EventRecord>>,
}

impl EventRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one event, classifying it unless already seen
    ///
    /// Returns `false` when the name was already registered; nothing is done
    /// in that case.
    ///
    /// # Errors
    ///
    /// Returns the classifier's error. The name stays registered.
    pub fn register(&mut self, event: Event, classifier: &dyn Classify) -> Result<bool> {
        if self.records.contains_key(&event.name) {
            debug!(event = %event.name, "event already processed");
            return Ok(false);
        }
        debug!(event = %event.name, kind = %event.kind, "processing event");
        self.records.insert(event.name.clone(), None);

        let mut address = None;
        let classification = if event.reserved().is_some() {
            InterfaceClassification::unclassified()
        } else if let Some(mut parsed) = EventAddress::parse(&event.name) {
            let classification = classifier.classify(&mut parsed)?;
            address = Some(parsed);
            classification
        } else {
            warn!(event = %event.name, "event name has no component/function address");
            InterfaceClassification::unclassified()
        };

        let name = event.name.clone();
        self.records.insert(
            name,
            Some(EventRecord {
                event,
                address,
                classification,
            }),
        );
        Ok(true)
    }

    /// Register a sequence of events in order
    ///
    /// # Errors
    ///
    /// Stops at the first classification error.
    pub fn populate(
        &mut self,
        events: impl IntoIterator<Item = Event>,
        classifier: &dyn Classify,
    ) -> Result<RegistrationReport> {
        let mut report = RegistrationReport::default();
        for event in events {
            let name = event.name.clone();
            if !self.register(event, classifier)? {
                report.duplicates += 1;
                continue;
            }
            report.registered += 1;
            if let Some(record) = self.get(&name) {
                if record.reserved().is_some() {
                    report.reserved += 1;
                } else if !record.classification.is_classified() {
                    report.unclassified.push(name);
                }
            }
        }
        Ok(report)
    }

    /// Whether an event name has been registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Whether a reserved lifecycle event has been registered
    #[must_use]
    pub fn contains_reserved(&self, event: ReservedEvent) -> bool {
        self.contains(event.as_str())
    }

    /// Record for an event name, if classification completed
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EventRecord> {
        self.records.get(name)?.as_ref()
    }

    /// Completed records in insertion order
    pub fn records(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.values().flatten()
    }

    /// Registered names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Number of registered names
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Report from registering the events of a statechart
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Number of distinct names registered
    pub registered: usize,

    /// Number of repeated names skipped
    pub duplicates: usize,

    /// Number of reserved lifecycle events among the registered
    pub reserved: usize,

    /// Names no declaration matched
    pub unclassified: Vec<String>,
}

impl RegistrationReport {
    /// Check if every non-reserved event was classified
    #[must_use]
    pub fn is_fully_classified(&self) -> bool {
        self.unclassified.is_empty()
    }

    /// Get total events seen
    #[must_use]
    pub fn total(&self) -> usize {
        self.registered + self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{InteractionKind, MockClassify};
    use crate::error::SkillError;

    fn client_classification() -> InterfaceClassification {
        let mut classification = InterfaceClassification::unclassified();
        classification.kind = InteractionKind::ServiceClient;
        classification
    }

    #[test]
    fn test_classifies_each_name_once() {
        let mut classifier = MockClassify::new();
        classifier
            .expect_classify()
            .times(1)
            .returning(|_| Ok(client_classification()));

        let mut registry = EventRegistry::new();
        let report = registry
            .populate(
                vec![
                    Event::transition("Nav.GetPose.Return", "idle"),
                    Event::transition("Nav.GetPose.Return", "done"),
                    Event::send("CMD_TICK"),
                ],
                &classifier,
            )
            .unwrap();

        assert_eq!(report.registered, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.reserved, 1);
        assert_eq!(report.total(), 3);
        assert!(report.is_fully_classified());

        let record = registry.get("Nav.GetPose.Return").unwrap();
        assert_eq!(record.event.target.as_deref(), Some("idle"));
        assert_eq!(record.classification.kind, InteractionKind::ServiceClient);
    }

    #[test]
    fn test_reserved_and_unaddressable_skip_classifier() {
        let mut classifier = MockClassify::new();
        classifier.expect_classify().never();

        let mut registry = EventRegistry::new();
        let report = registry
            .populate(
                vec![Event::transition("CMD_HALT", "halted"), Event::send("Lonely")],
                &classifier,
            )
            .unwrap();

        assert!(registry.contains_reserved(ReservedEvent::CmdHalt));
        assert!(!registry.contains_reserved(ReservedEvent::CmdTick));
        assert_eq!(report.unclassified, vec!["Lonely".to_string()]);
        assert!(registry.get("Lonely").unwrap().address.is_none());
    }

    #[test]
    fn test_insertion_order() {
        let mut classifier = MockClassify::new();
        classifier
            .expect_classify()
            .returning(|_| Ok(InterfaceClassification::unclassified()));

        let mut registry = EventRegistry::new();
        for name in ["B.Two.Call", "A.One.Call", "C.Three.Call", "A.One.Call"] {
            registry.register(Event::send(name), &classifier).unwrap();
        }
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["B.Two.Call", "A.One.Call", "C.Three.Call"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_failed_name_stays_registered() {
        let mut classifier = MockClassify::new();
        classifier
            .expect_classify()
            .times(1)
            .returning(|_| Err(SkillError::missing_declaration("ros_service_send_request", "/Nav/GetPose")));

        let mut registry = EventRegistry::new();
        let event = Event::send("Nav.GetPose.Call");
        assert!(registry.register(event.clone(), &classifier).is_err());
        assert!(registry.contains("Nav.GetPose.Call"));
        assert!(registry.get("Nav.GetPose.Call").is_none());
        assert!(!registry.register(event, &classifier).unwrap());
        assert_eq!(registry.records().count(), 0);
    }
}
