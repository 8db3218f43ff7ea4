//! Reusable template fragments and the anchors they are inserted at

use std::collections::HashMap;

use tracing::debug;

use crate::template::{Marker, MarkerStyle, Region, Template};

/// A region cut out of a template and rendered once per event
///
/// Variants are declared in extraction order: fragments nested inside another
/// fragment come first, so the outer one is saved with an anchor in their place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Service request parameter assignment
    Param,
    /// Response or request field forwarded to the state machine
    ReturnParam,
    /// Topic message field forwarded to the state machine
    TopicParam,
    /// Service call bound to a send event
    SendEventService,
    /// Topic callback body
    TopicCallback,
    /// Topic subscription
    TopicSubscription,
    /// Action client member initialization
    ActionSource,
    /// Goal field assignment
    SendParam,
    /// Feedback field forwarded from the lambda
    FeedbackParam,
    /// Feedback field forwarded from the callback function
    FeedbackParamFnc,
    /// Feedback field storage
    FeedbackData,
    /// Send-goal lambda
    ActionSendGoal,
    /// Result request lambda
    ActionResultRequest,
    /// Feedback lambda
    ActionFeedback,
    /// Send-goal function
    ActionSendGoalFnc,
    /// Result callback function
    ActionResultCallbackFnc,
    /// Feedback callback function
    ActionFeedbackFnc,
    /// Goal response callback function
    ActionResponseCallbackFnc,
    /// Service interface include
    Interface,
    /// Topic message include
    TopicInterface,
    /// Topic callback declaration
    TopicCallbackHeader,
    /// Topic subscription member
    TopicSubscriptionHeader,
    /// Action client declarations
    ActionHeader,
    /// Action interface include
    ActionInterface,
    /// `find_package` line of the build manifest
    BuildInterface,
    /// Target dependency of the build manifest
    BuildPackage,
    /// Dependency of the package manifest
    PackageInterface,
}

impl Fragment {
    /// Every fragment in extraction order
    pub const ALL: [Self; 27] = [
        Self::Param,
        Self::ReturnParam,
        Self::TopicParam,
        Self::SendEventService,
        Self::TopicCallback,
        Self::TopicSubscription,
        Self::ActionSource,
        Self::SendParam,
        Self::FeedbackParam,
        Self::FeedbackParamFnc,
        Self::FeedbackData,
        Self::ActionSendGoal,
        Self::ActionResultRequest,
        Self::ActionFeedback,
        Self::ActionSendGoalFnc,
        Self::ActionResultCallbackFnc,
        Self::ActionFeedbackFnc,
        Self::ActionResponseCallbackFnc,
        Self::Interface,
        Self::TopicInterface,
        Self::TopicCallbackHeader,
        Self::TopicSubscriptionHeader,
        Self::ActionHeader,
        Self::ActionInterface,
        Self::BuildInterface,
        Self::BuildPackage,
        Self::PackageInterface,
    ];

    /// Delimiting region
    #[must_use]
    pub fn region(self) -> Region {
        let (style, name) = match self {
            Self::Param => (MarkerStyle::Block, "PARAM"),
            Self::ReturnParam => (MarkerStyle::Block, "RETURN_PARAM"),
            Self::TopicParam => (MarkerStyle::Block, "TOPIC_PARAM"),
            Self::SendEventService => (MarkerStyle::Block, "SEND_EVENT_SRV"),
            Self::TopicCallback => (MarkerStyle::Block, "TOPIC_CALLBACK"),
            Self::TopicSubscription => (MarkerStyle::Block, "TOPIC_SUBSCRIPTION"),
            Self::ActionSource => (MarkerStyle::Block, "ACTION_C"),
            Self::SendParam => (MarkerStyle::Block, "SEND_PARAM"),
            Self::FeedbackParam => (MarkerStyle::Block, "FEEDBACK_PARAM"),
            Self::FeedbackParamFnc => (MarkerStyle::Block, "FEEDBACK_PARAM_FNC"),
            Self::FeedbackData => (MarkerStyle::Block, "FEEDBACK_DATA"),
            Self::ActionSendGoal => (MarkerStyle::Block, "ACTION_SEND_GOAL"),
            Self::ActionResultRequest => (MarkerStyle::Block, "ACTION_RESULT_REQUEST"),
            Self::ActionFeedback => (MarkerStyle::Block, "ACTION_FEEDBACK"),
            Self::ActionSendGoalFnc => (MarkerStyle::Block, "ACTION_SEND_GOAL_FNC"),
            Self::ActionResultCallbackFnc => (MarkerStyle::Block, "ACTION_RESULT_CALLBACK_FNC"),
            Self::ActionFeedbackFnc => (MarkerStyle::Block, "ACTION_FEEDBACK_FNC"),
            Self::ActionResponseCallbackFnc => {
                (MarkerStyle::Block, "ACTION_RESPONSE_CALLBACK_FNC")
            }
            Self::Interface => (MarkerStyle::Block, "INTERFACE"),
            Self::TopicInterface => (MarkerStyle::Block, "TOPIC_INTERFACE"),
            Self::TopicCallbackHeader => (MarkerStyle::Block, "TOPIC_CALLBACK_H"),
            Self::TopicSubscriptionHeader => (MarkerStyle::Block, "TOPIC_SUBSCRIPTION_H"),
            Self::ActionHeader => (MarkerStyle::Block, "ACTION_H"),
            Self::ActionInterface => (MarkerStyle::Block, "ACTION_INTERFACE"),
            Self::BuildInterface => (MarkerStyle::Hash, "INTERFACE"),
            Self::BuildPackage => (MarkerStyle::Hash, "PACKAGE"),
            Self::PackageInterface => (MarkerStyle::Xml, "INTERFACE"),
        };
        Region::new(style, name)
    }
}

/// A repeatable insertion point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// `/*SEND_EVENT_LIST*/`
    SendEventList,
    /// `/*PARAM_LIST*/`
    ParamList,
    /// `/*RETURN_PARAM_LIST*/`
    ReturnParamList,
    /// `/*SEND_PARAM_LIST*/`
    SendParamList,
    /// `/*TOPIC_SUBSCRIPTIONS_LIST*/`
    TopicSubscriptionsList,
    /// `/*TOPIC_CALLBACK_LIST*/`
    TopicCallbackList,
    /// `/*TOPIC_PARAM_LIST*/`
    TopicParamList,
    /// `/*ACTION_LIST_C*/`
    ActionListSource,
    /// `/*FEEDBACK_PARAM_LIST*/`
    FeedbackParamList,
    /// `/*FEEDBACK_PARAM_LIST_FNC*/`
    FeedbackParamListFnc,
    /// `/*FEEDBACK_DATA_LIST*/`
    FeedbackDataList,
    /// `/*ACTION_LAMBDA_LIST*/`
    ActionLambdaList,
    /// `/*ACTION_FNC_LIST*/`
    ActionFncList,
    /// `/*INTERFACES_LIST*/`
    InterfacesList,
    /// `/*TOPIC_SUBSCRIPTIONS_LIST_H*/`
    TopicSubscriptionsListHeader,
    /// `/*TOPIC_CALLBACK_LIST_H*/`
    TopicCallbackListHeader,
    /// `/*ACTION_LIST_H*/`
    ActionListHeader,
    /// `#INTERFACE_LIST#`
    BuildInterfaceList,
    /// `#PACKAGE_LIST#`
    BuildPackageList,
    /// `<!--INTERFACE_LIST-->`
    PackageInterfaceList,
}

impl Anchor {
    /// Every anchor, cleared at the end of each artifact
    pub const ALL: [Self; 20] = [
        Self::SendEventList,
        Self::ParamList,
        Self::ReturnParamList,
        Self::SendParamList,
        Self::TopicSubscriptionsList,
        Self::TopicCallbackList,
        Self::TopicParamList,
        Self::ActionListSource,
        Self::FeedbackParamList,
        Self::FeedbackParamListFnc,
        Self::FeedbackDataList,
        Self::ActionLambdaList,
        Self::ActionFncList,
        Self::InterfacesList,
        Self::TopicSubscriptionsListHeader,
        Self::TopicCallbackListHeader,
        Self::ActionListHeader,
        Self::BuildInterfaceList,
        Self::BuildPackageList,
        Self::PackageInterfaceList,
    ];

    /// Marker token of the anchor
    #[must_use]
    pub fn marker(self) -> Marker {
        let (style, name) = match self {
            Self::SendEventList => (MarkerStyle::Block, "SEND_EVENT_LIST"),
            Self::ParamList => (MarkerStyle::Block, "PARAM_LIST"),
            Self::ReturnParamList => (MarkerStyle::Block, "RETURN_PARAM_LIST"),
            Self::SendParamList => (MarkerStyle::Block, "SEND_PARAM_LIST"),
            Self::TopicSubscriptionsList => (MarkerStyle::Block, "TOPIC_SUBSCRIPTIONS_LIST"),
            Self::TopicCallbackList => (MarkerStyle::Block, "TOPIC_CALLBACK_LIST"),
            Self::TopicParamList => (MarkerStyle::Block, "TOPIC_PARAM_LIST"),
            Self::ActionListSource => (MarkerStyle::Block, "ACTION_LIST_C"),
            Self::FeedbackParamList => (MarkerStyle::Block, "FEEDBACK_PARAM_LIST"),
            Self::FeedbackParamListFnc => (MarkerStyle::Block, "FEEDBACK_PARAM_LIST_FNC"),
            Self::FeedbackDataList => (MarkerStyle::Block, "FEEDBACK_DATA_LIST"),
            Self::ActionLambdaList => (MarkerStyle::Block, "ACTION_LAMBDA_LIST"),
            Self::ActionFncList => (MarkerStyle::Block, "ACTION_FNC_LIST"),
            Self::InterfacesList => (MarkerStyle::Block, "INTERFACES_LIST"),
            Self::TopicSubscriptionsListHeader => {
                (MarkerStyle::Block, "TOPIC_SUBSCRIPTIONS_LIST_H")
            }
            Self::TopicCallbackListHeader => (MarkerStyle::Block, "TOPIC_CALLBACK_LIST_H"),
            Self::ActionListHeader => (MarkerStyle::Block, "ACTION_LIST_H"),
            Self::BuildInterfaceList => (MarkerStyle::Hash, "INTERFACE_LIST"),
            Self::BuildPackageList => (MarkerStyle::Hash, "PACKAGE_LIST"),
            Self::PackageInterfaceList => (MarkerStyle::Xml, "INTERFACE_LIST"),
        };
        Marker::new(style, name)
    }
}

/// Fragments saved from the templates of one run
///
/// The first template a fragment is found in provides its text.
#[derive(Debug, Clone, Default)]
pub struct FragmentTable {
    fragments: HashMap<Fragment, String>,
}

impl FragmentTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Save and delete every fragment region of a template
    pub fn collect(&mut self, template: &mut Template) {
        for fragment in Fragment::ALL {
            let region = fragment.region();
            if let Some(text) = template.extract(&region) {
                if !self.fragments.contains_key(&fragment) {
                    debug!(fragment = %region.open, "saved fragment");
                    self.fragments.insert(fragment, text);
                }
            }
            template.delete(&region);
        }
    }

    /// Saved text of a fragment
    #[must_use]
    pub fn get(&self, fragment: Fragment) -> Option<&str> {
        self.fragments.get(&fragment).map(String::as_str)
    }

    /// Number of saved fragments
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Check if nothing was saved
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
