#![deny(unsafe_code)]

//! # model2code skills
//!
//! Compiler stages that turn a high-level ROS skill statechart into a canonical
//! statechart and the C++ integration sources wiring its events to middleware
//! calls.
//!
//! ## Overview
//!
//! ```text
//! high-level skill ──► canonicalizer ──► <Class>SM.scxml
//!        │                                    │ events
//!        └──── declarations ──► classifier ◄──┘
//!                                   │
//!                              event registry ──► synthesizer ──► .h / .cpp / CMake / package.xml
//! ```
//!
//! - [`canonicalizer`] rewrites middleware tags (`ros_service_send_request`, ...)
//!   into `send` / `transition` elements named `Component.Function.Suffix`.
//! - [`classifier`] resolves an event address against the declarations of the
//!   high-level document: which interaction kind carries it and which fields
//!   flow through it.
//! - [`registry`] keeps each event's classification, computed at most once.
//! - [`template`] is the marker algebra the [`synthesizer`] renders with.
//! - [`pipeline`] drives the stages in order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use model2code_skills::{Pipeline, PipelineMode};
//!
//! fn main() -> model2code_skills::Result<()> {
//!     let report = Pipeline::builder()
//!         .input("skills/nav_skill/src/NavSkill.scxml")
//!         .template_dir("templates/skills/template_skill")
//!         .interface_dir("interfaces")
//!         .mode(PipelineMode::Full)
//!         .build()?
//!         .run()?;
//!
//!     println!("wrote {} files", report.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Template markers
//!
//! Templates mark regions and anchors with comments in three styles:
//! `/*NAME*/` (C++), `#NAME#` (CMake) and `<!--NAME-->` (package manifest).
//! A region runs from `NAME` to `END_NAME`; an anchor is a single marker where
//! rendered fragments are appended.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod error;

pub mod canonicalizer;
pub mod classifier;
pub mod event;
pub mod interface;
pub mod model;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod synthesizer;
pub mod template;

pub use canonicalizer::{Canonicalized, RULES, RewriteRule, canonicalize};
pub use classifier::{Classifier, Classify, InteractionKind, InterfaceClassification};
pub use error::{Result, SkillError};
pub use event::{Event, EventAddress, EventKind, EventSuffix, ReservedEvent, collect_events};
pub use interface::{InterfaceDefinition, InterfaceFamily, InterfaceLibrary};
pub use model::{ComponentModel, InterfaceModel};
pub use naming::{SkillKind, SkillNames};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineMode, PipelineReport, PipelineState};
pub use registry::{EventRecord, EventRegistry, RegistrationReport};
pub use synthesizer::{ArtifactKind, Artifacts, Synthesizer, TemplateSet};
pub use template::{Marker, MarkerStyle, Region, Template};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ArtifactKind, Classifier, Classify, Event, EventRegistry, InteractionKind,
        InterfaceClassification, Pipeline, PipelineMode, PipelineReport, Result, SkillError,
        SkillKind, SkillNames, Synthesizer, TemplateSet,
    };
}
