#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core document model for the model2code skill compiler.
//!
//! This crate provides the two building blocks every pipeline stage shares:
//!
//! - **An arena-backed XML document** ([`Document`]) where every node lives in a
//!   single vector and refers to its parent and children by [`NodeId`]. Rewrites
//!   that insert or remove siblings never invalidate ids held by the caller.
//! - **Tree queries** ([`query`]) that search the document depth-first in
//!   document order: find-first-by-tag, find-first-by-tag-and-attribute and
//!   collect-all-by-tag. They carry no knowledge of any tag vocabulary.
//!
//! # Examples
//!
//! ```rust
//! use model2code_core::{Document, query};
//!
//! # fn example() -> model2code_core::Result<()> {
//! let doc = Document::parse(r#"<scxml name="NavSkill"><state id="idle"/></scxml>"#)?;
//! let state = query::find_first_by_tag(&doc, doc.root(), "state").expect("state exists");
//! assert_eq!(doc.attribute(state, "id"), Some("idle"));
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod query;

pub use document::{Attribute, Document, NodeId, NodeKind};
pub use error::{Result, XmlError};

/// Convenient re-exports of commonly used items.
pub mod prelude {
    pub use crate::document::{Attribute, Document, NodeId, NodeKind};
    pub use crate::error::{Result, XmlError};
    pub use crate::query;
}
