//! Clarification questions
//!
//! The supervisor asks one question at a time. `builder` picks the phrasing
//! and options for a field; `render` turns an item into terminal text.

pub mod builder;
pub mod render;

pub use builder::{build, ClarificationField, ClarificationItem, ClarificationKind};
pub use render::{render_clarification, select_options};
