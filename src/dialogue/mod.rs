//! Multi-turn dialogue
//!
//! ```text
//! text ─► Supervisor::handle(ctx, text)
//!           │
//!           ├─ nothing pending ─► classify + extract + resolve
//!           └─ one pending     ─► read text as the answer
//!           │
//!           ▼
//!        compute_missing(ctx) ─► empty?     ─► Route(RoutedRequest)
//!                               otherwise   ─► Clarify(one ClarificationItem)
//! ```

pub mod requirements;
pub mod supervisor;
pub mod types;

pub use requirements::{compute_missing, next_field};
pub use supervisor::{Supervisor, SupervisorOutcome};
pub use types::{AggregationLevel, DialogueState, QueryContext, Requirement};
