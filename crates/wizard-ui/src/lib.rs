//! Render projection.
//!
//! Nothing here is a source of truth: every view is recomputed from the
//! conversation store plus the runtime events drained since the last tick.

pub mod state;
pub mod view;
