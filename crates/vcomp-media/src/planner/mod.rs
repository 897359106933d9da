//! Planners: pure functions from validated parameters plus probed media
//! facts to invariant-satisfying plans.
//!
//! No planner performs I/O. Every planner either returns a complete plan
//! or fails explicitly; partial plans never leave this module.

pub mod concat;
pub mod merge;
pub mod overlay;
pub mod parallax;

pub use concat::{plan_concat, SegmentMedia};
pub use merge::{mix_weights, plan_merge};
pub use overlay::plan_overlay;
pub use parallax::plan_parallax;
