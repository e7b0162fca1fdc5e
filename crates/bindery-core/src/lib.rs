pub mod ids;
pub mod lifecycle;
pub mod selection;
pub mod stats;

pub use lifecycle::{Engine, LifecycleError, LifecyclePolicy, VoteOutcome};
