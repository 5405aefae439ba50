//! # d-aggregate
//!
//! Windowed event aggregation for streaming pipelines.
//!
//! Events are grouped by a configurable key. A pluggable
//! [`AggregateAction`] accumulates per-group state as events arrive and,
//! once the group's window elapses, concludes the group into derived events.
//! Many pipeline threads may feed the same [`AggregateProcessor`]
//! concurrently; for any one group, handling and concluding never overlap
//! and a window is concluded at most once.
//!
//! ## Quick start
//! ```ignore
//! let config = AggregateProcessorConfig {
//!     group_by_keys: vec!["user".to_string()],
//!     window: Duration::from_secs(60),
//!     action: ActionConfig::new("count"),
//!     ..Default::default()
//! };
//! let processor = AggregateProcessor::builder(config).build()?;
//! let out = processor.execute(records)?;
//! ```

mod action;
pub mod config;
mod constants;
mod errors;
mod event;
mod expression;
mod group;
mod key;
mod metrics;
mod processor;
mod synchronizer;
pub(crate) mod utils;

pub use action::*;
pub use config::*;
pub use errors::*;
pub use event::*;
pub use expression::*;
pub use group::*;
pub use key::*;
pub use metrics::*;
pub use processor::*;
pub use synchronizer::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod errors_test;
