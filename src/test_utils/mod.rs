//! Helpers shared by the unit tests: logger setup, event builders and
//! instrumented actions.
mod actions;
mod common;

pub use actions::*;
pub use common::*;
