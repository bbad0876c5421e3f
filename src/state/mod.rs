//! State machine module for mode management
//!
//! Provides the controller's three modes:
//! - Idle: waiting for the wake gesture to be held
//! - Armed: waiting for a command gesture to be held
//! - Executing: transient, while a command runs

mod machine;

pub use machine::{Mode, StateMachine, TransitionError};
