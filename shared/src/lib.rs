//! Shared types for the survey invitation automation
//!
//! Contains the data model exchanged between the automation core and its
//! REST collaborators, the shared error type and logging setup.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use logging::LogSink;
pub use types::*;
