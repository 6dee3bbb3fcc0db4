//! Membership invitation automation
//!
//! Reconciles makerspace survey respondents against the mailing list, keeps
//! the invitation campaign in step with the forum's Open Evening calendar,
//! sends it and archives the invited members. Runs are recorded on the forum.

pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod reporting;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::Settings;
pub use core::{ContentSynchronizer, EligibilityResolver, Field, FieldValue, MemberDirectory, Scheduler};
pub use error::{InvitationError, InvitationResult};
pub use orchestrator::{EligibilityOutcome, Orchestrator, RunOptions};
pub use traits::{Forum, MailingList};
