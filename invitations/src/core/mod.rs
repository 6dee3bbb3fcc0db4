//! Pure automation logic
//!
//! Member snapshot and field resolution, campaign content patching, the
//! event cadence and audit formatting. Network access only happens through
//! the traits passed in.

pub mod audit;
pub mod calendar;
pub mod content;
pub mod directory;
pub mod eligibility;
pub mod scheduler;

pub use content::ContentSynchronizer;
pub use directory::MemberDirectory;
pub use eligibility::{EligibilityResolver, Field, FieldValue};
pub use scheduler::Scheduler;
