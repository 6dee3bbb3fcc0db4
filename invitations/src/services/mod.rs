//! Service implementations
//!
//! Real implementations of the collaborator traits. These are the only
//! places that perform network I/O.

pub mod discourse;
pub mod mailchimp;

#[cfg(test)]
mod tests;

pub use discourse::RealForum;
pub use mailchimp::RealMailingList;
