//! Common test utilities and infrastructure
//!
//! In-memory collaborators with real state, so a whole run can be checked
//! by inspecting what the list and forum look like afterwards.

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{FakeForum, FakeMailingList, OrchestratorBuilder};
