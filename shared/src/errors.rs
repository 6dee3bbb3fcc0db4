//! Shared error types for the invitation automation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Unknown status: {input}")]
    InvalidStatus { input: String },
}
