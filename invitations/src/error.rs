//! Automation error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvitationError {
    #[error("{operation}: response status code {status}")]
    HttpStatus { operation: String, status: u16 },

    #[error("{operation}: network error: {message}")]
    NetworkError { operation: String, message: String },

    #[error("{operation}: unexpected response body: {message}")]
    InvalidResponse { operation: String, message: String },

    #[error("Sending campaign '{campaign_id}' failed: {reason}")]
    CampaignSend { campaign_id: String, reason: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),
}

impl InvitationError {
    pub fn config(field: impl Into<String>) -> Self {
        InvitationError::ConfigurationError { field: field.into() }
    }

    pub fn network(operation: &str, error: impl std::fmt::Display) -> Self {
        InvitationError::NetworkError {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }

    pub fn status(operation: &str, status: u16) -> Self {
        InvitationError::HttpStatus {
            operation: operation.to_string(),
            status,
        }
    }

    pub fn invalid_response(operation: &str, error: impl std::fmt::Display) -> Self {
        InvitationError::InvalidResponse {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }

    /// Only a failed campaign send terminates a run
    pub fn is_fatal(&self) -> bool {
        matches!(self, InvitationError::CampaignSend { .. })
    }
}

pub type InvitationResult<T> = Result<T, InvitationError>;
