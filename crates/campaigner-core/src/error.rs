// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Campaigner dispatch engine.

use thiserror::Error;

/// The primary error type used across all Campaigner crates.
#[derive(Debug, Error)]
pub enum CampaignerError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Delivery provider rejected the message or could not be reached.
    ///
    /// `code` carries the provider's HTTP status; it is `None` for transport
    /// failures where no response was received.
    #[error("provider error{}: {message}", code.map(|c| format!(" ({c})")).unwrap_or_default())]
    Provider { code: Option<u16>, message: String },

    /// A campaign lifecycle transition that the state machine does not allow.
    #[error("invalid campaign transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The campaign can no longer be modified in its current status.
    #[error("campaign {campaign_id} is {status} and cannot be modified")]
    Immutable { campaign_id: String, status: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Caller-supplied input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CampaignerError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Provider status code, when the error came from a provider response.
    pub fn provider_code(&self) -> Option<u16> {
        match self {
            Self::Provider { code, .. } => *code,
            _ => None,
        }
    }
}
