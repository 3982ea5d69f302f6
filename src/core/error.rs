//! Error handling for product publishing
//!
//! Every workflow stage fails fast with one of these variants; the binary is
//! the only place an error becomes a process exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the publish workflow
#[derive(Error, Debug)]
pub enum PublishError {
    // Resolution errors
    #[error("unsupported reference format for API '{api}': direct name/version lookup is not implemented")]
    UnsupportedReferenceFormat { api: String },

    #[error("API reference '{reference}' could not be loaded from {path}: {message}")]
    ReferenceNotFound {
        reference: String,
        path: PathBuf,
        message: String,
    },

    #[error("product descriptor {path} is invalid: {message}")]
    DescriptorInvalid { path: PathBuf, message: String },

    // Payload assembly errors
    #[error("failed to stage publish payload: {message}")]
    Staging { message: String },

    // Configuration errors
    #[error("invalid settings: {message}")]
    InvalidSettings { message: String },

    // Remote workflow errors
    #[error("authentication against the manager failed: {message}")]
    AuthenticationFailure { message: String },

    #[error("product publish failed: {message}")]
    PublishFailure { message: String },

    #[error("product verification failed: state is {} (expected \"published\")", format_state(.state))]
    VerificationFailure { state: Option<String> },

    // `state` carries only a remote subscription state; request/transport
    // failures use `SubscriptionRequestFailed` instead.
    #[error("subscription verification failed: state is {} (expected \"enabled\")", format_state(.state))]
    SubscriptionFailure { state: Option<String> },

    #[error("subscription request failed: {message}")]
    SubscriptionRequestFailed { message: String },

    // Internal guard: the workflow attempted a transition outside the
    // Init -> Authenticated -> Published -> Verified -> Subscribed -> Done chain.
    #[error("illegal workflow transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}

fn format_state(state: &Option<String>) -> String {
    match state {
        Some(s) => format!("\"{}\"", s),
        None => "absent".to_string(),
    }
}

impl PublishError {
    /// Get the stable error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedReferenceFormat { .. } => "UNSUPPORTED_REFERENCE_FORMAT",
            Self::ReferenceNotFound { .. } => "REFERENCE_NOT_FOUND",
            Self::DescriptorInvalid { .. } => "DESCRIPTOR_INVALID",
            Self::Staging { .. } => "STAGING_FAILED",
            Self::InvalidSettings { .. } => "INVALID_SETTINGS",
            Self::AuthenticationFailure { .. } => "AUTHENTICATION_FAILURE",
            Self::PublishFailure { .. } => "PUBLISH_FAILURE",
            Self::VerificationFailure { .. } => "VERIFICATION_FAILURE",
            Self::SubscriptionFailure { .. } => "SUBSCRIPTION_FAILURE",
            Self::SubscriptionRequestFailed { .. } => "SUBSCRIPTION_REQUEST_FAILED",
            Self::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
        }
    }

    /// Process exit code for this error; each variant maps to a distinct
    /// non-zero status so CI steps can branch on the failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnsupportedReferenceFormat { .. } => 10,
            Self::ReferenceNotFound { .. } => 11,
            Self::DescriptorInvalid { .. } => 12,
            Self::Staging { .. } => 13,
            Self::InvalidSettings { .. } => 14,
            Self::AuthenticationFailure { .. } => 20,
            Self::PublishFailure { .. } => 21,
            Self::VerificationFailure { .. } => 22,
            Self::SubscriptionFailure { .. } => 23,
            Self::SubscriptionRequestFailed { .. } => 24,
            Self::IllegalTransition { .. } => 70,
        }
    }
}
