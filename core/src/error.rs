//! Error types for the Twilio client.
//!
//! # Design
//! Variants fall into four groups. Caller-contract violations are detected
//! before anything reaches the transport. Transport failures wrap whatever the
//! transport reported. Remote failures carry the non-2xx status, with the
//! Twilio `RestException` envelope decoded when the body has one. Decoding
//! failures cover a missing root element or a payload of the wrong shape.

use serde::Deserialize;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by `RequestDispatcher` and `TwilioClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The resource template has unbalanced or empty braces.
    #[error("malformed resource template `{0}`")]
    InvalidTemplate(String),

    /// A `{placeholder}` in the resource template has no value.
    #[error("url segment `{name}` is not bound for resource `{resource}`")]
    UnboundSegment { name: String, resource: String },

    /// A url segment was bound to an empty value, or rendered to `.` or `..`.
    #[error("invalid value {value:?} for url segment `{name}`")]
    InvalidSegment { name: String, value: String },

    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),

    /// The authenticated account tried to change its own status through the
    /// subaccount path.
    #[error("subaccount status can only be changed when authenticated from the master account")]
    SelfStatusChange,

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// A non-2xx response carrying a Twilio error envelope.
    #[error("{0}")]
    Rest(RestException),

    /// A non-2xx response without a recognizable error envelope.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("root element `{0}` missing from response")]
    MissingRootElement(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// True for failures raised locally, before any request was sent.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidTemplate(_)
                | ApiError::UnboundSegment { .. }
                | ApiError::InvalidSegment { .. }
                | ApiError::InvalidBaseUrl(_)
                | ApiError::SelfStatusChange
        )
    }

    /// HTTP status of a remote failure, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::Rest(e) => Some(e.status),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error details Twilio returns in the body of a failed request.
///
/// Wire form: `{"RestException": {"Status": 400, "Code": 20003, "Message": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Error)]
#[serde(rename_all = "PascalCase")]
#[error("Twilio error {code} (HTTP {status}): {message}")]
pub struct RestException {
    pub status: u16,
    #[serde(default)]
    pub code: u32,
    pub message: String,
    #[serde(default)]
    pub more_info: Option<String>,
}

#[derive(Deserialize)]
struct RestExceptionEnvelope {
    #[serde(rename = "RestException")]
    exception: RestException,
}

impl RestException {
    /// Decode the envelope from a response body, if it has one.
    pub(crate) fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<RestExceptionEnvelope>(body)
            .ok()
            .map(|e| e.exception)
    }
}

/// Failure setting up a client from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    MissingVar(&'static str),

    #[error("environment variable `{name}` is empty")]
    EmptyVar { name: &'static str },

    #[error("failed to set up transport: {0}")]
    Transport(#[from] TransportError),
}
