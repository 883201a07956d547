//! Asynchronous client for the Accounts resource of the Twilio REST API.
//!
//! # Overview
//! `TwilioClient` exposes one async method per endpoint: fetch the
//! authenticated account or a subaccount, list subaccounts, create a
//! subaccount, change a subaccount's status and rename the account. Each
//! method resolves to the typed account snapshot the server returned or to
//! an `ApiError`.
//!
//! # Design
//! - Endpoint methods are configuration only. They describe a `RestRequest`
//!   (resource template, verb, url segments, parameters, root element) and
//!   pass it to `RequestDispatcher`.
//! - `RequestDispatcher` builds plain `HttpRequest` data, sends it through a
//!   `Transport`, and unwraps and deserializes the JSON response. Unbound
//!   template placeholders are rejected before the transport is called.
//! - The authenticated account Sid lives on `ClientConfig` and is passed to
//!   every build; credentials live on the transport.
//! - `ReqwestTransport` is the default transport. Tests and hosts can supply
//!   their own.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod request;
pub mod transport;
pub mod types;

pub use client::TwilioClient;
pub use config::{ClientConfig, Credentials, DEFAULT_BASE_URL};
pub use dispatch::{parse_response, RequestDispatcher};
pub use error::{ApiError, ConfigError, RestException};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::{ResourceTemplate, RestRequest};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::{
    Account, AccountListOptions, AccountResult, AccountSid, AccountStatus, AccountType,
    ParseStatusError,
};
