//! Client configuration and credentials.
//!
//! `ClientConfig` is the context every operation runs against: where the API
//! lives and which account the caller is authenticated as. `Credentials` are
//! handed to the transport and never leave it.

use std::env;
use std::fmt;

use crate::error::ConfigError;
use crate::types::AccountSid;

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

const ACCOUNT_SID_VAR: &str = "TWILIO_ACCOUNT_SID";
const AUTH_TOKEN_VAR: &str = "TWILIO_AUTH_TOKEN";
const BASE_URL_VAR: &str = "TWILIO_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    account_sid: AccountSid,
}

impl ClientConfig {
    pub fn new(account_sid: impl Into<AccountSid>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            account_sid: account_sid.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Reads `TWILIO_ACCOUNT_SID` and, if set, `TWILIO_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::new(required_var(ACCOUNT_SID_VAR)?);
        Ok(match env::var(BASE_URL_VAR) {
            Ok(url) if !url.is_empty() => config.with_base_url(&url),
            _ => config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The account the caller is authenticated as.
    pub fn account_sid(&self) -> &AccountSid {
        &self.account_sid
    }
}

/// Account Sid and auth token used for HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    account_sid: AccountSid,
    auth_token: String,
}

impl Credentials {
    pub fn new(account_sid: impl Into<AccountSid>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Reads `TWILIO_ACCOUNT_SID` and `TWILIO_AUTH_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(
            required_var(ACCOUNT_SID_VAR)?,
            required_var(AUTH_TOKEN_VAR)?,
        ))
    }

    pub fn account_sid(&self) -> &AccountSid {
        &self.account_sid
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }
}

// Keeps the token out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if value.is_empty() => Err(ConfigError::EmptyVar { name }),
        Ok(value) => Ok(value),
        Err(_) => Err(ConfigError::MissingVar(name)),
    }
}
