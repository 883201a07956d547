//! Account resources returned by the Accounts endpoints.
//!
//! # Design
//! Accounts are snapshots of server state. They are only ever produced by
//! deserializing a response, so fields are private and there are no setters
//! or `Default` impls. To change an account, issue a request and replace the
//! local value with the account the server returns.
//!
//! Field names follow the API's PascalCase schema.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an account, e.g. `AC` followed by 32 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountSid(String);

impl AccountSid {
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the Sid has the canonical `AC` + 32 hex digit shape. The
    /// server is authoritative, so a malformed Sid is still sent as-is.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 34
            && self.0.starts_with("AC")
            && self.0[2..].bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for AccountSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountSid {
    fn from(sid: &str) -> Self {
        Self(sid.to_string())
    }
}

impl From<String> for AccountSid {
    fn from(sid: String) -> Self {
        Self(sid)
    }
}

impl AsRef<str> for AccountSid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of an account. Transitions are enforced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "suspended")]
    Suspended,
    #[serde(rename = "closed")]
    Closed,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 3] = [
        AccountStatus::Active,
        AccountStatus::Suspended,
        AccountStatus::Closed,
    ];

    /// Value sent in the `Status` parameter and returned by the server.
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown account status {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for AccountStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Billing tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Trial,
    Full,
}

/// A single account as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    sid: AccountSid,
    friendly_name: String,
    status: AccountStatus,
    #[serde(rename = "Type", default)]
    account_type: Option<AccountType>,
    #[serde(default)]
    owner_account_sid: Option<AccountSid>,
    #[serde(default)]
    auth_token: Option<String>,
    #[serde(default, deserialize_with = "rfc2822::deserialize")]
    date_created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "rfc2822::deserialize")]
    date_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    uri: Option<String>,
}

impl Account {
    pub fn sid(&self) -> &AccountSid {
        &self.sid
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn account_type(&self) -> Option<AccountType> {
        self.account_type
    }

    /// The master account that owns this one. Equal to `sid` for a master
    /// account.
    pub fn owner_account_sid(&self) -> Option<&AccountSid> {
        self.owner_account_sid.as_ref()
    }

    /// True when this account is owned by a different account.
    pub fn is_subaccount(&self) -> bool {
        self.owner_account_sid
            .as_ref()
            .is_some_and(|owner| owner != &self.sid)
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn date_created(&self) -> Option<DateTime<Utc>> {
        self.date_created
    }

    pub fn date_updated(&self) -> Option<DateTime<Utc>> {
        self.date_updated
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}

/// One page of an account listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountResult {
    accounts: Vec<Account>,
    page: u32,
    page_size: u32,
    total: u32,
    #[serde(default)]
    num_pages: Option<u32>,
    #[serde(default)]
    start: Option<u32>,
    #[serde(default)]
    end: Option<u32>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    first_page_uri: Option<String>,
    #[serde(default)]
    next_page_uri: Option<String>,
    #[serde(default)]
    previous_page_uri: Option<String>,
    #[serde(default)]
    last_page_uri: Option<String>,
}

impl AccountResult {
    /// Accounts in server order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn into_accounts(self) -> Vec<Account> {
        self.accounts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Account> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total number of accounts across all pages.
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn num_pages(&self) -> Option<u32> {
        self.num_pages
    }

    pub fn start(&self) -> Option<u32> {
        self.start
    }

    pub fn end(&self) -> Option<u32> {
        self.end
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn first_page_uri(&self) -> Option<&str> {
        self.first_page_uri.as_deref()
    }

    pub fn next_page_uri(&self) -> Option<&str> {
        self.next_page_uri.as_deref()
    }

    pub fn previous_page_uri(&self) -> Option<&str> {
        self.previous_page_uri.as_deref()
    }

    pub fn last_page_uri(&self) -> Option<&str> {
        self.last_page_uri.as_deref()
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page_uri.is_some()
    }
}

impl<'a> IntoIterator for &'a AccountResult {
    type Item = &'a Account;
    type IntoIter = std::slice::Iter<'a, Account>;

    fn into_iter(self) -> Self::IntoIter {
        self.accounts.iter()
    }
}

/// Filters for listing accounts. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountListOptions {
    pub friendly_name: Option<String>,
    pub status: Option<AccountStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl AccountListOptions {
    pub fn friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    pub fn status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Query parameters in wire form.
    pub(crate) fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(name) = &self.friendly_name {
            params.push(("FriendlyName", name.clone()));
        }
        if let Some(status) = self.status {
            params.push(("Status", status.as_str().to_string()));
        }
        if let Some(page) = self.page {
            params.push(("Page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            params.push(("PageSize", page_size.to_string()));
        }
        params
    }
}

/// Timestamps use the RFC 2822 form, e.g. `Wed, 04 Aug 2010 21:37:41 +0000`.
mod rfc2822 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                DateTime::parse_from_rfc2822(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}
