//! Accounts endpoints of the Twilio REST API.
//!
//! # Design
//! Each endpoint is a `build_*` method that only selects a resource, verb,
//! root element and parameters, plus an async method that hands the built
//! request to the `RequestDispatcher`. The `build_*` half does no I/O and is
//! where local preconditions are checked, so request shape can be tested
//! without a transport.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::config::{ClientConfig, Credentials};
use crate::dispatch::RequestDispatcher;
use crate::error::{ApiError, ConfigError};
use crate::request::{RestRequest, ACCOUNT_SID_SEGMENT};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Account, AccountListOptions, AccountResult, AccountSid, AccountStatus};

const ACCOUNT_RESOURCE: &str = "Accounts/{AccountSid}";
const ACCOUNTS_RESOURCE: &str = "Accounts";
const ACCOUNT_ROOT: &str = "Account";

/// Client for the Accounts resource, bound to one authenticated account.
///
/// Cloning is cheap; clones share the transport.
pub struct TwilioClient<T: ?Sized> {
    config: ClientConfig,
    dispatcher: RequestDispatcher<T>,
}

impl<T: ?Sized> Clone for TwilioClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for TwilioClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TwilioClient<ReqwestTransport> {
    /// Client for the public API using `TWILIO_ACCOUNT_SID`,
    /// `TWILIO_AUTH_TOKEN` and optionally `TWILIO_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ClientConfig::from_env()?;
        let transport = ReqwestTransport::new(Credentials::from_env()?)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> TwilioClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            dispatcher: RequestDispatcher::new(transport),
        }
    }
}

impl<T: Transport + ?Sized> TwilioClient<T> {
    pub fn with_shared_transport(config: ClientConfig, transport: Arc<T>) -> Self {
        Self {
            config,
            dispatcher: RequestDispatcher::from_arc(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The account this client is authenticated as.
    pub fn account_sid(&self) -> &AccountSid {
        self.config.account_sid()
    }

    pub fn dispatcher(&self) -> &RequestDispatcher<T> {
        &self.dispatcher
    }

    pub fn build_get_account(&self) -> Result<RestRequest, ApiError> {
        Ok(RestRequest::get(ACCOUNT_RESOURCE)?.root_element(ACCOUNT_ROOT))
    }

    pub fn build_get_account_by_sid(&self, sid: &AccountSid) -> Result<RestRequest, ApiError> {
        Ok(self
            .build_get_account()?
            .url_segment(ACCOUNT_SID_SEGMENT, sid.as_str()))
    }

    pub fn build_list_subaccounts(
        &self,
        options: &AccountListOptions,
    ) -> Result<RestRequest, ApiError> {
        let request = RestRequest::get(ACCOUNTS_RESOURCE)?;
        Ok(options
            .parameters()
            .into_iter()
            .fold(request, |req, (name, value)| req.parameter(name, value)))
    }

    pub fn build_create_subaccount(&self, friendly_name: &str) -> Result<RestRequest, ApiError> {
        Ok(RestRequest::post(ACCOUNTS_RESOURCE)?
            .root_element(ACCOUNT_ROOT)
            .parameter("FriendlyName", friendly_name))
    }

    /// Fails with `ApiError::SelfStatusChange` when `sid` is the
    /// authenticated account.
    pub fn build_change_subaccount_status(
        &self,
        sid: &AccountSid,
        status: AccountStatus,
    ) -> Result<RestRequest, ApiError> {
        if sid == self.account_sid() {
            warn!(%sid, "refusing to change the status of the authenticated account");
            return Err(ApiError::SelfStatusChange);
        }
        Ok(RestRequest::post(ACCOUNT_RESOURCE)?
            .root_element(ACCOUNT_ROOT)
            .parameter("Status", status.as_str())
            .url_segment(ACCOUNT_SID_SEGMENT, sid.as_str()))
    }

    pub fn build_update_account_name(&self, friendly_name: &str) -> Result<RestRequest, ApiError> {
        Ok(RestRequest::post(ACCOUNT_RESOURCE)?
            .root_element(ACCOUNT_ROOT)
            .parameter("FriendlyName", friendly_name))
    }

    /// Details of the authenticated account.
    pub async fn get_account(&self) -> Result<Account, ApiError> {
        let request = self.build_get_account()?;
        self.dispatcher.execute(&self.config, &request).await
    }

    /// Details of a subaccount.
    pub async fn get_account_by_sid(&self, sid: &AccountSid) -> Result<Account, ApiError> {
        let request = self.build_get_account_by_sid(sid)?;
        self.dispatcher.execute(&self.config, &request).await
    }

    /// All accounts visible to the authenticated account: itself and its
    /// subaccounts.
    pub async fn list_subaccounts(&self) -> Result<AccountResult, ApiError> {
        self.list_subaccounts_with(&AccountListOptions::default())
            .await
    }

    pub async fn list_subaccounts_with(
        &self,
        options: &AccountListOptions,
    ) -> Result<AccountResult, ApiError> {
        let request = self.build_list_subaccounts(options)?;
        self.dispatcher.execute(&self.config, &request).await
    }

    /// Create a subaccount under the authenticated account. `friendly_name`
    /// may be empty.
    pub async fn create_subaccount(&self, friendly_name: &str) -> Result<Account, ApiError> {
        let request = self.build_create_subaccount(friendly_name)?;
        self.dispatcher.execute(&self.config, &request).await
    }

    /// Change the status of a subaccount. Only the master account may do
    /// this, and never on itself.
    ///
    /// Closing is permanent: the server releases the account's phone numbers
    /// and a closed account cannot be reopened.
    pub async fn change_subaccount_status(
        &self,
        sid: &AccountSid,
        status: AccountStatus,
    ) -> Result<Account, ApiError> {
        let request = self.build_change_subaccount_status(sid, status)?;
        self.dispatcher.execute(&self.config, &request).await
    }

    /// Rename the authenticated account.
    pub async fn update_account_name(&self, friendly_name: &str) -> Result<Account, ApiError> {
        let request = self.build_update_account_name(friendly_name)?;
        self.dispatcher.execute(&self.config, &request).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};
    use crate::transport::TransportError;

    const SELF_SID: &str = "AC00000000000000000000000000000001";
    const OTHER_SID: &str = "AC00000000000000000000000000000002";

    /// Replays queued responses in order and records every request.
    #[derive(Default)]
    struct Recording {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Recording {
        fn replying(bodies: &[(u16, &str)]) -> Self {
            let responses = bodies
                .iter()
                .map(|(status, body)| HttpResponse {
                    status: *status,
                    headers: Vec::new(),
                    body: body.to_string(),
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Recording {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::new("no response queued"))
        }
    }

    fn client(transport: Recording) -> TwilioClient<Recording> {
        let config = ClientConfig::new(SELF_SID).with_base_url("http://localhost:3000/2010-04-01");
        TwilioClient::new(config, transport)
    }

    fn account_body(sid: &str, name: &str, status: &str) -> String {
        format!(r#"{{"Account":{{"Sid":"{sid}","FriendlyName":"{name}","Status":"{status}","OwnerAccountSid":"{SELF_SID}"}}}}"#)
    }

    #[tokio::test]
    async fn get_account_uses_authenticated_sid() {
        let body = account_body(SELF_SID, "Main", "active");
        let client = client(Recording::replying(&[(200, body.as_str())]));

        let account = client.get_account().await.unwrap();
        assert_eq!(account.sid(), client.account_sid());

        let requests = client.dispatcher().transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(
            requests[0].url,
            format!("http://localhost:3000/2010-04-01/Accounts/{SELF_SID}")
        );
        assert!(requests[0].body.is_none());
    }

    #[tokio::test]
    async fn get_account_by_sid_targets_subaccount() {
        let body = account_body(OTHER_SID, "Sub", "active");
        let client = client(Recording::replying(&[(200, body.as_str())]));

        let account = client
            .get_account_by_sid(&AccountSid::from(OTHER_SID))
            .await
            .unwrap();
        assert_eq!(account.sid().as_str(), OTHER_SID);
        assert!(account.is_subaccount());

        let requests = client.dispatcher().transport().requests();
        assert!(requests[0].url.ends_with(&format!("/Accounts/{OTHER_SID}")));
    }

    #[tokio::test]
    async fn list_subaccounts_preserves_order_and_count() {
        let body = format!(
            r#"{{"Accounts":[
                {{"Sid":"{SELF_SID}","FriendlyName":"Main","Status":"active"}},
                {{"Sid":"AC3","FriendlyName":"third","Status":"closed"}},
                {{"Sid":"{OTHER_SID}","FriendlyName":"second","Status":"suspended"}}
            ],"Page":0,"PageSize":50,"Total":3}}"#
        );
        let client = client(Recording::replying(&[(200, body.as_str())]));

        let result = client.list_subaccounts().await.unwrap();
        let sids: Vec<&str> = result.iter().map(|a| a.sid().as_str()).collect();
        assert_eq!(sids, [SELF_SID, "AC3", OTHER_SID]);
        assert_eq!(result.total(), 3);

        let requests = client.dispatcher().transport().requests();
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].url, "http://localhost:3000/2010-04-01/Accounts");
    }

    #[test]
    fn list_filters_become_query_parameters() {
        let client = client(Recording::default());
        let options = AccountListOptions::default()
            .friendly_name("Test")
            .status(AccountStatus::Active);
        let req = client
            .build_list_subaccounts(&options)
            .unwrap()
            .build(client.config())
            .unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/2010-04-01/Accounts?FriendlyName=Test&Status=active"
        );
    }

    #[tokio::test]
    async fn create_subaccount_posts_friendly_name() {
        let body = account_body(OTHER_SID, "Test", "active");
        let client = client(Recording::replying(&[(201, body.as_str())]));

        let account = client.create_subaccount("Test").await.unwrap();
        assert_eq!(account.friendly_name(), "Test");

        let requests = client.dispatcher().transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].url, "http://localhost:3000/2010-04-01/Accounts");
        assert_eq!(requests[0].body.as_deref(), Some("FriendlyName=Test"));
    }

    #[tokio::test]
    async fn change_own_status_fails_before_sending() {
        let client = client(Recording::default());

        for status in AccountStatus::ALL {
            let err = client
                .change_subaccount_status(&AccountSid::from(SELF_SID), status)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::SelfStatusChange));
            assert!(err.is_contract_violation());
        }
        assert!(client.dispatcher().transport().requests().is_empty());
    }

    #[tokio::test]
    async fn change_status_of_dot_sid_fails_before_sending() {
        let client = client(Recording::default());

        for sid in [".", ".."] {
            let err = client
                .change_subaccount_status(&AccountSid::from(sid), AccountStatus::Closed)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidSegment { .. }), "{sid}: {err:?}");
            assert!(err.is_contract_violation());
        }
        assert!(client.dispatcher().transport().requests().is_empty());
    }

    #[tokio::test]
    async fn close_subaccount_posts_lower_case_status() {
        let body = account_body(OTHER_SID, "Sub", "closed");
        let client = client(Recording::replying(&[(200, body.as_str())]));

        let account = client
            .change_subaccount_status(&AccountSid::from(OTHER_SID), AccountStatus::Closed)
            .await
            .unwrap();
        assert_eq!(account.status(), AccountStatus::Closed);

        let requests = client.dispatcher().transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(
            requests[0].url,
            format!("http://localhost:3000/2010-04-01/Accounts/{OTHER_SID}")
        );
        assert_eq!(requests[0].body.as_deref(), Some("Status=closed"));
    }

    #[tokio::test]
    async fn update_account_name_targets_self() {
        let body = account_body(SELF_SID, "Renamed", "active");
        let client = client(Recording::replying(&[(200, body.as_str())]));

        let account = client.update_account_name("Renamed").await.unwrap();
        assert_eq!(account.friendly_name(), "Renamed");

        let requests = client.dispatcher().transport().requests();
        assert_eq!(
            requests[0].url,
            format!("http://localhost:3000/2010-04-01/Accounts/{SELF_SID}")
        );
        assert_eq!(requests[0].body.as_deref(), Some("FriendlyName=Renamed"));
    }

    #[tokio::test]
    async fn failed_request_yields_error_not_account() {
        let body = r#"{"RestException":{"Status":404,"Code":20404,"Message":"not found"}}"#;
        let client = client(Recording::replying(&[(404, body)]));

        let err = client
            .get_account_by_sid(&AccountSid::from(OTHER_SID))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn concurrent_calls_do_not_interfere() {
        let first = account_body(SELF_SID, "Main", "active");
        let second = account_body(OTHER_SID, "Sub", "active");
        let client = client(Recording::replying(&[(200, first.as_str()), (200, second.as_str())]));

        let other = client.clone();
        let (a, b) = tokio::join!(client.get_account(), other.get_account());
        let mut names = vec![
            a.unwrap().friendly_name().to_string(),
            b.unwrap().friendly_name().to_string(),
        ];
        names.sort();
        assert_eq!(names, ["Main", "Sub"]);
        assert_eq!(client.dispatcher().transport().requests().len(), 2);
    }

    #[test]
    fn shared_transport_can_be_a_trait_object() {
        let transport: Arc<dyn Transport> = Arc::new(Recording::default());
        let client = TwilioClient::with_shared_transport(ClientConfig::new(SELF_SID), transport);
        let req = client.build_get_account().unwrap().build(client.config()).unwrap();
        assert_eq!(
            req.url,
            format!("https://api.twilio.com/2010-04-01/Accounts/{SELF_SID}")
        );
    }
}
