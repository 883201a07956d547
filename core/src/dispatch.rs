//! Request dispatch: build, send, check status, unwrap, deserialize.
//!
//! # Design
//! `RequestDispatcher` owns nothing but a shared handle to the transport.
//! Each call builds its own `HttpRequest`, so concurrent calls share no
//! mutable state. Building can fail locally; in that case the transport is
//! never called. The returned future resolves exactly once, either with the
//! deserialized value or with an `ApiError`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, RestException};
use crate::http::HttpResponse;
use crate::request::RestRequest;
use crate::transport::Transport;

pub struct RequestDispatcher<T: ?Sized> {
    transport: Arc<T>,
}

impl<T: ?Sized> Clone for RequestDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> RequestDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }
}

impl<T: Transport + ?Sized> RequestDispatcher<T> {
    pub fn from_arc(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` on behalf of `ctx` and decode the response into `R`.
    pub async fn execute<R: DeserializeOwned>(
        &self,
        ctx: &ClientConfig,
        request: &RestRequest,
    ) -> Result<R, ApiError> {
        let http = request.build(ctx)?;
        debug!(method = %http.method, url = %http.url, "dispatching request");

        let response = self.transport.execute(http).await?;
        debug!(status = response.status, "response received");

        parse_response(response, request.root_element_name())
    }
}

/// Check the status of `response`, unwrap `root_element` if given, and
/// deserialize the result.
pub fn parse_response<R: DeserializeOwned>(
    response: HttpResponse,
    root_element: Option<&str>,
) -> Result<R, ApiError> {
    check_status(&response)?;

    let mut payload: Value = serde_json::from_str(&response.body).map_err(|e| {
        warn!(error = %e, "response body is not valid JSON");
        ApiError::Deserialization(e.to_string())
    })?;

    if let Some(root) = root_element {
        payload = match payload {
            Value::Object(mut map) => map.remove(root),
            _ => None,
        }
        .ok_or_else(|| {
            warn!(root, "root element missing from response");
            ApiError::MissingRootElement(root.to_string())
        })?;
    }

    serde_json::from_value(payload).map_err(|e| {
        warn!(error = %e, "response does not match the expected shape");
        ApiError::Deserialization(e.to_string())
    })
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    warn!(status = response.status, "request failed");
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    match RestException::from_body(&response.body) {
        Some(exception) => Err(ApiError::Rest(exception)),
        None => Err(ApiError::Http {
            status: response.status,
            body: response.body.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::http::{HttpMethod, HttpRequest};
    use crate::transport::TransportError;
    use crate::types::Account;

    /// Answers every request with a canned response and records what it saw.
    struct Canned {
        response: Result<HttpResponse, String>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Canned {
        fn ok(status: u16, body: &str) -> Self {
            Self {
                response: Ok(response(status, body)),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                response: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.response.clone().map_err(TransportError::new)
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn ctx() -> ClientConfig {
        ClientConfig::new("AC1").with_base_url("http://localhost:3000")
    }

    const WRAPPED: &str = r#"{"Account":{"Sid":"AC1","FriendlyName":"Main","Status":"active"}}"#;

    #[tokio::test]
    async fn execute_unwraps_root_element() {
        let dispatcher = RequestDispatcher::new(Canned::ok(200, WRAPPED));
        let request = RestRequest::get("Accounts/{AccountSid}")
            .unwrap()
            .root_element("Account");

        let account: Account = dispatcher.execute(&ctx(), &request).await.unwrap();
        assert_eq!(account.sid().as_str(), "AC1");

        let seen = dispatcher.transport().seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].url, "http://localhost:3000/Accounts/AC1");
    }

    #[tokio::test]
    async fn unbound_segment_never_reaches_transport() {
        let dispatcher = RequestDispatcher::new(Canned::ok(200, WRAPPED));
        let request = RestRequest::get("Accounts/{AccountSid}/Calls/{CallSid}").unwrap();

        let err = dispatcher
            .execute::<Value>(&ctx(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnboundSegment { .. }));
        assert!(err.is_contract_violation());
        assert!(dispatcher.transport().seen().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let dispatcher = RequestDispatcher::new(Canned::failing("connection refused"));
        let request = RestRequest::get("Accounts").unwrap();

        let err = dispatcher
            .execute::<Value>(&ctx(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.to_string(), "transport failure: connection refused");
    }

    #[test]
    fn whole_body_is_used_without_root_element() {
        let value: Value = parse_response(response(200, r#"{"Page":0}"#), None).unwrap();
        assert_eq!(value["Page"], 0);
    }

    #[test]
    fn missing_root_element_is_an_error() {
        let err = parse_response::<Account>(
            response(200, r#"{"Sid":"AC1","FriendlyName":"x","Status":"active"}"#),
            Some("Account"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::MissingRootElement(ref r) if r == "Account"));

        let err = parse_response::<Account>(response(200, "[]"), Some("Account")).unwrap_err();
        assert!(matches!(err, ApiError::MissingRootElement(_)));
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let err = parse_response::<Account>(
            response(200, r#"{"Account":{"FriendlyName":"no sid"}}"#),
            Some("Account"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn bad_json_is_an_error() {
        let err = parse_response::<Account>(response(200, "not json"), None).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn not_found() {
        let err = parse_response::<Account>(response(404, ""), Some("Account")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn rest_exception_is_decoded() {
        let body = r#"{"RestException":{"Status":401,"Code":20003,"Message":"Authenticate"}}"#;
        let err = parse_response::<Account>(response(401, body), Some("Account")).unwrap_err();
        match err {
            ApiError::Rest(e) => {
                assert_eq!(e.status, 401);
                assert_eq!(e.code, 20003);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_status_keeps_raw_body() {
        let err = parse_response::<Account>(response(500, "internal error"), None).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, ref body } if body == "internal error"));
    }
}
