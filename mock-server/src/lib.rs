use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_ACCOUNT_SID: &str = "AC00000000000000000000000000000001";
pub const DEFAULT_AUTH_TOKEN: &str = "mock-auth-token";

const API_PREFIX: &str = "/2010-04-01";
const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 1000;

const STATUSES: [&str; 3] = ["active", "suspended", "closed"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    pub sid: String,
    pub friendly_name: String,
    pub status: String,
    #[serde(rename = "Type")]
    pub account_type: String,
    pub owner_account_sid: String,
    pub auth_token: String,
    pub date_created: String,
    pub date_updated: String,
    pub uri: String,
}

impl Account {
    fn new(sid: String, friendly_name: String, owner: String, auth_token: String) -> Self {
        let now = chrono::Utc::now().to_rfc2822();
        Self {
            uri: format!("{API_PREFIX}/Accounts/{sid}"),
            sid,
            friendly_name,
            status: "active".to_string(),
            account_type: "Full".to_string(),
            owner_account_sid: owner,
            auth_token,
            date_created: now.clone(),
            date_updated: now,
        }
    }
}

/// Single-account responses are wrapped in an `Account` root element.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountEnvelope {
    pub account: Account,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountList {
    pub accounts: Vec<Account>,
    pub page: u32,
    pub page_size: u32,
    pub total: u32,
    pub num_pages: u32,
    pub start: u32,
    pub end: u32,
    pub uri: String,
    pub first_page_uri: String,
    pub next_page_uri: Option<String>,
    pub previous_page_uri: Option<String>,
    pub last_page_uri: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAccount {
    #[serde(default)]
    pub friendly_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateAccount {
    pub friendly_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListAccounts {
    pub friendly_name: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Credentials of the master account every request must authenticate as.
#[derive(Clone, Debug)]
pub struct MasterAccount {
    pub sid: String,
    pub auth_token: String,
    pub friendly_name: String,
}

impl Default for MasterAccount {
    fn default() -> Self {
        Self {
            sid: DEFAULT_ACCOUNT_SID.to_string(),
            auth_token: DEFAULT_AUTH_TOKEN.to_string(),
            friendly_name: "Master Account".to_string(),
        }
    }
}

/// Master account first, then subaccounts in creation order.
pub struct Store {
    accounts: Vec<Account>,
}

impl Store {
    fn master(&self) -> &Account {
        &self.accounts[0]
    }

    fn find_mut(&mut self, sid: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.sid == sid)
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error rendered as a Twilio `RestException` envelope.
#[derive(Debug)]
pub struct RestError {
    status: StatusCode,
    code: u32,
    message: String,
}

impl RestError {
    fn new(status: StatusCode, code: u32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn not_found(path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            20404,
            format!("The requested resource {path} was not found"),
        )
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, 20001, message)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let body = json!({
            "RestException": {
                "Status": self.status.as_u16(),
                "Code": self.code,
                "Message": self.message,
                "MoreInfo": format!("https://www.twilio.com/docs/errors/{}", self.code),
            }
        });
        (self.status, Json(body)).into_response()
    }
}

pub fn app(master: MasterAccount) -> Router {
    let root = Account::new(
        master.sid.clone(),
        master.friendly_name,
        master.sid,
        master.auth_token,
    );
    let db: Db = Arc::new(RwLock::new(Store {
        accounts: vec![root],
    }));
    Router::new()
        .route("/Accounts", get(list_accounts).post(create_account))
        .route("/Accounts/{sid}", get(get_account).post(update_account))
        .layer(middleware::from_fn_with_state(db.clone(), require_auth))
        .with_state(db)
}

pub async fn run(listener: TcpListener, master: MasterAccount) -> Result<(), std::io::Error> {
    axum::serve(listener, app(master)).await
}

/// Accept only HTTP basic auth with the master account's Sid and token.
async fn require_auth(State(db): State<Db>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .and_then(|raw| String::from_utf8(raw).ok());

    let authorized = {
        let store = db.read().await;
        let master = store.master();
        presented
            .as_deref()
            .and_then(|p| p.split_once(':'))
            .is_some_and(|(sid, token)| sid == master.sid && token == master.auth_token)
    };

    if !authorized {
        warn!(path = %request.uri().path(), "rejected unauthenticated request");
        return RestError::new(StatusCode::UNAUTHORIZED, 20003, "Authenticate").into_response();
    }
    debug!(method = %request.method(), path = %request.uri().path(), "authenticated request");
    next.run(request).await
}

async fn list_accounts(
    State(db): State<Db>,
    Query(query): Query<ListAccounts>,
) -> Result<Json<AccountList>, RestError> {
    if let Some(status) = &query.status {
        validate_status(status)?;
    }
    let page = query.page.unwrap_or(0);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(RestError::bad_request(format!(
            "PageSize must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let store = db.read().await;
    let matching: Vec<&Account> = store
        .accounts
        .iter()
        .filter(|a| query.friendly_name.as_ref().map_or(true, |n| &a.friendly_name == n))
        .filter(|a| query.status.as_ref().map_or(true, |s| &a.status == s))
        .collect();

    let total = u32::try_from(matching.len()).unwrap_or(u32::MAX);
    let num_pages = total.div_ceil(page_size).max(1);
    let last_page = num_pages - 1;
    let start = page.saturating_mul(page_size);
    let accounts: Vec<Account> = matching
        .into_iter()
        .skip(usize::try_from(start).unwrap_or(usize::MAX))
        .take(usize::try_from(page_size).unwrap_or(usize::MAX))
        .cloned()
        .collect();
    // An empty page (past the end or no matches) reports `end == start`.
    let end = match u32::try_from(accounts.len()).unwrap_or(u32::MAX) {
        0 => start,
        len => start.saturating_add(len - 1),
    };

    let page_uri = |p: u32| format!("{API_PREFIX}/Accounts?Page={p}&PageSize={page_size}");
    Ok(Json(AccountList {
        page,
        page_size,
        total,
        num_pages,
        start,
        end,
        uri: page_uri(page),
        first_page_uri: page_uri(0),
        next_page_uri: (page < last_page).then(|| page_uri(page + 1)),
        previous_page_uri: (page > 0).then(|| page_uri((page - 1).min(last_page))),
        last_page_uri: page_uri(last_page),
        accounts,
    }))
}

async fn create_account(
    State(db): State<Db>,
    Form(input): Form<CreateAccount>,
) -> (StatusCode, Json<AccountEnvelope>) {
    let mut store = db.write().await;
    let owner = store.master().sid.clone();
    let account = Account::new(
        format!("AC{}", Uuid::new_v4().simple()),
        input.friendly_name,
        owner,
        Uuid::new_v4().simple().to_string(),
    );
    info!(sid = %account.sid, "created subaccount");
    store.accounts.push(account.clone());
    (StatusCode::CREATED, Json(AccountEnvelope { account }))
}

async fn get_account(
    State(db): State<Db>,
    Path(sid): Path<String>,
) -> Result<Json<AccountEnvelope>, RestError> {
    let store = db.read().await;
    store
        .accounts
        .iter()
        .find(|a| a.sid == sid)
        .cloned()
        .map(|account| Json(AccountEnvelope { account }))
        .ok_or_else(|| RestError::not_found(&format!("{API_PREFIX}/Accounts/{sid}")))
}

async fn update_account(
    State(db): State<Db>,
    Path(sid): Path<String>,
    Form(input): Form<UpdateAccount>,
) -> Result<Json<AccountEnvelope>, RestError> {
    let mut store = db.write().await;
    let is_master = store.master().sid == sid;
    let account = store
        .find_mut(&sid)
        .ok_or_else(|| RestError::not_found(&format!("{API_PREFIX}/Accounts/{sid}")))?;

    if let Some(status) = input.status {
        validate_status(&status)?;
        if is_master {
            return Err(RestError::bad_request(
                "The master account's status cannot be changed",
            ));
        }
        if account.status == "closed" && status != "closed" {
            return Err(RestError::bad_request("A closed account cannot be reopened"));
        }
        info!(%sid, from = %account.status, to = %status, "changing account status");
        account.status = status;
    }
    if let Some(name) = input.friendly_name {
        account.friendly_name = name;
    }
    account.date_updated = chrono::Utc::now().to_rfc2822();

    Ok(Json(AccountEnvelope {
        account: account.clone(),
    }))
}

fn validate_status(status: &str) -> Result<(), RestError> {
    if STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(RestError::bad_request(format!("Invalid Status: {status}")))
    }
}
