use mock_server::MasterAccount;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut master = MasterAccount::default();
    if let Ok(sid) = std::env::var("MOCK_ACCOUNT_SID") {
        master.sid = sid;
    }
    if let Ok(token) = std::env::var("MOCK_AUTH_TOKEN") {
        master.auth_token = token;
    }

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, account_sid = %master.sid, "listening");
    mock_server::run(listener, master).await
}
