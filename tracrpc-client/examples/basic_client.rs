// Trac client example: one call per request.
// Reads TRAC_URL, TRAC_USER and TRAC_PASSWORD from the environment.

use anyhow::Result;
use tracing::{info, warn};
use tracrpc_client::{Client, ClientConfig, ClientError};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let url = std::env::var("TRAC_URL")
        .unwrap_or_else(|_| "http://localhost:8000/login/jsonrpc".to_string());
    let mut config = ClientConfig::new(url);
    if let (Ok(user), Ok(password)) = (std::env::var("TRAC_USER"), std::env::var("TRAC_PASSWORD")) {
        config = config.with_credentials(user, password);
    }

    let mut client = Client::new(config)?;
    info!("Talking to {}", client.config().endpoint);

    let version = client.api_version().await?;
    if let Some(version) = version.into_value() {
        info!("API version: {}", serde_json::to_string(&version)?);
    }

    match client.ticket(1).await {
        Ok(reply) => {
            if let Some(ticket) = reply.into_value() {
                info!("Ticket #1: {}", serde_json::to_string_pretty(&ticket)?);
            }
        }
        Err(ClientError::Remote { id, error }) => {
            warn!("{} failed: {}", id, error);
        }
        Err(e) => return Err(e.into()),
    }

    let open = client.query_tickets("status!=closed").await?;
    if let Some(ids) = open.into_value() {
        info!("Open tickets: {}", serde_json::to_string(&ids)?);
    }

    Ok(())
}
