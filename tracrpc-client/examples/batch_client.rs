// Trac client example: queue several calls and send them as one
// system.multicall request, then read each result back by id.

use anyhow::{anyhow, Result};
use tracing::{info, warn};
use tracrpc_client::{Client, ClientConfig, EnumAction, EnumKind};

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
    let mut client = Client::new(ClientConfig::new(url).with_batch_mode(true))?;

    let mut queued = Vec::new();
    for ticket in 1..=3 {
        let reply = client.ticket(ticket).await?;
        queued.push(reply.queued_id().ok_or_else(|| anyhow!("call was not queued"))?);
    }
    let milestones = client
        .ticket_enum(EnumKind::Milestone, EnumAction::GetAll)
        .await?
        .queued_id()
        .ok_or_else(|| anyhow!("call was not queued"))?;

    info!("Sending {} calls in one request", client.pending());
    client.execute().await?;

    for id in queued {
        match client.error(id) {
            Some(Some(error)) => warn!("{} failed: {}", id, error),
            Some(None) => {
                if let Some(ticket) = client.result(id) {
                    info!("{}: {}", id, serde_json::to_string(ticket)?);
                }
            }
            None => warn!("{} missing from the response", id),
        }
    }

    if let Some(names) = client.result(milestones) {
        info!("Milestones: {}", serde_json::to_string(names)?);
    }

    Ok(())
}
