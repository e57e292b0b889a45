use crate::{
    handlers::AppState,
    models::HealthStatus,
    services::ChainClient,
};
use async_trait::async_trait;
use axum::{extract::State, Json};
use chrono::Utc;

/// Liveness probe against the chain RPC.
#[async_trait]
pub trait ChainProbe: Send + Sync {
    async fn block_number(&self) -> anyhow::Result<u64>;
}

#[async_trait]
impl ChainProbe for ChainClient {
    async fn block_number(&self) -> anyhow::Result<u64> {
        ChainClient::block_number(self).await
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let chain_rpc = match state.probe.block_number().await {
        Ok(block) => {
            tracing::debug!("Health check at block {}", block);
            true
        }
        Err(e) => {
            tracing::warn!("Chain RPC unreachable: {}", e);
            false
        }
    };

    Json(HealthStatus {
        status: if chain_rpc { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        network: state.network.to_string(),
        chain_rpc,
        uptime_seconds: state.stats.uptime_seconds(),
        timestamp: Utc::now(),
    })
}
