//! Wiring of the chain client, payment flow and page services for one
//! wallet on one network.

use crate::{
    config::{Config, Network},
    flow::{PaymentFlow, WalletSession},
    models::USDC_DECIMALS,
    services::{ChainClient, PageDirectory, PagePublisher},
};
use anyhow::Result;
use std::sync::Arc;

pub struct OnClickClient {
    pub chain: Arc<ChainClient>,
    pub flow: Arc<PaymentFlow>,
    pub pages: Arc<PageDirectory>,
    pub publisher: PagePublisher,
}

impl OnClickClient {
    pub async fn connect(config: &Config) -> Result<Self> {
        let chain = Arc::new(ChainClient::new(config).await?);

        match chain.token_decimals().await {
            Ok(decimals) if u32::from(decimals) != USDC_DECIMALS => tracing::warn!(
                "Settlement token reports {} decimals, amounts assume {}",
                decimals,
                USDC_DECIMALS
            ),
            Ok(_) => {}
            Err(e) => tracing::warn!("Could not read token decimals: {}", e),
        }

        let session = chain.session();
        tracing::info!(
            "Wallet {} paying through {} on {}",
            session.owner,
            session.spender,
            config.network
        );

        let flow = Arc::new(PaymentFlow::with_client(session, chain.clone()));
        let pages = Arc::new(PageDirectory::new(chain.clone(), config.page_cache_ttl));
        let publisher = PagePublisher::new(chain.clone(), chain.clone(), pages.clone());

        Ok(Self {
            chain,
            flow,
            pages,
            publisher,
        })
    }

    pub fn network(&self) -> Network {
        self.chain.network()
    }

    pub fn session(&self) -> WalletSession {
        self.flow.session()
    }
}
