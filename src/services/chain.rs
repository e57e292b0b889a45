use crate::{
    config::{Config, Network},
    contracts::{OnClick, IERC20},
    error::ChainError,
    flow::{ConfirmationSource, PaymentGateway, TokenLedger, WalletSession},
    models::{Page, PagePayment},
    services::pages::PageRegistry,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use ethers::{
    abi::{ParamType, Token},
    prelude::*,
    providers::{Http, Provider},
    types::{Address, Bytes, TxHash, U256},
};
use std::sync::Arc;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Signing client for one network: token reads and approvals, page
/// payments and page registry calls.
pub struct ChainClient {
    network: Network,
    signer: Arc<SignerClient>,
    token: IERC20<SignerClient>,
    onclick: OnClick<SignerClient>,
    fallback_token: Option<IERC20<Provider<Http>>>,
    confirmations: usize,
}

impl ChainClient {
    pub async fn new(config: &Config) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .with_context(|| format!("Invalid RPC_URL: {}", config.rpc_url))?;

        // Network switching belongs to the wallet; refuse to sign for the wrong chain
        let chain_id = provider.get_chainid().await?.as_u64();
        if chain_id != config.network.chain_id() {
            bail!(
                "RPC endpoint is on chain {}, expected {} ({})",
                chain_id,
                config.network.chain_id(),
                config.network
            );
        }
        tracing::info!("Chain RPC connected to {} (chain id {})", config.network, chain_id);

        let wallet = config
            .wallet_private_key
            .parse::<LocalWallet>()
            .context("Invalid WALLET_PRIVATE_KEY")?
            .with_chain_id(chain_id);

        let signer = Arc::new(SignerMiddleware::new(provider, wallet));

        let fallback_token = match &config.rpc_fallback {
            Some(url) => {
                let fallback = Arc::new(Provider::<Http>::try_from(url.as_str())?);
                Some(IERC20::new(config.usdc_address, fallback))
            }
            None => None,
        };

        Ok(Self {
            network: config.network,
            token: IERC20::new(config.usdc_address, signer.clone()),
            onclick: OnClick::new(config.onclick_address, signer.clone()),
            signer,
            fallback_token,
            confirmations: config.confirmations,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Owner is the signing wallet, spender is the OnClick contract.
    pub fn session(&self) -> WalletSession {
        WalletSession {
            owner: self.signer.address(),
            spender: self.onclick.address(),
        }
    }

    pub async fn block_number(&self) -> Result<u64> {
        Ok(self.signer.get_block_number().await?.as_u64())
    }

    pub async fn token_decimals(&self) -> Result<u8, ChainError> {
        self.token.decimals().call().await.map_err(contract_error)
    }
}

#[async_trait]
impl TokenLedger for ChainClient {
    async fn read_balance(&self, owner: Address) -> Result<U256, ChainError> {
        match self.token.balance_of(owner).call().await {
            Ok(balance) => Ok(balance),
            Err(e) => match &self.fallback_token {
                Some(fallback) => {
                    tracing::warn!("Primary RPC failed reading balance ({}), trying fallback", e);
                    fallback.balance_of(owner).call().await.map_err(contract_error)
                }
                None => Err(contract_error(e)),
            },
        }
    }

    async fn read_allowance(&self, owner: Address, spender: Address) -> Result<U256, ChainError> {
        match self.token.allowance(owner, spender).call().await {
            Ok(allowance) => Ok(allowance),
            Err(e) => match &self.fallback_token {
                Some(fallback) => {
                    tracing::warn!("Primary RPC failed reading allowance ({}), trying fallback", e);
                    fallback.allowance(owner, spender).call().await.map_err(contract_error)
                }
                None => Err(contract_error(e)),
            },
        }
    }

    async fn submit_approve(&self, spender: Address, amount: U256) -> Result<TxHash, ChainError> {
        let call = self.token.approve(spender, amount);
        let pending = call.send().await.map_err(contract_error)?;
        let tx = *pending;
        tracing::info!("Approval sent: {}", self.network.tx_url(tx));
        Ok(tx)
    }
}

#[async_trait]
impl PaymentGateway for ChainClient {
    async fn submit_payment(
        &self,
        handle: &str,
        amount: U256,
        message: &str,
    ) -> Result<TxHash, ChainError> {
        let call = self
            .onclick
            .make_payment(handle.to_string(), amount, message.to_string());
        let pending = call.send().await.map_err(contract_error)?;
        let tx = *pending;
        tracing::info!("Payment sent: {}", self.network.tx_url(tx));
        Ok(tx)
    }
}

#[async_trait]
impl ConfirmationSource for ChainClient {
    async fn await_confirmation(&self, tx: TxHash) -> Result<(), ChainError> {
        tracing::debug!(tx = ?tx, "Waiting for confirmation...");

        let receipt = PendingTransaction::new(tx, self.signer.provider())
            .confirmations(self.confirmations)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .ok_or(ChainError::Dropped(tx))?;

        if receipt.status != Some(1.into()) {
            return Err(ChainError::Reverted(tx));
        }
        Ok(())
    }
}

#[async_trait]
impl PageRegistry for ChainClient {
    async fn get_page(&self, handle: &str) -> Result<Option<Page>, ChainError> {
        let raw = self
            .onclick
            .get_page(handle.to_string())
            .call()
            .await
            .map_err(contract_error)?;
        let page = Page::from_raw(raw).map_err(ChainError::Rpc)?;
        Ok(page.exists.then_some(page))
    }

    async fn get_payments(&self, handle: &str) -> Result<Vec<PagePayment>, ChainError> {
        let raw = self
            .onclick
            .get_payments(handle.to_string())
            .call()
            .await
            .map_err(contract_error)?;
        Ok(raw.into_iter().map(PagePayment::from).collect())
    }

    async fn is_handle_available(&self, handle: &str) -> Result<bool, ChainError> {
        self.onclick
            .is_handle_available(handle.to_string())
            .call()
            .await
            .map_err(contract_error)
    }

    async fn is_goal_reached(&self, handle: &str) -> Result<bool, ChainError> {
        self.onclick
            .is_goal_reached(handle.to_string())
            .call()
            .await
            .map_err(contract_error)
    }

    async fn submit_create_page(
        &self,
        handle: &str,
        role: u8,
        wallet: Address,
        goal: U256,
        deadline: u64,
    ) -> Result<TxHash, ChainError> {
        let call = self
            .onclick
            .create_page(handle.to_string(), role, wallet, goal, U256::from(deadline));
        let pending = call.send().await.map_err(contract_error)?;
        Ok(*pending)
    }

    async fn submit_update_page(
        &self,
        handle: &str,
        wallet: Address,
        goal: U256,
        deadline: u64,
    ) -> Result<TxHash, ChainError> {
        let call = self
            .onclick
            .update_page(handle.to_string(), wallet, goal, U256::from(deadline));
        let pending = call.send().await.map_err(contract_error)?;
        Ok(*pending)
    }
}

fn contract_error<M: Middleware>(err: ContractError<M>) -> ChainError {
    match err {
        ContractError::Revert(data) => ChainError::Revert(revert_reason(&data)),
        ContractError::MiddlewareError { e } => ChainError::Wallet(e.to_string()),
        other => ChainError::Rpc(other.to_string()),
    }
}

/// Decode a Solidity `Error(string)` payload, falling back to the raw bytes.
fn revert_reason(data: &Bytes) -> String {
    const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

    if data.len() > 4 && data[..4] == ERROR_SELECTOR {
        if let Ok(tokens) = ethers::abi::decode(&[ParamType::String], &data[4..]) {
            if let Some(Token::String(reason)) = tokens.into_iter().next() {
                return reason;
            }
        }
    }
    data.to_string()
}
