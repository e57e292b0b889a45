use crate::error::ChainError;
use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};

/// Read/approve side of the settlement token (ERC-20).
#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn read_balance(&self, owner: Address) -> Result<U256, ChainError>;
    async fn read_allowance(&self, owner: Address, spender: Address) -> Result<U256, ChainError>;
    async fn submit_approve(&self, spender: Address, amount: U256) -> Result<TxHash, ChainError>;
}

/// The page contract's payment entry point.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn submit_payment(
        &self,
        handle: &str,
        amount: U256,
        message: &str,
    ) -> Result<TxHash, ChainError>;
}

/// Resolves once a submitted transaction is mined, or fails if it reverted
/// or was dropped.
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
    async fn await_confirmation(&self, tx: TxHash) -> Result<(), ChainError>;
}

/// Connected wallet and the contract it pays through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSession {
    pub owner: Address,
    pub spender: Address,
}
