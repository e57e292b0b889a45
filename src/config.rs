use anyhow::{bail, Context, Result};
use ethers::types::{Address, H256};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Target chain. Constants match the deployed OnClick contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn chain_id(self) -> u64 {
        match self {
            Network::Testnet => 11_142_220,
            Network::Mainnet => 42_220,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Network::Testnet => "Celo Sepolia Testnet",
            Network::Mainnet => "Celo Mainnet",
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Network::Testnet => "https://forno.celo-sepolia.celo-testnet.org",
            Network::Mainnet => "https://forno.celo.org",
        }
    }

    pub fn explorer_url(self) -> &'static str {
        match self {
            Network::Testnet => "https://sepolia.celoscan.io",
            Network::Mainnet => "https://celoscan.io",
        }
    }

    pub fn onclick_address(self) -> Address {
        let addr = match self {
            Network::Testnet => "0x274f499201b0716e6CB632FF5BEc10cAD508eAD6",
            Network::Mainnet => "0x073638da15e6e99ba50991f358a4b39000cdb48f",
        };
        addr.parse().unwrap_or_default()
    }

    pub fn usdc_address(self) -> Address {
        let addr = match self {
            Network::Testnet => "0xd9fc6cC979472A5FA52750ae26805462E1638872",
            Network::Mainnet => "0x765DE816845861e75A25fCA122bb6898B8B1282a",
        };
        addr.parse().unwrap_or_default()
    }

    pub fn tx_url(self, tx: H256) -> String {
        format!("{}/tx/{:?}", self.explorer_url(), tx)
    }

    pub fn address_url(self, address: Address) -> String {
        format!("{}/address/{:?}", self.explorer_url(), address)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "testnet" | "test" | "sepolia" | "celo-sepolia" => Ok(Network::Testnet),
            "mainnet" | "main" | "production" | "prod" | "celo" => Ok(Network::Mainnet),
            _ => bail!("Unknown network: {}", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub network: Network,
    pub host: String,
    pub port: u16,

    pub rpc_url: String,
    pub rpc_fallback: Option<String>,
    pub onclick_address: Address,
    pub usdc_address: Address,

    pub wallet_private_key: String,

    pub page_cache_ttl: Duration,
    pub confirmations: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let network: Network = std::env::var("ONCLICK_NETWORK")
            .unwrap_or_else(|_| "testnet".to_string())
            .parse()?;

        let config = Self {
            network,
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,

            rpc_url: std::env::var("RPC_URL")
                .unwrap_or_else(|_| network.default_rpc_url().to_string()),
            rpc_fallback: std::env::var("RPC_FALLBACK").ok(),
            onclick_address: Self::parse_address("ONCLICK_CONTRACT_ADDRESS")?
                .unwrap_or_else(|| network.onclick_address()),
            usdc_address: Self::parse_address("USDC_ADDRESS")?
                .unwrap_or_else(|| network.usdc_address()),

            wallet_private_key: std::env::var("WALLET_PRIVATE_KEY")
                .context("WALLET_PRIVATE_KEY required")?,

            page_cache_ttl: Duration::from_secs(
                std::env::var("PAGE_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid PAGE_CACHE_TTL_SECS")?,
            ),
            confirmations: std::env::var("CONFIRMATIONS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("Invalid CONFIRMATIONS")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_address(var: &str) -> Result<Option<Address>> {
        match std::env::var(var) {
            Ok(addr) => Address::from_str(addr.trim())
                .map(Some)
                .with_context(|| format!("Invalid address for {}", var)),
            Err(_) => Ok(None),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.rpc_url.starts_with("http") {
            bail!("RPC_URL must be HTTP(S) URL");
        }
        if let Some(fallback) = &self.rpc_fallback {
            if !fallback.starts_with("http") {
                bail!("RPC_FALLBACK must be HTTP(S) URL");
            }
        }
        if !self.wallet_private_key.starts_with("0x") {
            bail!("WALLET_PRIVATE_KEY must start with 0x");
        }
        if self.onclick_address.is_zero() || self.usdc_address.is_zero() {
            bail!("Contract addresses must not be zero");
        }
        if self.confirmations == 0 {
            bail!("CONFIRMATIONS must be at least 1");
        }

        tracing::info!("Configuration validated for {}", self.network);

        Ok(())
    }
}
