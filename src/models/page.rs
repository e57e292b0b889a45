use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Page role, stored on-chain as a `uint8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Freelancer = 0,
    Business = 1,
    Crowdfunder = 2,
}

impl Role {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Role::Freelancer),
            1 => Some(Role::Business),
            2 => Some(Role::Crowdfunder),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Freelancer => "freelancer",
            Role::Business => "business",
            Role::Crowdfunder => "crowdfunder",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "freelancer" => Ok(Role::Freelancer),
            "business" => Ok(Role::Business),
            "crowdfunder" => Ok(Role::Crowdfunder),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Raw tuple returned by the contract's `getPage`.
pub type RawPage = (Address, String, u8, Address, U256, U256, U256, U256, bool);

/// Raw tuple element returned by the contract's `getPayments`.
pub type RawPayment = (Address, U256, U256, String, bool);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub owner: Address,
    pub handle: String,
    pub role: Role,
    pub wallet_address: Address,
    /// Crowdfunding goal in minor units, zero when the page has none.
    pub goal: U256,
    /// Unix timestamp in seconds, zero when the page has none.
    pub deadline: u64,
    pub total_raised: U256,
    pub supporter_count: u64,
    pub exists: bool,
}

impl Page {
    /// Build a page from the contract tuple. Unknown role bytes are rejected.
    pub fn from_raw(raw: RawPage) -> Result<Self, String> {
        let (owner, handle, role, wallet_address, goal, deadline, total_raised, supporters, exists) =
            raw;
        let role = Role::from_u8(role).ok_or_else(|| format!("Unknown role byte: {}", role))?;

        Ok(Self {
            owner,
            handle,
            role,
            wallet_address,
            goal,
            deadline: deadline.low_u64(),
            total_raised,
            supporter_count: supporters.low_u64(),
            exists,
        })
    }

    pub fn has_goal(&self) -> bool {
        !self.goal.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePayment {
    pub supporter: Address,
    pub amount: U256,
    pub timestamp: u64,
    pub message: String,
    pub is_fiat_converted: bool,
}

impl From<RawPayment> for PagePayment {
    fn from((supporter, amount, timestamp, message, is_fiat_converted): RawPayment) -> Self {
        Self {
            supporter,
            amount,
            timestamp: timestamp.low_u64(),
            message,
            is_fiat_converted,
        }
    }
}
