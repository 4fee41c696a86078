// ============ PairPool Types ============
// Shared record definitions for the market registry, the pool engine and
// the transition validators. Account records use a fixed little-endian
// layout so every node reads back exactly the bytes that were committed.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ============ Constants ============

pub const BPS_DENOMINATOR: u16 = 10_000;

pub const AUTHORITY_SEED: &[u8] = b"authority";
pub const LIQUIDITY_SEED: &[u8] = b"liquidity";

// ============ Default Config ============

pub const DEFAULT_MINIMUM_LIQUIDITY: u64 = 0;
pub const DEFAULT_MAX_FEE_BPS: u16 = BPS_DENOMINATOR;
pub const DEFAULT_SHARE_DECIMALS: u8 = 6;
pub const MAX_SHARE_DECIMALS: u8 = 18;

// ============ Address ============

/// 32-byte ledger identity: a public key, an asset mint or a derived account.
/// Ordering is lexicographic over the bytes, which is the canonical asset order.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);
    pub const LEN: usize = 32;

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

// Hex strings on the wire, same as Display.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ============ Swap Direction ============

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Pay `mint_low`, receive `mint_high`
    LowToHigh,
    /// Pay `mint_high`, receive `mint_low`
    HighToLow,
}

/// Names one pool: a market and its canonically ordered mint pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub market_id: Address,
    pub mint_low: Address,
    pub mint_high: Address,
}

impl PoolKey {
    pub fn new(market_id: Address, mint_low: Address, mint_high: Address) -> Self {
        Self {
            market_id,
            mint_low,
            mint_high,
        }
    }
}

// ============ Swap Intents ============
// Live for one operation only; never stored.

/// Sell exactly `amount_in`, receive at least `minimum_amount_out`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapIntent {
    pub direction: SwapDirection,
    pub amount_in: u64,
    pub minimum_amount_out: u64,
}

/// Buy exactly `amount_out`, pay at most `maximum_amount_in`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactOutIntent {
    pub direction: SwapDirection,
    pub amount_out: u64,
    pub maximum_amount_in: u64,
}

// ============ Account Data Structures ============

/// Market account data: immutable once created
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
    pub market_id: Address,
    pub admin: Address,
    pub fee_bps: u16,
}

impl MarketData {
    pub const SERIALIZED_SIZE: usize = 32 + 32 + 2; // 66

    pub fn serialize(&self) -> [u8; Self::SERIALIZED_SIZE] {
        let mut buf = [0u8; Self::SERIALIZED_SIZE];
        buf[0..32].copy_from_slice(&self.market_id.0);
        buf[32..64].copy_from_slice(&self.admin.0);
        buf[64..66].copy_from_slice(&self.fee_bps.to_le_bytes());
        buf
    }

    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SERIALIZED_SIZE {
            return None;
        }
        Some(Self {
            market_id: Address(data[0..32].try_into().ok()?),
            admin: Address(data[32..64].try_into().ok()?),
            fee_bps: u16::from_le_bytes(data[64..66].try_into().ok()?),
        })
    }
}

/// Pool account data: one per (market, mint_low, mint_high)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolData {
    pub market: Address,
    pub mint_low: Address,
    pub mint_high: Address,
    pub pool_authority: Address,
    pub share_mint: Address,
    pub fee_bps: u16,
    pub reserve_low: u64,
    pub reserve_high: u64,
    pub total_shares: u64,
    /// Shares minted at bootstrap and credited to nobody
    pub locked_shares: u64,
}

impl PoolData {
    pub const SERIALIZED_SIZE: usize = 32 * 5 + 2 + 8 * 4; // 194

    pub fn serialize(&self) -> [u8; Self::SERIALIZED_SIZE] {
        let mut buf = [0u8; Self::SERIALIZED_SIZE];
        let mut offset = 0;

        for address in [
            &self.market,
            &self.mint_low,
            &self.mint_high,
            &self.pool_authority,
            &self.share_mint,
        ] {
            buf[offset..offset + 32].copy_from_slice(&address.0);
            offset += 32;
        }

        buf[offset..offset + 2].copy_from_slice(&self.fee_bps.to_le_bytes());
        offset += 2;

        for value in [
            self.reserve_low,
            self.reserve_high,
            self.total_shares,
            self.locked_shares,
        ] {
            buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
            offset += 8;
        }

        buf
    }

    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SERIALIZED_SIZE {
            return None;
        }
        let mut offset = 0;
        let mut result = Self::default();

        for address in [
            &mut result.market,
            &mut result.mint_low,
            &mut result.mint_high,
            &mut result.pool_authority,
            &mut result.share_mint,
        ] {
            address.0.copy_from_slice(&data[offset..offset + 32]);
            offset += 32;
        }

        result.fee_bps = u16::from_le_bytes(data[offset..offset + 2].try_into().ok()?);
        offset += 2;

        for value in [
            &mut result.reserve_low,
            &mut result.reserve_high,
            &mut result.total_shares,
            &mut result.locked_shares,
        ] {
            *value = u64::from_le_bytes(data[offset..offset + 8].try_into().ok()?);
            offset += 8;
        }

        Some(result)
    }

    /// (reserve_in, reserve_out) for a trade in `direction`
    pub fn reserves_for(&self, direction: SwapDirection) -> (u64, u64) {
        match direction {
            SwapDirection::LowToHigh => (self.reserve_low, self.reserve_high),
            SwapDirection::HighToLow => (self.reserve_high, self.reserve_low),
        }
    }

    /// (mint_in, mint_out) for a trade in `direction`
    pub fn mints_for(&self, direction: SwapDirection) -> (Address, Address) {
        match direction {
            SwapDirection::LowToHigh => (self.mint_low, self.mint_high),
            SwapDirection::HighToLow => (self.mint_high, self.mint_low),
        }
    }

    /// Write post-trade reserves back in canonical order.
    pub fn set_reserves_for(&mut self, direction: SwapDirection, reserve_in: u64, reserve_out: u64) {
        match direction {
            SwapDirection::LowToHigh => {
                self.reserve_low = reserve_in;
                self.reserve_high = reserve_out;
            }
            SwapDirection::HighToLow => {
                self.reserve_high = reserve_in;
                self.reserve_low = reserve_out;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_shares == 0
    }
}

// ============ Engine Config ============

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_fee_bps must be in 1..=10000, got {0}")]
    InvalidMaxFee(u16),
    #[error("share_decimals must be at most 18, got {0}")]
    InvalidShareDecimals(u8),
    #[error("malformed config: {0}")]
    Malformed(String),
}

/// Engine-wide parameters, read once at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shares locked forever at bootstrap
    pub minimum_liquidity: u64,
    /// Exclusive upper bound on a market's fee
    pub max_fee_bps: u16,
    pub share_decimals: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            minimum_liquidity: DEFAULT_MINIMUM_LIQUIDITY,
            max_fee_bps: DEFAULT_MAX_FEE_BPS,
            share_decimals: DEFAULT_SHARE_DECIMALS,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_fee_bps == 0 || self.max_fee_bps > BPS_DENOMINATOR {
            return Err(ConfigError::InvalidMaxFee(self.max_fee_bps));
        }
        if self.share_decimals > MAX_SHARE_DECIMALS {
            return Err(ConfigError::InvalidShareDecimals(self.share_decimals));
        }
        Ok(())
    }
}

// ============ Tests ============
