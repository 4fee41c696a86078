// ============ Market Type Script ============
// Validates market account creation. Markets are written once and never
// updated, so any existing account data means the create is a duplicate.

use pairpool_types::*;
use thiserror::Error;

pub fn verify_market_type(
    old_data: Option<&[u8]>,
    new_data: &[u8],
    max_fee_bps: u16,
) -> Result<MarketData, MarketTypeError> {
    if old_data.is_some() {
        return Err(MarketTypeError::MarketAlreadyExists);
    }

    let market = MarketData::deserialize(new_data).ok_or(MarketTypeError::InvalidAccountData)?;

    if market.fee_bps >= max_fee_bps.min(BPS_DENOMINATOR) {
        return Err(MarketTypeError::InvalidFee(market.fee_bps));
    }

    Ok(market)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketTypeError {
    #[error("market account data is malformed")]
    InvalidAccountData,
    #[error("market already exists")]
    MarketAlreadyExists,
    #[error("fee of {0} bps is at or above the allowed maximum")]
    InvalidFee(u16),
}

// ============ Tests ============
