// ============ Pool Type Script ============
// Validates every pool account state transition:
// - Pool creation (empty reserves, canonical mint order)
// - Deposit (reserves up, shares minted no faster than contribution)
// - Withdraw (shares burned, reserves released no faster than claim)
// - Swap (shares fixed, one reserve in and one out, k non-decreasing)
//
// The engine runs this over serialized snapshots before it commits anything.

use core::cmp::Ordering;

use pairpool_math::{isqrt, pricing, product_non_decreasing};
use pairpool_types::*;
use thiserror::Error;

/// What a validated transition turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolTransition {
    Creation,
    Deposit,
    Withdraw,
    Swap(SwapDirection),
}

// ============ Script Entry Point ============

pub fn verify_pool_type(
    old_data: Option<&[u8]>,
    new_data: &[u8],
) -> Result<PoolTransition, PoolTypeError> {
    let new_pool = PoolData::deserialize(new_data).ok_or(PoolTypeError::InvalidAccountData)?;

    match old_data {
        None => {
            validate_pool_creation(&new_pool)?;
            Ok(PoolTransition::Creation)
        }
        Some(old) => {
            let old_pool = PoolData::deserialize(old).ok_or(PoolTypeError::InvalidAccountData)?;
            validate_pool_transition(&old_pool, &new_pool)
        }
    }
}

// ============ Pool Creation ============

fn validate_pool_creation(pool: &PoolData) -> Result<(), PoolTypeError> {
    if pool.reserve_low != 0
        || pool.reserve_high != 0
        || pool.total_shares != 0
        || pool.locked_shares != 0
    {
        return Err(PoolTypeError::NonEmptyCreation);
    }

    if pool.mint_low.is_zero() || pool.mint_high.is_zero() {
        return Err(PoolTypeError::InvalidMint);
    }
    if pool.mint_low >= pool.mint_high {
        return Err(PoolTypeError::UnorderedMints);
    }

    if pool.pool_authority.is_zero()
        || pool.share_mint.is_zero()
        || pool.pool_authority == pool.share_mint
    {
        return Err(PoolTypeError::InvalidDerivedAccount);
    }

    if pool.fee_bps >= BPS_DENOMINATOR {
        return Err(PoolTypeError::InvalidFeeRate);
    }

    Ok(())
}

// ============ Pool Transition Validation ============

fn validate_pool_transition(
    old: &PoolData,
    new: &PoolData,
) -> Result<PoolTransition, PoolTypeError> {
    if old.market != new.market
        || old.mint_low != new.mint_low
        || old.mint_high != new.mint_high
        || old.pool_authority != new.pool_authority
        || old.share_mint != new.share_mint
        || old.fee_bps != new.fee_bps
    {
        return Err(PoolTypeError::IdentityChanged);
    }

    validate_zero_iff_empty(new)?;
    validate_locked_shares(old, new)?;

    match new.total_shares.cmp(&old.total_shares) {
        Ordering::Greater => {
            validate_deposit(old, new)?;
            Ok(PoolTransition::Deposit)
        }
        Ordering::Less => {
            validate_withdraw(old, new)?;
            Ok(PoolTransition::Withdraw)
        }
        Ordering::Equal => validate_swap(old, new).map(PoolTransition::Swap),
    }
}

// ============ Deposit ============

fn validate_deposit(old: &PoolData, new: &PoolData) -> Result<(), PoolTypeError> {
    let amount_low = new
        .reserve_low
        .checked_sub(old.reserve_low)
        .ok_or(PoolTypeError::ReserveDecreased)?;
    let amount_high = new
        .reserve_high
        .checked_sub(old.reserve_high)
        .ok_or(PoolTypeError::ReserveDecreased)?;
    let minted = new.total_shares - old.total_shares;

    if old.total_shares == 0 {
        // Bootstrap: the whole supply, locked part included, is the geometric mean.
        let expected = isqrt(amount_low as u128 * amount_high as u128);
        if minted as u128 != expected {
            return Err(PoolTypeError::InvalidBootstrapShares);
        }
        return Ok(());
    }

    // minted / total <= amount / reserve on both sides
    let total = old.total_shares as u128;
    if minted as u128 * old.reserve_low as u128 > amount_low as u128 * total
        || minted as u128 * old.reserve_high as u128 > amount_high as u128 * total
    {
        return Err(PoolTypeError::ExcessiveSharesMinted);
    }

    Ok(())
}

// ============ Withdraw ============

fn validate_withdraw(old: &PoolData, new: &PoolData) -> Result<(), PoolTypeError> {
    let amount_low = old
        .reserve_low
        .checked_sub(new.reserve_low)
        .ok_or(PoolTypeError::ReserveIncreased)?;
    let amount_high = old
        .reserve_high
        .checked_sub(new.reserve_high)
        .ok_or(PoolTypeError::ReserveIncreased)?;
    let burned = (old.total_shares - new.total_shares) as u128;

    // amount / reserve <= burned / total on both sides
    let total = old.total_shares as u128;
    if amount_low as u128 * total > old.reserve_low as u128 * burned
        || amount_high as u128 * total > old.reserve_high as u128 * burned
    {
        return Err(PoolTypeError::ExcessiveWithdrawal);
    }

    Ok(())
}

// ============ Swap Validation ============

fn validate_swap(old: &PoolData, new: &PoolData) -> Result<SwapDirection, PoolTypeError> {
    if old.reserve_low == new.reserve_low && old.reserve_high == new.reserve_high {
        return Err(PoolTypeError::NoStateChange);
    }
    if old.total_shares == 0 {
        return Err(PoolTypeError::SwapOnEmptyPool);
    }

    let direction = if new.reserve_low > old.reserve_low {
        SwapDirection::LowToHigh
    } else if new.reserve_high > old.reserve_high {
        SwapDirection::HighToLow
    } else {
        return Err(PoolTypeError::KInvariantViolation);
    };

    let (old_in, old_out) = old.reserves_for(direction);
    let (new_in, new_out) = new.reserves_for(direction);
    if new_out > old_out {
        return Err(PoolTypeError::KInvariantViolation);
    }

    let amount_in = new_in - old_in;
    let amount_out = old_out - new_out;

    let max_out = pricing::get_amount_out(amount_in, old_in, old_out, old.fee_bps)
        .map_err(|_| PoolTypeError::SwapCalculationFailed)?
        .amount_out;
    if amount_out > max_out {
        return Err(PoolTypeError::ExcessiveOutput);
    }

    if !product_non_decreasing(old_in, old_out, new_in, new_out) {
        return Err(PoolTypeError::KInvariantViolation);
    }

    Ok(direction)
}

// ============ Invariant Checks ============

/// Reserves are zero exactly when no shares are outstanding.
fn validate_zero_iff_empty(pool: &PoolData) -> Result<(), PoolTypeError> {
    let drained = pool.reserve_low == 0 && pool.reserve_high == 0;
    let funded = pool.reserve_low > 0 && pool.reserve_high > 0;

    if pool.total_shares == 0 && !drained {
        return Err(PoolTypeError::ReserveShareMismatch);
    }
    if pool.total_shares > 0 && !funded {
        return Err(PoolTypeError::ReserveShareMismatch);
    }
    Ok(())
}

fn validate_locked_shares(old: &PoolData, new: &PoolData) -> Result<(), PoolTypeError> {
    if new.locked_shares > new.total_shares {
        return Err(PoolTypeError::LockedSharesChanged);
    }
    // Locked shares are set once, at bootstrap.
    let bootstrap = old.total_shares == 0 && new.total_shares > 0;
    if !bootstrap && old.locked_shares != new.locked_shares {
        return Err(PoolTypeError::LockedSharesChanged);
    }
    Ok(())
}

// ============ Error Types ============

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolTypeError {
    #[error("pool account data is malformed")]
    InvalidAccountData,

    // Creation
    #[error("pool must be created empty")]
    NonEmptyCreation,
    #[error("pool mint is unset")]
    InvalidMint,
    #[error("pool mints are not in canonical order")]
    UnorderedMints,
    #[error("pool authority or share mint is invalid")]
    InvalidDerivedAccount,
    #[error("pool fee rate is out of range")]
    InvalidFeeRate,

    // Transition
    #[error("pool identity fields changed")]
    IdentityChanged,
    #[error("pool state did not change")]
    NoStateChange,
    #[error("reserves and outstanding shares disagree on emptiness")]
    ReserveShareMismatch,
    #[error("locked shares changed after bootstrap")]
    LockedSharesChanged,

    // Liquidity
    #[error("a reserve decreased during a deposit")]
    ReserveDecreased,
    #[error("bootstrap shares are not the geometric mean of the deposit")]
    InvalidBootstrapShares,
    #[error("more shares minted than the deposit is worth")]
    ExcessiveSharesMinted,
    #[error("a reserve increased during a withdrawal")]
    ReserveIncreased,
    #[error("more reserves released than the burned shares claim")]
    ExcessiveWithdrawal,

    // Swap
    #[error("swap against a pool with no liquidity")]
    SwapOnEmptyPool,
    #[error("swap output could not be priced")]
    SwapCalculationFailed,
    #[error("swap output exceeds the priced amount")]
    ExcessiveOutput,
    #[error("reserve product decreased")]
    KInvariantViolation,
}

// ============ Tests ============
