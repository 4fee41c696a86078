// ============ PairPool Math Library ============
// Integer arithmetic for a two-asset constant product pool.
// Amounts are u64 ledger units; every product and quotient is taken in u128
// and narrowed back with a checked conversion. Every division floors.

use thiserror::Error;

// ============ Constants ============

pub const BPS_DENOMINATOR: u128 = 10_000;

// ============ Error Types ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("fee must be below 10000 basis points")]
    InvalidFee,
    #[error("amount must be non-zero")]
    ZeroAmount,
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    #[error("share amount exceeds outstanding supply")]
    ExceedsSupply,
}

// ============ Checked Primitives ============

pub fn checked_add(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

pub fn checked_mul(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

pub fn checked_div(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_div(b).ok_or(MathError::DivisionByZero)
}

/// floor(a * b / c)
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    checked_div(checked_mul(a, b)?, c)
}

/// Narrow a u128 intermediate back into the u64 amount domain.
pub fn to_amount(value: u128) -> Result<u64, MathError> {
    u64::try_from(value).map_err(|_| MathError::Overflow)
}

/// Sum of two amounts, failing instead of wrapping past u64::MAX.
pub fn add_amounts(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn sub_amounts(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

// ============ Integer Square Root (Newton's Method) ============

/// floor(sqrt(x))
pub fn isqrt(x: u128) -> u128 {
    if x < 2 {
        return x;
    }
    // (x + 1) / 2 without overflowing at u128::MAX
    let mut z = x / 2 + x % 2;
    let mut y = x;
    while z < y {
        y = z;
        z = (x / z + z) / 2;
    }
    y
}

/// Compare reserve products without overflow: true if new_a * new_b >= old_a * old_b.
pub fn product_non_decreasing(old_a: u64, old_b: u64, new_a: u64, new_b: u64) -> bool {
    (new_a as u128) * (new_b as u128) >= (old_a as u128) * (old_b as u128)
}

// ============ Pricing Module ============

pub mod pricing {
    use super::*;

    /// Breakdown of an exact-input trade against one reserve pair.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SwapQuote {
        pub amount_in: u64,
        pub amount_in_after_fee: u64,
        pub fee_amount: u64,
        pub amount_out: u64,
    }

    /// amount_in * (10000 - fee_bps) / 10000, floored.
    pub fn amount_in_after_fee(amount_in: u64, fee_bps: u16) -> Result<u64, MathError> {
        let fee = fee_bps as u128;
        if fee >= BPS_DENOMINATOR {
            return Err(MathError::InvalidFee);
        }
        to_amount(mul_div(amount_in as u128, BPS_DENOMINATOR - fee, BPS_DENOMINATOR)?)
    }

    /// Constant product: get output amount.
    ///
    /// `amount_out = floor(after_fee * reserve_out / (reserve_in + after_fee))`, which is
    /// `reserve_out` minus the *ceiling* of `k / (reserve_in + after_fee)`. The reserve left
    /// behind is rounded up, so the product of the reserves can never shrink.
    pub fn get_amount_out(
        amount_in: u64,
        reserve_in: u64,
        reserve_out: u64,
        fee_bps: u16,
    ) -> Result<SwapQuote, MathError> {
        let after_fee = amount_in_after_fee(amount_in, fee_bps)?;

        let denominator = checked_add(reserve_in as u128, after_fee as u128)?;
        let amount_out = mul_div(after_fee as u128, reserve_out as u128, denominator)?;

        Ok(SwapQuote {
            amount_in,
            amount_in_after_fee: after_fee,
            fee_amount: amount_in - after_fee,
            amount_out: to_amount(amount_out)?,
        })
    }

    /// Constant product: smallest input whose `get_amount_out` is at least `amount_out`.
    pub fn get_amount_in(
        amount_out: u64,
        reserve_in: u64,
        reserve_out: u64,
        fee_bps: u16,
    ) -> Result<u64, MathError> {
        let fee = fee_bps as u128;
        if fee >= BPS_DENOMINATOR {
            return Err(MathError::InvalidFee);
        }
        if amount_out == 0 {
            return Err(MathError::ZeroAmount);
        }
        if reserve_in == 0 || reserve_out == 0 || amount_out >= reserve_out {
            return Err(MathError::InsufficientLiquidity);
        }

        // floor(x * reserve_out / (reserve_in + x)) >= amount_out
        //   <=> x >= ceil(amount_out * reserve_in / (reserve_out - amount_out))
        let numerator = checked_mul(amount_out as u128, reserve_in as u128)?;
        let remaining = (reserve_out - amount_out) as u128;
        let min_after_fee = checked_div(checked_add(numerator, remaining - 1)?, remaining)?;

        // floor(a * (10000 - fee) / 10000) >= x  <=>  a >= ceil(x * 10000 / (10000 - fee))
        let net = BPS_DENOMINATOR - fee;
        let scaled = checked_mul(min_after_fee, BPS_DENOMINATOR)?;
        let amount_in = checked_div(checked_add(scaled, net - 1)?, net)?;

        to_amount(amount_in)
    }
}

// ============ Liquidity Module ============

pub mod liquidity {
    use super::*;

    /// Amounts a deposit commits and the shares it earns.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DepositPlan {
        pub amount_low: u64,
        pub amount_high: u64,
        pub shares: u64,
        pub bootstrap: bool,
    }

    /// Clamp the desired amounts to the current reserve ratio.
    /// The binding side is taken in full, the other side is taken at its
    /// proportional counterpart and the surplus is left with the caller.
    pub fn optimal_amounts(
        desired_low: u64,
        desired_high: u64,
        reserve_low: u64,
        reserve_high: u64,
    ) -> Result<(u64, u64), MathError> {
        let high_for_low = mul_div(desired_low as u128, reserve_high as u128, reserve_low as u128)?;
        if high_for_low <= desired_high as u128 {
            return Ok((desired_low, to_amount(high_for_low)?));
        }

        let low_for_high = mul_div(desired_high as u128, reserve_low as u128, reserve_high as u128)?;
        Ok((to_amount(low_for_high)?, desired_high))
    }

    /// First deposit: isqrt(amount_low * amount_high). Always fits in u64.
    pub fn bootstrap_shares(amount_low: u64, amount_high: u64) -> u64 {
        let product = (amount_low as u128) * (amount_high as u128);
        isqrt(product) as u64
    }

    /// Later deposits: the smaller of the two proportional share claims.
    pub fn shares_for_deposit(
        amount_low: u64,
        amount_high: u64,
        reserve_low: u64,
        reserve_high: u64,
        total_shares: u64,
    ) -> Result<u64, MathError> {
        let from_low = mul_div(amount_low as u128, total_shares as u128, reserve_low as u128)?;
        let from_high = mul_div(amount_high as u128, total_shares as u128, reserve_high as u128)?;
        to_amount(from_low.min(from_high))
    }

    pub fn plan_deposit(
        desired_low: u64,
        desired_high: u64,
        reserve_low: u64,
        reserve_high: u64,
        total_shares: u64,
    ) -> Result<DepositPlan, MathError> {
        if desired_low == 0 && desired_high == 0 {
            return Err(MathError::ZeroAmount);
        }

        if total_shares == 0 {
            return Ok(DepositPlan {
                amount_low: desired_low,
                amount_high: desired_high,
                shares: bootstrap_shares(desired_low, desired_high),
                bootstrap: true,
            });
        }

        let (amount_low, amount_high) =
            optimal_amounts(desired_low, desired_high, reserve_low, reserve_high)?;
        let shares =
            shares_for_deposit(amount_low, amount_high, reserve_low, reserve_high, total_shares)?;

        Ok(DepositPlan {
            amount_low,
            amount_high,
            shares,
            bootstrap: false,
        })
    }

    /// Reserves released by burning `shares`: reserve * shares / total_shares, floored.
    pub fn amounts_for_shares(
        shares: u64,
        reserve_low: u64,
        reserve_high: u64,
        total_shares: u64,
    ) -> Result<(u64, u64), MathError> {
        if shares > total_shares {
            return Err(MathError::ExceedsSupply);
        }
        let amount_low = mul_div(reserve_low as u128, shares as u128, total_shares as u128)?;
        let amount_high = mul_div(reserve_high as u128, shares as u128, total_shares as u128)?;
        Ok((to_amount(amount_low)?, to_amount(amount_high)?))
    }
}

// ============ Tests ============
