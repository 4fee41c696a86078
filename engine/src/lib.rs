// ============ Pairpool Engine ============
// Two-asset constant-product AMM over an external custody ledger.
// Every operation is computed, checked by the pool type script against the
// serialized before/after snapshots, settled with custody as one batch and
// only then committed to the registry. Any failure leaves no trace.

pub mod custody;
pub mod derive;
pub mod registry;

pub use custody::{Custody, CustodyError, MemoryCustody, Movement, PoolSigner};
pub use derive::{market_account, AddressDeriver, PoolAddresses, Sha256Deriver};
pub use pairpool_math::pricing::SwapQuote;
pub use pairpool_types::{
    Address, ConfigError, EngineConfig, ExactOutIntent, MarketData, PoolData, PoolKey,
    SwapDirection, SwapIntent,
};
pub use registry::Registry;

use market_type::{verify_market_type, MarketTypeError};
use pairpool_math::{add_amounts, liquidity, pricing, sub_amounts, MathError};
use pool_type::{verify_pool_type, PoolTransition};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

// ============ Receipts ============

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub pool: Address,
    pub amount_low: u64,
    pub amount_high: u64,
    /// Shares credited to the caller
    pub shares_minted: u64,
    /// Shares locked forever on this deposit (bootstrap only)
    pub locked_shares: u64,
    pub reserve_low: u64,
    pub reserve_high: u64,
    pub total_shares: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    pub pool: Address,
    pub shares_burned: u64,
    pub amount_low: u64,
    pub amount_high: u64,
    pub reserve_low: u64,
    pub reserve_high: u64,
    pub total_shares: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub pool: Address,
    pub direction: SwapDirection,
    pub amount_in: u64,
    /// Part of `amount_in` retained by the pool as fee
    pub fee_amount: u64,
    pub amount_out: u64,
    pub reserve_low: u64,
    pub reserve_high: u64,
}

// ============ Engine ============

pub struct AmmEngine<C: Custody, D: AddressDeriver = Sha256Deriver> {
    config: EngineConfig,
    registry: Registry,
    custody: C,
    deriver: D,
}

impl<C: Custody> AmmEngine<C> {
    pub fn new(config: EngineConfig, custody: C) -> Result<Self, AmmError> {
        Self::with_deriver(config, custody, Sha256Deriver)
    }
}

impl<C: Custody, D: AddressDeriver> AmmEngine<C, D> {
    pub fn with_deriver(config: EngineConfig, custody: C, deriver: D) -> Result<Self, AmmError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: Registry::new(),
            custody,
            deriver,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn market_account(&self, market_id: &Address) -> Address {
        market_account(&self.deriver, market_id)
    }

    pub fn pool_addresses(&self, key: &PoolKey) -> PoolAddresses {
        let market = self.market_account(&key.market_id);
        PoolAddresses::derive(&self.deriver, &market, &key.mint_low, &key.mint_high)
    }

    pub fn market(&self, market_id: &Address) -> Option<&MarketData> {
        self.registry.market(&self.market_account(market_id))
    }

    pub fn pool(&self, key: &PoolKey) -> Option<&PoolData> {
        self.registry.pool(&self.pool_addresses(key).pool)
    }

    // ============ Market Registry ============

    /// Register a market. Markets are immutable once created.
    pub fn create_market(
        &mut self,
        market_id: Address,
        admin: Address,
        fee_bps: u16,
    ) -> Result<MarketData, AmmError> {
        self.try_create_market(market_id, admin, fee_bps)
            .inspect_err(|e| debug!(market = %market_id, fee_bps, error = %e, "create_market rejected"))
    }

    fn try_create_market(
        &mut self,
        market_id: Address,
        admin: Address,
        fee_bps: u16,
    ) -> Result<MarketData, AmmError> {
        let account = self.market_account(&market_id);
        let market = MarketData {
            market_id,
            admin,
            fee_bps,
        };

        let existing = self.registry.market(&account).map(MarketData::serialize);
        verify_market_type(
            existing.as_ref().map(|data| data.as_slice()),
            &market.serialize(),
            self.config.max_fee_bps,
        )?;

        if !self.registry.insert_market(account, market.clone()) {
            return Err(AmmError::MarketAlreadyExists);
        }
        info!(market = %market_id, admin = %admin, fee_bps, "market created");
        Ok(market)
    }

    // ============ Pool Creation ============

    /// Create an empty pool for `asset_a < asset_b`. Assets are never reordered.
    pub fn create_pool(
        &mut self,
        market_id: Address,
        asset_a: Address,
        asset_b: Address,
    ) -> Result<PoolData, AmmError> {
        self.try_create_pool(market_id, asset_a, asset_b).inspect_err(|e| {
            debug!(market = %market_id, asset_a = %asset_a, asset_b = %asset_b, error = %e, "create_pool rejected")
        })
    }

    fn try_create_pool(
        &mut self,
        market_id: Address,
        asset_a: Address,
        asset_b: Address,
    ) -> Result<PoolData, AmmError> {
        let market_account = self.market_account(&market_id);
        let fee_bps = self
            .registry
            .market(&market_account)
            .ok_or(AmmError::MarketNotFound)?
            .fee_bps;

        if asset_a.is_zero() || asset_b.is_zero() {
            return Err(AmmError::InvalidAsset);
        }
        if asset_a >= asset_b {
            return Err(AmmError::TokenMintOrderError);
        }

        let addrs = PoolAddresses::derive(&self.deriver, &market_account, &asset_a, &asset_b);
        if self.registry.pool(&addrs.pool).is_some() {
            return Err(AmmError::PoolAlreadyExists);
        }

        let pool = PoolData {
            market: market_account,
            mint_low: asset_a,
            mint_high: asset_b,
            pool_authority: addrs.authority,
            share_mint: addrs.share_mint,
            fee_bps,
            ..PoolData::default()
        };
        check_transition(None, &pool, PoolTransition::Creation)?;

        let signer = PoolSigner::new(addrs.authority);
        self.custody
            .create_mint(&signer, &addrs.share_mint, self.config.share_decimals)?;
        if !self.registry.insert_pool(addrs.pool, pool.clone()) {
            return Err(AmmError::PoolAlreadyExists);
        }

        info!(
            pool = %addrs.pool,
            market = %market_id,
            mint_low = %asset_a,
            mint_high = %asset_b,
            share_mint = %addrs.share_mint,
            "pool created"
        );
        Ok(pool)
    }

    // ============ Liquidity ============

    /// Add liquidity. On a live pool the desired amounts are clamped to the
    /// reserve ratio and only the clamped amounts leave the caller.
    pub fn deposit(
        &mut self,
        caller: Address,
        key: &PoolKey,
        desired_low: u64,
        desired_high: u64,
    ) -> Result<DepositReceipt, AmmError> {
        self.try_deposit(caller, key, desired_low, desired_high)
            .inspect_err(|e| debug!(caller = %caller, desired_low, desired_high, error = %e, "deposit rejected"))
    }

    fn try_deposit(
        &mut self,
        caller: Address,
        key: &PoolKey,
        desired_low: u64,
        desired_high: u64,
    ) -> Result<DepositReceipt, AmmError> {
        let (account, pool) = self.load_pool(key)?;
        require_outside_caller(&caller, &pool)?;
        if desired_low == 0 && desired_high == 0 {
            return Err(AmmError::ZeroDeposit);
        }

        let plan = liquidity::plan_deposit(
            desired_low,
            desired_high,
            pool.reserve_low,
            pool.reserve_high,
            pool.total_shares,
        )?;

        let locked = if plan.bootstrap {
            self.config.minimum_liquidity
        } else {
            0
        };
        let credited = match plan.shares.checked_sub(locked) {
            Some(shares) if shares > 0 => shares,
            _ if locked > 0 => return Err(AmmError::DepositTooSmall),
            _ => return Err(AmmError::ZeroSharesMinted),
        };

        self.require_balance(&caller, &pool.mint_low, plan.amount_low)?;
        self.require_balance(&caller, &pool.mint_high, plan.amount_high)?;

        let mut next = pool.clone();
        next.reserve_low = add_amounts(pool.reserve_low, plan.amount_low)?;
        next.reserve_high = add_amounts(pool.reserve_high, plan.amount_high)?;
        next.total_shares = add_amounts(pool.total_shares, plan.shares)?;
        if plan.bootstrap {
            next.locked_shares = locked;
        }
        check_transition(Some(&pool), &next, PoolTransition::Deposit)?;

        let movements = [
            Movement::Transfer {
                asset: pool.mint_low,
                from: caller,
                to: pool.pool_authority,
                amount: plan.amount_low,
            },
            Movement::Transfer {
                asset: pool.mint_high,
                from: caller,
                to: pool.pool_authority,
                amount: plan.amount_high,
            },
            Movement::Mint {
                asset: pool.share_mint,
                to: caller,
                amount: credited,
            },
        ];
        self.settle_and_commit(account, &next, &movements)?;

        info!(
            pool = %account,
            caller = %caller,
            amount_low = plan.amount_low,
            amount_high = plan.amount_high,
            shares = credited,
            bootstrap = plan.bootstrap,
            "deposit"
        );
        Ok(DepositReceipt {
            pool: account,
            amount_low: plan.amount_low,
            amount_high: plan.amount_high,
            shares_minted: credited,
            locked_shares: locked,
            reserve_low: next.reserve_low,
            reserve_high: next.reserve_high,
            total_shares: next.total_shares,
        })
    }

    /// Burn `shares_in` for the proportional slice of both reserves.
    pub fn withdraw(
        &mut self,
        caller: Address,
        key: &PoolKey,
        shares_in: u64,
    ) -> Result<WithdrawReceipt, AmmError> {
        self.try_withdraw(caller, key, shares_in)
            .inspect_err(|e| debug!(caller = %caller, shares_in, error = %e, "withdraw rejected"))
    }

    fn try_withdraw(
        &mut self,
        caller: Address,
        key: &PoolKey,
        shares_in: u64,
    ) -> Result<WithdrawReceipt, AmmError> {
        let (account, pool) = self.load_pool(key)?;
        require_outside_caller(&caller, &pool)?;
        if shares_in == 0 {
            return Err(AmmError::ZeroAmount);
        }
        self.require_balance(&caller, &pool.share_mint, shares_in)?;

        let (amount_low, amount_high) = liquidity::amounts_for_shares(
            shares_in,
            pool.reserve_low,
            pool.reserve_high,
            pool.total_shares,
        )?;

        let mut next = pool.clone();
        next.reserve_low = sub_amounts(pool.reserve_low, amount_low)?;
        next.reserve_high = sub_amounts(pool.reserve_high, amount_high)?;
        next.total_shares = sub_amounts(pool.total_shares, shares_in)?;
        check_transition(Some(&pool), &next, PoolTransition::Withdraw)?;

        let movements = [
            Movement::Burn {
                asset: pool.share_mint,
                from: caller,
                amount: shares_in,
            },
            Movement::Transfer {
                asset: pool.mint_low,
                from: pool.pool_authority,
                to: caller,
                amount: amount_low,
            },
            Movement::Transfer {
                asset: pool.mint_high,
                from: pool.pool_authority,
                to: caller,
                amount: amount_high,
            },
        ];
        self.settle_and_commit(account, &next, &movements)?;

        info!(pool = %account, caller = %caller, shares = shares_in, amount_low, amount_high, "withdraw");
        Ok(WithdrawReceipt {
            pool: account,
            shares_burned: shares_in,
            amount_low,
            amount_high,
            reserve_low: next.reserve_low,
            reserve_high: next.reserve_high,
            total_shares: next.total_shares,
        })
    }

    /// Reserves a holder of `shares` could withdraw right now.
    pub fn position_value(&self, key: &PoolKey, shares: u64) -> Result<(u64, u64), AmmError> {
        let (_, pool) = self.load_pool(key)?;
        if shares == 0 {
            return Ok((0, 0));
        }
        Ok(liquidity::amounts_for_shares(
            shares,
            pool.reserve_low,
            pool.reserve_high,
            pool.total_shares,
        )?)
    }

    // ============ Swaps ============

    /// Exact-input swap, rejected whole if the output misses the caller's minimum.
    pub fn swap(
        &mut self,
        caller: Address,
        key: &PoolKey,
        intent: SwapIntent,
    ) -> Result<SwapReceipt, AmmError> {
        self.try_swap(caller, key, intent)
            .inspect_err(|e| debug!(caller = %caller, ?intent, error = %e, "swap rejected"))
    }

    fn try_swap(
        &mut self,
        caller: Address,
        key: &PoolKey,
        intent: SwapIntent,
    ) -> Result<SwapReceipt, AmmError> {
        let (account, pool) = self.load_pool(key)?;
        require_outside_caller(&caller, &pool)?;
        if intent.amount_in == 0 {
            return Err(AmmError::ZeroAmount);
        }
        if pool.is_empty() {
            return Err(AmmError::EmptyPool);
        }

        let direction = intent.direction;
        let (mint_in, mint_out) = pool.mints_for(direction);
        self.require_balance(&caller, &mint_in, intent.amount_in)?;

        let (reserve_in, reserve_out) = pool.reserves_for(direction);
        let quote = pricing::get_amount_out(intent.amount_in, reserve_in, reserve_out, pool.fee_bps)?;
        if quote.amount_out < intent.minimum_amount_out {
            return Err(AmmError::OutputTooSmall);
        }

        let mut next = pool.clone();
        next.set_reserves_for(
            direction,
            add_amounts(reserve_in, intent.amount_in)?,
            sub_amounts(reserve_out, quote.amount_out)?,
        );
        check_transition(Some(&pool), &next, PoolTransition::Swap(direction))?;

        let movements = [
            Movement::Transfer {
                asset: mint_in,
                from: caller,
                to: pool.pool_authority,
                amount: intent.amount_in,
            },
            Movement::Transfer {
                asset: mint_out,
                from: pool.pool_authority,
                to: caller,
                amount: quote.amount_out,
            },
        ];
        self.settle_and_commit(account, &next, &movements)?;

        info!(
            pool = %account,
            caller = %caller,
            ?direction,
            amount_in = quote.amount_in,
            fee = quote.fee_amount,
            amount_out = quote.amount_out,
            "swap"
        );
        Ok(SwapReceipt {
            pool: account,
            direction,
            amount_in: quote.amount_in,
            fee_amount: quote.fee_amount,
            amount_out: quote.amount_out,
            reserve_low: next.reserve_low,
            reserve_high: next.reserve_high,
        })
    }

    /// Exact-output swap: pay the smallest input that buys `amount_out`.
    pub fn swap_exact_out(
        &mut self,
        caller: Address,
        key: &PoolKey,
        intent: ExactOutIntent,
    ) -> Result<SwapReceipt, AmmError> {
        let amount_in = self
            .quote_amount_in(key, intent.direction, intent.amount_out)
            .inspect_err(|e| debug!(caller = %caller, ?intent, error = %e, "swap_exact_out rejected"))?;
        if amount_in > intent.maximum_amount_in {
            debug!(caller = %caller, ?intent, amount_in, "swap_exact_out rejected: input above maximum");
            return Err(AmmError::InputTooLarge);
        }

        self.swap(
            caller,
            key,
            SwapIntent {
                direction: intent.direction,
                amount_in,
                minimum_amount_out: intent.amount_out,
            },
        )
    }

    pub fn quote_swap(
        &self,
        key: &PoolKey,
        direction: SwapDirection,
        amount_in: u64,
    ) -> Result<SwapQuote, AmmError> {
        let (_, pool) = self.load_pool(key)?;
        if amount_in == 0 {
            return Err(AmmError::ZeroAmount);
        }
        if pool.is_empty() {
            return Err(AmmError::EmptyPool);
        }
        let (reserve_in, reserve_out) = pool.reserves_for(direction);
        Ok(pricing::get_amount_out(amount_in, reserve_in, reserve_out, pool.fee_bps)?)
    }

    /// Smallest input that yields at least `amount_out`.
    pub fn quote_amount_in(
        &self,
        key: &PoolKey,
        direction: SwapDirection,
        amount_out: u64,
    ) -> Result<u64, AmmError> {
        let (_, pool) = self.load_pool(key)?;
        if amount_out == 0 {
            return Err(AmmError::ZeroAmount);
        }
        if pool.is_empty() {
            return Err(AmmError::EmptyPool);
        }
        let (reserve_in, reserve_out) = pool.reserves_for(direction);
        Ok(pricing::get_amount_in(amount_out, reserve_in, reserve_out, pool.fee_bps)?)
    }

    // ============ Internals ============

    fn load_pool(&self, key: &PoolKey) -> Result<(Address, PoolData), AmmError> {
        let market = self.market_account(&key.market_id);
        if self.registry.market(&market).is_none() {
            return Err(AmmError::MarketNotFound);
        }
        let account = PoolAddresses::derive(&self.deriver, &market, &key.mint_low, &key.mint_high).pool;
        let pool = self.registry.pool(&account).ok_or(AmmError::PoolNotFound)?;
        Ok((account, pool.clone()))
    }

    fn require_balance(&self, owner: &Address, asset: &Address, amount: u64) -> Result<(), AmmError> {
        if self.custody.balance(owner, asset) < amount {
            return Err(AmmError::InsufficientTokenBalance);
        }
        Ok(())
    }

    fn settle_and_commit(
        &mut self,
        account: Address,
        next: &PoolData,
        movements: &[Movement],
    ) -> Result<(), AmmError> {
        let signer = PoolSigner::new(next.pool_authority);
        self.custody.settle(&signer, movements)?;
        self.registry.commit_pool(account, next.clone());
        Ok(())
    }
}

/// The escrow only moves through the pool's own operations, never as a party to one.
fn require_outside_caller(caller: &Address, pool: &PoolData) -> Result<(), AmmError> {
    if *caller == pool.pool_authority {
        return Err(AmmError::InvalidCaller);
    }
    Ok(())
}

/// Run the pool type script over the serialized snapshots and insist it sees
/// the transition the engine meant to make.
fn check_transition(
    old: Option<&PoolData>,
    new: &PoolData,
    expected: PoolTransition,
) -> Result<(), AmmError> {
    let old_data = old.map(PoolData::serialize);
    let transition = verify_pool_type(old_data.as_ref().map(|data| data.as_slice()), &new.serialize())
        .map_err(|e| {
            debug!(error = %e, "pool transition rejected");
            AmmError::InvariantViolated
        })?;
    if transition != expected {
        debug!(?transition, ?expected, "pool transition misclassified");
        return Err(AmmError::InvariantViolated);
    }
    Ok(())
}

// ============ Errors ============

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmmError {
    #[error("fee must be below the market fee ceiling")]
    InvalidFee,
    #[error("pool assets must be supplied in canonical order")]
    TokenMintOrderError,
    #[error("market already exists")]
    MarketAlreadyExists,
    #[error("pool already exists")]
    PoolAlreadyExists,
    #[error("deposit amounts are both zero")]
    ZeroDeposit,
    #[error("insufficient token balance")]
    InsufficientTokenBalance,
    #[error("swap output below the requested minimum")]
    OutputTooSmall,
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("market not found")]
    MarketNotFound,
    #[error("pool not found")]
    PoolNotFound,
    #[error("deposit would mint zero shares")]
    ZeroSharesMinted,
    #[error("initial deposit below the minimum locked liquidity")]
    DepositTooSmall,
    #[error("amount must be non-zero")]
    ZeroAmount,
    #[error("the zero address is not a valid asset")]
    InvalidAsset,
    #[error("the pool authority cannot act as a caller")]
    InvalidCaller,
    #[error("pool has no liquidity")]
    EmptyPool,
    #[error("requested output exceeds pool liquidity")]
    InsufficientLiquidity,
    #[error("required input exceeds the requested maximum")]
    InputTooLarge,
    #[error("pool state transition failed validation")]
    InvariantViolated,
    #[error("custody: {0}")]
    Custody(#[from] CustodyError),
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl From<MathError> for AmmError {
    fn from(e: MathError) -> Self {
        match e {
            MathError::Overflow => AmmError::ArithmeticOverflow,
            MathError::DivisionByZero => AmmError::DivisionByZero,
            MathError::InvalidFee => AmmError::InvalidFee,
            MathError::ZeroAmount => AmmError::ZeroAmount,
            MathError::InsufficientLiquidity => AmmError::InsufficientLiquidity,
            MathError::ExceedsSupply => AmmError::InsufficientTokenBalance,
        }
    }
}

impl From<MarketTypeError> for AmmError {
    fn from(e: MarketTypeError) -> Self {
        match e {
            MarketTypeError::MarketAlreadyExists => AmmError::MarketAlreadyExists,
            MarketTypeError::InvalidFee(_) => AmmError::InvalidFee,
            MarketTypeError::InvalidAccountData => AmmError::InvariantViolated,
        }
    }
}

// ============ Tests ============
