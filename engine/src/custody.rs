// ============ Asset Custody ============
// Where balances actually live. The engine never edits a balance directly; it
// hands custody one settlement batch per operation and custody applies all of
// it or none of it.

use std::collections::BTreeMap;

use pairpool_types::Address;
use thiserror::Error;

/// Authorization to move a pool's escrow and mint its shares.
/// Only the engine can construct one.
#[derive(Debug)]
pub struct PoolSigner {
    authority: Address,
}

impl PoolSigner {
    pub(crate) fn new(authority: Address) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> &Address {
        &self.authority
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Movement {
    Transfer {
        asset: Address,
        from: Address,
        to: Address,
        amount: u64,
    },
    Mint {
        asset: Address,
        to: Address,
        amount: u64,
    },
    Burn {
        asset: Address,
        from: Address,
        amount: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    #[error("{owner} holds {available} of {asset}, needs {needed}")]
    InsufficientBalance {
        owner: Address,
        asset: Address,
        needed: u64,
        available: u64,
    },
    #[error("signer may not move funds held by {0}")]
    UnauthorizedTransfer(Address),
    #[error("transfer from {0} to itself")]
    SelfTransfer(Address),
    #[error("signer is not the mint authority of {0}")]
    UnauthorizedMint(Address),
    #[error("mint {0} already exists")]
    MintAlreadyExists(Address),
    #[error("balance or supply overflow")]
    Overflow,
}

pub trait Custody {
    fn balance(&self, owner: &Address, asset: &Address) -> u64;

    fn supply(&self, asset: &Address) -> u64;

    /// Register `mint` with the signer's authority as its only minter.
    fn create_mint(
        &mut self,
        signer: &PoolSigner,
        mint: &Address,
        decimals: u8,
    ) -> Result<(), CustodyError>;

    /// Apply every movement, or none. Transfers out of an authority's escrow
    /// and mints need the matching signer; a transfer to its own source is refused.
    fn settle(&mut self, signer: &PoolSigner, movements: &[Movement]) -> Result<(), CustodyError>;
}

// ============ In-Memory Custody ============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MintInfo {
    authority: Address,
    decimals: u8,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryCustody {
    /// (owner, asset) -> balance
    balances: BTreeMap<(Address, Address), u64>,
    supplies: BTreeMap<Address, u64>,
    mints: BTreeMap<Address, MintInfo>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fund `owner` out of thin air. Used to seed caller wallets.
    pub fn credit(&mut self, owner: Address, asset: Address, amount: u64) -> Result<(), CustodyError> {
        let supply = self.supplies.get(&asset).copied().unwrap_or(0);
        let supply = supply.checked_add(amount).ok_or(CustodyError::Overflow)?;
        let balance = self.balance(&owner, &asset);
        let balance = balance.checked_add(amount).ok_or(CustodyError::Overflow)?;
        self.supplies.insert(asset, supply);
        self.balances.insert((owner, asset), balance);
        Ok(())
    }

    pub fn mint_decimals(&self, mint: &Address) -> Option<u8> {
        self.mints.get(mint).map(|info| info.decimals)
    }

    fn is_escrow(&self, owner: &Address) -> bool {
        self.mints.values().any(|info| info.authority == *owner)
    }

    fn authorize(&self, signer: &PoolSigner, movement: &Movement) -> Result<(), CustodyError> {
        match movement {
            Movement::Transfer { from, to, .. } => {
                if from == to {
                    return Err(CustodyError::SelfTransfer(*from));
                }
                if self.is_escrow(from) && signer.authority() != from {
                    return Err(CustodyError::UnauthorizedTransfer(*from));
                }
            }
            Movement::Mint { asset, .. } => match self.mints.get(asset) {
                Some(info) if info.authority == *signer.authority() => {}
                _ => return Err(CustodyError::UnauthorizedMint(*asset)),
            },
            Movement::Burn { .. } => {}
        }
        Ok(())
    }
}

impl Custody for MemoryCustody {
    fn balance(&self, owner: &Address, asset: &Address) -> u64 {
        self.balances.get(&(*owner, *asset)).copied().unwrap_or(0)
    }

    fn supply(&self, asset: &Address) -> u64 {
        self.supplies.get(asset).copied().unwrap_or(0)
    }

    fn create_mint(
        &mut self,
        signer: &PoolSigner,
        mint: &Address,
        decimals: u8,
    ) -> Result<(), CustodyError> {
        if self.mints.contains_key(mint) || self.supplies.contains_key(mint) {
            return Err(CustodyError::MintAlreadyExists(*mint));
        }
        self.mints.insert(
            *mint,
            MintInfo {
                authority: *signer.authority(),
                decimals,
            },
        );
        Ok(())
    }

    fn settle(&mut self, signer: &PoolSigner, movements: &[Movement]) -> Result<(), CustodyError> {
        // Net every movement first; nothing is written until the whole batch checks out.
        let mut balance_deltas: BTreeMap<(Address, Address), i128> = BTreeMap::new();
        let mut supply_deltas: BTreeMap<Address, i128> = BTreeMap::new();

        for movement in movements {
            self.authorize(signer, movement)?;
            match *movement {
                Movement::Transfer {
                    asset,
                    from,
                    to,
                    amount,
                } => {
                    *balance_deltas.entry((from, asset)).or_default() -= amount as i128;
                    *balance_deltas.entry((to, asset)).or_default() += amount as i128;
                }
                Movement::Mint { asset, to, amount } => {
                    *balance_deltas.entry((to, asset)).or_default() += amount as i128;
                    *supply_deltas.entry(asset).or_default() += amount as i128;
                }
                Movement::Burn {
                    asset,
                    from,
                    amount,
                } => {
                    *balance_deltas.entry((from, asset)).or_default() -= amount as i128;
                    *supply_deltas.entry(asset).or_default() -= amount as i128;
                }
            }
        }

        let mut new_balances = Vec::with_capacity(balance_deltas.len());
        for ((owner, asset), delta) in balance_deltas {
            let available = self.balance(&owner, &asset);
            let updated = available as i128 + delta;
            if updated < 0 {
                return Err(CustodyError::InsufficientBalance {
                    owner,
                    asset,
                    needed: u64::try_from(-delta).unwrap_or(u64::MAX),
                    available,
                });
            }
            let updated = u64::try_from(updated).map_err(|_| CustodyError::Overflow)?;
            new_balances.push(((owner, asset), updated));
        }

        let mut new_supplies = Vec::with_capacity(supply_deltas.len());
        for (asset, delta) in supply_deltas {
            let updated = self.supply(&asset) as i128 + delta;
            let updated = u64::try_from(updated).map_err(|_| CustodyError::Overflow)?;
            new_supplies.push((asset, updated));
        }

        for (key, balance) in new_balances {
            self.balances.insert(key, balance);
        }
        for (asset, supply) in new_supplies {
            self.supplies.insert(asset, supply);
        }
        Ok(())
    }
}

// ============ Tests ============
