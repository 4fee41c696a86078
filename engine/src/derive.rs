// ============ Address Derivation ============
// Deterministic account identities for markets, pools, pool authorities and
// share mints. Same seeds, same address, on every node.

use pairpool_types::{Address, AUTHORITY_SEED, LIQUIDITY_SEED};
use sha2::{Digest, Sha256};

/// Domain tag mixed into every derivation
pub const DERIVATION_DOMAIN: &[u8] = b"pairpool-derive-v1";

pub trait AddressDeriver {
    fn derive(&self, seeds: &[&[u8]]) -> Address;
}

/// SHA-256(domain || len(seed_0) || seed_0 || len(seed_1) || seed_1 ...)
///
/// Each seed is length-prefixed (u32 LE) so `["ab", "c"]` and `["a", "bc"]`
/// never collide.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Deriver;

impl AddressDeriver for Sha256Deriver {
    fn derive(&self, seeds: &[&[u8]]) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(DERIVATION_DOMAIN);
        for seed in seeds {
            hasher.update((seed.len() as u32).to_le_bytes());
            hasher.update(seed);
        }
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        Address(hash)
    }
}

pub fn market_account<D: AddressDeriver + ?Sized>(deriver: &D, market_id: &Address) -> Address {
    deriver.derive(&[market_id.as_ref()])
}

/// Every account a pool owns, derived from its market and mint pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolAddresses {
    pub pool: Address,
    pub authority: Address,
    pub share_mint: Address,
}

impl PoolAddresses {
    pub fn derive<D: AddressDeriver + ?Sized>(
        deriver: &D,
        market_account: &Address,
        mint_low: &Address,
        mint_high: &Address,
    ) -> Self {
        let base: [&[u8]; 3] = [market_account.as_ref(), mint_low.as_ref(), mint_high.as_ref()];
        Self {
            pool: deriver.derive(&base),
            authority: deriver.derive(&[base[0], base[1], base[2], AUTHORITY_SEED]),
            share_mint: deriver.derive(&[base[0], base[1], base[2], LIQUIDITY_SEED]),
        }
    }
}

// ============ Tests ============
