// ============ Registry ============
// Market and pool account state, keyed by derived account address.
// BTreeMap so iteration order is the same everywhere.

use std::collections::BTreeMap;

use pairpool_types::{Address, MarketData, PoolData};

#[derive(Clone, Debug, Default)]
pub struct Registry {
    markets: BTreeMap<Address, MarketData>,
    pools: BTreeMap<Address, PoolData>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn market(&self, account: &Address) -> Option<&MarketData> {
        self.markets.get(account)
    }

    pub fn pool(&self, account: &Address) -> Option<&PoolData> {
        self.pools.get(account)
    }

    /// Insert-if-absent. Returns false and leaves the existing record alone
    /// when `account` is taken.
    pub fn insert_market(&mut self, account: Address, market: MarketData) -> bool {
        if self.markets.contains_key(&account) {
            return false;
        }
        self.markets.insert(account, market);
        true
    }

    pub fn insert_pool(&mut self, account: Address, pool: PoolData) -> bool {
        if self.pools.contains_key(&account) {
            return false;
        }
        self.pools.insert(account, pool);
        true
    }

    /// Overwrite an existing pool with an already validated successor.
    pub(crate) fn commit_pool(&mut self, account: Address, pool: PoolData) {
        self.pools.insert(account, pool);
    }

    pub fn markets(&self) -> impl Iterator<Item = (&Address, &MarketData)> {
        self.markets.iter()
    }

    pub fn pools(&self) -> impl Iterator<Item = (&Address, &PoolData)> {
        self.pools.iter()
    }

    /// Pools belonging to one market account
    pub fn pools_in<'a>(&'a self, market: &'a Address) -> impl Iterator<Item = &'a PoolData> + 'a {
        self.pools.values().filter(move |pool| pool.market == *market)
    }
}

// ============ Tests ============
