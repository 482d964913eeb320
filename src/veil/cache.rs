use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::veil::types::{Market, MarketStatus};

/// Query shape of a `GET markets` listing; one cache entry per filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MarketFilter {
    pub channel: Option<String>,
    pub status: Option<MarketStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// In-memory market cache shared by clones of a client.
#[derive(Debug, Clone, Default)]
pub struct MarketCache {
    listings: Arc<RwLock<HashMap<MarketFilter, Vec<Market>>>>,
    by_slug: Arc<RwLock<HashMap<String, Market>>>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listing(&self, filter: &MarketFilter) -> Option<Vec<Market>> {
        self.listings.read().get(filter).cloned()
    }

    pub fn store_listing(&self, filter: MarketFilter, markets: Vec<Market>) {
        self.listings.write().insert(filter, markets);
    }

    pub fn market(&self, slug: &str) -> Option<Market> {
        self.by_slug.read().get(slug).cloned()
    }

    pub fn store_market(&self, market: Market) {
        self.by_slug.write().insert(market.slug.clone(), market);
    }

    pub fn clear(&self) {
        self.listings.write().clear();
        self.by_slug.write().clear();
    }

    pub fn sizes(&self) -> (usize, usize) {
        (self.listings.read().len(), self.by_slug.read().len())
    }
}
