pub mod book;
pub mod cache;
pub mod client;
pub mod types;

pub use book::OrderBook;
pub use cache::{MarketCache, MarketFilter};
pub use client::{VeilClient, DEFAULT_FEED_SCOPE, MAX_PAGES};
pub use types::*;
