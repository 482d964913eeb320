use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::units::{veil_price_to_eth, veil_shares_to_amount};
use crate::veil::types::{BookEntry, OrderSide, SideBook};

/// Aggregated view of one long or short book.
///
/// Prices are veil ticks, sizes veil shares. Entries at the same price are
/// summed into a single level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBook {
    pub bids: BTreeMap<u128, u128>, // highest price = best bid
    pub asks: BTreeMap<u128, u128>, // lowest price  = best ask
}

fn aggregate(entries: &[BookEntry]) -> BTreeMap<u128, u128> {
    let mut levels = BTreeMap::new();
    for e in entries {
        let level = levels.entry(e.price).or_insert(0u128);
        *level = level.saturating_add(e.token_amount);
    }
    levels
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sides(bids: &SideBook, asks: &SideBook) -> Self {
        let mut book = Self::new();
        book.apply_side(bids);
        book.apply_side(asks);
        book
    }

    // Replace one side with a fresh snapshot
    pub fn apply_side(&mut self, side: &SideBook) {
        let levels = aggregate(&side.entries);
        match side.side {
            OrderSide::Buy => self.bids = levels,
            OrderSide::Sell => self.asks = levels,
        }
    }

    pub fn best_bid(&self) -> Option<(u128, u128)> {
        self.bids.iter().next_back().map(|(p, s)| (*p, *s))
    }

    pub fn best_ask(&self) -> Option<(u128, u128)> {
        self.asks.iter().next().map(|(p, s)| (*p, *s))
    }

    pub fn bbo(&self) -> (Option<(u128, u128)>, Option<(u128, u128)>) {
        (self.best_bid(), self.best_ask())
    }

    /// Ask minus bid in ticks; negative when the book is crossed.
    pub fn spread(&self) -> Option<i128> {
        let (bid, _) = self.best_bid()?;
        let (ask, _) = self.best_ask()?;
        Some(ask as i128 - bid as i128)
    }

    /// Best `n` levels of each side, best first.
    pub fn top(&self, n: usize) -> (Vec<(u128, u128)>, Vec<(u128, u128)>) {
        let bids = self.bids.iter().rev().take(n).map(|(p, s)| (*p, *s)).collect();
        let asks = self.asks.iter().take(n).map(|(p, s)| (*p, *s)).collect();
        (bids, asks)
    }

    pub fn depth(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    /// Best `n` levels as (price in ETH, shares) for a market with `num_ticks`.
    pub fn top_in_eth(
        &self,
        n: usize,
        num_ticks: Option<u64>,
    ) -> Result<(Vec<(Decimal, Decimal)>, Vec<(Decimal, Decimal)>)> {
        let convert = |levels: Vec<(u128, u128)>| -> Result<Vec<(Decimal, Decimal)>> {
            levels
                .into_iter()
                .map(|(p, s)| Ok((veil_price_to_eth(p, num_ticks)?, veil_shares_to_amount(s, num_ticks)?)))
                .collect()
        };
        let (bids, asks) = self.top(n);
        Ok((convert(bids)?, convert(asks)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(side: OrderSide, levels: &[(u128, u128)]) -> SideBook {
        SideBook {
            side,
            entries: levels
                .iter()
                .map(|&(price, token_amount)| BookEntry { price, token_amount })
                .collect(),
        }
    }

    #[test]
    fn bbo_and_spread() {
        let book = OrderBook::from_sides(
            &side(OrderSide::Buy, &[(5000, 10), (5200, 5), (5000, 7)]),
            &side(OrderSide::Sell, &[(5600, 3), (5500, 8)]),
        );
        assert_eq!(book.best_bid(), Some((5200, 5)));
        assert_eq!(book.best_ask(), Some((5500, 8)));
        assert_eq!(book.spread(), Some(300));
        assert_eq!(book.bids.get(&5000), Some(&17));
        assert_eq!(book.depth(), (2, 2));
    }

    #[test]
    fn huge_levels_saturate() {
        let book = OrderBook::from_sides(
            &side(OrderSide::Buy, &[(5000, u128::MAX), (5000, 1)]),
            &side(OrderSide::Sell, &[]),
        );
        assert_eq!(book.best_bid(), Some((5000, u128::MAX)));
    }

    #[test]
    fn empty_side_has_no_spread() {
        let book = OrderBook::from_sides(
            &side(OrderSide::Buy, &[(5000, 1)]),
            &side(OrderSide::Sell, &[]),
        );
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.spread(), None);
    }

    #[test]
    fn top_levels_best_first() {
        let book = OrderBook::from_sides(
            &side(OrderSide::Buy, &[(1, 1), (3, 1), (2, 1)]),
            &side(OrderSide::Sell, &[(9, 1), (7, 1), (8, 1)]),
        );
        let (bids, asks) = book.top(2);
        assert_eq!(bids, vec![(3, 1), (2, 1)]);
        assert_eq!(asks, vec![(7, 1), (8, 1)]);
    }

    #[test]
    fn levels_in_eth() {
        let book = OrderBook::from_sides(
            &side(OrderSide::Buy, &[(5500, 100_000_000_000_000)]),
            &side(OrderSide::Sell, &[]),
        );
        let (bids, _) = book.top_in_eth(1, None).unwrap();
        assert_eq!(bids, vec![(Decimal::new(55, 2), Decimal::ONE)]);
    }
}
