// Typed veil.co payloads. Wire names are snake_case, integers arrive as
// strings or numbers, timestamps as epoch milliseconds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ethers::types::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::de;
use crate::error::VeilError;
use crate::zeroex::ZxSignedOrder;

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = VeilError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(VeilError::InvalidValue(format!(
                        "{:?} is not a valid {}",
                        other,
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

wire_enum!(MarketStatus { Open => "open", Resolved => "resolved" });

wire_enum!(MarketType { Scalar => "scalar", YesNo => "yesno" });

wire_enum!(
    /// Side of a market. Long and short books mirror each other.
    TokenType { Long => "long", Short => "short" }
);

wire_enum!(OrderSide { Buy => "buy", Sell => "sell" });

wire_enum!(OrderPriceType { Limit => "limit" });

wire_enum!(OrderStatus {
    Open => "open",
    Filled => "filled",
    Canceled => "canceled",
    Expired => "expired",
    Pending => "pending",
    Completed => "completed",
});

/// `{"data": ...}` wrapper around every veil response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default, deserialize_with = "de::opt_u64_lenient")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    #[serde(deserialize_with = "de::u128_lenient")]
    pub price: u128,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub token_amount: u128,
}

/// Bid side (buy) or ask side (sell) of a long/short book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideBook {
    pub side: OrderSide,
    pub entries: Vec<BookEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFill {
    pub uid: String,
    pub status: OrderStatus,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub token_amount: u128,
    #[serde(with = "de::epoch_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de::opt_u128_lenient")]
    pub price: Option<u128>,
    #[serde(default)]
    pub side: Option<OrderSide>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub uid: String,
    pub status: OrderStatus,
    #[serde(with = "de::epoch_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "de::epoch_millis")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub price_type: OrderPriceType,
    pub token_type: TokenType,
    pub side: OrderSide,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub price: u128,
    #[serde(with = "de::address")]
    pub token: Address,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub token_amount: u128,
    #[serde(default, deserialize_with = "de::opt_string_lenient")]
    pub token_amount_clean: Option<String>,
    #[serde(default, deserialize_with = "de::u128_lenient")]
    pub token_amount_filled: u128,
    #[serde(with = "de::address")]
    pub currency: Address,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub currency_amount: u128,
    #[serde(default, deserialize_with = "de::opt_string_lenient")]
    pub currency_amount_clean: Option<String>,
    #[serde(default, deserialize_with = "de::u128_lenient")]
    pub currency_amount_filled: u128,
    #[serde(default, deserialize_with = "de::bool_lenient")]
    pub post_only: bool,
    #[serde(default)]
    pub market: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fills: Vec<OrderFill>,
    #[serde(default)]
    pub zero_ex_order: Option<ZxSignedOrder>,
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub uid: String,
    pub slug: String,
    pub name: String,
    #[serde(with = "de::address")]
    pub address: Address,
    #[serde(with = "de::epoch_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "de::epoch_millis")]
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub details: String,
    /// `None` for binary (yes/no) markets.
    #[serde(default, deserialize_with = "de::opt_u64_lenient")]
    pub num_ticks: Option<u64>,
    #[serde(default, deserialize_with = "de::opt_u128_lenient")]
    pub min_price: Option<u128>,
    #[serde(default, deserialize_with = "de::opt_u128_lenient")]
    pub max_price: Option<u128>,
    #[serde(default, deserialize_with = "de::opt_u128_lenient")]
    pub limit_price: Option<u128>,
    #[serde(rename = "type")]
    pub market_type: MarketType,
    #[serde(default, deserialize_with = "de::opt_string_lenient")]
    pub result: Option<String>,
    #[serde(default)]
    pub long_buyback_order: Option<Box<Order>>,
    #[serde(default)]
    pub short_buyback_order: Option<Box<Order>>,
    #[serde(with = "de::address")]
    pub long_token: Address,
    #[serde(with = "de::address")]
    pub short_token: Address,
    #[serde(default)]
    pub denomination: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default, deserialize_with = "de::opt_string_lenient")]
    pub index: Option<String>,
    #[serde(default, deserialize_with = "de::opt_u128_lenient")]
    pub predicted_price: Option<u128>,
    #[serde(default, deserialize_with = "de::opt_u128_lenient")]
    pub last_trade_price: Option<u128>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, deserialize_with = "de::opt_string_lenient")]
    pub final_value: Option<String>,
    #[serde(default, deserialize_with = "de::bool_lenient")]
    pub is_deleted: bool,
    #[serde(default, deserialize_with = "de::bool_lenient")]
    pub is_delisted: bool,
    #[serde(default, deserialize_with = "de::bool_lenient")]
    pub is_trading_paused: bool,
    #[serde(default, deserialize_with = "de::bool_lenient")]
    pub is_draft: bool,
    #[serde(default, deserialize_with = "de::opt_string_lenient")]
    pub review_status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string_lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string_lenient")]
    pub trade_fee: Option<String>,
}

impl Market {
    /// Address of the long or short share token.
    pub fn token(&self, token_type: TokenType) -> Address {
        match token_type {
            TokenType::Long => self.long_token,
            TokenType::Short => self.short_token,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.as_deref() == Some(MarketStatus::Open.as_str())
    }
}

/// Unsigned 0x order template returned by `POST quotes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub uid: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub price_type: OrderPriceType,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub price: u128,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub token_amount: u128,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub currency_amount: u128,
    pub order_hash: String,
    #[serde(with = "de::epoch_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "de::epoch_millis")]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "de::epoch_millis")]
    pub quote_expires_at: DateTime<Utc>,
    #[serde(with = "de::address")]
    pub token: Address,
    #[serde(with = "de::address")]
    pub currency: Address,
    #[serde(default, deserialize_with = "de::u128_lenient")]
    pub fillable_token_amount: u128,
    #[serde(default, deserialize_with = "de::u128_lenient")]
    pub fee_amount: u128,
    #[serde(default)]
    pub fee_breakdown: Option<serde_json::Value>,
    pub zero_ex_order: ZxSignedOrder,
}

/// A user's position in one market. Raw balances are in veil share base
/// units; the clean and ether balances are whole units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBalances {
    #[serde(default)]
    pub slug: String,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub long_balance: u128,
    #[serde(deserialize_with = "de::u128_lenient")]
    pub short_balance: u128,
    #[serde(deserialize_with = "de::ether_units")]
    pub long_balance_clean: Decimal,
    #[serde(deserialize_with = "de::ether_units")]
    pub short_balance_clean: Decimal,
    #[serde(deserialize_with = "de::ether_units")]
    pub veil_ether_balance: Decimal,
    #[serde(deserialize_with = "de::ether_units")]
    pub ether_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFeedEntry {
    #[serde(with = "de::epoch_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFeed {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub denomination: String,
    /// Oldest first.
    #[serde(default, deserialize_with = "sorted_entries")]
    pub entries: Vec<DataFeedEntry>,
}

fn sorted_entries<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<DataFeedEntry>, D::Error> {
    let mut entries: Vec<DataFeedEntry> = null_as_empty(d)?;
    entries.sort_by_key(|e| e.timestamp);
    Ok(entries)
}

impl DataFeed {
    pub fn latest(&self) -> Option<&DataFeedEntry> {
        self.entries.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChallenge {
    pub uid: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub account: serde_json::Value,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("account", &self.account)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn market_json() -> serde_json::Value {
        json!({
            "uid": "m-1",
            "slug": "btc-above-4000",
            "name": "Will BTC close above $4000?",
            "address": "0x1111111111111111111111111111111111111111",
            "created_at": 1546300800000u64,
            "ends_at": "1548979200000",
            "details": "",
            "num_ticks": null,
            "type": "yesno",
            "result": null,
            "long_buyback_order": null,
            "short_buyback_order": null,
            "long_token": "0x2222222222222222222222222222222222222222",
            "short_token": "0x3333333333333333333333333333333333333333",
            "denomination": "ETH",
            "channel": "btc",
            "index": "btc_usd",
            "predicted_price": "5500",
            "last_trade_price": 5400,
            "metadata": {},
            "is_deleted": false,
            "is_delisted": false,
            "is_trading_paused": false,
            "is_draft": false,
            "review_status": "approved",
            "status": "open",
            "trade_fee": "0.01"
        })
    }

    #[test]
    fn parses_market() {
        let m: Market = serde_json::from_value(market_json()).unwrap();
        assert_eq!(m.num_ticks, None);
        assert_eq!(m.market_type, MarketType::YesNo);
        assert_eq!(m.predicted_price, Some(5500));
        assert_eq!(m.last_trade_price, Some(5400));
        assert_eq!(m.ends_at.timestamp(), 1_548_979_200);
        assert_eq!(m.token(TokenType::Short), m.short_token);
        assert!(m.is_open());
    }

    #[test]
    fn parses_order_with_fills() {
        let o: Order = serde_json::from_value(json!({
            "uid": "o-1",
            "status": "open",
            "created_at": 1546300800000u64,
            "expires_at": 1546300860000u64,
            "type": "limit",
            "token_type": "long",
            "side": "buy",
            "price": "5500",
            "token": "0x2222222222222222222222222222222222222222",
            "token_amount": "100000000000000",
            "token_amount_filled": "0",
            "currency": "0xd0a1e359811322d97991e03f863a0c30c2cf029c",
            "currency_amount": "55000000000000",
            "currency_amount_filled": 0,
            "post_only": false,
            "market": null,
            "fills": [{
                "uid": "f-1",
                "status": "completed",
                "token_amount": 10,
                "created_at": 1546300801000u64
            }]
        }))
        .unwrap();
        assert_eq!(o.side, OrderSide::Buy);
        assert_eq!(o.price, 5500);
        assert_eq!(o.fills.len(), 1);
        assert_eq!(o.fills[0].status, OrderStatus::Completed);
        assert!(o.zero_ex_order.is_none());
    }

    #[test]
    fn balances_are_converted_to_whole_units() {
        let b: MarketBalances = serde_json::from_value(json!({
            "long_balance": "100000000000000",
            "short_balance": "0",
            "long_balance_clean": "1000000000000000000",
            "short_balance_clean": "0",
            "veil_ether_balance": "500000000000000000",
            "ether_balance": "2000000000000000000"
        }))
        .unwrap();
        assert_eq!(b.long_balance, 100_000_000_000_000);
        assert_eq!(b.long_balance_clean, Decimal::ONE);
        assert_eq!(b.veil_ether_balance, Decimal::new(5, 1));
        assert_eq!(b.ether_balance, Decimal::TWO);
        assert!(b.slug.is_empty());
    }

    #[test]
    fn feed_entries_are_sorted() {
        let feed: DataFeed = serde_json::from_value(json!({
            "uid": "f",
            "name": "btc_usd",
            "description": "BTC/USD",
            "denomination": "USD",
            "entries": [
                {"timestamp": 1546387200000u64, "value": "3900.5"},
                {"timestamp": 1546300800000u64, "value": 3800}
            ]
        }))
        .unwrap();
        assert!(feed.entries[0].timestamp < feed.entries[1].timestamp);
        assert_eq!(feed.latest().unwrap().value, Some(Decimal::new(39005, 1)));
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("LONG".parse::<TokenType>().unwrap(), TokenType::Long);
        assert_eq!(OrderStatus::Canceled.to_string(), "canceled");
        assert!("maybe".parse::<OrderSide>().is_err());
    }

    #[test]
    fn session_debug_hides_token() {
        let s = Session {
            token: "secret-token".to_string(),
            account: json!({"address": "0xabc"}),
        };
        assert!(!format!("{:?}", s).contains("secret-token"));
    }
}
