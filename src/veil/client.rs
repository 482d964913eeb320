// Async client for the veil.co REST API.
//
// Public market data needs no account. Quotes, orders and balances need a
// session, which is obtained lazily by signing a server challenge with the
// configured private key.

use std::fmt;
use std::sync::Arc;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use reqwest::{header, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Settings;
use crate::error::{Result, VeilError};
use crate::network::{NetworkId, DEFAULT_PAGE, DEFAULT_PER_PAGE};
use crate::units::{amount_to_veil_shares, eth_to_veil_price};
use crate::veil::book::OrderBook;
use crate::veil::cache::{MarketCache, MarketFilter};
use crate::veil::types::{
    DataFeed, Envelope, Market, MarketBalances, MarketStatus, Order, OrderFill, OrderPriceType,
    OrderSide, OrderStatus, Page, QuoteResponse, Session, SessionChallenge, SideBook, TokenType,
};
use crate::zeroex::signature::{sign_hash_zx_compat, sign_personal_message, signature_hex};

/// Default history window for `data_feeds`.
pub const DEFAULT_FEED_SCOPE: &str = "month";

/// Upper bound on requests made by one unpaged listing.
pub const MAX_PAGES: u32 = 500;

fn normalise_hash(h: &str) -> String {
    h.trim().trim_start_matches("0x").to_lowercase()
}

#[derive(Clone)]
pub struct VeilClient {
    http: reqwest::Client,
    api_url: String,
    network: NetworkId,
    min_amount: Decimal,
    max_amount: Decimal,
    wallet: Option<LocalWallet>,
    session: Arc<RwLock<Option<Session>>>,
    markets: MarketCache,
}

impl VeilClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_parts(
            settings.network,
            &settings.veil_api_url()?,
            settings.wallet()?,
            settings.min_amount,
            settings.max_amount,
        )
    }

    pub fn with_parts(
        network: NetworkId,
        api_url: &str,
        wallet: Option<LocalWallet>,
        min_amount: Decimal,
        max_amount: Decimal,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("veil-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let mut api_url = api_url.trim().to_string();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        Ok(Self {
            http,
            api_url,
            network,
            min_amount,
            max_amount,
            wallet,
            session: Arc::new(RwLock::new(None)),
            markets: MarketCache::new(),
        })
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn account_address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.address())
    }

    pub fn markets_cache(&self) -> &MarketCache {
        &self.markets
    }

    fn wallet(&self) -> Result<&LocalWallet> {
        self.wallet.as_ref().ok_or(VeilError::MissingPrivateKey)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Current session, authenticating first if there is none.
    pub async fn session(&self) -> Result<Session> {
        if let Some(s) = self.session.read().await.as_ref() {
            return Ok(s.clone());
        }
        // authenticate -> request -> session recurses; box the future
        Box::pin(self.authenticate(false)).await
    }

    /// Sign a fresh session challenge and exchange it for a session token.
    /// An existing session is reused unless `force` is set.
    #[instrument(skip(self))]
    pub async fn authenticate(&self, force: bool) -> Result<Session> {
        let mut guard = self.session.write().await;
        if !force {
            if let Some(s) = guard.as_ref() {
                return Ok(s.clone());
            }
        }
        let wallet = self.wallet()?;
        let challenge = self.get_session_challenge().await?;
        let signature = sign_personal_message(wallet, challenge.uid.as_bytes())?;
        let body = json!({
            "challengeUid": challenge.uid,
            "message": challenge.uid,
            "signature": signature_hex(&signature),
        });
        let env: Envelope<Session> = self
            .request(Method::POST, "sessions", &[], Some(body), false)
            .await?;
        info!(account = %format!("{:#x}", wallet.address()), "veil session established");
        *guard = Some(env.data.clone());
        Ok(env.data)
    }

    pub async fn get_session_challenge(&self) -> Result<SessionChallenge> {
        let env: Envelope<SessionChallenge> = self
            .request(Method::POST, "session_challenges", &[], None, false)
            .await?;
        Ok(env.data)
    }

    /// Markets, optionally filtered on channel and status. Without `page`
    /// every page is fetched.
    #[instrument(skip(self))]
    pub async fn get_markets(&self, filter: MarketFilter, force_refresh: bool) -> Result<Vec<Market>> {
        if !force_refresh {
            if let Some(markets) = self.markets.listing(&filter) {
                debug!(count = markets.len(), "markets served from cache");
                return Ok(markets);
            }
        }
        let mut params = Vec::new();
        if let Some(channel) = filter.channel.as_deref().filter(|c| !c.is_empty()) {
            params.push(("channel".to_string(), channel.to_string()));
        }
        if let Some(status) = filter.status {
            params.push(("status".to_string(), status.to_string()));
        }
        let markets: Vec<Market> = self
            .request_paginated("markets", params, filter.page, filter.per_page, false)
            .await?;
        for m in &markets {
            self.markets.store_market(m.clone());
        }
        self.markets.store_listing(filter, markets.clone());
        Ok(markets)
    }

    /// Open markets, every page.
    pub async fn get_open_markets(&self) -> Result<Vec<Market>> {
        let filter = MarketFilter {
            status: Some(MarketStatus::Open),
            ..Default::default()
        };
        self.get_markets(filter, false).await
    }

    #[instrument(skip(self))]
    pub async fn get_market(&self, slug: &str, force_refresh: bool) -> Result<Market> {
        if !force_refresh {
            if let Some(m) = self.markets.market(slug) {
                return Ok(m);
            }
        }
        let env: Envelope<Market> = self
            .request(Method::GET, &format!("markets/{}", slug), &[], None, false)
            .await?;
        self.markets.store_market(env.data.clone());
        Ok(env.data)
    }

    /// Data feed named by a market's `index`, e.g. `btc_usd`.
    #[instrument(skip(self))]
    pub async fn get_feed_data(&self, feed_name: &str, scope: &str) -> Result<DataFeed> {
        let query = [("scope".to_string(), scope.to_string())];
        let env: Envelope<DataFeed> = self
            .request(Method::GET, &format!("data_feeds/{}", feed_name), &query, None, false)
            .await?;
        Ok(env.data)
    }

    #[instrument(skip(self))]
    pub async fn get_bids(
        &self,
        slug: &str,
        token_type: TokenType,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<SideBook> {
        let path = format!("markets/{}/{}/bids", slug, token_type);
        let entries = self.request_paginated(&path, Vec::new(), page, per_page, false).await?;
        Ok(SideBook {
            side: OrderSide::Buy,
            entries,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_asks(
        &self,
        slug: &str,
        token_type: TokenType,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<SideBook> {
        let path = format!("markets/{}/{}/asks", slug, token_type);
        let entries = self.request_paginated(&path, Vec::new(), page, per_page, false).await?;
        Ok(SideBook {
            side: OrderSide::Sell,
            entries,
        })
    }

    /// Both sides of a book, fetched concurrently.
    pub async fn get_order_book(&self, slug: &str, token_type: TokenType) -> Result<OrderBook> {
        let (bids, asks) = futures::try_join!(
            self.get_bids(slug, token_type, None, None),
            self.get_asks(slug, token_type, None, None)
        )?;
        Ok(OrderBook::from_sides(&bids, &asks))
    }

    #[instrument(skip(self))]
    pub async fn get_order_fills(
        &self,
        slug: &str,
        token_type: TokenType,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Vec<OrderFill>> {
        let path = format!("markets/{}/{}/order_fills", slug, token_type);
        self.request_paginated(&path, Vec::new(), page, per_page, false).await
    }

    /// Request an unsigned order for `amount` shares at `price` ETH.
    #[instrument(skip(self, market), fields(market = %market.slug))]
    pub async fn get_quote(
        &self,
        market: &Market,
        token_type: TokenType,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
        price_type: OrderPriceType,
    ) -> Result<QuoteResponse> {
        if amount < self.min_amount || amount > self.max_amount {
            return Err(VeilError::AmountOutOfRange {
                amount,
                min: self.min_amount,
                max: self.max_amount,
            });
        }
        if price < Decimal::ZERO || price > Decimal::ONE {
            return Err(VeilError::PriceOutOfRange(price));
        }
        let body = json!({
            "quote": {
                "side": side,
                "token": format!("{:#x}", market.token(token_type)),
                "token_amount": amount_to_veil_shares(amount, market.num_ticks)?.to_string(),
                "price": eth_to_veil_price(price, market.num_ticks)?.to_string(),
                "type": price_type,
            }
        });
        let env: Envelope<QuoteResponse> = self
            .request(Method::POST, "quotes", &[], Some(body), true)
            .await?;
        Ok(env.data)
    }

    /// Quote, sign and submit an order. The returned order carries the
    /// signed 0x order.
    #[instrument(skip(self, market), fields(market = %market.slug))]
    pub async fn post_order(
        &self,
        market: &Market,
        token_type: TokenType,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
        price_type: OrderPriceType,
    ) -> Result<Order> {
        let wallet = self.wallet()?;
        let quote = self
            .get_quote(market, token_type, side, amount, price, price_type)
            .await?;

        let mut zx_order = quote.zero_ex_order;
        let computed = zx_order.order_hash_hex();
        if normalise_hash(&computed) != normalise_hash(&quote.order_hash) {
            error!(expected = %quote.order_hash, %computed, "quote order hash mismatch");
            return Err(VeilError::OrderHashMismatch {
                expected: quote.order_hash,
                computed,
            });
        }
        zx_order.hash = Some(computed);
        zx_order.signature = Some(sign_hash_zx_compat(wallet, zx_order.order_hash())?);

        let body = json!({
            "order": {
                "quote_uid": quote.uid,
                "zero_ex_order": &zx_order,
            }
        });
        let env: Envelope<Order> = self
            .request(Method::POST, "orders", &[], Some(body), true)
            .await?;
        let mut order = env.data;
        info!(uid = %order.uid, status = %order.status, "order posted");
        order.zero_ex_order = Some(zx_order);
        Ok(order)
    }

    /// The account's orders in a market; `None` status means any status.
    #[instrument(skip(self))]
    pub async fn get_orders(
        &self,
        slug: &str,
        status: Option<OrderStatus>,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Vec<Order>> {
        let mut params = vec![("market".to_string(), slug.to_string())];
        if let Some(status) = status {
            params.push(("status".to_string(), status.to_string()));
        }
        self.request_paginated("orders", params, page, per_page, true).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_order(&self, uid: &str) -> Result<Order> {
        let env: Envelope<Order> = self
            .request(Method::DELETE, &format!("orders/{}", uid), &[], None, true)
            .await?;
        info!(uid = %env.data.uid, status = %env.data.status, "order cancelled");
        Ok(env.data)
    }

    #[instrument(skip(self))]
    pub async fn get_balances(&self, slug: &str) -> Result<MarketBalances> {
        let env: Envelope<MarketBalances> = self
            .request(Method::GET, &format!("markets/{}/balances", slug), &[], None, true)
            .await?;
        let mut balances = env.data;
        balances.slug = slug.to_string();
        Ok(balances)
    }

    /// Untyped access to any endpoint. `query` goes in the URL, `body` is
    /// sent as JSON.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
        requires_session: bool,
    ) -> Result<Value> {
        self.request(method, path, query, body, requires_session).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
        requires_session: bool,
    ) -> Result<T> {
        let url = format!("{}{}", self.api_url, path.trim_start_matches('/'));
        debug!(%method, %url, ?query, "sending veil request");
        metrics::counter!("veil_http_requests_total", "method" => method.to_string()).increment(1);

        let mut req = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = &body {
            req = req.json(body);
        }
        if requires_session {
            let session = self.session().await?;
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", session.token));
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            error!(status = status.as_u16(), %method, %url, body = %text, "veil request failed");
            metrics::counter!("veil_http_failures_total", "status" => status.as_u16().to_string())
                .increment(1);
            return Err(VeilError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        debug!(status = status.as_u16(), bytes = text.len(), "veil response");
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&text)?)
    }

    // Explicit page: that page only. Otherwise walk from page 0 until an
    // empty or short page, `total` results, or MAX_PAGES requests.
    async fn request_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(String, String)>,
        page: Option<u32>,
        per_page: Option<u32>,
        requires_session: bool,
    ) -> Result<Vec<T>> {
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        let mut next_page = page.unwrap_or(DEFAULT_PAGE);
        let mut results = Vec::new();
        loop {
            let mut query = params.clone();
            query.push(("page".to_string(), next_page.to_string()));
            query.push(("pageSize".to_string(), per_page.to_string()));
            let env: Envelope<Page<T>> = self
                .request(Method::GET, path, &query, None, requires_session)
                .await?;
            let this_page = env.data;
            if this_page.results.is_empty() {
                break;
            }
            let short = this_page.results.len() < per_page as usize;
            results.extend(this_page.results);
            let complete = this_page
                .total
                .map_or(false, |total| results.len() as u64 >= total);
            if page.is_some() || complete || short {
                break;
            }
            next_page += 1;
            if next_page - page.unwrap_or(DEFAULT_PAGE) >= MAX_PAGES {
                warn!(path, pages = MAX_PAGES, "page limit reached, results may be incomplete");
                break;
            }
        }
        debug!(path, count = results.len(), "paginated fetch done");
        Ok(results)
    }
}

impl fmt::Debug for VeilClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VeilClient")
            .field("network", &self.network)
            .field("api_url", &self.api_url)
            .field("account", &self.account_address())
            .field("min_amount", &self.min_amount)
            .field("max_amount", &self.max_amount)
            .finish()
    }
}
