use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ethers::signers::Signer;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use veil_rs::units::{veil_price_to_eth, veil_shares_to_amount};
use veil_rs::veil::{MarketFilter, MarketStatus, OrderPriceType, OrderSide, OrderStatus, TokenType, DEFAULT_FEED_SCOPE};
use veil_rs::zeroex::{ZxExchange, ZxSignedOrder};
use veil_rs::{telemetry, Settings, VeilClient};

#[derive(Parser, Debug)]
#[command(name = "veil", version, about = "veil.co prediction-market client")]
struct Cli {
    /// Network name or id (overrides VEIL_NETWORK and veil.toml)
    #[arg(long, global = true)]
    network: Option<String>,

    /// Settings file (default: ./veil.toml if present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Prometheus exporter port (only with the metrics-exporter feature)
    #[arg(long, global = true, default_value_t = 9000)]
    metrics_port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List markets
    Markets {
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        status: Option<MarketStatus>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Show one market
    Market { slug: String },
    /// Bid side of a long/short book
    Bids {
        slug: String,
        token_type: TokenType,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Ask side of a long/short book
    Asks {
        slug: String,
        token_type: TokenType,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Top of book with prices in ETH
    Book {
        slug: String,
        token_type: TokenType,
        #[arg(long, default_value_t = 10)]
        depth: usize,
    },
    /// Fill history of a long/short book
    Fills {
        slug: String,
        token_type: TokenType,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Data feed behind a market index
    Feed {
        name: String,
        #[arg(long, default_value = DEFAULT_FEED_SCOPE)]
        scope: String,
    },
    /// Your orders in a market
    Orders {
        slug: String,
        #[arg(long, default_value = "open")]
        status: OrderStatus,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Your balances in a market
    Balances { slug: String },
    /// Ask veil for a quote without posting
    Quote {
        slug: String,
        token_type: TokenType,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    },
    /// Quote, sign and post a limit order
    Order {
        slug: String,
        token_type: TokenType,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    },
    /// Cancel an order by uid
    Cancel { uid: String },
    /// Account address, and ether balance when an RPC endpoint is configured
    Address,
    /// getOrderInfo for a 0x order stored as JSON
    ZxOrderInfo { order: PathBuf },
    /// Cancel a 0x order on-chain
    ZxCancel { order: PathBuf },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_zx_order(path: &PathBuf, exchange: &ZxExchange) -> anyhow::Result<ZxSignedOrder> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut order: ZxSignedOrder = serde_json::from_str(&text).context("parsing 0x order")?;
    if order.exchange_address.is_zero() {
        order.exchange_address = exchange.exchange_address();
    }
    Ok(order)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref(), cli.network.as_deref())?;
    telemetry::init_tracing(&settings.log_filter);
    telemetry::init_metrics(cli.metrics_port)?;
    info!(network = %settings.network, "starting veil client");

    match cli.command {
        Command::ZxOrderInfo { order } => {
            let exchange = ZxExchange::new(settings.network, &settings.rpc_url()?, None)?;
            let order = read_zx_order(&order, &exchange)?;
            print_json(&exchange.get_order_info(&order).await?)?;
        }
        Command::ZxCancel { order } => {
            let exchange = ZxExchange::new(settings.network, &settings.rpc_url()?, settings.wallet()?)?;
            let order = read_zx_order(&order, &exchange)?;
            let tx_hash = exchange.cancel_order(&order).await?;
            print_json(&json!({ "tx_hash": tx_hash }))?;
        }
        Command::Address => {
            let wallet = settings.wallet()?.context("PRIVATE_KEY is not set")?;
            let exchange = match settings.rpc_url() {
                Ok(url) => Some(ZxExchange::new(settings.network, &url, Some(wallet.clone()))?),
                Err(_) => None,
            };
            let balance = match &exchange {
                Some(ex) => Some(ex.ether_balance(None).await?),
                None => None,
            };
            print_json(&json!({
                "network": settings.network,
                "address": ethers::utils::to_checksum(&wallet.address(), None),
                "ether_balance": balance,
            }))?;
        }
        command => run_api_command(VeilClient::new(&settings)?, command).await?,
    }
    Ok(())
}

async fn run_api_command(client: VeilClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Markets {
            channel,
            status,
            page,
            per_page,
        } => {
            let filter = MarketFilter {
                channel,
                status,
                page,
                per_page,
            };
            print_json(&client.get_markets(filter, false).await?)?;
        }
        Command::Market { slug } => print_json(&client.get_market(&slug, false).await?)?,
        Command::Bids { slug, token_type, page } => {
            print_json(&client.get_bids(&slug, token_type, page, None).await?)?
        }
        Command::Asks { slug, token_type, page } => {
            print_json(&client.get_asks(&slug, token_type, page, None).await?)?
        }
        Command::Book {
            slug,
            token_type,
            depth,
        } => {
            let market = client.get_market(&slug, false).await?;
            let book = client.get_order_book(&slug, token_type).await?;
            let (bids, asks) = book.top_in_eth(depth, market.num_ticks)?;
            let level = |l: Option<(u128, u128)>| -> anyhow::Result<Option<(Decimal, Decimal)>> {
                Ok(match l {
                    Some((p, s)) => Some((
                        veil_price_to_eth(p, market.num_ticks)?,
                        veil_shares_to_amount(s, market.num_ticks)?,
                    )),
                    None => None,
                })
            };
            print_json(&json!({
                "market": slug,
                "token_type": token_type,
                "best_bid": level(book.best_bid())?,
                "best_ask": level(book.best_ask())?,
                "spread_ticks": book.spread().map(|s| s.to_string()),
                "bids": bids,
                "asks": asks,
            }))?;
        }
        Command::Fills { slug, token_type, page } => {
            print_json(&client.get_order_fills(&slug, token_type, page, None).await?)?
        }
        Command::Feed { name, scope } => print_json(&client.get_feed_data(&name, &scope).await?)?,
        Command::Orders { slug, status, page } => {
            print_json(&client.get_orders(&slug, Some(status), page, None).await?)?
        }
        Command::Balances { slug } => print_json(&client.get_balances(&slug).await?)?,
        Command::Quote {
            slug,
            token_type,
            side,
            amount,
            price,
        } => {
            let market = client.get_market(&slug, false).await?;
            let quote = client
                .get_quote(&market, token_type, side, amount, price, OrderPriceType::Limit)
                .await?;
            print_json(&quote)?;
        }
        Command::Order {
            slug,
            token_type,
            side,
            amount,
            price,
        } => {
            let market = client.get_market(&slug, false).await?;
            let order = client
                .post_order(&market, token_type, side, amount, price, OrderPriceType::Limit)
                .await?;
            print_json(&order)?;
        }
        Command::Cancel { uid } => print_json(&client.cancel_order(&uid).await?)?,
        other => anyhow::bail!("{:?} does not use the veil API", other),
    }
    Ok(())
}
