use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum VeilError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("veil API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("A private key is required for this operation")]
    MissingPrivateKey,

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("quote amount outside acceptable range: amount={amount}, expected {min} <= amount <= {max}")]
    AmountOutOfRange {
        amount: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("quote price outside acceptable range: price={0}, expected 0 <= price <= 1")]
    PriceOutOfRange(Decimal),

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("Order hash mismatch: quote says {expected}, computed {computed}")]
    OrderHashMismatch { expected: String, computed: String },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, VeilError>;
