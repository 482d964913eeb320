// 0x protocol v2 order model and EIP-712 order hashing.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use ethers::types::{Address, Bytes, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::de;

const EIP191_HEADER: [u8; 2] = [0x19, 0x01];

const EIP712_DOMAIN_NAME: &str = "0x Protocol";
const EIP712_DOMAIN_VERSION: &str = "2";

const EIP712_DOMAIN_SCHEMA: &[u8] =
    b"EIP712Domain(string name,string version,address verifyingContract)";

const EIP712_ORDER_SCHEMA: &[u8] = b"Order(\
address makerAddress,\
address takerAddress,\
address feeRecipientAddress,\
address senderAddress,\
uint256 makerAssetAmount,\
uint256 takerAssetAmount,\
uint256 makerFee,\
uint256 takerFee,\
uint256 expirationTimeSeconds,\
uint256 salt,\
bytes makerAssetData,\
bytes takerAssetData\
)";

/// Orders without an explicit expiry live for one minute.
pub const DEFAULT_ORDER_TTL_SECS: u64 = 60;

pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn encode_address(addr: &Address) -> [u8; 32] {
    let mut buf = [0u8; 32];
    buf[12..].copy_from_slice(addr.as_bytes());
    buf
}

fn encode_u256(value: U256) -> [u8; 32] {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    buf
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn default_expiration() -> u64 {
    now_secs() + DEFAULT_ORDER_TTL_SECS
}

fn u256_to_decimal(v: U256) -> Option<Decimal> {
    Decimal::from_str(&v.to_string()).ok()
}

/// A 0x v2 order, optionally carrying its signature.
///
/// The serde form is the snake_case JSON veil.co uses for `zero_ex_order`
/// (amounts and expiration as decimal strings, addresses lower-case hex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZxSignedOrder {
    #[serde(default, skip_serializing)]
    pub hash: Option<String>,
    #[serde(default, with = "de::address")]
    pub maker_address: Address,
    #[serde(default, with = "de::address")]
    pub taker_address: Address,
    #[serde(default, with = "de::address")]
    pub fee_recipient_address: Address,
    #[serde(default, with = "de::address")]
    pub sender_address: Address,
    #[serde(default, with = "de::address")]
    pub exchange_address: Address,
    #[serde(default, with = "de::u256_dec")]
    pub maker_asset_amount: U256,
    #[serde(default, with = "de::u256_dec")]
    pub taker_asset_amount: U256,
    #[serde(default, with = "de::u256_dec")]
    pub maker_fee: U256,
    #[serde(default, with = "de::u256_dec")]
    pub taker_fee: U256,
    #[serde(default, with = "de::u256_dec")]
    pub salt: U256,
    #[serde(default = "default_expiration", with = "de::u64_str")]
    pub expiration_time_seconds: u64,
    #[serde(default, with = "de::hex_bytes")]
    pub maker_asset_data: Bytes,
    #[serde(default, with = "de::hex_bytes")]
    pub taker_asset_data: Bytes,
    #[serde(default)]
    pub signature: Option<String>,
}

impl Default for ZxSignedOrder {
    fn default() -> Self {
        Self {
            hash: None,
            maker_address: Address::zero(),
            taker_address: Address::zero(),
            fee_recipient_address: Address::zero(),
            sender_address: Address::zero(),
            exchange_address: Address::zero(),
            maker_asset_amount: U256::zero(),
            taker_asset_amount: U256::zero(),
            maker_fee: U256::zero(),
            taker_fee: U256::zero(),
            salt: U256::zero(),
            expiration_time_seconds: default_expiration(),
            maker_asset_data: Bytes::new(),
            taker_asset_data: Bytes::new(),
            signature: None,
        }
    }
}

/// camelCase JSON shape of the 0x order schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZxOrderJson {
    #[serde(with = "de::address")]
    pub maker_address: Address,
    #[serde(with = "de::address")]
    pub taker_address: Address,
    #[serde(with = "de::address")]
    pub fee_recipient_address: Address,
    #[serde(with = "de::address")]
    pub sender_address: Address,
    #[serde(with = "de::u256_dec")]
    pub maker_asset_amount: U256,
    #[serde(with = "de::u256_dec")]
    pub taker_asset_amount: U256,
    #[serde(with = "de::u256_dec")]
    pub maker_fee: U256,
    #[serde(with = "de::u256_dec")]
    pub taker_fee: U256,
    #[serde(with = "de::u256_dec")]
    pub salt: U256,
    #[serde(with = "de::u64_str")]
    pub expiration_time_seconds: u64,
    #[serde(with = "de::hex_bytes")]
    pub maker_asset_data: Bytes,
    #[serde(with = "de::hex_bytes")]
    pub taker_asset_data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_address")]
    pub exchange_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

mod opt_address {
    use ethers::types::Address;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Address>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(addr) => s.serialize_str(&format!("{:#x}", addr)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Address>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(s) => crate::de::parse_address(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

impl ZxSignedOrder {
    /// EIP-712 domain separator for the order's exchange contract.
    pub fn domain_hash(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(32 * 4);
        encoded.extend_from_slice(&keccak256(EIP712_DOMAIN_SCHEMA));
        encoded.extend_from_slice(&keccak256(EIP712_DOMAIN_NAME.as_bytes()));
        encoded.extend_from_slice(&keccak256(EIP712_DOMAIN_VERSION.as_bytes()));
        encoded.extend_from_slice(&encode_address(&self.exchange_address));
        keccak256(&encoded)
    }

    pub fn struct_hash(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(32 * 13);
        encoded.extend_from_slice(&keccak256(EIP712_ORDER_SCHEMA));
        encoded.extend_from_slice(&encode_address(&self.maker_address));
        encoded.extend_from_slice(&encode_address(&self.taker_address));
        encoded.extend_from_slice(&encode_address(&self.fee_recipient_address));
        encoded.extend_from_slice(&encode_address(&self.sender_address));
        encoded.extend_from_slice(&encode_u256(self.maker_asset_amount));
        encoded.extend_from_slice(&encode_u256(self.taker_asset_amount));
        encoded.extend_from_slice(&encode_u256(self.maker_fee));
        encoded.extend_from_slice(&encode_u256(self.taker_fee));
        encoded.extend_from_slice(&encode_u256(U256::from(self.expiration_time_seconds)));
        encoded.extend_from_slice(&encode_u256(self.salt));
        encoded.extend_from_slice(&keccak256(self.maker_asset_data.as_ref()));
        encoded.extend_from_slice(&keccak256(self.taker_asset_data.as_ref()));
        keccak256(&encoded)
    }

    /// `keccak256(0x1901 ‖ domainHash ‖ structHash)`
    pub fn order_hash(&self) -> [u8; 32] {
        let mut msg = Vec::with_capacity(66);
        msg.extend_from_slice(&EIP191_HEADER);
        msg.extend_from_slice(&self.domain_hash());
        msg.extend_from_slice(&self.struct_hash());
        keccak256(&msg)
    }

    pub fn order_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.order_hash()))
    }

    /// Hash of the order, computed on first use.
    pub fn cached_hash(&mut self) -> String {
        match &self.hash {
            Some(h) => h.clone(),
            None => {
                self.update_hash();
                self.order_hash_hex()
            }
        }
    }

    pub fn update_hash(&mut self) -> &mut Self {
        self.hash = Some(self.order_hash_hex());
        self
    }

    /// Price of the taker asset per unit of maker asset (what the maker bids).
    pub fn bid_price(&self) -> Decimal {
        if self.maker_asset_amount.is_zero() {
            return Decimal::ZERO;
        }
        match (
            u256_to_decimal(self.taker_asset_amount),
            u256_to_decimal(self.maker_asset_amount),
        ) {
            (Some(taker), Some(maker)) => taker.checked_div(maker).unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        }
    }

    /// Price of the maker asset per unit of taker asset (what the maker asks).
    pub fn ask_price(&self) -> Decimal {
        if self.taker_asset_amount.is_zero() {
            return Decimal::MAX;
        }
        match (
            u256_to_decimal(self.maker_asset_amount),
            u256_to_decimal(self.taker_asset_amount),
        ) {
            (Some(maker), Some(taker)) => maker.checked_div(taker).unwrap_or(Decimal::MAX),
            _ => Decimal::MAX,
        }
    }

    pub fn to_zx_json(&self, include_hash: bool, include_signature: bool, include_exchange_address: bool) -> ZxOrderJson {
        ZxOrderJson {
            maker_address: self.maker_address,
            taker_address: self.taker_address,
            fee_recipient_address: self.fee_recipient_address,
            sender_address: self.sender_address,
            maker_asset_amount: self.maker_asset_amount,
            taker_asset_amount: self.taker_asset_amount,
            maker_fee: self.maker_fee,
            taker_fee: self.taker_fee,
            salt: self.salt,
            expiration_time_seconds: self.expiration_time_seconds,
            maker_asset_data: self.maker_asset_data.clone(),
            taker_asset_data: self.taker_asset_data.clone(),
            exchange_address: include_exchange_address.then_some(self.exchange_address),
            signature: if include_signature { self.signature.clone() } else { None },
            hash: include_hash.then(|| self.order_hash_hex()),
        }
    }

    pub fn from_zx_json(json: &ZxOrderJson) -> Self {
        let mut order = Self {
            hash: None,
            maker_address: json.maker_address,
            taker_address: json.taker_address,
            fee_recipient_address: json.fee_recipient_address,
            sender_address: json.sender_address,
            exchange_address: json.exchange_address.unwrap_or_else(Address::zero),
            maker_asset_amount: json.maker_asset_amount,
            taker_asset_amount: json.taker_asset_amount,
            maker_fee: json.maker_fee,
            taker_fee: json.taker_fee,
            salt: json.salt,
            expiration_time_seconds: json.expiration_time_seconds,
            maker_asset_data: json.maker_asset_data.clone(),
            taker_asset_data: json.taker_asset_data.clone(),
            signature: json.signature.clone(),
        };
        order.update_hash();
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> ZxSignedOrder {
        serde_json::from_value(serde_json::json!({
            "maker_address": "0x5409ed021d9299bf6814279a6a1411a7e866a631",
            "taker_address": "0x0000000000000000000000000000000000000000",
            "fee_recipient_address": "0x0000000000000000000000000000000000000000",
            "sender_address": "0x0000000000000000000000000000000000000000",
            "exchange_address": "0x35dd2932454449b14cee11a94d3674a936d5d7b2",
            "maker_asset_amount": "100000000000000",
            "taker_asset_amount": "55000000000000",
            "maker_fee": "0",
            "taker_fee": "0",
            "salt": "67006738228878699843088602623665307406148487219438534730168799356281242528500",
            "expiration_time_seconds": 1546300800,
            "maker_asset_data": "0xf47261b0000000000000000000000000d0a1e359811322d97991e03f863a0c30c2cf029c",
            "taker_asset_data": "0xf47261b00000000000000000000000002002d3812f58e35f0ea1ffbf80a75a38c32175fa",
        }))
        .unwrap()
    }

    #[test]
    fn order_schema_string_is_canonical() {
        let schema = std::str::from_utf8(EIP712_ORDER_SCHEMA).unwrap();
        assert!(schema.starts_with("Order(address makerAddress,address takerAddress,"));
        assert!(schema.ends_with("bytes makerAssetData,bytes takerAssetData)"));
        assert!(!schema.contains(", "));
    }

    #[test]
    fn hash_is_deterministic_and_sensitive_to_fields() {
        let order = sample_order();
        let h1 = order.order_hash_hex();
        assert_eq!(h1.len(), 66);
        assert!(h1.starts_with("0x"));
        assert_eq!(h1, sample_order().order_hash_hex());

        let mut other = sample_order();
        other.salt = other.salt + U256::one();
        assert_ne!(h1, other.order_hash_hex());

        let mut other_exchange = sample_order();
        other_exchange.exchange_address = Address::zero();
        assert_ne!(h1, other_exchange.order_hash_hex());
    }

    // Same order hashed by ethers' generic EIP-712 encoder.
    #[test]
    fn hash_matches_generic_eip712_encoding() {
        use ethers::types::transaction::eip712::{Eip712, TypedData};

        let order = sample_order();
        let typed: TypedData = serde_json::from_value(serde_json::json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "verifyingContract", "type": "address"},
                ],
                "Order": [
                    {"name": "makerAddress", "type": "address"},
                    {"name": "takerAddress", "type": "address"},
                    {"name": "feeRecipientAddress", "type": "address"},
                    {"name": "senderAddress", "type": "address"},
                    {"name": "makerAssetAmount", "type": "uint256"},
                    {"name": "takerAssetAmount", "type": "uint256"},
                    {"name": "makerFee", "type": "uint256"},
                    {"name": "takerFee", "type": "uint256"},
                    {"name": "expirationTimeSeconds", "type": "uint256"},
                    {"name": "salt", "type": "uint256"},
                    {"name": "makerAssetData", "type": "bytes"},
                    {"name": "takerAssetData", "type": "bytes"},
                ],
            },
            "primaryType": "Order",
            "domain": {
                "name": "0x Protocol",
                "version": "2",
                "verifyingContract": "0x35dd2932454449b14cee11a94d3674a936d5d7b2",
            },
            "message": {
                "makerAddress": "0x5409ed021d9299bf6814279a6a1411a7e866a631",
                "takerAddress": "0x0000000000000000000000000000000000000000",
                "feeRecipientAddress": "0x0000000000000000000000000000000000000000",
                "senderAddress": "0x0000000000000000000000000000000000000000",
                "makerAssetAmount": "100000000000000",
                "takerAssetAmount": "55000000000000",
                "makerFee": "0",
                "takerFee": "0",
                "expirationTimeSeconds": "1546300800",
                "salt": "67006738228878699843088602623665307406148487219438534730168799356281242528500",
                "makerAssetData": "0xf47261b0000000000000000000000000d0a1e359811322d97991e03f863a0c30c2cf029c",
                "takerAssetData": "0xf47261b00000000000000000000000002002d3812f58e35f0ea1ffbf80a75a38c32175fa",
            },
        }))
        .unwrap();

        assert_eq!(typed.domain_separator().unwrap(), order.domain_hash());
        assert_eq!(typed.struct_hash().unwrap(), order.struct_hash());
        assert_eq!(typed.encode_eip712().unwrap(), order.order_hash());

        let hex = order.order_hash_hex();
        assert!(hex.starts_with("0x3269a4de"), "{}", hex);
        assert!(hex.ends_with("9f5b"), "{}", hex);
    }

    #[test]
    fn signature_does_not_affect_hash() {
        let mut order = sample_order();
        let before = order.order_hash_hex();
        order.signature = Some("0x1b00".to_string());
        assert_eq!(before, order.order_hash_hex());
    }

    #[test]
    fn lazy_hash_is_cached() {
        let mut order = sample_order();
        assert!(order.hash.is_none());
        let h = order.cached_hash();
        assert_eq!(order.hash.as_deref(), Some(h.as_str()));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let order: ZxSignedOrder = serde_json::from_str("{}").unwrap();
        assert_eq!(order.maker_address, Address::zero());
        assert!(order.maker_asset_amount.is_zero());
        assert!(order.expiration_time_seconds >= now_secs());
        assert!(order.maker_asset_data.is_empty());
    }

    #[test]
    fn bid_and_ask_prices() {
        let order = sample_order();
        assert_eq!(order.bid_price(), Decimal::from_str("0.55").unwrap());
        let empty = ZxSignedOrder::default();
        assert_eq!(empty.bid_price(), Decimal::ZERO);
        assert_eq!(empty.ask_price(), Decimal::MAX);
    }

    #[test]
    fn veil_json_uses_strings_for_amounts_and_expiry() {
        let value = serde_json::to_value(sample_order()).unwrap();
        assert_eq!(value["maker_asset_amount"], "100000000000000");
        assert_eq!(value["expiration_time_seconds"], "1546300800");
        assert_eq!(value["exchange_address"], "0x35dd2932454449b14cee11a94d3674a936d5d7b2");
        assert!(value.get("hash").is_none());
    }

    #[test]
    fn zx_json_preserves_the_hash() {
        let order = sample_order();
        let json = order.to_zx_json(true, true, true);
        let value = serde_json::to_value(&json).unwrap();
        assert_eq!(value["makerAssetAmount"], "100000000000000");
        assert_eq!(value["hash"], order.order_hash_hex());
        let back = ZxSignedOrder::from_zx_json(&json);
        assert_eq!(back.order_hash_hex(), order.order_hash_hex());
        assert_eq!(back.hash, Some(order.order_hash_hex()));
    }
}
