// Calls into the 0x v2 Exchange contract over JSON-RPC.

use std::fmt;

use ethers::abi::{self, ParamType, Token};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use ethers::utils::to_checksum;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::de::parse_address;
use crate::error::{Result, VeilError};
use crate::network::NetworkId;
use crate::units::{from_base_unit_amount, to_base_unit_amount};
use crate::zeroex::order::{keccak256, ZxSignedOrder};

const ORDER_TUPLE: &str =
    "(address,address,address,address,uint256,uint256,uint256,uint256,uint256,uint256,bytes,bytes)";

/// Order status codes reported by `Exchange.getOrderInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZxOrderStatus {
    Invalid = 0,
    InvalidMakerAssetAmount = 1,
    InvalidTakerAssetAmount = 2,
    Fillable = 3,
    Expired = 4,
    FullyFilled = 5,
    Cancelled = 6,
}

impl TryFrom<u8> for ZxOrderStatus {
    type Error = VeilError;

    fn try_from(v: u8) -> Result<Self> {
        Ok(match v {
            0 => ZxOrderStatus::Invalid,
            1 => ZxOrderStatus::InvalidMakerAssetAmount,
            2 => ZxOrderStatus::InvalidTakerAssetAmount,
            3 => ZxOrderStatus::Fillable,
            4 => ZxOrderStatus::Expired,
            5 => ZxOrderStatus::FullyFilled,
            6 => ZxOrderStatus::Cancelled,
            other => return Err(VeilError::Rpc(format!("unknown 0x order status {}", other))),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZxOrderInfo {
    pub order_status: ZxOrderStatus,
    pub order_hash: String,
    pub order_taker_asset_filled_amount: String,
}

impl fmt::Display for ZxOrderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrderInfo({:?}, {}, filled_amount={})",
            self.order_status, self.order_hash, self.order_taker_asset_filled_amount
        )
    }
}

pub(crate) fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub(crate) fn order_tuple(order: &ZxSignedOrder) -> Token {
    Token::Tuple(vec![
        Token::Address(order.maker_address),
        Token::Address(order.taker_address),
        Token::Address(order.fee_recipient_address),
        Token::Address(order.sender_address),
        Token::Uint(order.maker_asset_amount),
        Token::Uint(order.taker_asset_amount),
        Token::Uint(order.maker_fee),
        Token::Uint(order.taker_fee),
        Token::Uint(U256::from(order.expiration_time_seconds)),
        Token::Uint(order.salt),
        Token::Bytes(order.maker_asset_data.to_vec()),
        Token::Bytes(order.taker_asset_data.to_vec()),
    ])
}

pub(crate) fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&abi::encode(args));
    Bytes::from(data)
}

fn signature_bytes(order: &ZxSignedOrder) -> Result<Vec<u8>> {
    let sig = order
        .signature
        .as_deref()
        .ok_or_else(|| VeilError::Signing("order is not signed".to_string()))?;
    hex::decode(sig.trim_start_matches("0x")).map_err(|e| VeilError::InvalidHex(format!("{}: {}", sig, e)))
}

pub(crate) fn get_order_info_calldata(order: &ZxSignedOrder) -> Bytes {
    encode_call(&format!("getOrderInfo({})", ORDER_TUPLE), &[order_tuple(order)])
}

pub(crate) fn cancel_order_calldata(order: &ZxSignedOrder) -> Bytes {
    encode_call(&format!("cancelOrder({})", ORDER_TUPLE), &[order_tuple(order)])
}

pub(crate) fn fill_order_calldata(order: &ZxSignedOrder, taker_fill_amount: U256) -> Result<Bytes> {
    Ok(encode_call(
        &format!("fillOrder({},uint256,bytes)", ORDER_TUPLE),
        &[
            order_tuple(order),
            Token::Uint(taker_fill_amount),
            Token::Bytes(signature_bytes(order)?),
        ],
    ))
}

pub(crate) fn decode_order_info(output: &[u8]) -> Result<ZxOrderInfo> {
    let tokens = abi::decode(
        &[ParamType::Uint(8), ParamType::FixedBytes(32), ParamType::Uint(256)],
        output,
    )
    .map_err(|e| VeilError::Rpc(format!("cannot decode getOrderInfo output: {}", e)))?;
    match tokens.as_slice() {
        [Token::Uint(status), Token::FixedBytes(hash), Token::Uint(filled)] => Ok(ZxOrderInfo {
            order_status: ZxOrderStatus::try_from(
                u8::try_from(status.low_u32()).map_err(|e| VeilError::Rpc(e.to_string()))?,
            )?,
            order_hash: format!("0x{}", hex::encode(hash)),
            order_taker_asset_filled_amount: filled.to_string(),
        }),
        other => Err(VeilError::Rpc(format!("unexpected getOrderInfo output: {:?}", other))),
    }
}

/// Thin handle on the network's 0x Exchange contract.
pub struct ZxExchange {
    provider: Provider<Http>,
    wallet: Option<LocalWallet>,
    exchange: Address,
    network: NetworkId,
}

impl ZxExchange {
    pub fn new(network: NetworkId, rpc_url: &str, wallet: Option<LocalWallet>) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| VeilError::Rpc(format!("{}: {}", rpc_url, e)))?;
        let exchange = parse_address(network.zx_contracts().exchange).map_err(VeilError::InvalidAddress)?;
        let wallet = wallet.map(|w| w.with_chain_id(network.chain_id()));
        Ok(Self {
            provider,
            wallet,
            exchange,
            network,
        })
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn exchange_address(&self) -> Address {
        self.exchange
    }

    pub fn exchange_address_checksummed(&self) -> String {
        to_checksum(&self.exchange, None)
    }

    pub fn account_address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.address())
    }

    /// Balance of `owner` (the wallet's account when `None`) in ether.
    pub async fn ether_balance(&self, owner: Option<Address>) -> Result<Decimal> {
        let owner = owner
            .or_else(|| self.account_address())
            .ok_or(VeilError::MissingPrivateKey)?;
        let wei = self
            .provider
            .get_balance(owner, None)
            .await
            .map_err(|e| VeilError::Rpc(e.to_string()))?;
        let wei = u128::try_from(wei).map_err(|_| VeilError::InvalidNumber(wei.to_string()))?;
        from_base_unit_amount(wei, crate::units::ETHER_DECIMALS)
    }

    #[instrument(skip(self, order), fields(network = %self.network))]
    pub async fn get_order_info(&self, order: &ZxSignedOrder) -> Result<ZxOrderInfo> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.exchange)
            .data(get_order_info_calldata(order))
            .into();
        let output = self
            .provider
            .call(&tx, None)
            .await
            .map_err(|e| VeilError::Rpc(e.to_string()))?;
        let info = decode_order_info(&output)?;
        debug!(%info, "order info");
        Ok(info)
    }

    /// Submit `cancelOrder`; returns the transaction hash.
    #[instrument(skip(self, order), fields(network = %self.network))]
    pub async fn cancel_order(&self, order: &ZxSignedOrder) -> Result<H256> {
        self.send(cancel_order_calldata(order)).await
    }

    /// Submit `fillOrder` for `taker_fill_amount` whole units of the taker asset.
    #[instrument(skip(self, order), fields(network = %self.network))]
    pub async fn fill_order(
        &self,
        order: &ZxSignedOrder,
        taker_fill_amount: Decimal,
        base_unit_decimals: u32,
    ) -> Result<H256> {
        let amount = to_base_unit_amount(taker_fill_amount, base_unit_decimals)?;
        self.send(fill_order_calldata(order, U256::from(amount))?).await
    }

    async fn send(&self, data: Bytes) -> Result<H256> {
        let wallet = self.wallet.clone().ok_or(VeilError::MissingPrivateKey)?;
        let from = wallet.address();
        let client = SignerMiddleware::new(self.provider.clone(), wallet);
        let tx = TransactionRequest::new().from(from).to(self.exchange).data(data);
        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(|e| VeilError::Rpc(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        info!(?tx_hash, "transaction submitted");
        Ok(tx_hash)
    }
}

impl fmt::Debug for ZxExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZxExchange")
            .field("network", &self.network)
            .field("exchange", &self.exchange)
            .field("account", &self.account_address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_order() -> ZxSignedOrder {
        ZxSignedOrder {
            maker_address: parse_address("0x5409ed021d9299bf6814279a6a1411a7e866a631").unwrap(),
            maker_asset_amount: U256::from(100u64),
            taker_asset_amount: U256::from(55u64),
            expiration_time_seconds: 1_546_300_800,
            maker_asset_data: Bytes::from(vec![0xf4, 0x72, 0x61, 0xb0]),
            signature: Some(format!("0x1b{}03", "11".repeat(64))),
            ..ZxSignedOrder::default()
        }
    }

    #[test]
    fn known_exchange_selectors() {
        assert_eq!(hex::encode(selector(&format!("fillOrder({},uint256,bytes)", ORDER_TUPLE))), "b4be83d5");
        assert_eq!(hex::encode(selector(&format!("getOrderInfo({})", ORDER_TUPLE))), "c75e0a81");
        assert_eq!(hex::encode(selector(&format!("cancelOrder({})", ORDER_TUPLE))), "d46b02c3");
    }

    #[test]
    fn order_tuple_encodes_with_dynamic_offset() {
        let data = get_order_info_calldata(&signed_order());
        // selector + head offset word for the dynamic tuple
        assert_eq!(&data[..4], &selector(&format!("getOrderInfo({})", ORDER_TUPLE)));
        assert_eq!(U256::from_big_endian(&data[4..36]), U256::from(32u64));
        let args = abi::decode(
            &[ParamType::Tuple(vec![
                ParamType::Address,
                ParamType::Address,
                ParamType::Address,
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Bytes,
                ParamType::Bytes,
            ])],
            &data[4..],
        )
        .unwrap();
        assert_eq!(args[0], order_tuple(&signed_order()));
    }

    #[test]
    fn fill_requires_a_signature() {
        let mut order = signed_order();
        assert!(fill_order_calldata(&order, U256::one()).is_ok());
        order.signature = None;
        assert!(matches!(
            fill_order_calldata(&order, U256::one()),
            Err(VeilError::Signing(_))
        ));
    }

    #[test]
    fn decodes_order_info() {
        let encoded = abi::encode(&[
            Token::Uint(U256::from(3u8)),
            Token::FixedBytes(vec![0xab; 32]),
            Token::Uint(U256::from(42u64)),
        ]);
        let info = decode_order_info(&encoded).unwrap();
        assert_eq!(info.order_status, ZxOrderStatus::Fillable);
        assert_eq!(info.order_hash, format!("0x{}", "ab".repeat(32)));
        assert_eq!(info.order_taker_asset_filled_amount, "42");

        let bad = abi::encode(&[
            Token::Uint(U256::from(9u8)),
            Token::FixedBytes(vec![0; 32]),
            Token::Uint(U256::zero()),
        ]);
        assert!(decode_order_info(&bad).is_err());
    }

    #[test]
    fn checksummed_exchange_address() {
        let ex = ZxExchange::new(NetworkId::Kovan, "http://localhost:8545", None).unwrap();
        assert_eq!(
            ex.exchange_address_checksummed().to_lowercase(),
            NetworkId::Kovan.zx_contracts().exchange
        );
        assert!(ex.account_address().is_none());
    }
}
