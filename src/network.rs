// Ethereum networks, their veil.co endpoints and 0x v2 contract deployments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilError};

pub const NULL_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub const DEFAULT_PAGE: u32 = 0;
pub const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Mainnet,
    Ropsten,
    Rinkeby,
    Kovan,
    Ganache,
}

impl NetworkId {
    pub fn chain_id(self) -> u64 {
        match self {
            NetworkId::Mainnet => 1,
            NetworkId::Ropsten => 3,
            NetworkId::Rinkeby => 4,
            NetworkId::Kovan => 42,
            NetworkId::Ganache => 50,
        }
    }

    pub fn from_chain_id(id: u64) -> Result<Self> {
        match id {
            1 => Ok(NetworkId::Mainnet),
            3 => Ok(NetworkId::Ropsten),
            4 => Ok(NetworkId::Rinkeby),
            42 => Ok(NetworkId::Kovan),
            50 => Ok(NetworkId::Ganache),
            other => Err(VeilError::UnsupportedNetwork(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NetworkId::Mainnet => "mainnet",
            NetworkId::Ropsten => "ropsten",
            NetworkId::Rinkeby => "rinkeby",
            NetworkId::Kovan => "kovan",
            NetworkId::Ganache => "ganache",
        }
    }

    /// Base URL of the veil.co REST API. veil only ran on mainnet and kovan.
    pub fn veil_api_url(self) -> Result<&'static str> {
        match self {
            NetworkId::Mainnet => Ok("https://api.veil.co/api/v1/"),
            NetworkId::Kovan => Ok("https://api.kovan.veil.co/api/v1/"),
            other => Err(VeilError::UnsupportedNetwork(format!(
                "veil.co has no API on {}",
                other
            ))),
        }
    }

    pub fn infura_url(self, api_key: &str) -> String {
        match self {
            NetworkId::Ganache => "http://localhost:8545".to_string(),
            other => format!("https://{}.infura.io/v3/{}", other.name(), api_key),
        }
    }

    pub fn zx_contracts(self) -> &'static ZxContractAddresses {
        match self {
            NetworkId::Mainnet => &MAINNET_CONTRACTS,
            NetworkId::Ropsten => &ROPSTEN_CONTRACTS,
            NetworkId::Rinkeby => &RINKEBY_CONTRACTS,
            NetworkId::Kovan => &KOVAN_CONTRACTS,
            NetworkId::Ganache => &GANACHE_CONTRACTS,
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NetworkId {
    type Err = VeilError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        if let Ok(id) = s.parse::<u64>() {
            return NetworkId::from_chain_id(id);
        }
        match s.as_str() {
            "mainnet" => Ok(NetworkId::Mainnet),
            "ropsten" => Ok(NetworkId::Ropsten),
            "rinkeby" => Ok(NetworkId::Rinkeby),
            "kovan" => Ok(NetworkId::Kovan),
            "ganache" => Ok(NetworkId::Ganache),
            _ => Err(VeilError::UnsupportedNetwork(s)),
        }
    }
}

/// 0x protocol v2 deployment addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZxContractAddresses {
    pub exchange: &'static str,
    pub erc20_proxy: &'static str,
    pub erc721_proxy: &'static str,
    pub asset_proxy_owner: &'static str,
    pub forwarder: &'static str,
    pub order_validator: &'static str,
    pub zrx_token: &'static str,
    pub ether_token: &'static str,
}

const MAINNET_CONTRACTS: ZxContractAddresses = ZxContractAddresses {
    exchange: "0x4f833a24e1f95d70f028921e27040ca56e09ab0b",
    erc20_proxy: "0x2240dab907db71e64d3e0dba4800c83b5c502d4e",
    erc721_proxy: "0x208e41fb445f1bb1b6780d58356e81405f3e6127",
    asset_proxy_owner: "0x17992e4ffb22730138e4b62aaa6367fa9d3699a6",
    forwarder: "0x5468a1dc173652ee28d249c271fa9933144746b1",
    order_validator: "0x9463e518dea6810309563c81d5266c1b1d149138",
    zrx_token: "0xe41d2489571d322189246dafa5ebde1f4699f498",
    ether_token: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
};

const ROPSTEN_CONTRACTS: ZxContractAddresses = ZxContractAddresses {
    exchange: "0x4530c0483a1633c7a1c97d2c53721caff2caaaaf",
    erc20_proxy: "0xb1408f4c245a23c31b98d2c626777d4c0d766caa",
    erc721_proxy: "0xe654aac058bfbf9f83fcaee7793311dd82f6ddb4",
    asset_proxy_owner: "0xf5fa5b5fed2727a0e44ac67f6772e97977aa358b",
    forwarder: "0x2240dab907db71e64d3e0dba4800c83b5c502d4e",
    order_validator: "0x90431a90516ab49af23a0530e04e8c7836e7122f",
    zrx_token: "0xff67881f8d12f372d91baae9752eb3631ff0ed00",
    ether_token: "0xc778417e063141139fce010982780140aa0cd5ab",
};

const RINKEBY_CONTRACTS: ZxContractAddresses = ZxContractAddresses {
    exchange: "0xbce0b5f6eb618c565c3e5f5cd69652bbc279f44e",
    erc20_proxy: "0x2f5ae4f6106e89b4147651688a92256885c5f410",
    erc721_proxy: "0x7656d773e11ff7383a14dcf09a9c50990481cd10",
    asset_proxy_owner: "0xe1703da878afcebff5b7624a826902af475b9c03",
    forwarder: "0x2d40589abbdee84961f3a7656b9af7adb0ee5ab4",
    order_validator: "0x0c5173a51e26b29d6126c686756fb9fbef71f762",
    zrx_token: "0x8080c7e4b81ecf23aa6f877cfbfd9b0c228c6ffa",
    ether_token: "0xc778417e063141139fce010982780140aa0cd5ab",
};

const KOVAN_CONTRACTS: ZxContractAddresses = ZxContractAddresses {
    exchange: "0x35dd2932454449b14cee11a94d3674a936d5d7b2",
    erc20_proxy: "0xf1ec01d6236d3cd881a0bf0130ea25fe4234003e",
    erc721_proxy: "0x2a9127c745688a165106c11cd4d647d2220af821",
    asset_proxy_owner: "0x2c824d2882baa668e0d5202b1e7f2922278703f8",
    forwarder: "0x17992e4ffb22730138e4b62aaa6367fa9d3699a6",
    order_validator: "0xb389da3d204b412df2f75c6afb3d0a7ce0bc283d",
    zrx_token: "0x2002d3812f58e35f0ea1ffbf80a75a38c32175fa",
    ether_token: "0xd0a1e359811322d97991e03f863a0c30c2cf029c",
};

const GANACHE_CONTRACTS: ZxContractAddresses = ZxContractAddresses {
    exchange: "0x48bacb9266a570d521063ef5dd96e61686dbe788",
    erc20_proxy: "0x1dc4c1cefef38a777b15aa20260a54e584b16c48",
    erc721_proxy: "0x1d7022f5b17d2f8b695918fb48fa1089c9f85401",
    asset_proxy_owner: "0x34d402f14d58e001d8efbe6585051bf9706aa064",
    forwarder: "0xb69e673309512a9d726f87304c6984054f87a93b",
    order_validator: "0xe86bb98fcf9bff3512c74589b78fb168200cc546",
    zrx_token: "0x871dd7c2b4b25e1aa18728e9d5f2af4c4e431f5c",
    ether_token: "0x0b1ba0af832d7c05fd64161e0db78e85978e8082",
};
