use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for NativeCurrency {
    fn default() -> Self {
        Self {
            name: "Ether".to_owned(),
            symbol: "ETH".to_owned(),
            decimals: 18,
        }
    }
}

/// description of an EVM chain the application is willing to work with
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub id: u64,
    pub name: String,
    pub network: String,
    #[serde(default)]
    pub native_currency: NativeCurrency,
    #[serde(default)]
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub block_explorer: Option<String>,
    #[serde(default)]
    pub testnet: bool,
}

/// the chain a connection ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct ConnectedChain {
    pub id: u64,
    /// `true` if the chain is not one of the configured chains
    pub unsupported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid chain id: {0}")]
pub struct InvalidChainId(pub String);

impl Chain {
    /// chain synthesized for an id the application did not configure
    pub fn unknown(id: u64) -> Self {
        Self {
            id,
            name: format!("Chain {id}"),
            network: id.to_string(),
            native_currency: NativeCurrency::default(),
            rpc_urls: Vec::new(),
            block_explorer: None,
            testnet: false,
        }
    }

    pub fn mainnet() -> Self {
        Self {
            id: 1,
            name: "Ethereum".to_owned(),
            network: "homestead".to_owned(),
            native_currency: NativeCurrency::default(),
            rpc_urls: vec!["https://cloudflare-eth.com".to_owned()],
            block_explorer: Some("https://etherscan.io".to_owned()),
            testnet: false,
        }
    }

    pub fn sepolia() -> Self {
        Self {
            id: 11_155_111,
            name: "Sepolia".to_owned(),
            network: "sepolia".to_owned(),
            native_currency: NativeCurrency {
                name: "Sepolia Ether".to_owned(),
                symbol: "SEP".to_owned(),
                decimals: 18,
            },
            rpc_urls: vec!["https://rpc.sepolia.org".to_owned()],
            block_explorer: Some("https://sepolia.etherscan.io".to_owned()),
            testnet: true,
        }
    }

    /// parameters of `wallet_addEthereumChain`, as defined by
    /// [EIP-3085](https://eips.ethereum.org/EIPS/eip-3085)
    pub fn add_chain_parameter(&self) -> JsonValue {
        let block_explorer_urls: Vec<&str> = self.block_explorer.iter().map(String::as_str).collect();
        serde_json::json!({
            "chainId": to_hex_chain_id(self.id),
            "chainName": self.name,
            "nativeCurrency": self.native_currency,
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": block_explorer_urls,
        })
    }
}

/// `0x` prefixed hexadecimal chain id, as `eth_chainId` returns them
pub fn to_hex_chain_id(id: u64) -> String {
    format!("{id:#x}")
}

/// Wallets are not consistent with the chain ids they report: hexadecimal
/// strings (the standard), decimal strings or plain numbers.
pub fn normalize_chain_id(value: &JsonValue) -> Result<u64, InvalidChainId> {
    match value {
        JsonValue::Number(number) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            })
            .ok_or_else(|| InvalidChainId(number.to_string())),
        JsonValue::String(s) => {
            let s = s.trim();
            let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                u64::from_str_radix(hex, 16)
            } else {
                s.parse()
            };
            parsed.map_err(|_| InvalidChainId(s.to_owned()))
        }
        other => Err(InvalidChainId(other.to_string())),
    }
}
