use wasm_bindgen::JsValue;

/// Error codes a wallet provider may reject a request with.
///
/// Covers the JSON-RPC 2.0 codes and the provider codes of
/// [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193#provider-errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum RpcErrorCode {
    #[error("Invalid JSON was received by the server.")]
    ParseError,
    #[error("The JSON sent is not a valid Request object.")]
    InvalidRequest,
    #[error("The method does not exist / is not available.")]
    MethodNotFound,
    #[error("Invalid method parameter(s).")]
    InvalidParams,
    #[error("Internal JSON-RPC error.")]
    InternalError,
    /// The wallet already has a request of this kind waiting on the user.
    #[error("Requested resource not available.")]
    ResourceUnavailable,
    #[error("Request exceeds defined limit.")]
    LimitExceeded,
    #[error("The user rejected the request.")]
    UserRejectedRequest,
    #[error("The requested method and/or account has not been authorized by the user.")]
    Unauthorized,
    #[error("The provider does not support the requested method.")]
    UnsupportedMethod,
    #[error("The provider is disconnected from all chains.")]
    Disconnected,
    #[error("The provider is not connected to the requested chain.")]
    ChainDisconnected,
    /// returned by `wallet_switchEthereumChain` when the wallet does not
    /// know the chain yet
    #[error("Unrecognized chain.")]
    UnrecognizedChain,
    #[error("Unknown error code `{0}'")]
    Unknown(i64),
}

impl RpcErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32002 => Self::ResourceUnavailable,
            -32005 => Self::LimitExceeded,
            4001 => Self::UserRejectedRequest,
            4100 => Self::Unauthorized,
            4200 => Self::UnsupportedMethod,
            4900 => Self::Disconnected,
            4901 => Self::ChainDisconnected,
            4902 => Self::UnrecognizedChain,
            unknown => Self::Unknown(unknown),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ResourceUnavailable => -32002,
            Self::LimitExceeded => -32005,
            Self::UserRejectedRequest => 4001,
            Self::Unauthorized => 4100,
            Self::UnsupportedMethod => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
            Self::UnrecognizedChain => 4902,
            Self::Unknown(code) => *code,
        }
    }
}

/// The error a provider rejected a `request` with.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Deserialize)]
#[error("{code} {message}")]
pub struct RpcError {
    pub code: RpcErrorCode,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// decode the value a JS promise was rejected with
    ///
    /// Wallets reject with objects carrying a numeric `code` and a `message`.
    /// Anything else is reported as an [`RpcErrorCode::InternalError`].
    pub fn from_js(error: JsValue) -> Self {
        serde_wasm_bindgen::from_value(error.clone()).unwrap_or_else(|decode_error| RpcError {
            code: RpcErrorCode::InternalError,
            message: format!("Couldn't decode the error content: {decode_error} ({error:?})"),
            data: None,
        })
    }
}

/// Errors returned by the connectors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectorError {
    #[error("Connector not found")]
    ConnectorNotFound,
    #[error("User rejected request")]
    UserRejectedRequest(#[source] RpcError),
    #[error("Resource unavailable")]
    ResourceUnavailable(#[source] RpcError),
    #[error("Chain \"{chain_id}\" not configured for connector \"{connector_id}\".")]
    ChainNotConfigured {
        chain_id: u64,
        connector_id: &'static str,
    },
    #[error("Error switching chain")]
    SwitchChain(#[source] RpcError),
    #[error("Error adding chain")]
    AddChain(#[source] RpcError),
    #[error("The wallet did not return any account")]
    AccountNotFound,
    #[error("Unexpected response from the wallet: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl ConnectorError {
    /// the error the wallet originally rejected the request with, if any
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            Self::UserRejectedRequest(error)
            | Self::ResourceUnavailable(error)
            | Self::SwitchChain(error)
            | Self::AddChain(error)
            | Self::Rpc(error) => Some(error),
            _ => None,
        }
    }
}

impl<'de> serde::Deserialize<'de> for RpcErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;
        impl serde::de::Visitor<'_> for Visitor {
            type Value = RpcErrorCode;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "Expecting an integer RpcErrorCode")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(RpcErrorCode::from_code(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                i64::try_from(v)
                    .map(RpcErrorCode::from_code)
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Unsigned(v), &self))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
                    Ok(RpcErrorCode::from_code(v as i64))
                } else {
                    Err(E::invalid_value(serde::de::Unexpected::Float(v), &self))
                }
            }
        }

        deserializer.deserialize_i64(Visitor)
    }
}
