use crate::error::RpcError;
use serde_json::Value as JsonValue;
use std::{fmt, rc::Rc};

/// flag Enkrypt sets on the provider it injects
pub const ENKRYPT_FLAG: &str = "isEnkrypt";

/// Arguments of an [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193)
/// `request` call.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RequestArguments {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<JsonValue>,
}

impl RequestArguments {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(method: impl Into<String>, params: JsonValue) -> Self {
        Self {
            method: method.into(),
            params: Some(params),
        }
    }
}

/// Events emitted by the injected providers that the connectors forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEvent {
    AccountsChanged,
    ChainChanged,
    Disconnect,
}

impl ProviderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for ProviderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Callback attached to a provider event. It receives the event's payload.
///
/// Handlers are compared by pointer when detaching them.
pub type EventHandler = Rc<dyn Fn(JsonValue)>;

/// Capabilities of an injected wallet provider.
#[async_trait::async_trait(?Send)]
pub trait Provider {
    /// send a JSON-RPC request to the wallet
    async fn request(&self, args: RequestArguments) -> Result<JsonValue, RpcError>;

    /// check the provider carries the given truthy flag (e.g. `isEnkrypt`)
    fn has_flag(&self, flag: &str) -> bool;

    /// `true` if the provider lets us subscribe to its events
    fn supports_events(&self) -> bool;

    fn on(&self, event: ProviderEvent, handler: EventHandler);

    fn remove_listener(&self, event: ProviderEvent, handler: &EventHandler);
}

/// What a page exposes at the wallet injection point.
#[derive(Debug, Clone, PartialEq)]
pub enum Injection<P> {
    /// nothing was injected (yet)
    Empty,
    /// a single provider
    Single(P),
    /// several wallets are competing for the injection point and expose
    /// their providers as a list
    Multiple(Vec<P>),
}

/// Source of the current [`Injection`] snapshot.
///
/// Returns `None` when there is no global window to look into (e.g. the
/// code runs outside of a browser).
pub trait InjectionSource {
    type Provider: Provider + Clone + PartialEq + 'static;

    fn injection(&self) -> Option<Injection<Self::Provider>>;
}

/// Find the first provider satisfying `predicate` in the injection.
pub fn find_provider<P>(injection: Injection<P>, predicate: impl Fn(&P) -> bool) -> Option<P> {
    match injection {
        Injection::Empty => None,
        Injection::Single(provider) => Some(provider).filter(|p| predicate(p)),
        Injection::Multiple(providers) => providers.into_iter().find(|p| predicate(p)),
    }
}

pub fn is_enkrypt<P: Provider>(provider: &P) -> bool {
    provider.has_flag(ENKRYPT_FLAG)
}

/// Provider resolution shared by the connectors: the Enkrypt provider from
/// the current snapshot, `None` if there is no window.
pub fn resolve_enkrypt<S: InjectionSource>(source: &S) -> Option<Option<S::Provider>> {
    source
        .injection()
        .map(|injection| find_provider(injection, is_enkrypt))
}
