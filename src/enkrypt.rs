use crate::{
    Address,
    chain::{Chain, ConnectedChain},
    emitter::{ConnectorMessage, ListenerId},
    error::{ConnectorError, RpcErrorCode},
    ffi::{LocalStorage, WindowInjection},
    injected::{BaseConnector, InjectedConnector, WatchAsset},
    options::ConnectorOptions,
    provider::{
        EventHandler, InjectionSource, Provider, ProviderEvent, RequestArguments, resolve_enkrypt,
    },
    storage::Storage,
};
use serde_json::{Value as JsonValue, json};
use std::{cell::RefCell, rc::Rc};

/// identifier of the Enkrypt connector
pub const ENKRYPT_ID: &str = "enkrypt";
pub const ENKRYPT_NAME: &str = "Enkrypt";

/// result of a successful [`EnkryptConnector::connect`]
#[derive(Debug, Clone, PartialEq)]
pub struct Connection<P> {
    pub account: Address,
    pub chain: ConnectedChain,
    pub provider: P,
}

/// the wallet listed at least one account, whatever its format
fn has_first_account(accounts: &JsonValue) -> bool {
    match accounts.as_array().and_then(|accounts| accounts.first()) {
        Some(JsonValue::String(account)) => !account.is_empty(),
        Some(JsonValue::Null | JsonValue::Bool(false)) | None => false,
        Some(_) => true,
    }
}

/// Connector to the [Enkrypt](https://www.enkrypt.com) browser wallet.
///
/// The connector looks for the provider Enkrypt injects in the page,
/// possibly among the providers of other wallets, and drives it through the
/// [`BaseConnector`] `B`.
pub struct EnkryptConnector<S: InjectionSource, B = InjectedConnector> {
    base: B,
    source: S,
    provider: RefCell<Option<S::Provider>>,
    ready: bool,
    handlers: [(ProviderEvent, EventHandler); 3],
    /// provider the handlers are attached to, it owns the attached
    /// listeners until they are removed
    subscribed: RefCell<Option<S::Provider>>,
}

impl EnkryptConnector<WindowInjection> {
    /// connector looking at `window.ethereum`, remembering its state in the
    /// browser's `localStorage` (if available)
    pub fn from_window(chains: Vec<Chain>, options: ConnectorOptions) -> Self {
        let storage = LocalStorage::new().map(|storage| Rc::new(storage) as Rc<dyn Storage>);
        Self::new(WindowInjection, chains, options, storage)
    }
}

impl<S: InjectionSource> EnkryptConnector<S> {
    pub fn new(
        source: S,
        chains: Vec<Chain>,
        options: ConnectorOptions,
        storage: Option<Rc<dyn Storage>>,
    ) -> Self {
        let base = InjectedConnector::new(ENKRYPT_ID, chains, options, storage);
        Self::with_base(source, base)
    }
}

impl<S, B> EnkryptConnector<S, B>
where
    S: InjectionSource,
    B: BaseConnector + Clone + 'static,
{
    pub fn with_base(source: S, base: B) -> Self {
        // TODO: the wallet may inject its provider after this check, listen
        // to `ethereum#initialized` to refresh `ready`
        let ready = matches!(resolve_enkrypt(&source), Some(Some(_)));

        let handlers = {
            let accounts_changed = base.clone();
            let chain_changed = base.clone();
            let disconnect = base.clone();
            [
                (
                    ProviderEvent::AccountsChanged,
                    Rc::new(move |value: JsonValue| accounts_changed.on_accounts_changed(value))
                        as EventHandler,
                ),
                (
                    ProviderEvent::ChainChanged,
                    Rc::new(move |value: JsonValue| chain_changed.on_chain_changed(value))
                        as EventHandler,
                ),
                (
                    ProviderEvent::Disconnect,
                    Rc::new(move |_: JsonValue| disconnect.on_disconnect()) as EventHandler,
                ),
            ]
        };

        Self {
            base,
            source,
            provider: RefCell::new(None),
            ready,
            handlers,
            subscribed: RefCell::new(None),
        }
    }

    pub fn id(&self) -> &'static str {
        self.base.id()
    }

    pub fn name(&self) -> &str {
        self.base.options().name.as_deref().unwrap_or(ENKRYPT_NAME)
    }

    pub fn chains(&self) -> &[Chain] {
        self.base.chains()
    }

    pub fn options(&self) -> &ConnectorOptions {
        self.base.options()
    }

    /// `true` if the Enkrypt provider was found when the connector was
    /// created.
    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn subscribe(&self, listener: impl Fn(&ConnectorMessage) + 'static) -> ListenerId {
        self.base.emitter().subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.base.emitter().unsubscribe(id)
    }

    /// Look for the Enkrypt provider again.
    ///
    /// Without a global window the last resolved provider is returned.
    pub fn get_provider(&self) -> Option<S::Provider> {
        if let Some(provider) = resolve_enkrypt(&self.source) {
            *self.provider.borrow_mut() = provider;
        }
        self.provider.borrow().clone()
    }

    fn provider(&self) -> Result<S::Provider, ConnectorError> {
        self.get_provider().ok_or(ConnectorError::ConnectorNotFound)
    }

    fn shim_disconnect_marked(&self) -> bool {
        self.base
            .storage()
            .is_some_and(|storage| storage.contains(&self.base.shim_disconnect_key()))
    }

    fn subscribe_provider(&self, provider: &S::Provider) {
        // connecting again must not forward the events twice
        if self.subscribed.borrow().as_ref() == Some(provider) {
            return;
        }

        self.unsubscribe_provider();
        for (event, handler) in &self.handlers {
            provider.on(*event, handler.clone());
        }
        *self.subscribed.borrow_mut() = Some(provider.clone());
    }

    fn unsubscribe_provider(&self) {
        let Some(provider) = self.subscribed.borrow_mut().take() else {
            return;
        };
        for (event, handler) in &self.handlers {
            provider.remove_listener(*event, handler);
        }
    }

    fn translate_error(&self, error: ConnectorError) -> ConnectorError {
        match error {
            ConnectorError::Rpc(error) if self.base.is_user_rejected_request_error(&error) => {
                ConnectorError::UserRejectedRequest(error)
            }
            ConnectorError::Rpc(error) if error.code == RpcErrorCode::ResourceUnavailable => {
                ConnectorError::ResourceUnavailable(error)
            }
            error => error,
        }
    }

    /// Connect to the wallet, prompting the user if needed.
    ///
    /// If `chain_id` is given and the wallet is on another chain, the wallet
    /// is asked to switch to it.
    pub async fn connect(
        &self,
        chain_id: Option<u64>,
    ) -> Result<Connection<S::Provider>, ConnectorError> {
        self.try_connect(chain_id)
            .await
            .map_err(|error| self.translate_error(error))
    }

    async fn try_connect(
        &self,
        chain_id: Option<u64>,
    ) -> Result<Connection<S::Provider>, ConnectorError> {
        let provider = self.provider()?;

        if provider.supports_events() {
            self.subscribe_provider(&provider);
        }

        self.base.emit(ConnectorMessage::Connecting);

        let options = self.base.options();
        if options.shim_on_connect_select_account()
            && options.shim_disconnect
            && !self.shim_disconnect_marked()
        {
            let has_account = match provider.request(RequestArguments::new("eth_accounts")).await {
                Ok(accounts) => has_first_account(&accounts),
                Err(error) => {
                    log::debug!("{}: cannot list the accounts: {error}", self.id());
                    false
                }
            };

            // the wallet shows its account picker, the answer is not needed
            if has_account {
                provider
                    .request(RequestArguments::with_params(
                        "wallet_requestPermissions",
                        json!([{ "eth_accounts": {} }]),
                    ))
                    .await?;
            }
        }

        let account = self.base.get_account(&provider).await?;
        let mut id = self.base.get_chain_id(&provider).await?;
        let mut unsupported = self.base.is_chain_unsupported(id);

        if let Some(target) = chain_id.filter(|target| *target != id) {
            log::debug!("{}: switching from chain {id} to {target}", self.id());
            let chain = self.base.switch_chain(&provider, target).await?;
            id = chain.id;
            unsupported = self.base.is_chain_unsupported(id);
        }

        if options.shim_disconnect {
            if let Some(storage) = self.base.storage() {
                storage.set_item(&self.base.shim_disconnect_key(), json!(true));
            }
        }

        Ok(Connection {
            account,
            chain: ConnectedChain { id, unsupported },
            provider,
        })
    }

    /// Stop forwarding the provider events and forget the connection.
    pub fn disconnect(&self) {
        self.unsubscribe_provider();

        if self.base.options().shim_disconnect {
            if let Some(storage) = self.base.storage() {
                storage.remove_item(&self.base.shim_disconnect_key());
            }
        }
    }

    pub async fn get_account(&self) -> Result<Address, ConnectorError> {
        let provider = self.provider()?;
        self.base
            .get_account(&provider)
            .await
            .map_err(|error| self.translate_error(error))
    }

    pub async fn get_chain_id(&self) -> Result<u64, ConnectorError> {
        let provider = self.provider()?;
        self.base
            .get_chain_id(&provider)
            .await
            .map_err(|error| self.translate_error(error))
    }

    pub async fn switch_chain(&self, chain_id: u64) -> Result<Chain, ConnectorError> {
        let provider = self.provider()?;
        self.base.switch_chain(&provider, chain_id).await
    }

    pub async fn is_authorized(&self) -> bool {
        match self.get_provider() {
            Some(provider) => self.base.is_authorized(&provider).await,
            None => false,
        }
    }

    pub async fn watch_asset(&self, asset: &WatchAsset) -> Result<bool, ConnectorError> {
        let provider = self.provider()?;
        self.base
            .watch_asset(&provider, asset)
            .await
            .map_err(|error| self.translate_error(error))
    }
}
