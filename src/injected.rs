/*!
Behavior shared by the connectors of injected (EIP-1193) wallets.

The wallet specific connectors (see [`EnkryptConnector`]) are composed of a
[`BaseConnector`] which knows how to query the account and the chain, how to
switch chain and how to react to the provider events. [`InjectedConnector`]
is the default implementation.

[`EnkryptConnector`]: crate::EnkryptConnector
*/

use crate::{
    Address,
    chain::{Chain, ConnectedChain, normalize_chain_id, to_hex_chain_id},
    emitter::{ConnectorMessage, Emitter},
    error::{ConnectorError, RpcError, RpcErrorCode},
    options::ConnectorOptions,
    provider::{Provider, RequestArguments},
    storage::Storage,
};
use serde_json::{Value as JsonValue, json};
use std::{cell::Cell, rc::Rc};

/// An ERC-20 token to suggest to the wallet (`wallet_watchAsset`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WatchAsset {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[async_trait::async_trait(?Send)]
pub trait BaseConnector {
    fn id(&self) -> &'static str;

    fn chains(&self) -> &[Chain];

    fn options(&self) -> &ConnectorOptions;

    fn storage(&self) -> Option<&dyn Storage>;

    fn emitter(&self) -> &Emitter;

    /// storage key remembering the user did not disconnect
    fn shim_disconnect_key(&self) -> String {
        format!("{}.shimDisconnect", self.id())
    }

    fn emit(&self, message: ConnectorMessage) {
        self.emitter().emit(message)
    }

    fn is_chain_unsupported(&self, chain_id: u64) -> bool {
        !self.chains().iter().any(|chain| chain.id == chain_id)
    }

    fn is_user_rejected_request_error(&self, error: &RpcError) -> bool;

    async fn get_account<P: Provider>(&self, provider: &P) -> Result<Address, ConnectorError>;

    async fn get_chain_id<P: Provider>(&self, provider: &P) -> Result<u64, ConnectorError>;

    async fn switch_chain<P: Provider>(
        &self,
        provider: &P,
        chain_id: u64,
    ) -> Result<Chain, ConnectorError>;

    fn on_accounts_changed(&self, accounts: JsonValue);

    fn on_chain_changed(&self, chain_id: JsonValue);

    fn on_disconnect(&self);

    /// check the application may use the wallet without prompting the user
    ///
    /// Any failure to query the wallet is reported as not authorized.
    async fn is_authorized<P: Provider>(&self, provider: &P) -> bool {
        if self.options().shim_disconnect
            && !self
                .storage()
                .is_some_and(|storage| storage.contains(&self.shim_disconnect_key()))
        {
            return false;
        }

        match accounts(provider).await {
            Ok(accounts) => !accounts.is_empty(),
            Err(error) => {
                log::debug!("{}: cannot list the accounts: {error}", self.id());
                false
            }
        }
    }

    /// ask the wallet to track the given token
    async fn watch_asset<P: Provider>(
        &self,
        provider: &P,
        asset: &WatchAsset,
    ) -> Result<bool, ConnectorError> {
        let params = json!({
            "type": "ERC20",
            "options": asset,
        });
        let answer = provider
            .request(RequestArguments::with_params("wallet_watchAsset", params))
            .await?;

        answer
            .as_bool()
            .ok_or_else(|| ConnectorError::InvalidResponse(format!("wallet_watchAsset: {answer}")))
    }
}

/// decode the list of accounts as returned by `eth_accounts` and
/// `eth_requestAccounts`
pub fn parse_accounts(value: &JsonValue) -> Result<Vec<Address>, ConnectorError> {
    let Some(entries) = value.as_array() else {
        return Err(ConnectorError::InvalidResponse(format!(
            "Expected a list of accounts: {value}"
        )));
    };

    entries
        .iter()
        .map(|entry| {
            let Some(entry) = entry.as_str() else {
                return Err(ConnectorError::InvalidResponse(format!(
                    "Invalid account: {entry}"
                )));
            };
            Address::from_hex(entry)
                .map_err(|error| ConnectorError::InvalidResponse(format!("{entry}: {error}")))
        })
        .collect()
}

/// the accounts the application is already allowed to see (`eth_accounts`)
pub async fn accounts<P: Provider>(provider: &P) -> Result<Vec<Address>, ConnectorError> {
    let value = provider
        .request(RequestArguments::new("eth_accounts"))
        .await?;
    parse_accounts(&value)
}

fn is_unrecognized_chain(error: &RpcError) -> bool {
    error.code == RpcErrorCode::UnrecognizedChain
        || error
            .data
            .as_ref()
            .and_then(|data| data.pointer("/originalError/code"))
            .and_then(JsonValue::as_i64)
            .is_some_and(|code| RpcErrorCode::from_code(code) == RpcErrorCode::UnrecognizedChain)
}

/// Default [`BaseConnector`].
///
/// Cloning is cheap and clones share their state, the provider event
/// handlers hold a clone of the connector.
#[derive(Clone)]
pub struct InjectedConnector {
    id: &'static str,
    chains: Rc<[Chain]>,
    options: Rc<ConnectorOptions>,
    storage: Option<Rc<dyn Storage>>,
    emitter: Emitter,
    switching_chains: Rc<Cell<bool>>,
}

impl InjectedConnector {
    pub fn new(
        id: &'static str,
        chains: Vec<Chain>,
        options: ConnectorOptions,
        storage: Option<Rc<dyn Storage>>,
    ) -> Self {
        Self {
            id,
            chains: chains.into(),
            options: Rc::new(options),
            storage,
            emitter: Emitter::new(),
            switching_chains: Rc::new(Cell::new(false)),
        }
    }

    fn chain(&self, chain_id: u64) -> Option<&Chain> {
        self.chains.iter().find(|chain| chain.id == chain_id)
    }

    fn connected_chain(&self, id: u64) -> ConnectedChain {
        ConnectedChain {
            id,
            unsupported: self.is_chain_unsupported(id),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl BaseConnector for InjectedConnector {
    fn id(&self) -> &'static str {
        self.id
    }

    fn chains(&self) -> &[Chain] {
        &self.chains
    }

    fn options(&self) -> &ConnectorOptions {
        &self.options
    }

    fn storage(&self) -> Option<&dyn Storage> {
        self.storage.as_deref()
    }

    fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    fn is_user_rejected_request_error(&self, error: &RpcError) -> bool {
        error.code == RpcErrorCode::UserRejectedRequest
    }

    async fn get_account<P: Provider>(&self, provider: &P) -> Result<Address, ConnectorError> {
        let value = provider
            .request(RequestArguments::new("eth_requestAccounts"))
            .await?;

        parse_accounts(&value)?
            .into_iter()
            .next()
            .ok_or(ConnectorError::AccountNotFound)
    }

    async fn get_chain_id<P: Provider>(&self, provider: &P) -> Result<u64, ConnectorError> {
        let value = provider
            .request(RequestArguments::new("eth_chainId"))
            .await?;

        normalize_chain_id(&value).map_err(|error| ConnectorError::InvalidResponse(error.to_string()))
    }

    async fn switch_chain<P: Provider>(
        &self,
        provider: &P,
        chain_id: u64,
    ) -> Result<Chain, ConnectorError> {
        if self.options.shim_chain_changed_disconnect {
            self.switching_chains.set(true);
        }

        let params = json!([{ "chainId": to_hex_chain_id(chain_id) }]);
        let result = provider
            .request(RequestArguments::with_params(
                "wallet_switchEthereumChain",
                params,
            ))
            .await;

        let error = match result {
            Ok(_) => {
                return Ok(self
                    .chain(chain_id)
                    .cloned()
                    .unwrap_or_else(|| Chain::unknown(chain_id)));
            }
            Err(error) => error,
        };

        // no chain changed event is coming
        self.switching_chains.set(false);

        if is_unrecognized_chain(&error) {
            let Some(chain) = self.chain(chain_id) else {
                return Err(ConnectorError::ChainNotConfigured {
                    chain_id,
                    connector_id: self.id,
                });
            };

            log::debug!("{}: adding chain {chain_id} to the wallet", self.id);
            let params = json!([chain.add_chain_parameter()]);
            return match provider
                .request(RequestArguments::with_params("wallet_addEthereumChain", params))
                .await
            {
                Ok(_) => Ok(chain.clone()),
                Err(error) if self.is_user_rejected_request_error(&error) => {
                    Err(ConnectorError::UserRejectedRequest(error))
                }
                Err(error) => Err(ConnectorError::AddChain(error)),
            };
        }

        if self.is_user_rejected_request_error(&error) {
            Err(ConnectorError::UserRejectedRequest(error))
        } else {
            Err(ConnectorError::SwitchChain(error))
        }
    }

    fn on_accounts_changed(&self, accounts: JsonValue) {
        match parse_accounts(&accounts) {
            Ok(accounts) => match accounts.first() {
                None => self.emit(ConnectorMessage::Disconnect),
                Some(account) => self.emit(ConnectorMessage::Change {
                    account: Some(*account),
                    chain: None,
                }),
            },
            Err(error) => log::warn!("{}: ignoring accountsChanged event: {error}", self.id),
        }
    }

    fn on_chain_changed(&self, chain_id: JsonValue) {
        self.switching_chains.set(false);

        match normalize_chain_id(&chain_id) {
            Ok(id) => self.emit(ConnectorMessage::Change {
                account: None,
                chain: Some(self.connected_chain(id)),
            }),
            Err(error) => log::warn!("{}: ignoring chainChanged event: {error}", self.id),
        }
    }

    fn on_disconnect(&self) {
        // some wallets disconnect while switching chain
        if self.options.shim_chain_changed_disconnect && self.switching_chains.get() {
            self.switching_chains.set(false);
            return;
        }

        self.emit(ConnectorMessage::Disconnect);

        if self.options.shim_disconnect {
            if let Some(storage) = self.storage() {
                storage.remove_item(&self.shim_disconnect_key());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emitter::record,
        provider::mock::MockProvider,
        storage::MemoryStorage,
    };
    use futures::executor::block_on;

    const ACCOUNT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn rejected() -> RpcError {
        RpcError::new(RpcErrorCode::UserRejectedRequest, "User rejected the request.")
    }

    fn connector(options: ConnectorOptions) -> (InjectedConnector, Rc<MemoryStorage>) {
        let storage = Rc::new(MemoryStorage::new());
        let connector = InjectedConnector::new(
            "injected",
            vec![Chain::mainnet(), Chain::sepolia()],
            options,
            Some(storage.clone() as Rc<dyn Storage>),
        );
        (connector, storage)
    }

    #[test]
    fn get_account_takes_the_first() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        provider.respond(
            "eth_requestAccounts",
            Ok(json!([ACCOUNT.to_lowercase(), "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359"])),
        );

        let account = block_on(connector.get_account(&provider)).unwrap();
        assert_eq!(account.to_string(), ACCOUNT);
    }

    #[test]
    fn get_account_without_account() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        provider.respond("eth_requestAccounts", Ok(json!([])));

        assert_eq!(
            block_on(connector.get_account(&provider)),
            Err(ConnectorError::AccountNotFound)
        );
    }

    #[test]
    fn get_chain_id_normalized() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        provider.respond("eth_chainId", Ok(json!("0xaa36a7")));

        assert_eq!(block_on(connector.get_chain_id(&provider)), Ok(11_155_111));
    }

    #[test]
    fn chain_unsupported() {
        let (connector, _) = connector(ConnectorOptions::default());
        assert!(!connector.is_chain_unsupported(1));
        assert!(connector.is_chain_unsupported(137));
    }

    #[test]
    fn switch_chain() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        provider.respond("wallet_switchEthereumChain", Ok(JsonValue::Null));

        let chain = block_on(connector.switch_chain(&provider, 11_155_111)).unwrap();
        assert_eq!(chain, Chain::sepolia());
        assert_eq!(
            provider.calls()[0].params,
            Some(json!([{ "chainId": "0xaa36a7" }]))
        );
    }

    #[test]
    fn switch_to_unconfigured_chain_known_by_the_wallet() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        provider.respond("wallet_switchEthereumChain", Ok(JsonValue::Null));

        let chain = block_on(connector.switch_chain(&provider, 137)).unwrap();
        assert_eq!(chain, Chain::unknown(137));
    }

    #[test]
    fn switch_chain_adds_configured_chain() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        provider
            .respond(
                "wallet_switchEthereumChain",
                Err(RpcError::new(RpcErrorCode::UnrecognizedChain, "Unrecognized chain ID")),
            )
            .respond("wallet_addEthereumChain", Ok(JsonValue::Null));

        let chain = block_on(connector.switch_chain(&provider, 11_155_111)).unwrap();
        assert_eq!(chain, Chain::sepolia());
        assert_eq!(
            provider.methods(),
            vec!["wallet_switchEthereumChain", "wallet_addEthereumChain"]
        );
        assert_eq!(
            provider.calls()[1].params,
            Some(json!([Chain::sepolia().add_chain_parameter()]))
        );
    }

    #[test]
    fn switch_chain_unrecognized_nested_code() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        let error = RpcError {
            code: RpcErrorCode::InternalError,
            message: "Internal error".to_owned(),
            data: Some(json!({ "originalError": { "code": 4902 } })),
        };
        provider.respond("wallet_switchEthereumChain", Err(error));

        assert_eq!(
            block_on(connector.switch_chain(&provider, 137)),
            Err(ConnectorError::ChainNotConfigured {
                chain_id: 137,
                connector_id: "injected"
            })
        );
    }

    #[test]
    fn switch_chain_rejected() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        provider.respond("wallet_switchEthereumChain", Err(rejected()));

        assert_eq!(
            block_on(connector.switch_chain(&provider, 1)),
            Err(ConnectorError::UserRejectedRequest(rejected()))
        );
    }

    #[test]
    fn switch_chain_failure() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        let error = RpcError::new(RpcErrorCode::InternalError, "boom");
        provider.respond("wallet_switchEthereumChain", Err(error.clone()));

        assert_eq!(
            block_on(connector.switch_chain(&provider, 1)),
            Err(ConnectorError::SwitchChain(error))
        );
    }

    #[test]
    fn accounts_changed() {
        let (connector, _) = connector(ConnectorOptions::default());
        let messages = record(connector.emitter());

        connector.on_accounts_changed(json!([ACCOUNT]));
        connector.on_accounts_changed(json!([]));
        connector.on_accounts_changed(json!("garbage"));

        assert_eq!(
            *messages.borrow(),
            vec![
                ConnectorMessage::Change {
                    account: Some(ACCOUNT.parse().unwrap()),
                    chain: None,
                },
                ConnectorMessage::Disconnect,
            ]
        );
    }

    #[test]
    fn chain_changed() {
        let (connector, _) = connector(ConnectorOptions::default());
        let messages = record(connector.emitter());

        connector.on_chain_changed(json!("0x89"));

        assert_eq!(
            *messages.borrow(),
            vec![ConnectorMessage::Change {
                account: None,
                chain: Some(ConnectedChain {
                    id: 137,
                    unsupported: true
                }),
            }]
        );
    }

    #[test]
    fn disconnect_removes_the_shim() {
        let (connector, storage) = connector(ConnectorOptions::default());
        let messages = record(connector.emitter());
        storage.set_item(&connector.shim_disconnect_key(), json!(true));

        connector.on_disconnect();

        assert_eq!(*messages.borrow(), vec![ConnectorMessage::Disconnect]);
        assert!(!storage.contains("injected.shimDisconnect"));
    }

    #[test]
    fn disconnect_while_switching_chain_is_ignored_once() {
        let (connector, _) = connector(ConnectorOptions::default());
        let messages = record(connector.emitter());
        let provider = MockProvider::enkrypt();
        provider.respond("wallet_switchEthereumChain", Ok(JsonValue::Null));

        block_on(connector.switch_chain(&provider, 11_155_111)).unwrap();
        connector.on_disconnect();
        assert!(messages.borrow().is_empty());

        connector.on_disconnect();
        assert_eq!(*messages.borrow(), vec![ConnectorMessage::Disconnect]);
    }

    #[test]
    fn disconnect_while_switching_chain_without_shim() {
        let (connector, _) = connector(ConnectorOptions {
            shim_chain_changed_disconnect: false,
            ..ConnectorOptions::default()
        });
        let messages = record(connector.emitter());
        let provider = MockProvider::enkrypt();
        provider.respond("wallet_switchEthereumChain", Ok(JsonValue::Null));

        block_on(connector.switch_chain(&provider, 1)).unwrap();
        connector.on_disconnect();

        assert_eq!(*messages.borrow(), vec![ConnectorMessage::Disconnect]);
    }

    #[test]
    fn not_authorized_without_shim() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();

        assert!(!block_on(connector.is_authorized(&provider)));
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn authorized() {
        let (connector, storage) = connector(ConnectorOptions::default());
        storage.set_item(&connector.shim_disconnect_key(), json!(true));
        let provider = MockProvider::enkrypt();
        provider
            .respond("eth_accounts", Ok(json!([ACCOUNT])))
            .respond("eth_accounts", Ok(json!([])))
            .respond("eth_accounts", Err(rejected()));

        assert!(block_on(connector.is_authorized(&provider)));
        assert!(!block_on(connector.is_authorized(&provider)));
        assert!(!block_on(connector.is_authorized(&provider)));
    }

    #[test]
    fn watch_asset() {
        let (connector, _) = connector(ConnectorOptions::default());
        let provider = MockProvider::enkrypt();
        provider.respond("wallet_watchAsset", Ok(json!(true)));

        let asset = WatchAsset {
            address: ACCOUNT.parse().unwrap(),
            symbol: "TKN".to_owned(),
            decimals: 18,
            image: None,
        };
        assert_eq!(block_on(connector.watch_asset(&provider, &asset)), Ok(true));
        assert_eq!(
            provider.calls()[0].params,
            Some(json!({
                "type": "ERC20",
                "options": { "address": ACCOUNT, "symbol": "TKN", "decimals": 18 },
            }))
        );
    }
}
