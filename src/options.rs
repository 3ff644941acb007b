/// Options of the injected connectors.
///
/// Can be deserialized from the JS object applications usually hand to
/// connectors (`{ shimDisconnect: true, ... }`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectorOptions {
    /// display name of the connector
    pub name: Option<String>,
    /// Remember in the storage that the user disconnected from the
    /// application. Wallets do not offer a way to revoke the permission
    /// from the dApp side.
    pub shim_disconnect: bool,
    /// Some wallets emit `disconnect` while switching chain. Ignore the
    /// `disconnect` event while a chain switch is in progress.
    pub shim_chain_changed_disconnect: bool,
    /// Force the wallet to prompt the user for the account to use when
    /// connecting again after a shimmed disconnect.
    #[serde(rename = "UNSTABLE_shimOnConnectSelectAccount")]
    pub unstable_shim_on_connect_select_account: Option<bool>,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            name: None,
            shim_disconnect: true,
            shim_chain_changed_disconnect: true,
            unstable_shim_on_connect_select_account: None,
        }
    }
}

impl ConnectorOptions {
    pub fn shim_on_connect_select_account(&self) -> bool {
        self.unstable_shim_on_connect_select_account
            .unwrap_or(false)
    }
}
