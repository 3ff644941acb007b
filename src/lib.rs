/*!

# Connector for the Enkrypt wallet

This library is meant to be used for web applications that need to interact with
the [Enkrypt](https://www.enkrypt.com) browser extension on EVM chains. It finds
the provider Enkrypt injects in the page (even when other wallets compete for
`window.ethereum`) and offers a simple interface to connect to it.

## Features

- Detect the Enkrypt provider
- Connect, and optionally switch to the chain the application needs
- Remember that the user disconnected the application
- Forward the account and chain changes to the application

## Usage

```no_run
use enkrypt_connector::{Chain, ConnectorOptions, EnkryptConnector};

# async fn test() -> anyhow::Result<()> {
let connector = EnkryptConnector::from_window(
    vec![Chain::mainnet(), Chain::sepolia()],
    ConnectorOptions::default(),
);

if connector.ready() {
    let connection = connector.connect(Some(1)).await?;
    println!("Connected {} on chain {}", connection.account, connection.chain.id);
}
# Ok(()) }
```

The application is notified of the changes happening in the wallet with
[`EnkryptConnector::subscribe`].

*/

mod address;
pub mod chain;
mod emitter;
mod enkrypt;
pub mod error;
pub mod ffi;
pub mod injected;
mod options;
pub mod provider;
pub mod storage;

pub use self::{
    address::{Address, AddressError},
    chain::{Chain, ConnectedChain},
    emitter::{ConnectorMessage, Emitter, ListenerId},
    enkrypt::{Connection, ENKRYPT_ID, ENKRYPT_NAME, EnkryptConnector},
    error::ConnectorError,
    injected::{BaseConnector, InjectedConnector, WatchAsset},
    options::ConnectorOptions,
};
