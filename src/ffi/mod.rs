pub mod ethereum;
pub mod local_storage;

pub use self::{
    ethereum::{EthereumProvider, JsProvider, WindowInjection},
    local_storage::LocalStorage,
};
