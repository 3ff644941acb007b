use crate::{
    error::{RpcError, RpcErrorCode},
    provider::{EventHandler, Injection, InjectionSource, Provider, ProviderEvent, RequestArguments},
};
use js_sys::{Array, Function, Reflect};
use serde::Serialize as _;
use serde_json::Value as JsonValue;
use std::{cell::RefCell, fmt, rc::Rc};
use wasm_bindgen::{JsCast as _, prelude::*};

#[wasm_bindgen]
extern "C" {
    /// The [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193) provider
    /// object wallets inject in `window.ethereum`.
    #[derive(Clone, PartialEq)]
    pub type EthereumProvider;

    /// Submit a JSON-RPC request `{ method, params }` to the wallet.
    #[wasm_bindgen(method, catch)]
    pub async fn request(this: &EthereumProvider, args: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method)]
    pub fn on(this: &EthereumProvider, event: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = "removeListener")]
    pub fn remove_listener(this: &EthereumProvider, event: &str, listener: &Function);
}

struct Listener {
    event: ProviderEvent,
    handler: EventHandler,
    closure: Closure<dyn Fn(JsValue)>,
}

/// [`Provider`] backed by an injected JS provider.
///
/// The JS closures handed to `on` are owned by the provider until the
/// listener is removed.
#[derive(Clone)]
pub struct JsProvider {
    provider: EthereumProvider,
    listeners: Rc<RefCell<Vec<Listener>>>,
}

impl JsProvider {
    pub fn new(provider: EthereumProvider) -> Self {
        Self {
            provider,
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn inner(&self) -> &EthereumProvider {
        &self.provider
    }

    fn property(&self, name: &str) -> Option<JsValue> {
        Reflect::get(&self.provider, &JsValue::from_str(name)).ok()
    }
}

impl PartialEq for JsProvider {
    fn eq(&self, other: &Self) -> bool {
        self.provider == other.provider
    }
}

impl fmt::Debug for JsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsProvider")
            .field("listeners", &self.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait(?Send)]
impl Provider for JsProvider {
    async fn request(&self, args: RequestArguments) -> Result<JsonValue, RpcError> {
        // plain JS objects, not `Map`s
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let js_args = args.serialize(&serializer).map_err(|error| {
            RpcError::new(
                RpcErrorCode::InvalidRequest,
                format!("Couldn't encode the `{}' request: {error}", args.method),
            )
        })?;

        match self.provider.request(js_args).await {
            Ok(value) => serde_wasm_bindgen::from_value(value).map_err(|decode_error| {
                RpcError::new(
                    RpcErrorCode::InternalError,
                    format!("Couldn't decode the `{}' response: {decode_error}", args.method),
                )
            }),
            Err(error) => Err(RpcError::from_js(error)),
        }
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.property(flag).is_some_and(|value| value.is_truthy())
    }

    fn supports_events(&self) -> bool {
        self.property("on").is_some_and(|on| on.is_function())
    }

    fn on(&self, event: ProviderEvent, handler: EventHandler) {
        let forward = handler.clone();
        let closure = Closure::<dyn Fn(JsValue)>::new(move |payload: JsValue| {
            let payload = serde_wasm_bindgen::from_value(payload).unwrap_or_else(|error| {
                log::debug!("{event}: undecodable event payload: {error}");
                JsonValue::Null
            });
            forward(payload)
        });

        self.provider
            .on(event.name(), closure.as_ref().unchecked_ref());
        self.listeners.borrow_mut().push(Listener {
            event,
            handler,
            closure,
        });
    }

    fn remove_listener(&self, event: ProviderEvent, handler: &EventHandler) {
        let mut listeners = self.listeners.borrow_mut();
        let Some(position) = listeners
            .iter()
            .position(|listener| listener.event == event && Rc::ptr_eq(&listener.handler, handler))
        else {
            return;
        };

        let listener = listeners.remove(position);
        let can_remove = self
            .property("removeListener")
            .is_some_and(|remove| remove.is_function());
        if can_remove {
            self.provider
                .remove_listener(event.name(), listener.closure.as_ref().unchecked_ref());
        } else {
            // the provider keeps calling it, it must outlive us
            log::debug!("{event}: the provider cannot remove listeners");
            listener.closure.forget();
        }
    }
}

/// The `window.ethereum` injection point.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowInjection;

fn looks_like_provider(value: &JsValue) -> bool {
    value.is_object()
        && Reflect::get(value, &JsValue::from_str("request"))
            .map(|request| request.is_function())
            .unwrap_or(false)
}

impl InjectionSource for WindowInjection {
    type Provider = JsProvider;

    fn injection(&self) -> Option<Injection<JsProvider>> {
        let window = web_sys::window()?;

        let ethereum = match Reflect::get(&window, &JsValue::from_str("ethereum")) {
            Ok(ethereum) if looks_like_provider(&ethereum) => ethereum,
            _ => return Some(Injection::Empty),
        };

        let providers = Reflect::get(&ethereum, &JsValue::from_str("providers"))
            .ok()
            .filter(Array::is_array);

        let injection = match providers {
            Some(providers) => Injection::Multiple(
                Array::from(&providers)
                    .iter()
                    .filter(looks_like_provider)
                    .map(|provider| JsProvider::new(provider.unchecked_into()))
                    .collect(),
            ),
            None => Injection::Single(JsProvider::new(ethereum.unchecked_into())),
        };

        Some(injection)
    }
}
