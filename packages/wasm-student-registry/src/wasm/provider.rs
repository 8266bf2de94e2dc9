//! Browser implementations of the provider traits
//!
//! - `BrowserWallet`: the injected EIP-1193 provider (`window.ethereum`)
//! - `FetchTransport`: JSON-RPC over HTTP with `fetch`, used for reads
//! - `BrowserSleeper`: `setTimeout` as a future

use crate::provider::{AccountsListener, JsonRpc, ListenerId, RpcError, Sleeper, WalletProvider};
use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

const ACCOUNTS_CHANGED: &str = "accountsChanged";

fn to_js(value: &Value) -> Result<JsValue, RpcError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| RpcError::transport(&format!("Failed to encode params: {}", e)))
}

fn from_js(value: JsValue) -> Result<Value, RpcError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| RpcError::transport(&format!("Failed to decode result: {}", e)))
}

fn get(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

/// Read an EIP-1193 `ProviderRpcError` (or any thrown value) into an `RpcError`
fn rpc_error_from_js(err: JsValue) -> RpcError {
    let code = get(&err, "code")
        .and_then(|c| c.as_f64())
        .map(|c| c as i64)
        .unwrap_or(RpcError::INTERNAL);
    let message = get(&err, "message")
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{:?}", err));
    let data = get(&err, "data").and_then(|d| serde_wasm_bindgen::from_value::<Value>(d).ok());
    RpcError {
        code,
        message,
        data,
    }
}

/// `window.ethereum`
pub struct BrowserWallet {
    ethereum: JsValue,
    listeners: RefCell<HashMap<u64, Closure<dyn FnMut(JsValue)>>>,
    next_listener: Cell<u64>,
}

impl BrowserWallet {
    /// Look up the injected provider on the global object
    pub fn detect() -> Option<Self> {
        get(&js_sys::global(), "ethereum").map(Self::new)
    }

    pub fn new(ethereum: JsValue) -> Self {
        Self {
            ethereum,
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
        }
    }

    fn method(&self, name: &str) -> Result<Function, RpcError> {
        get(&self.ethereum, name)
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| RpcError::transport(&format!("Provider has no {} method", name)))
    }
}

#[async_trait(?Send)]
impl JsonRpc for BrowserWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        trace!("wallet request {}", method);
        let request = self.method("request")?;

        let args = Object::new();
        Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method))
            .map_err(rpc_error_from_js)?;
        Reflect::set(&args, &JsValue::from_str("params"), &to_js(&params)?)
            .map_err(rpc_error_from_js)?;

        let promise: Promise = request
            .call1(&self.ethereum, &args)
            .map_err(rpc_error_from_js)?
            .dyn_into()
            .map_err(|_| RpcError::transport("Provider request did not return a Promise"))?;
        let result = JsFuture::from(promise).await.map_err(rpc_error_from_js)?;
        from_js(result)
    }
}

impl WalletProvider for BrowserWallet {
    fn add_accounts_listener(&self, listener: AccountsListener) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);

        let closure = Closure::wrap(Box::new(move |accounts: JsValue| {
            let accounts: Vec<String> =
                serde_wasm_bindgen::from_value(accounts).unwrap_or_default();
            listener(accounts);
        }) as Box<dyn FnMut(JsValue)>);

        match self.method("on") {
            Ok(on) => {
                let registered = on.call2(
                    &self.ethereum,
                    &JsValue::from_str(ACCOUNTS_CHANGED),
                    closure.as_ref().unchecked_ref(),
                );
                if let Err(e) = registered {
                    warn!("Failed to register accountsChanged listener: {:?}", e);
                }
            }
            Err(e) => warn!("{}", e.message),
        }
        self.listeners.borrow_mut().insert(id, closure);
        ListenerId(id)
    }

    fn remove_accounts_listener(&self, id: ListenerId) {
        let Some(closure) = self.listeners.borrow_mut().remove(&id.0) else {
            return;
        };
        match self.method("removeListener") {
            Ok(remove) => {
                let removed = remove.call2(
                    &self.ethereum,
                    &JsValue::from_str(ACCOUNTS_CHANGED),
                    closure.as_ref().unchecked_ref(),
                );
                if let Err(e) = removed {
                    warn!("Failed to remove accountsChanged listener: {:?}", e);
                }
            }
            Err(e) => warn!("{}", e.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// JSON-RPC over HTTP POST
pub struct FetchTransport {
    url: String,
    next_id: Cell<u64>,
}

impl FetchTransport {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            next_id: Cell::new(1),
        }
    }

    async fn post(&self, body: &str) -> Result<String, RpcError> {
        let headers = Headers::new().map_err(rpc_error_from_js)?;
        headers
            .set("Content-Type", "application/json")
            .map_err(rpc_error_from_js)?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_body(&JsValue::from_str(body));
        init.set_headers(&headers);
        let request =
            Request::new_with_str_and_init(&self.url, &init).map_err(rpc_error_from_js)?;

        let window = web_sys::window().ok_or_else(|| RpcError::transport("No window object"))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(rpc_error_from_js)?
            .dyn_into()
            .map_err(|_| RpcError::transport("fetch did not return a Response"))?;
        if !response.ok() {
            return Err(RpcError::transport(&format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        JsFuture::from(response.text().map_err(rpc_error_from_js)?)
            .await
            .map_err(rpc_error_from_js)?
            .as_string()
            .ok_or_else(|| RpcError::transport("Response body is not text"))
    }
}

#[async_trait(?Send)]
impl JsonRpc for FetchTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        trace!("rpc #{} {} -> {}", id, method, self.url);

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        })
        .to_string();
        let text = self.post(&body).await?;
        let response: RpcResponse = serde_json::from_str(&text)
            .map_err(|e| RpcError::transport(&format!("Invalid JSON-RPC response: {}", e)))?;

        match response {
            RpcResponse {
                error: Some(err), ..
            } => Err(err),
            RpcResponse { result, .. } => Ok(result.unwrap_or(Value::Null)),
        }
    }
}

/// `setTimeout`-backed sleeper
pub struct BrowserSleeper;

#[async_trait(?Send)]
impl Sleeper for BrowserSleeper {
    async fn sleep(&self, millis: u32) {
        let promise = Promise::new(&mut |resolve, _reject| {
            let global = js_sys::global();
            let scheduled = get(&global, "setTimeout")
                .and_then(|f| f.dyn_into::<Function>().ok())
                .map(|set_timeout| set_timeout.call2(&global, &resolve, &JsValue::from(millis)));
            if !matches!(scheduled, Some(Ok(_))) {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}
