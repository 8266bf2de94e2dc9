//! WASM bindings for the student registry
//!
//! Thin wrapper around core StudentRegistry with #[wasm_bindgen]. Async
//! operations return Promises; failures reject with a localized message.

use crate::config::NetworkConfig;
use crate::error::RegistryError;
use crate::messages::{describe_error, describe_write_error};
use crate::provider::{AccountsSubscription, WalletProvider};
use crate::registry::StudentRegistry;
use crate::types::{StudentForm, TxKind};
use crate::validation::integer_from_js;
use crate::wasm::provider::{BrowserSleeper, BrowserWallet, FetchTransport};
use crate::wasm::try_into_js_value::{JsConversionError, TryIntoJsValue};
use js_sys::{Function, Promise};
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

fn js_error(message: &str) -> JsValue {
    js_sys::Error::new(message).into()
}

fn attempt_to_js(registry: &StudentRegistry, kind: TxKind) -> Result<JsValue, JsConversionError> {
    let attempt = registry.attempt(kind);
    let explorer_url = attempt.hash.as_deref().map(|h| registry.explorer_url(h));
    let message = registry.tracker(kind).message();
    crate::js_obj!(
        "kind" => attempt.kind.to_string(),
        "status" => attempt.status.to_string(),
        "hash" => attempt.hash,
        "error" => attempt.error,
        "message" => message,
        "explorerUrl" => explorer_url,
        "stale" => attempt.stale
    )
}

/// WASM-exposed student registry
///
/// The session follows wallet account switches from construction on;
/// `watchAccounts` only adds a callback.
#[wasm_bindgen]
pub struct WasmStudentRegistry {
    inner: Rc<StudentRegistry>,
    subscription: RefCell<Option<AccountsSubscription>>,
}

impl WasmStudentRegistry {
    fn write(&self, kind: TxKind, run: WriteAction) -> Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let result = match run {
                WriteAction::Add(form) => inner.add_student(&form).await,
                WriteAction::Update(id, name) => inner.update_student_name(id, &name).await,
                WriteAction::Delete(id) => inner.delete_student(id).await,
            };
            match result {
                Ok(_) => Ok(attempt_to_js(&inner, kind)?),
                Err(e) => Err(js_error(&describe_write_error(
                    inner.config().locale,
                    kind,
                    &e,
                ))),
            }
        })
    }

    fn read_error(&self, err: &RegistryError) -> JsValue {
        js_error(&describe_error(self.inner.config().locale, err))
    }
}

enum WriteAction {
    Add(StudentForm),
    Update(i64, String),
    Delete(i64),
}

#[wasm_bindgen]
impl WasmStudentRegistry {
    /// Create a registry for a network
    ///
    /// # Example Config
    /// ```json
    /// {
    ///   "contractAddress": "0x...",
    ///   "rpcUrl": "https://sepolia.drpc.org",
    ///   "pollIntervalMs": 4000,
    ///   "locale": "vi"
    /// }
    /// ```
    /// Missing fields default to the Sepolia preset.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WasmStudentRegistry, JsValue> {
        let config: NetworkConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;

        let wallet = BrowserWallet::detect().map(|w| Rc::new(w) as Rc<dyn WalletProvider>);
        if wallet.is_none() {
            warn!("No injected wallet provider found; registry is read-only");
        }
        let read = Rc::new(FetchTransport::new(&config.rpc_url));
        let inner = StudentRegistry::new(config, wallet, read, Rc::new(BrowserSleeper))?;
        Ok(WasmStudentRegistry {
            inner: Rc::new(inner),
            subscription: RefCell::new(None),
        })
    }

    #[wasm_bindgen(getter, js_name = hasProvider)]
    pub fn has_provider(&self) -> bool {
        self.inner.sessions().has_provider()
    }

    /// Connected account (lowercase hex) or undefined
    #[wasm_bindgen(getter)]
    pub fn account(&self) -> Option<String> {
        self.inner.account()
    }

    /// Request wallet access; resolves with the account
    #[wasm_bindgen]
    pub fn connect(&self) -> Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            match inner.connect().await {
                Ok(account) => Ok(JsValue::from_str(&account)),
                Err(e) => Err(js_error(&describe_error(inner.config().locale, &e))),
            }
        })
    }

    #[wasm_bindgen]
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Call `callback(account | null)` whenever the wallet switches accounts.
    /// Replaces any previous callback.
    #[wasm_bindgen(js_name = watchAccounts)]
    pub fn watch_accounts(&self, callback: Function) -> Result<(), JsValue> {
        let subscription = self
            .inner
            .watch_accounts(move |account| {
                let arg = account.map(JsValue::from_str).unwrap_or(JsValue::NULL);
                if let Err(e) = callback.call1(&JsValue::NULL, &arg) {
                    warn!("accountsChanged callback threw: {:?}", e);
                }
            })
            .map_err(|e| self.read_error(&e))?;
        *self.subscription.borrow_mut() = Some(subscription);
        Ok(())
    }

    #[wasm_bindgen(js_name = unwatchAccounts)]
    pub fn unwatch_accounts(&self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    /// Add a student; resolves with the attempt snapshot
    ///
    /// # Example Form
    /// ```json
    /// { "id": 12, "name": "Nguyễn Văn A", "birthYear": 2003, "classLabel": "CNTT1" }
    /// ```
    #[wasm_bindgen(js_name = addStudent)]
    pub fn add_student(&self, form: JsValue) -> Promise {
        match serde_wasm_bindgen::from_value::<StudentForm>(form) {
            Ok(form) => self.write(TxKind::Add, WriteAction::Add(form)),
            // Garbled numeric input fails like an invalid form
            Err(_) => self.write(TxKind::Add, WriteAction::Add(StudentForm::default())),
        }
    }

    #[wasm_bindgen(js_name = updateStudentName)]
    pub fn update_student_name(&self, id: f64, new_name: String) -> Promise {
        let id = integer_from_js(id).unwrap_or(0);
        self.write(TxKind::Update, WriteAction::Update(id, new_name))
    }

    /// Delete a student; the displayed listing reloads on success
    #[wasm_bindgen(js_name = deleteStudent)]
    pub fn delete_student(&self, id: f64) -> Promise {
        let id = integer_from_js(id).unwrap_or(0);
        self.write(TxKind::Delete, WriteAction::Delete(id))
    }

    /// Snapshot of an action's attempt: `add`, `update` or `delete`
    #[wasm_bindgen]
    pub fn attempt(&self, kind: &str) -> Result<JsValue, JsValue> {
        let kind = TxKind::from_name(kind)
            .ok_or_else(|| js_error(&format!("Unknown action: {}", kind)))?;
        Ok(attempt_to_js(&self.inner, kind)?)
    }

    #[wasm_bindgen(js_name = explorerUrl)]
    pub fn explorer_url(&self, hash: &str) -> String {
        self.inner.explorer_url(hash)
    }

    /// Load the existing students of an index range; resolves with an array
    #[wasm_bindgen(js_name = fetchStudents)]
    pub fn fetch_students(&self, start: f64, end: f64) -> Promise {
        let inner = self.inner.clone();
        let start = integer_from_js(start).unwrap_or(-1);
        let end = integer_from_js(end).unwrap_or(-1);
        future_to_promise(async move {
            match inner.fetch_students(start, end).await {
                Ok(query) => Ok(query.records.try_to_js_value()?),
                Err(e) => Err(js_error(&describe_error(inner.config().locale, &e))),
            }
        })
    }

    /// Records of the last completed listing
    #[wasm_bindgen(js_name = currentStudents)]
    pub fn current_students(&self) -> Result<JsValue, JsValue> {
        let records = self
            .inner
            .listing()
            .current()
            .map(|query| query.records)
            .unwrap_or_default();
        Ok(records.try_to_js_value()?)
    }

    #[wasm_bindgen(getter, js_name = isLoadingStudents)]
    pub fn is_loading_students(&self) -> bool {
        self.inner.listing().is_loading()
    }

    #[wasm_bindgen(js_name = getStudent)]
    pub fn get_student(&self, id: f64) -> Promise {
        let inner = self.inner.clone();
        let id = integer_from_js(id).unwrap_or(0);
        future_to_promise(async move {
            match inner.get_student(id).await {
                Ok(record) => Ok(record.try_to_js_value()?),
                Err(e) => Err(js_error(&describe_error(inner.config().locale, &e))),
            }
        })
    }

    /// Like `getStudent`, with `completedCourses` filled in
    #[wasm_bindgen(js_name = getStudentDetails)]
    pub fn get_student_details(&self, id: f64) -> Promise {
        let inner = self.inner.clone();
        let id = integer_from_js(id).unwrap_or(0);
        future_to_promise(async move {
            match inner.get_student_details(id).await {
                Ok(record) => Ok(record.try_to_js_value()?),
                Err(e) => Err(js_error(&describe_error(inner.config().locale, &e))),
            }
        })
    }

    #[wasm_bindgen(js_name = totalStudents)]
    pub fn total_students(&self) -> Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            match inner.total_students().await {
                Ok(total) => Ok(total.try_to_js_value()?),
                Err(e) => Err(js_error(&describe_error(inner.config().locale, &e))),
            }
        })
    }
}
