//! WASM bindings for wasm-student-registry
//!
//! This module contains thin wrappers with #[wasm_bindgen] that delegate
//! to the core Rust implementations, plus the browser implementations of
//! the provider traits (`window.ethereum`, `fetch`, `setTimeout`).

pub mod provider;
pub mod registry;
pub mod try_into_js_value;

// Re-export WASM types
pub use provider::{BrowserSleeper, BrowserWallet, FetchTransport};
pub use registry::WasmStudentRegistry;
