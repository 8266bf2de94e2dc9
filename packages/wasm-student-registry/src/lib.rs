//! wasm-student-registry: WASM module for a smart-contract student registry
//!
//! This crate provides:
//! - Wallet session management (EIP-1193 provider, account switching)
//! - Tracked writes: simulate, submit and confirm with decoded reverts
//! - Range listing with per-record detail reads
//! - Input validation and localized user-facing messages
//!
//! # Architecture
//!
//! The crate follows a two-layer architecture:
//! - **Core layer** (`src/*.rs`): Pure Rust logic, no WASM dependencies
//! - **WASM layer** (`src/wasm/*.rs`): Thin wrappers with `#[wasm_bindgen]`

pub mod address;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod gateway;
pub mod listing;
pub mod messages;
pub mod provider;
pub mod registry;
pub mod session;
pub mod tracker;
pub mod types;
pub mod validation;
pub mod wasm;

#[cfg(test)]
pub mod test_utils;

// Re-export main types for convenience
pub use address::{explorer_tx_url, normalize_address, validate_address};
pub use config::NetworkConfig;
pub use error::RegistryError;
pub use gateway::RecordGateway;
pub use listing::ListingCoordinator;
pub use messages::Locale;
pub use registry::StudentRegistry;
pub use session::{Session, SessionManager};
pub use tracker::{TransactionAttempt, TransactionTracker};
pub use types::{ListingQuery, Receipt, Record, StudentForm, TxKind, TxStatus};
