//! EVM account address handling
//!
//! Wallets report addresses in mixed (EIP-55 checksum) case. Sessions are
//! keyed by the lowercase hex form so that the same account reported in
//! two casings is never mistaken for an account change.

use crate::error::RegistryError;
use alloy_primitives::Address;
use std::str::FromStr;

/// Parse an address, accepting any letter case
pub fn parse_address(address: &str) -> Result<Address, RegistryError> {
    let trimmed = address.trim();
    if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
        return Err(RegistryError::InvalidAddress(format!(
            "missing 0x prefix: {}",
            trimmed
        )));
    }
    Address::from_str(trimmed)
        .map_err(|e| RegistryError::InvalidAddress(format!("{}: {}", trimmed, e)))
}

/// Normalize an address to its `0x`-prefixed lowercase hex form
pub fn normalize_address(address: &str) -> Result<String, RegistryError> {
    let parsed = parse_address(address)?;
    Ok(format!("0x{}", hex::encode(parsed.as_slice())))
}

/// Validate an address
pub fn validate_address(address: &str) -> bool {
    parse_address(address).is_ok()
}

/// Block explorer link for a transaction: `<explorer-base>/tx/<hash>`
pub fn explorer_tx_url(explorer_base: &str, hash: &str) -> String {
    format!("{}/tx/{}", explorer_base.trim_end_matches('/'), hash)
}
