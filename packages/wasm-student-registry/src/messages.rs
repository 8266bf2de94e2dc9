//! User-facing messages
//!
//! Failure text follows two tiers: reverts that name a registry condition
//! get a dedicated message with the key interpolated; everything else gets
//! a generic per-action message annotated with the raw reason.

use crate::contract::RevertReason;
use crate::error::RegistryError;
use crate::types::TxKind;
use serde::{Deserialize, Serialize};

/// Message language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Vietnamese
    #[default]
    Vi,
    /// English
    En,
}

/// Message for a failed attempt of `kind`
pub fn describe_failure(locale: Locale, kind: TxKind, err: &RegistryError) -> String {
    match err {
        RegistryError::SimulationReverted(reason) if reason.is_domain_specific() => {
            describe_revert(locale, reason)
        }
        RegistryError::SimulationReverted(reason) => match locale {
            Locale::Vi => format!("Lỗi blockchain: {}", reason),
            Locale::En => format!("Blockchain error: {}", reason),
        },
        RegistryError::TransactionReverted { .. } => match locale {
            Locale::Vi => "Giao dịch thất bại. Vui lòng thử lại.".to_string(),
            Locale::En => "Transaction failed. Please try again.".to_string(),
        },
        other => format!("{} ({})", generic_failure(locale, kind), other.raw_reason()),
    }
}

/// Message for a failed write call, whether or not it reached the attempt
pub fn describe_write_error(locale: Locale, kind: TxKind, err: &RegistryError) -> String {
    match err {
        RegistryError::AttemptInProgress(_) => describe_error(locale, err),
        local if local.is_local() => describe_error(locale, local),
        other => describe_failure(locale, kind, other),
    }
}

/// Message for errors raised outside a tracked attempt
pub fn describe_error(locale: Locale, err: &RegistryError) -> String {
    match err {
        RegistryError::ProviderUnavailable => provider_missing(locale).to_string(),
        RegistryError::AuthorizationPending => authorization_pending(locale).to_string(),
        RegistryError::AuthorizationRejected(_) => match locale {
            Locale::Vi => "Kết nối ví đã bị từ chối.".to_string(),
            Locale::En => "Wallet connection was rejected.".to_string(),
        },
        RegistryError::NotConnected => not_connected(locale).to_string(),
        RegistryError::ValidationFailed(message) => message.clone(),
        RegistryError::AttemptInProgress(_) => match locale {
            Locale::Vi => "Giao dịch trước vẫn đang được xử lý.".to_string(),
            Locale::En => "The previous transaction is still pending.".to_string(),
        },
        other => other.to_string(),
    }
}

fn describe_revert(locale: Locale, reason: &RevertReason) -> String {
    match (reason, locale) {
        (RevertReason::StudentAlreadyExists(id), Locale::Vi) => {
            format!("Sinh viên với MSSV {} đã tồn tại.", id)
        }
        (RevertReason::StudentAlreadyExists(id), Locale::En) => {
            format!("A student with ID {} already exists.", id)
        }
        (RevertReason::StudentNotFound(id), Locale::Vi) => {
            format!("Sinh viên với MSSV {} không tồn tại.", id)
        }
        (RevertReason::StudentNotFound(id), Locale::En) => {
            format!("No student with ID {} exists.", id)
        }
        (RevertReason::NotOwner(caller), Locale::Vi) => {
            format!("Tài khoản {} không có quyền thực hiện thao tác này.", caller)
        }
        (RevertReason::NotOwner(caller), Locale::En) => {
            format!("Account {} is not allowed to perform this action.", caller)
        }
        (other, Locale::Vi) => format!("Lỗi blockchain: {}", other),
        (other, Locale::En) => format!("Blockchain error: {}", other),
    }
}

/// Generic failure text for an action
pub fn generic_failure(locale: Locale, kind: TxKind) -> &'static str {
    match (kind, locale) {
        (TxKind::Add, Locale::Vi) => "Thêm sinh viên lỗi.",
        (TxKind::Add, Locale::En) => "Failed to add student.",
        (TxKind::Update, Locale::Vi) => "Cập nhật tên sinh viên thất bại.",
        (TxKind::Update, Locale::En) => "Failed to update student name.",
        (TxKind::Delete, Locale::Vi) => "Xóa sinh viên thất bại.",
        (TxKind::Delete, Locale::En) => "Failed to delete student.",
    }
}

/// Confirmation text for a successful attempt
pub fn describe_success(locale: Locale, kind: TxKind) -> &'static str {
    match (kind, locale) {
        (TxKind::Add, Locale::Vi) => "Thêm sinh viên thành công!",
        (TxKind::Add, Locale::En) => "Student added successfully!",
        (TxKind::Update, Locale::Vi) => "Cập nhật tên sinh viên thành công!",
        (TxKind::Update, Locale::En) => "Student name updated successfully!",
        (TxKind::Delete, Locale::Vi) => "Xóa sinh viên thành công!",
        (TxKind::Delete, Locale::En) => "Student deleted successfully!",
    }
}

pub fn invalid_form(locale: Locale) -> &'static str {
    match locale {
        Locale::Vi => "Vui lòng nhập đầy đủ và hợp lệ thông tin sinh viên.",
        Locale::En => "Please fill in valid student details.",
    }
}

pub fn invalid_id(locale: Locale) -> &'static str {
    match locale {
        Locale::Vi => "MSSV phải là số nguyên dương.",
        Locale::En => "Student ID must be a positive integer.",
    }
}

pub fn invalid_range(locale: Locale) -> &'static str {
    match locale {
        Locale::Vi => "Khoảng MSSV không hợp lệ.",
        Locale::En => "Invalid student index range.",
    }
}

pub fn provider_missing(locale: Locale) -> &'static str {
    match locale {
        Locale::Vi => "Vui lòng cài đặt MetaMask!",
        Locale::En => "Please install MetaMask!",
    }
}

pub fn authorization_pending(locale: Locale) -> &'static str {
    match locale {
        Locale::Vi => "Yêu cầu kết nối đang chờ xử lý trong MetaMask.",
        Locale::En => "A connection request is already pending in MetaMask.",
    }
}

pub fn not_connected(locale: Locale) -> &'static str {
    match locale {
        Locale::Vi => "Vui lòng kết nối ví trước.",
        Locale::En => "Please connect your wallet first.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    #[test]
    fn test_already_exists_embeds_key() {
        let err = RegistryError::SimulationReverted(RevertReason::StudentAlreadyExists(U256::from(
            7,
        )));
        let vi = describe_failure(Locale::Vi, TxKind::Add, &err);
        let en = describe_failure(Locale::En, TxKind::Add, &err);
        assert_eq!(vi, "Sinh viên với MSSV 7 đã tồn tại.");
        assert_eq!(en, "A student with ID 7 already exists.");
    }

    #[test]
    fn test_not_found_embeds_key() {
        let err = RegistryError::SimulationReverted(RevertReason::StudentNotFound(U256::from(4)));
        assert!(describe_failure(Locale::Vi, TxKind::Delete, &err).contains('4'));
    }

    #[test]
    fn test_other_revert_uses_blockchain_tier() {
        let err = RegistryError::SimulationReverted(RevertReason::Message("paused".to_string()));
        assert_eq!(
            describe_failure(Locale::En, TxKind::Update, &err),
            "Blockchain error: paused"
        );
    }

    #[test]
    fn test_generic_tier_carries_raw_reason() {
        let err = RegistryError::SubmissionFailed("User denied transaction signature.".to_string());
        assert_eq!(
            describe_failure(Locale::Vi, TxKind::Delete, &err),
            "Xóa sinh viên thất bại. (User denied transaction signature.)"
        );
    }

    #[test]
    fn test_included_revert_is_distinct() {
        let err = RegistryError::TransactionReverted {
            hash: "0xabc".to_string(),
        };
        let simulated =
            RegistryError::SimulationReverted(RevertReason::Unknown("0x".to_string()));
        assert_ne!(
            describe_failure(Locale::Vi, TxKind::Add, &err),
            describe_failure(Locale::Vi, TxKind::Add, &simulated)
        );
    }

    #[test]
    fn test_local_errors_skip_generic_tier() {
        let err = RegistryError::NotConnected;
        assert_eq!(
            describe_write_error(Locale::En, TxKind::Add, &err),
            "Please connect your wallet first."
        );

        let err = RegistryError::AttemptInProgress("add".to_string());
        assert_eq!(
            describe_write_error(Locale::Vi, TxKind::Add, &err),
            "Giao dịch trước vẫn đang được xử lý."
        );

        let err = RegistryError::SubmissionFailed("nonce too low".to_string());
        assert_eq!(
            describe_write_error(Locale::En, TxKind::Update, &err),
            "Failed to update student name. (nonce too low)"
        );
    }

    #[test]
    fn test_connect_errors() {
        assert_eq!(
            describe_error(Locale::Vi, &RegistryError::ProviderUnavailable),
            "Vui lòng cài đặt MetaMask!"
        );
        assert_ne!(
            describe_error(Locale::En, &RegistryError::AuthorizationPending),
            describe_error(
                Locale::En,
                &RegistryError::AuthorizationRejected("denied".to_string())
            )
        );
    }

    #[test]
    fn test_locale_serde() {
        assert_eq!(serde_json::to_string(&Locale::En).unwrap(), "\"en\"");
        let locale: Locale = serde_json::from_str("\"vi\"").unwrap();
        assert_eq!(locale, Locale::Vi);
    }
}
