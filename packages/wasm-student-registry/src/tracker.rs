//! Transaction lifecycle tracking
//!
//! Each write action owns one [`TransactionAttempt`]:
//!
//! ```text
//! Idle -> Pending -> Success
//!                 \-> Error
//! ```
//!
//! Success and Error are terminal for the attempt but a new trigger starts
//! over at Pending with the previous hash and error cleared. While an
//! attempt is Pending, further triggers of the same action are refused.

use crate::contract::ContractCall;
use crate::error::RegistryError;
use crate::gateway::RecordGateway;
use crate::messages::{describe_failure, describe_success, Locale};
use crate::session::SessionManager;
use crate::types::{Receipt, TxKind, TxStatus};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// State of one write action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAttempt {
    pub kind: TxKind,
    pub status: TxStatus,
    /// Present once the transaction was submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// User-facing failure message, only in Error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Session the attempt was issued under
    #[serde(skip)]
    pub session_epoch: Option<u64>,
    /// The session changed before the attempt completed
    #[serde(default)]
    pub stale: bool,
}

impl TransactionAttempt {
    pub fn new(kind: TxKind) -> Self {
        Self {
            kind,
            status: TxStatus::Idle,
            hash: None,
            error: None,
            session_epoch: None,
            stale: false,
        }
    }

    /// Idle/Success/Error -> Pending
    pub fn begin(&mut self, session_epoch: u64) -> Result<(), RegistryError> {
        if self.status == TxStatus::Pending {
            return Err(RegistryError::AttemptInProgress(self.kind.to_string()));
        }
        self.status = TxStatus::Pending;
        self.hash = None;
        self.error = None;
        self.session_epoch = Some(session_epoch);
        self.stale = false;
        Ok(())
    }

    pub fn record_submission(&mut self, hash: String) {
        if self.status == TxStatus::Pending {
            self.hash = Some(hash);
        }
    }

    /// Pending -> Success
    pub fn succeed(&mut self) {
        if self.status == TxStatus::Pending {
            self.status = TxStatus::Success;
        }
    }

    /// Pending -> Error
    pub fn fail(&mut self, message: String) {
        if self.status == TxStatus::Pending {
            self.status = TxStatus::Error;
            self.error = Some(message);
        }
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }
}

/// A write that reached a successful receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    pub receipt: Receipt,
    /// Issued under a session that is no longer current
    pub stale: bool,
}

/// Drives the attempt of one action through the gateway
pub struct TransactionTracker {
    kind: TxKind,
    locale: Locale,
    attempt: RefCell<TransactionAttempt>,
}

impl TransactionTracker {
    pub fn new(kind: TxKind, locale: Locale) -> Self {
        Self {
            kind,
            locale,
            attempt: RefCell::new(TransactionAttempt::new(kind)),
        }
    }

    pub fn kind(&self) -> TxKind {
        self.kind
    }

    pub fn snapshot(&self) -> TransactionAttempt {
        self.attempt.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.attempt.borrow().status == TxStatus::Pending
    }

    /// Text to show for the attempt's outcome, if it has one
    pub fn message(&self) -> Option<String> {
        let attempt = self.attempt.borrow();
        match attempt.status {
            TxStatus::Success => Some(describe_success(self.locale, self.kind).to_string()),
            TxStatus::Error => attempt.error.clone(),
            TxStatus::Idle | TxStatus::Pending => None,
        }
    }

    /// Simulate, submit and confirm `call`, recording every transition.
    ///
    /// Without a write-capable gateway nothing happens and the attempt stays
    /// as it was. Completion under a superseded session still resolves but
    /// the attempt is flagged stale.
    pub async fn execute(
        &self,
        gateway: &RecordGateway,
        call: &ContractCall,
        sessions: &SessionManager,
    ) -> Result<Confirmed, RegistryError> {
        let epoch = match gateway.session_epoch() {
            Some(epoch) if gateway.can_write() => epoch,
            _ => {
                debug!("{} requested without a session", self.kind);
                return Err(RegistryError::NotConnected);
            }
        };
        self.attempt.borrow_mut().begin(epoch)?;
        debug!("{} attempt pending ({})", self.kind, call.signature());

        let outcome = self.drive(gateway, call).await;

        let stale = !sessions.is_current(epoch);
        let mut attempt = self.attempt.borrow_mut();
        if stale {
            warn!(
                "{} attempt completed after its session (epoch {}) was replaced",
                self.kind, epoch
            );
            attempt.mark_stale();
        }
        match outcome {
            Ok(receipt) => {
                info!("{} confirmed: {}", self.kind, receipt.transaction_hash);
                attempt.succeed();
                Ok(Confirmed { receipt, stale })
            }
            Err(err) => {
                error!("{} failed: {}", self.kind, err);
                attempt.fail(describe_failure(self.locale, self.kind, &err));
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        gateway: &RecordGateway,
        call: &ContractCall,
    ) -> Result<Receipt, RegistryError> {
        let hash = gateway.simulate_and_submit(call).await?;
        self.attempt.borrow_mut().record_submission(hash.clone());

        let receipt = gateway.confirm(&hash).await?;
        if !receipt.is_success() {
            return Err(RegistryError::TransactionReverted { hash });
        }
        Ok(receipt)
    }
}
