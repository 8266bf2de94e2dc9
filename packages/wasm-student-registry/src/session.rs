//! Wallet session management
//!
//! `SessionManager` is the single owner of the active [`Session`]. Every
//! account change (authorization, `accountsChanged`, disconnect) goes
//! through one rule: if the account differs from the live one, the session
//! is replaced wholesale with freshly built clients and a new epoch.
//! Nothing outside this module reassigns session state.

use crate::address::normalize_address;
use crate::client::{ReadClient, WriteClient};
use crate::error::RegistryError;
use crate::provider::{AccountsSubscription, JsonRpc, RpcError, WalletProvider};
use log::{debug, info, warn};
use serde_json::json;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Clients derived for one account
#[derive(Clone)]
pub struct Clients {
    /// Bound to the session account; simulates and submits writes
    pub write: WriteClient,
    /// Network-only; queries and receipts
    pub read: ReadClient,
}

/// The currently authorized account plus the clients derived from it
#[derive(Clone)]
pub struct Session {
    account: String,
    epoch: u64,
    clients: Clients,
}

impl Session {
    /// Lowercase hex account address
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Monotonic counter identifying this session among all sessions of
    /// the manager; attempts are tagged with it
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }
}

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    epoch: u64,
}

struct SessionInner {
    wallet: Option<Rc<dyn WalletProvider>>,
    read: ReadClient,
    state: RefCell<SessionState>,
}

impl SessionInner {
    fn clients_for(&self, account: &str) -> Result<Clients, RegistryError> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or(RegistryError::ProviderUnavailable)?;
        Ok(Clients {
            write: WriteClient::new(wallet.clone(), account.to_string()),
            read: self.read.clone(),
        })
    }

    /// Apply the rebuild-on-change rule for a newly reported account
    fn apply_account(&self, account: Option<&str>) -> Result<Option<Session>, RegistryError> {
        let account = match account {
            Some(account) => normalize_address(account)?,
            None => {
                self.clear();
                return Ok(None);
            }
        };

        if let Some(current) = self.state.borrow().session.as_ref() {
            if current.account == account {
                return Ok(Some(current.clone()));
            }
        }

        let clients = self.clients_for(&account)?;
        let mut state = self.state.borrow_mut();
        state.epoch += 1;
        let session = Session {
            account,
            epoch: state.epoch,
            clients,
        };
        info!(
            "Session established for {} (epoch {})",
            session.account, session.epoch
        );
        state.session = Some(session.clone());
        Ok(Some(session))
    }

    /// Apply an `accountsChanged` payload; the first account is the active one
    fn apply_accounts(&self, accounts: &[String]) -> Option<Session> {
        match self.apply_account(accounts.first().map(String::as_str)) {
            Ok(session) => session,
            Err(e) => {
                warn!("Ignoring reported account, clearing session: {}", e);
                self.clear();
                None
            }
        }
    }

    fn clear(&self) {
        let mut state = self.state.borrow_mut();
        if let Some(previous) = state.session.take() {
            state.epoch += 1;
            info!("Session for {} cleared", previous.account);
        }
    }
}

/// Owner of the active wallet session
#[derive(Clone)]
pub struct SessionManager {
    inner: Rc<SessionInner>,
}

impl SessionManager {
    /// `wallet` is `None` when no injected provider was detected
    pub fn new(wallet: Option<Rc<dyn WalletProvider>>, read_transport: Rc<dyn JsonRpc>) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                wallet,
                read: ReadClient::new(read_transport),
                state: RefCell::new(SessionState::default()),
            }),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.inner.wallet.is_some()
    }

    /// Request account access and establish a session for the primary account
    pub async fn authorize(&self) -> Result<String, RegistryError> {
        let wallet = self
            .inner
            .wallet
            .clone()
            .ok_or(RegistryError::ProviderUnavailable)?;

        debug!("Requesting account access");
        let value = wallet
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(|err| match err.code {
                RpcError::REQUEST_PENDING => RegistryError::AuthorizationPending,
                _ => RegistryError::AuthorizationRejected(err.message),
            })?;

        let accounts: Vec<String> = serde_json::from_value(value)?;
        let primary = accounts.first().ok_or_else(|| {
            RegistryError::AuthorizationRejected("wallet returned no accounts".to_string())
        })?;

        let session = self
            .inner
            .apply_account(Some(primary.as_str()))?
            .ok_or(RegistryError::NotConnected)?;
        Ok(session.account)
    }

    /// Subscribe to wallet account changes.
    ///
    /// The session is rebuilt (or cleared) before `handler` runs, so the
    /// handler always observes the new state. Dropping or cancelling the
    /// returned handle removes the wallet listener.
    pub fn on_accounts_changed<F>(&self, handler: F) -> Result<AccountsSubscription, RegistryError>
    where
        F: Fn(Option<&str>) + 'static,
    {
        let wallet = self
            .inner
            .wallet
            .clone()
            .ok_or(RegistryError::ProviderUnavailable)?;
        let weak: Weak<SessionInner> = Rc::downgrade(&self.inner);
        let listener = Rc::new(move |accounts: Vec<String>| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            debug!("accountsChanged: {:?}", accounts);
            let session = inner.apply_accounts(&accounts);
            handler(session.as_ref().map(Session::account));
        });
        Ok(AccountsSubscription::new(wallet, listener))
    }

    /// Apply an account list reported by the wallet outside a subscription
    pub fn handle_accounts_changed(&self, accounts: &[String]) -> Option<Session> {
        self.inner.apply_accounts(accounts)
    }

    /// Derive a fresh write/read client pair for `account`.
    ///
    /// Clients are never shared across accounts: each call builds a new
    /// write client bound to exactly this account.
    pub fn current_clients(&self, account: &str) -> Result<Clients, RegistryError> {
        let account = normalize_address(account)?;
        self.inner.clients_for(&account)
    }

    /// Explicitly end the session
    pub fn disconnect(&self) {
        self.inner.clear();
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.state.borrow().session.clone()
    }

    pub fn account(&self) -> Option<String> {
        self.inner
            .state
            .borrow()
            .session
            .as_ref()
            .map(|s| s.account.clone())
    }

    /// Whether `epoch` still identifies the live session
    pub fn is_current(&self, epoch: u64) -> bool {
        self.inner
            .state
            .borrow()
            .session
            .as_ref()
            .is_some_and(|s| s.epoch == epoch)
    }

    pub fn read_client(&self) -> ReadClient {
        self.inner.read.clone()
    }
}
