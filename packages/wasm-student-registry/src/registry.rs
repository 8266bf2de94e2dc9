//! Student registry façade
//!
//! One UI surface's worth of state: the wallet session, one tracked
//! attempt per write action and the currently displayed listing.

use crate::address::explorer_tx_url;
use crate::config::NetworkConfig;
use crate::contract;
use crate::error::RegistryError;
use crate::gateway::RecordGateway;
use crate::listing::ListingCoordinator;
use crate::messages;
use crate::provider::{AccountsSubscription, JsonRpc, Sleeper, WalletProvider};
use crate::session::SessionManager;
use crate::tracker::{Confirmed, TransactionAttempt, TransactionTracker};
use crate::types::{ListingQuery, Record, StudentForm, TxKind};
use crate::validation::{is_valid_id, validate_name_update, validate_student_form};
use log::{debug, warn};
use std::rc::Rc;

pub struct StudentRegistry {
    config: NetworkConfig,
    sessions: SessionManager,
    sleeper: Rc<dyn Sleeper>,
    listing: ListingCoordinator,
    add: TransactionTracker,
    update: TransactionTracker,
    delete: TransactionTracker,
    /// Keeps the session on the wallet's current account
    _account_watch: Option<AccountsSubscription>,
}

impl StudentRegistry {
    /// `wallet` is the injected provider if one was detected; reads always
    /// go through `read_transport`
    pub fn new(
        config: NetworkConfig,
        wallet: Option<Rc<dyn WalletProvider>>,
        read_transport: Rc<dyn JsonRpc>,
        sleeper: Rc<dyn Sleeper>,
    ) -> Result<Self, RegistryError> {
        let config = config.validate()?;
        let locale = config.locale;
        let sessions = SessionManager::new(wallet, read_transport);
        let account_watch = if sessions.has_provider() {
            Some(sessions.on_accounts_changed(|_| {})?)
        } else {
            None
        };
        Ok(Self {
            sessions,
            sleeper,
            listing: ListingCoordinator::new(),
            add: TransactionTracker::new(TxKind::Add, locale),
            update: TransactionTracker::new(TxKind::Update, locale),
            delete: TransactionTracker::new(TxKind::Delete, locale),
            _account_watch: account_watch,
            config,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn listing(&self) -> &ListingCoordinator {
        &self.listing
    }

    /// Connected account, lowercase hex
    pub fn account(&self) -> Option<String> {
        self.sessions.account()
    }

    /// Ask the wallet for account access
    pub async fn connect(&self) -> Result<String, RegistryError> {
        self.sessions.authorize().await
    }

    pub fn disconnect(&self) {
        self.sessions.disconnect();
    }

    /// Notify `handler` of wallet account switches; see
    /// [`SessionManager::on_accounts_changed`]. The session itself follows
    /// the wallet without any handler.
    pub fn watch_accounts<F>(&self, handler: F) -> Result<AccountsSubscription, RegistryError>
    where
        F: Fn(Option<&str>) + 'static,
    {
        self.sessions.on_accounts_changed(handler)
    }

    /// Gateway bound to the current session, read-only without one
    pub fn gateway(&self) -> RecordGateway {
        let gateway = RecordGateway::new(
            &self.config,
            self.sessions.read_client(),
            self.sleeper.clone(),
        );
        match self.sessions.session() {
            Some(session) => gateway.with_session(&session),
            None => gateway,
        }
    }

    pub fn tracker(&self, kind: TxKind) -> &TransactionTracker {
        match kind {
            TxKind::Add => &self.add,
            TxKind::Update => &self.update,
            TxKind::Delete => &self.delete,
        }
    }

    pub fn attempt(&self, kind: TxKind) -> TransactionAttempt {
        self.tracker(kind).snapshot()
    }

    pub fn explorer_url(&self, hash: &str) -> String {
        explorer_tx_url(&self.config.explorer_base, hash)
    }

    /// Add a student from the form fields
    pub async fn add_student(&self, form: &StudentForm) -> Result<Confirmed, RegistryError> {
        if !validate_student_form(form) {
            return Err(self.invalid(messages::invalid_form(self.config.locale)));
        }
        let call = contract::add_student(
            form.id.unsigned_abs(),
            form.name.trim(),
            form.birth_year.unsigned_abs(),
            form.class_label.trim(),
        );
        self.submit(TxKind::Add, &call).await
    }

    pub async fn update_student_name(
        &self,
        id: i64,
        new_name: &str,
    ) -> Result<Confirmed, RegistryError> {
        if !validate_name_update(id, new_name) {
            return Err(self.invalid(messages::invalid_form(self.config.locale)));
        }
        let call = contract::update_student_name(id.unsigned_abs(), new_name.trim());
        self.submit(TxKind::Update, &call).await
    }

    /// Delete a student, then reload the displayed listing
    pub async fn delete_student(&self, id: i64) -> Result<Confirmed, RegistryError> {
        if !is_valid_id(id) {
            return Err(self.invalid(messages::invalid_id(self.config.locale)));
        }
        let confirmed = self
            .submit(TxKind::Delete, &contract::delete_student(id.unsigned_abs()))
            .await?;

        if confirmed.stale {
            debug!("Skipping listing refresh for a delete from a replaced session");
        } else if let Err(e) = self.listing.refresh(&self.gateway()).await {
            warn!("Listing refresh after delete failed: {}", e);
        }
        Ok(confirmed)
    }

    /// Load the listing for a range; bounds go to the contract unchanged
    pub async fn fetch_students(
        &self,
        start: i64,
        end: i64,
    ) -> Result<ListingQuery, RegistryError> {
        if start < 0 || end < 0 {
            return Err(self.invalid(messages::invalid_range(self.config.locale)));
        }
        self.listing
            .fetch_range(&self.gateway(), start.unsigned_abs(), end.unsigned_abs())
            .await
    }

    /// Look up one student; `exists == false` when there is none
    pub async fn get_student(&self, id: i64) -> Result<Record, RegistryError> {
        if !is_valid_id(id) {
            return Err(self.invalid(messages::invalid_id(self.config.locale)));
        }
        self.gateway().get_student(id.unsigned_abs()).await
    }

    /// Look up one student together with its completed courses
    pub async fn get_student_details(&self, id: i64) -> Result<Record, RegistryError> {
        let mut record = self.get_student(id).await?;
        if record.exists {
            let courses = self.gateway().get_completed_courses(record.id).await?;
            record.completed_courses = Some(courses);
        }
        Ok(record)
    }

    pub async fn total_students(&self) -> Result<u64, RegistryError> {
        self.gateway().get_total_students().await
    }

    async fn submit(
        &self,
        kind: TxKind,
        call: &contract::ContractCall,
    ) -> Result<Confirmed, RegistryError> {
        self.tracker(kind)
            .execute(&self.gateway(), call, &self.sessions)
            .await
    }

    fn invalid(&self, message: &str) -> RegistryError {
        RegistryError::ValidationFailed(message.to_string())
    }
}
