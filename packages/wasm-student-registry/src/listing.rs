//! Bulk listing of a range of students
//!
//! A fetch reads the identifiers of an index range, then fans out one
//! detail read per identifier. Results keep the contract's index order
//! and drop entries whose existence flag is false. A fetch either
//! publishes a complete list or nothing.

use crate::error::RegistryError;
use crate::gateway::RecordGateway;
use crate::types::{ListingQuery, Record};
use futures::future::try_join_all;
use log::{debug, log_enabled, trace, Level};
use std::cell::{Cell, RefCell};

#[derive(Default)]
pub struct ListingCoordinator {
    current: RefCell<Option<ListingQuery>>,
    displayed: Cell<Option<(u64, u64)>>,
    generation: Cell<u64>,
    loading: Cell<bool>,
}

impl ListingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last published listing
    pub fn current(&self) -> Option<ListingQuery> {
        self.current.borrow().clone()
    }

    /// Range of the last requested fetch
    pub fn displayed_range(&self) -> Option<(u64, u64)> {
        self.displayed.get()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Fetch the existing records between `start` and `end`; the boundary
    /// convention is the contract's.
    ///
    /// The previous listing is discarded as soon as the fetch starts. When a
    /// newer fetch begins before this one completes, this one still returns
    /// its result but does not publish it.
    pub async fn fetch_range(
        &self,
        gateway: &RecordGateway,
        start: u64,
        end: u64,
    ) -> Result<ListingQuery, RegistryError> {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.displayed.set(Some((start, end)));
        *self.current.borrow_mut() = None;
        self.loading.set(true);

        let result = Self::load(gateway, start, end).await.map_err(|e| {
            RegistryError::QueryFailed(format!(
                "failed to load students {} to {}: {}",
                start,
                end,
                e.raw_reason()
            ))
        });

        if self.generation.get() == generation {
            self.loading.set(false);
            if let Ok(query) = &result {
                *self.current.borrow_mut() = Some(query.clone());
            }
        } else {
            debug!("Listing {}..{} superseded, not publishing", start, end);
        }
        result
    }

    /// Re-run the fetch for the currently displayed range, if any
    pub async fn refresh(
        &self,
        gateway: &RecordGateway,
    ) -> Result<Option<ListingQuery>, RegistryError> {
        match self.displayed.get() {
            Some((start, end)) => self.fetch_range(gateway, start, end).await.map(Some),
            None => Ok(None),
        }
    }

    async fn load(
        gateway: &RecordGateway,
        start: u64,
        end: u64,
    ) -> Result<ListingQuery, RegistryError> {
        let ids = gateway.get_students_in_range(start, end).await?;
        trace!("range {}..{} holds {} ids", start, end, ids.len());

        let details = try_join_all(ids.iter().map(|id| gateway.get_student(*id))).await?;
        let records: Vec<Record> = details.into_iter().filter(|r| r.exists).collect();

        if log_enabled!(Level::Debug) {
            let shown: Vec<u64> = records.iter().map(|r| r.id).collect();
            debug!("Listing {}..{}: {:?} of {:?}", start, end, shown, ids);
        }
        Ok(ListingQuery {
            start,
            end,
            records,
        })
    }
}
