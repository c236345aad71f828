//! Per-day store of bulk reservation results.
//!
//! Entries are authoritative until invalidated. The cache also remembers the
//! set of reservables its entries were fetched for (its scope): every entry
//! covers at least the current scope, so narrowing the selection keeps the
//! cache and widening it clears the cache.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use chrono::NaiveDate;
use shared_types::{DaySnapshot, ReservableId, ReservationId};

/// Handle to a day cache. Clones share the same storage; meant for a single
/// event loop.
#[derive(Debug, Clone, Default)]
pub struct DayCache {
    inner: Rc<RefCell<CacheInner>>,
}

#[derive(Debug, Default)]
struct CacheInner {
    days: HashMap<NaiveDate, Arc<DaySnapshot>>,
    scope: BTreeSet<ReservableId>,
    scope_generation: u64,
    epochs: HashMap<NaiveDate, u64>,
}

/// Captured before a fetch starts; [`DayCache::store`] rejects the result
/// when the scope or that date was reset in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTicket {
    date: NaiveDate,
    scope_generation: u64,
    epoch: u64,
}

impl CacheTicket {
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl DayCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, date: NaiveDate) -> bool {
        self.inner.borrow().days.contains_key(&date)
    }

    pub fn get(&self, date: NaiveDate) -> Option<Arc<DaySnapshot>> {
        self.inner.borrow().days.get(&date).cloned()
    }

    pub fn set(&self, date: NaiveDate, snapshot: Arc<DaySnapshot>) {
        self.inner.borrow_mut().days.insert(date, snapshot);
    }

    /// Drops the entry for `date` and turns away in-flight results for it.
    pub fn invalidate(&self, date: NaiveDate) {
        let mut inner = self.inner.borrow_mut();
        inner.days.remove(&date);
        *inner.epochs.entry(date).or_default() += 1;
        tracing::debug!(date = %date, "day cache entry invalidated");
    }

    /// Cached days whose snapshot lists reservation `id`. A reservation
    /// crossing midnight shows up under both days.
    pub fn dates_holding(&self, id: ReservationId) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .inner
            .borrow()
            .days
            .iter()
            .filter(|(_, snapshot)| snapshot.contains_reservation(id))
            .map(|(date, _)| *date)
            .collect();
        dates.sort();
        dates
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.days.clear();
        inner.scope_generation += 1;
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scope(&self) -> BTreeSet<ReservableId> {
        self.inner.borrow().scope.clone()
    }

    /// Makes `ids` the scope. Entries survive when `ids` is a subset of the
    /// old scope; otherwise the cache is cleared. Returns whether it was.
    pub fn adopt_scope(&self, ids: &BTreeSet<ReservableId>) -> bool {
        let mut inner = self.inner.borrow_mut();
        let cleared = !ids.is_subset(&inner.scope) && !inner.days.is_empty();
        if !ids.is_subset(&inner.scope) {
            inner.days.clear();
            inner.scope_generation += 1;
        }
        inner.scope = ids.clone();
        if cleared {
            tracing::debug!(reservables = ids.len(), "selection widened, day cache cleared");
        }
        cleared
    }

    pub fn ticket(&self, date: NaiveDate) -> CacheTicket {
        let inner = self.inner.borrow();
        CacheTicket {
            date,
            scope_generation: inner.scope_generation,
            epoch: inner.epochs.get(&date).copied().unwrap_or_default(),
        }
    }

    /// Stores a fetch result unless its ticket went stale. Returns whether it
    /// was written.
    pub fn store(&self, ticket: CacheTicket, snapshot: Arc<DaySnapshot>) -> bool {
        let mut inner = self.inner.borrow_mut();
        let epoch = inner.epochs.get(&ticket.date).copied().unwrap_or_default();
        if ticket.scope_generation != inner.scope_generation || ticket.epoch != epoch {
            tracing::debug!(date = %ticket.date, "discarding stale fetch result");
            return false;
        }
        inner.days.insert(ticket.date, snapshot);
        true
    }
}
