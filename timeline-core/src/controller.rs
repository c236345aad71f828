//! Loads the reservations shown by the timeline grid.
//!
//! The controller owns the grid's load state for one (date, reservables) key
//! at a time. The visible day is fetched in the foreground; neighbouring days
//! are warmed in the background one at a time. A fetch for a key that is no
//! longer displayed may still fill the cache, but never changes what the
//! grid shows.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use shared_types::{DaySnapshot, ReservableId, ReservationId};

use crate::api::ReservationSource;
use crate::cache::DayCache;
use crate::window::shift_days;
use crate::{ApiError, TimeWindow};

/// Day offsets warmed after the visible day is ready, in visiting order.
pub const PREFETCH_OFFSETS: [i64; 4] = [-2, -1, 1, 2];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridKey {
    pub date: NaiveDate,
    pub reservables: BTreeSet<ReservableId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum GridState {
    #[default]
    Idle,
    Loading,
    Ready(Arc<DaySnapshot>),
    Error(String),
}

impl GridState {
    pub fn is_loading(&self) -> bool {
        matches!(self, GridState::Loading)
    }

    pub fn snapshot(&self) -> Option<&Arc<DaySnapshot>> {
        match self {
            GridState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// What the grid renders: the displayed key, its load state and whether
/// neighbouring days are being fetched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridStatus {
    pub key: Option<GridKey>,
    pub state: GridState,
    pub background_loading: bool,
}

type Listener = Rc<dyn Fn(&GridStatus)>;
type DayFetch = Shared<LocalBoxFuture<'static, Result<Arc<DaySnapshot>, ApiError>>>;

#[derive(Default)]
struct Inner {
    status: GridStatus,
    in_flight: HashMap<GridKey, (u64, DayFetch)>,
    next_fetch: u64,
    // Newest fetch applied to the displayed key; older ones settle as no-ops.
    settled: Option<(GridKey, u64)>,
    listener: Option<Listener>,
}

/// Cheap to clone; clones drive the same grid.
#[derive(Clone)]
pub struct GridController {
    source: Rc<dyn ReservationSource>,
    cache: DayCache,
    window_for: fn(NaiveDate) -> TimeWindow,
    offsets: Vec<i64>,
    inner: Rc<RefCell<Inner>>,
}

impl GridController {
    pub fn new(source: Rc<dyn ReservationSource>, cache: DayCache) -> Self {
        Self {
            source,
            cache,
            window_for: TimeWindow::local_day,
            offsets: PREFETCH_OFFSETS.to_vec(),
            inner: Rc::new(RefCell::new(Inner::default())),
        }
    }

    /// Overrides how a date becomes a query window (local day by default).
    pub fn with_window(mut self, window_for: fn(NaiveDate) -> TimeWindow) -> Self {
        self.window_for = window_for;
        self
    }

    pub fn with_prefetch_offsets(mut self, offsets: Vec<i64>) -> Self {
        self.offsets = offsets;
        self
    }

    /// Called after every state or background flag change.
    pub fn on_change(&self, listener: impl Fn(&GridStatus) + 'static) {
        self.inner.borrow_mut().listener = Some(Rc::new(listener));
    }

    pub fn cache(&self) -> &DayCache {
        &self.cache
    }

    pub fn status(&self) -> GridStatus {
        self.inner.borrow().status.clone()
    }

    pub fn state(&self) -> GridState {
        self.inner.borrow().status.state.clone()
    }

    pub fn is_background_loading(&self) -> bool {
        self.inner.borrow().status.background_loading
    }

    /// Displays `date` for `reservables`, from cache when possible.
    ///
    /// Returns the state of whatever key is current when the load settles.
    pub async fn show(&self, date: NaiveDate, reservables: BTreeSet<ReservableId>) -> GridState {
        let key = GridKey { date, reservables };

        if key.reservables.is_empty() {
            self.update(|status| {
                status.key = Some(key);
                status.state = GridState::Ready(Arc::new(DaySnapshot::new()));
            });
            return self.state();
        }

        self.cache.adopt_scope(&key.reservables);
        if let Some(snapshot) = self.cache.get(date) {
            tracing::debug!(date = %date, "day cache hit");
            self.update(|status| {
                status.key = Some(key);
                status.state = GridState::Ready(snapshot);
            });
            return self.state();
        }

        self.update(|status| {
            status.key = Some(key.clone());
            status.state = GridState::Loading;
        });
        let (fetch_id, result) = self.fetch_day(&key, false).await;
        self.settle(&key, fetch_id, result);
        self.state()
    }

    /// Loads the current key again after an error.
    pub async fn retry(&self) -> GridState {
        match self.status().key {
            Some(key) => self.show(key.date, key.reservables).await,
            None => self.state(),
        }
    }

    /// Warms the cache for the days around the displayed one, one request at
    /// a time. Does nothing unless the displayed day is ready and no other
    /// prefetch is running. Failures are logged and skipped.
    pub async fn prefetch_neighbors(&self) {
        if self.is_background_loading() {
            return;
        }
        let Some(mut key) = self.ready_key() else {
            return;
        };

        self.update(|status| status.background_loading = true);
        loop {
            self.prefetch_around(&key).await;
            match self.ready_key() {
                Some(current) if current != key => {
                    tracing::debug!(date = %current.date, "prefetch superseded, restarting");
                    key = current;
                }
                _ => break,
            }
        }
        self.update(|status| status.background_loading = false);
    }

    /// Deletes a reservation starting on `date` (its local day).
    ///
    /// Drops `date` and every other cached day listing the reservation, then
    /// reloads the displayed day from the server when it was one of them. A
    /// failed delete leaves the grid and the cache untouched.
    pub async fn delete_reservation(
        &self,
        id: ReservationId,
        date: NaiveDate,
    ) -> Result<(), ApiError> {
        self.source.delete(id).await?;
        tracing::info!(reservation = %id, date = %date, "reservation deleted");

        let mut stale = self.cache.dates_holding(id);
        stale.push(date);
        let displayed = self.status().key.filter(|key| !key.reservables.is_empty());
        if let Some(key) = &displayed {
            if self.state().snapshot().is_some_and(|s| s.contains_reservation(id)) {
                stale.push(key.date);
            }
        }
        stale.sort();
        stale.dedup();
        for day in &stale {
            self.cache.invalidate(*day);
        }

        let Some(key) = displayed.filter(|key| stale.contains(&key.date)) else {
            return Ok(());
        };
        tracing::debug!(date = %key.date, "reloading displayed day after delete");
        self.update(|status| status.state = GridState::Loading);
        let (fetch_id, result) = self.fetch_day(&key, true).await;
        self.settle(&key, fetch_id, result);
        Ok(())
    }

    async fn prefetch_around(&self, key: &GridKey) {
        for &offset in &self.offsets {
            if !self.is_current(key) {
                return;
            }
            let Some(date) = shift_days(key.date, offset) else {
                continue;
            };
            if self.cache.has(date) {
                continue;
            }

            let neighbor = GridKey {
                date,
                reservables: key.reservables.clone(),
            };
            match self.fetch_day(&neighbor, false).await.1 {
                Ok(_) => tracing::debug!(date = %date, "prefetched day"),
                Err(e) => tracing::warn!(date = %date, error = %e, "background prefetch failed"),
            }
        }
    }

    /// Fetches one day, sharing a request already in flight for the same key
    /// unless `fresh` is set. Returns the id of the fetch that answered.
    async fn fetch_day(
        &self,
        key: &GridKey,
        fresh: bool,
    ) -> (u64, Result<Arc<DaySnapshot>, ApiError>) {
        let (fetch_id, fetch) = {
            let inner = &mut *self.inner.borrow_mut();
            let existing = if fresh {
                None
            } else {
                inner.in_flight.get(key).cloned()
            };
            match existing {
                Some(entry) => {
                    tracing::debug!(date = %key.date, "joining in-flight fetch");
                    entry
                }
                None => {
                    inner.next_fetch += 1;
                    let entry = (inner.next_fetch, self.start_fetch(key));
                    inner.in_flight.insert(key.clone(), entry.clone());
                    entry
                }
            }
        };

        let result = fetch.await;

        let mut inner = self.inner.borrow_mut();
        if inner.in_flight.get(key).map(|(id, _)| *id) == Some(fetch_id) {
            inner.in_flight.remove(key);
        }
        (fetch_id, result)
    }

    fn start_fetch(&self, key: &GridKey) -> DayFetch {
        let source = Rc::clone(&self.source);
        let cache = self.cache.clone();
        let ticket = cache.ticket(key.date);
        let window = (self.window_for)(key.date);
        let reservables = key.reservables.clone();

        async move {
            tracing::info!(date = %ticket.date(), reservables = reservables.len(), "fetching day");
            let snapshot = Arc::new(source.fetch_day(&window, &reservables).await?);
            cache.store(ticket, Arc::clone(&snapshot));
            Ok(snapshot)
        }
        .boxed_local()
        .shared()
    }

    fn settle(&self, key: &GridKey, fetch_id: u64, result: Result<Arc<DaySnapshot>, ApiError>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.status.key.as_ref() != Some(key) {
                tracing::debug!(date = %key.date, "ignoring result for a day no longer displayed");
                return;
            }
            if matches!(&inner.settled, Some((shown, latest)) if shown == key && *latest > fetch_id) {
                tracing::debug!(date = %key.date, fetch = fetch_id, "ignoring result of an older fetch");
                return;
            }
            inner.settled = Some((key.clone(), fetch_id));
        }
        match result {
            Ok(snapshot) => self.update(|status| status.state = GridState::Ready(snapshot)),
            Err(e) => {
                tracing::error!(date = %key.date, error = %e, "failed to load reservations");
                self.update(|status| status.state = GridState::Error(e.user_message()));
            }
        }
    }

    fn is_current(&self, key: &GridKey) -> bool {
        self.inner.borrow().status.key.as_ref() == Some(key)
    }

    fn ready_key(&self) -> Option<GridKey> {
        let inner = self.inner.borrow();
        match (&inner.status.key, &inner.status.state) {
            (Some(key), GridState::Ready(_)) if !key.reservables.is_empty() => Some(key.clone()),
            _ => None,
        }
    }

    fn update(&self, change: impl FnOnce(&mut GridStatus)) {
        let (listener, status) = {
            let mut inner = self.inner.borrow_mut();
            change(&mut inner.status);
            (inner.listener.clone(), inner.status.clone())
        };
        if let Some(listener) = listener {
            listener(&status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use futures::channel::oneshot;
    use shared_types::Reservation;
    use std::collections::HashSet;

    #[derive(Default)]
    struct FakeSource {
        calls: RefCell<Vec<NaiveDate>>,
        deletes: RefCell<Vec<ReservationId>>,
        data: RefCell<HashMap<NaiveDate, DaySnapshot>>,
        failing: RefCell<HashSet<NaiveDate>>,
        gates: RefCell<HashMap<NaiveDate, oneshot::Receiver<()>>>,
        delete_fails: RefCell<bool>,
    }

    impl FakeSource {
        fn calls(&self) -> Vec<NaiveDate> {
            self.calls.borrow().clone()
        }

        fn gate(&self, date: NaiveDate) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().insert(date, rx);
            tx
        }
    }

    #[async_trait(?Send)]
    impl ReservationSource for FakeSource {
        async fn fetch_day(
            &self,
            window: &TimeWindow,
            ids: &BTreeSet<ReservableId>,
        ) -> Result<DaySnapshot, ApiError> {
            if ids.is_empty() {
                return Err(ApiError::InvalidArgument("no ids".to_string()));
            }
            let date = window.start().date_naive();
            self.calls.borrow_mut().push(date);

            // Answers with the data as it was when the request arrived.
            let failed = self.failing.borrow().contains(&date);
            let answer = self.data.borrow().get(&date).cloned().unwrap_or_default();

            let gate = self.gates.borrow_mut().remove(&date);
            if let Some(gate) = gate {
                let _ = gate.await;
            }

            if failed {
                return Err(ApiError::Remote {
                    status: 500,
                    message: "server exploded".to_string(),
                });
            }
            Ok(answer)
        }

        async fn delete(&self, id: ReservationId) -> Result<(), ApiError> {
            if *self.delete_fails.borrow() {
                return Err(ApiError::Remote {
                    status: 403,
                    message: "not allowed".to_string(),
                });
            }
            self.deletes.borrow_mut().push(id);
            Ok(())
        }
    }

    fn utc_day(date: NaiveDate) -> TimeWindow {
        TimeWindow::day_in(date, &Utc)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn ids(raw: &[i64]) -> BTreeSet<ReservableId> {
        raw.iter().copied().map(ReservableId).collect()
    }

    fn snapshot_with(reservable: i64, reservation: i64) -> DaySnapshot {
        let r: Reservation = serde_json::from_value(serde_json::json!({
            "id": reservation,
            "start": "2024-05-06T09:00:00Z",
            "end": "2024-05-06T10:00:00Z",
        }))
        .unwrap();
        [(ReservableId(reservable), vec![r])].into_iter().collect()
    }

    fn controller(source: &Rc<FakeSource>) -> GridController {
        let source: Rc<dyn ReservationSource> = source.clone();
        GridController::new(source, DayCache::new()).with_window(utc_day)
    }

    #[tokio::test]
    async fn uncached_day_costs_one_call_and_then_none() {
        let source = Rc::new(FakeSource::default());
        source.data.borrow_mut().insert(day(6), snapshot_with(1, 10));
        let grid = controller(&source);

        let state = grid.show(day(6), ids(&[1, 2])).await;
        assert_eq!(state.snapshot().unwrap().reservation_count(), 1);
        assert_eq!(source.calls(), vec![day(6)]);

        grid.show(day(6), ids(&[1, 2])).await;
        assert_eq!(source.calls(), vec![day(6)]);
        assert!(grid.cache().has(day(6)));
    }

    #[tokio::test]
    async fn cache_hit_skips_loading_state() {
        let source = Rc::new(FakeSource::default());
        let grid = controller(&source);
        grid.show(day(6), ids(&[1])).await;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        grid.on_change(move |status| log.borrow_mut().push(status.state.is_loading()));

        grid.show(day(7), ids(&[1])).await;
        assert_eq!(*seen.borrow(), vec![true, false]);

        seen.borrow_mut().clear();
        grid.show(day(6), ids(&[1])).await;
        assert_eq!(*seen.borrow(), vec![false]);
    }

    #[tokio::test]
    async fn empty_selection_needs_no_request() {
        let source = Rc::new(FakeSource::default());
        let grid = controller(&source);

        let state = grid.show(day(6), BTreeSet::new()).await;
        assert!(state.snapshot().unwrap().is_empty());
        assert!(source.calls().is_empty());

        grid.prefetch_neighbors().await;
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn failure_shows_error_and_leaves_cache_empty() {
        let source = Rc::new(FakeSource::default());
        source.failing.borrow_mut().insert(day(6));
        let grid = controller(&source);

        let state = grid.show(day(6), ids(&[1])).await;
        assert_eq!(state, GridState::Error("server exploded".to_string()));
        assert!(!grid.cache().has(day(6)));

        grid.prefetch_neighbors().await;
        assert_eq!(source.calls(), vec![day(6)]);

        source.failing.borrow_mut().clear();
        assert!(grid.retry().await.snapshot().is_some());
        assert_eq!(source.calls(), vec![day(6), day(6)]);
    }

    #[tokio::test]
    async fn prefetch_visits_neighbors_in_order_and_skips_cached() {
        let source = Rc::new(FakeSource::default());
        let grid = controller(&source);
        grid.show(day(10), ids(&[1])).await;
        grid.cache().set(day(11), Arc::new(DaySnapshot::new()));

        grid.prefetch_neighbors().await;

        assert_eq!(source.calls(), vec![day(10), day(8), day(9), day(12)]);
        assert!(!grid.is_background_loading());
        for d in [8, 9, 11, 12] {
            assert!(grid.cache().has(day(d)));
        }
    }

    #[tokio::test]
    async fn prefetch_failures_are_swallowed() {
        let source = Rc::new(FakeSource::default());
        source.failing.borrow_mut().insert(day(9));
        let grid = controller(&source);
        grid.show(day(10), ids(&[1])).await;

        let flags = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&flags);
        grid.on_change(move |status| log.borrow_mut().push(status.background_loading));

        grid.prefetch_neighbors().await;

        assert_eq!(*flags.borrow(), vec![true, false]);
        assert!(grid.state().snapshot().is_some());
        assert!(!grid.cache().has(day(9)));
        assert!(grid.cache().has(day(12)));
    }

    #[tokio::test]
    async fn stale_result_does_not_replace_newer_day() {
        let source = Rc::new(FakeSource::default());
        source.data.borrow_mut().insert(day(6), snapshot_with(1, 60));
        source.data.borrow_mut().insert(day(7), snapshot_with(1, 70));
        let release = source.gate(day(6));
        let grid = controller(&source);

        futures::join!(grid.show(day(6), ids(&[1])), async {
            grid.show(day(7), ids(&[1])).await;
            let _ = release.send(());
        });

        let status = grid.status();
        assert_eq!(status.key.unwrap().date, day(7));
        let shown = status.state.snapshot().unwrap().for_reservable(ReservableId(1))[0].id;
        assert_eq!(shown, ReservationId(70));
        assert!(grid.cache().has(day(6)));
    }

    #[tokio::test]
    async fn foreground_joins_background_fetch_for_same_day() {
        let source = Rc::new(FakeSource::default());
        let grid = controller(&source);
        grid.show(day(10), ids(&[1])).await;
        let release = source.gate(day(8));

        futures::join!(
            grid.prefetch_neighbors(),
            grid.show(day(8), ids(&[1])),
            async {
                tokio::task::yield_now().await;
                let _ = release.send(());
            }
        );

        let calls_for_day_8 = source.calls().iter().filter(|d| **d == day(8)).count();
        assert_eq!(calls_for_day_8, 1);
        assert_eq!(grid.status().key.unwrap().date, day(8));
        assert!(grid.state().snapshot().is_some());
        assert!(!grid.is_background_loading());
    }

    #[tokio::test]
    async fn prefetch_restarts_for_a_new_day() {
        let source = Rc::new(FakeSource::default());
        let grid = controller(&source);
        grid.show(day(10), ids(&[1])).await;
        let release = source.gate(day(8));

        futures::join!(grid.prefetch_neighbors(), async {
            tokio::task::yield_now().await;
            grid.show(day(20), ids(&[1])).await;
            let _ = release.send(());
        });

        assert_eq!(
            source.calls(),
            vec![day(10), day(8), day(20), day(18), day(19), day(21), day(22)]
        );
        assert_eq!(grid.status().key.unwrap().date, day(20));
        assert!(!grid.is_background_loading());
    }

    #[tokio::test]
    async fn delete_refetches_the_displayed_day() {
        let source = Rc::new(FakeSource::default());
        source.data.borrow_mut().insert(day(6), snapshot_with(1, 10));
        let grid = controller(&source);
        grid.show(day(6), ids(&[1])).await;

        source.data.borrow_mut().insert(day(6), DaySnapshot::new());
        grid.delete_reservation(ReservationId(10), day(6)).await.unwrap();

        assert_eq!(*source.deletes.borrow(), vec![ReservationId(10)]);
        assert_eq!(source.calls(), vec![day(6), day(6)]);
        assert!(grid.state().snapshot().unwrap().is_empty());
        assert!(grid.cache().get(day(6)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_drops_the_reservation_day_while_another_is_shown() {
        let source = Rc::new(FakeSource::default());
        source.data.borrow_mut().insert(day(6), snapshot_with(1, 10));
        let grid = controller(&source);
        grid.show(day(6), ids(&[1])).await;
        grid.show(day(7), ids(&[1])).await;

        source.data.borrow_mut().insert(day(6), DaySnapshot::new());
        grid.delete_reservation(ReservationId(10), day(6)).await.unwrap();

        assert!(!grid.cache().has(day(6)));
        assert!(grid.cache().has(day(7)));
        assert_eq!(source.calls(), vec![day(6), day(7)]);

        let state = grid.show(day(6), ids(&[1])).await;
        assert!(state.snapshot().unwrap().is_empty());
        assert_eq!(source.calls(), vec![day(6), day(7), day(6)]);
    }

    #[tokio::test]
    async fn delete_reloads_a_shown_day_that_lists_the_reservation() {
        let source = Rc::new(FakeSource::default());
        source.data.borrow_mut().insert(day(7), snapshot_with(1, 10));
        let grid = controller(&source);
        grid.show(day(7), ids(&[1])).await;

        source.data.borrow_mut().insert(day(7), DaySnapshot::new());
        grid.delete_reservation(ReservationId(10), day(6)).await.unwrap();

        assert_eq!(source.calls(), vec![day(7), day(7)]);
        assert!(grid.state().snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn older_fetch_cannot_bring_back_a_deleted_reservation() {
        let source = Rc::new(FakeSource::default());
        source.data.borrow_mut().insert(day(6), snapshot_with(1, 10));
        let release = source.gate(day(6));
        let grid = controller(&source);

        futures::join!(grid.show(day(6), ids(&[1])), async {
            source.data.borrow_mut().insert(day(6), DaySnapshot::new());
            grid.delete_reservation(ReservationId(10), day(6)).await.unwrap();
            let _ = release.send(());
        });

        assert_eq!(source.calls(), vec![day(6), day(6)]);
        assert!(grid.state().snapshot().unwrap().is_empty());
        assert!(grid.cache().get(day(6)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_grid() {
        let source = Rc::new(FakeSource::default());
        *source.delete_fails.borrow_mut() = true;
        let grid = controller(&source);
        grid.show(day(6), ids(&[1])).await;
        let before = grid.status();

        let err = grid
            .delete_reservation(ReservationId(10), day(6))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "not allowed");
        assert_eq!(grid.status(), before);
        assert_eq!(source.calls(), vec![day(6)]);
    }

    #[tokio::test]
    async fn widening_the_selection_refetches() {
        let source = Rc::new(FakeSource::default());
        let grid = controller(&source);

        grid.show(day(6), ids(&[1, 2])).await;
        grid.show(day(6), ids(&[2])).await;
        assert_eq!(source.calls().len(), 1);

        grid.show(day(6), ids(&[2, 3])).await;
        assert_eq!(source.calls().len(), 2);
    }
}
