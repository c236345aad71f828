use std::collections::{BTreeSet, HashMap};
use std::future::Future;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use shared_types::{DaySnapshot, Reservation, ReservableId, ReservationId};
use url::Url;

use super::{endpoint, expect_success, ApiClient};
use crate::{ApiError, FetchStrategy, TimeWindow};

/// Where the grid controller gets its reservations from.
///
/// `?Send` because in the browser the futures are driven by a single-threaded
/// executor and hold non-`Send` fetch handles.
#[async_trait(?Send)]
pub trait ReservationSource {
    /// Reservations overlapping `window` for every id in `ids`.
    async fn fetch_day(
        &self,
        window: &TimeWindow,
        ids: &BTreeSet<ReservableId>,
    ) -> Result<DaySnapshot, ApiError>;

    async fn delete(&self, id: ReservationId) -> Result<(), ApiError>;
}

#[derive(Deserialize)]
struct ReservationsResponse {
    #[serde(default)]
    results: Vec<Reservation>,
}

impl ApiClient {
    /// Reservations of a single reservable within `window`.
    pub async fn fetch_one(
        &self,
        window: &TimeWindow,
        id: ReservableId,
    ) -> Result<Vec<Reservation>, ApiError> {
        let mut url = self.endpoint(&["reservations"])?;
        url.query_pairs_mut()
            .append_pair("start", &window.start_param())
            .append_pair("end", &window.end_param())
            .append_pair("reservables", &id.to_string());
        let response: ReservationsResponse = self.get_json(url).await?;
        Ok(response.results)
    }

    /// Reservations of several reservables in one round trip.
    pub async fn fetch_bulk(
        &self,
        window: &TimeWindow,
        ids: &BTreeSet<ReservableId>,
    ) -> Result<DaySnapshot, ApiError> {
        let url = bulk_url(&self.config().base_url, window, ids)?;
        let grouped: HashMap<ReservableId, Vec<Reservation>> = self.get_json(url).await?;
        let snapshot: DaySnapshot = grouped.into_iter().collect();
        tracing::info!(
            reservables = ids.len(),
            reservations = snapshot.reservation_count(),
            start = %window.start(),
            "fetched reservations in bulk"
        );
        Ok(snapshot)
    }

    /// Concurrent `fetch_one` per reservable. A failing reservable is logged
    /// and shows up with no reservations.
    pub async fn fetch_each(
        &self,
        window: &TimeWindow,
        ids: &BTreeSet<ReservableId>,
    ) -> DaySnapshot {
        fan_out(ids, |id| self.fetch_one(window, id)).await
    }

    pub async fn delete_reservation(&self, id: ReservationId) -> Result<(), ApiError> {
        let url = self.endpoint(&["reservations", &id.to_string()])?;
        tracing::info!(reservation = %id, "deleting reservation");
        let response = self.http.delete(url).send().await?;
        expect_success(response).await
    }
}

#[async_trait(?Send)]
impl ReservationSource for ApiClient {
    async fn fetch_day(
        &self,
        window: &TimeWindow,
        ids: &BTreeSet<ReservableId>,
    ) -> Result<DaySnapshot, ApiError> {
        match self.config().strategy {
            FetchStrategy::Bulk => self.fetch_bulk(window, ids).await,
            FetchStrategy::PerReservable => Ok(self.fetch_each(window, ids).await),
        }
    }

    async fn delete(&self, id: ReservationId) -> Result<(), ApiError> {
        self.delete_reservation(id).await
    }
}

fn bulk_url(
    base: &Url,
    window: &TimeWindow,
    ids: &BTreeSet<ReservableId>,
) -> Result<Url, ApiError> {
    if ids.is_empty() {
        return Err(ApiError::InvalidArgument(
            "bulk query needs at least one reservable id".to_string(),
        ));
    }
    let mut url = endpoint(base, &["reservations", "bulk"])?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("start", &window.start_param())
            .append_pair("end", &window.end_param());
        for id in ids {
            query.append_pair("reservable_ids[]", &id.to_string());
        }
    }
    Ok(url)
}

/// Runs `fetch` for every id concurrently and joins the results in input
/// order. Failures degrade to an empty list for that id.
pub async fn fan_out<'a, I, F, Fut>(ids: I, fetch: F) -> DaySnapshot
where
    I: IntoIterator<Item = &'a ReservableId>,
    F: Fn(ReservableId) -> Fut,
    Fut: Future<Output = Result<Vec<Reservation>, ApiError>>,
{
    let requests = ids.into_iter().copied().map(|id| {
        let request = fetch(id);
        async move {
            match request.await {
                Ok(reservations) => (id, reservations),
                Err(e) => {
                    tracing::warn!(reservable = %id, error = %e, "reservation fetch failed, showing none");
                    (id, Vec::new())
                }
            }
        }
    });

    join_all(requests).await.into_iter().collect()
}
