use serde::Deserialize;
use shared_types::{
    ClassroomResources, Page, ReservableDetail, ReservableId, ReservableObject, ReservableSet,
    ReservableType,
};
use url::Url;

use super::ApiClient;
use crate::ApiError;

#[derive(Deserialize)]
struct SetsResponse {
    results: Vec<ReservableSet>,
}

impl ApiClient {
    pub async fn fetch_sets(&self) -> Result<Vec<ReservableSet>, ApiError> {
        let url = self.endpoint(&["sets"])?;
        let response: SetsResponse = self.get_json(url).await?;
        Ok(response.results)
    }

    /// One page of reservables. `cursor` is a `next`/`previous` link from an
    /// earlier page.
    pub async fn fetch_by_type_page(
        &self,
        set: &str,
        kind: ReservableType,
        cursor: Option<&str>,
    ) -> Result<Page<ReservableObject>, ApiError> {
        let mut url = self.endpoint(&["sets", set, "types", kind.as_str(), "reservables"])?;
        if let Some(cursor) = cursor {
            let query = cursor_query(&url, cursor)?;
            url.set_query(query.as_deref());
        }
        self.get_json(url).await
    }

    /// Every reservable of `kind` in `set`, following `next` links until the
    /// last page. Any failing page fails the whole call.
    pub async fn fetch_all_by_type(
        &self,
        set: &str,
        kind: ReservableType,
    ) -> Result<Vec<ReservableObject>, ApiError> {
        let limit = self.config().max_catalog_pages;
        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            if pages == limit {
                tracing::warn!(set, kind = %kind, limit, "catalog page limit reached");
                return Err(ApiError::PageLimit(limit));
            }
            let page = self
                .fetch_by_type_page(set, kind, cursor.as_deref())
                .await?;
            pages += 1;
            objects.extend(page.results);

            match page.next {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }

        tracing::info!(set, kind = %kind, count = objects.len(), pages, "fetched catalog");
        Ok(objects)
    }

    pub async fn fetch_reservable(&self, id: ReservableId) -> Result<ReservableDetail, ApiError> {
        let url = self.endpoint(&["reservables", &id.to_string()])?;
        self.get_json(url).await
    }

    pub async fn fetch_classroom_resources(&self) -> Result<ClassroomResources, ApiError> {
        let url = self.endpoint(&["classroom-resources"])?;
        self.get_json(url).await
    }
}

/// Pagination links point at the upstream host; only their query string
/// (`page=3`, `limit=..&offset=..`) is carried over to our own endpoint.
fn cursor_query(base: &Url, cursor: &str) -> Result<Option<String>, ApiError> {
    let cursor = base.join(cursor)?;
    Ok(cursor.query().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::serve;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    /// Three classroom pages whose `next` links point at the upstream host.
    fn paged_backend() -> Router {
        Router::new()
            .route(
                "/api/sets/s/types/classroom/reservables/",
                get(|Query(query): Query<HashMap<String, String>>| async move {
                    let page: i64 = query
                        .get("page")
                        .and_then(|raw| raw.parse().ok())
                        .unwrap_or(1);
                    let next = (page < 3).then(|| {
                        format!(
                            "https://upstream.example/api/sets/s/types/classroom/reservables/?page={}",
                            page + 1
                        )
                    });
                    Json(json!({
                        "count": 3,
                        "next": next,
                        "previous": null,
                        "results": [{"id": page, "name": format!("P{}", page)}]
                    }))
                }),
            )
            .route(
                "/api/classroom-resources/",
                get(|| async {
                    Json(json!({
                        "resources": [{"id": 1, "name": "seats"}, {"id": 2, "name": "projectors"}],
                        "reservable_table": [["P1", [120, 2]], ["P2", [40, 1]]]
                    }))
                }),
            )
    }

    #[tokio::test]
    async fn all_pages_are_followed_through_upstream_links() {
        let client = ApiClient::new(serve(paged_backend()).await);

        let objects = client
            .fetch_all_by_type("s", ReservableType::Classroom)
            .await
            .unwrap();
        let ids: Vec<_> = objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![ReservableId(1), ReservableId(2), ReservableId(3)]);
    }

    #[tokio::test]
    async fn configured_page_limit_stops_the_walk() {
        let config = serve(paged_backend()).await.with_max_catalog_pages(2);
        let client = ApiClient::new(config);

        let err = client
            .fetch_all_by_type("s", ReservableType::Classroom)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::PageLimit(2));
    }

    #[tokio::test]
    async fn classroom_resources_decode() {
        let client = ApiClient::new(serve(paged_backend()).await);

        let table = client.fetch_classroom_resources().await.unwrap();
        assert_eq!(table.resources[1].name, "projectors");
        assert_eq!(table.reservable_table[1], ("P2".to_string(), vec![40, 1]));
    }

    #[test]
    fn absolute_cursor_keeps_only_its_query() {
        let base = Url::parse("http://localhost:3000/api/sets/s/types/classroom/reservables/")
            .unwrap();
        let query = cursor_query(
            &base,
            "https://upstream.example/sets/s/types/classroom/reservables/?format=json&page=3",
        )
        .unwrap();
        assert_eq!(query.as_deref(), Some("format=json&page=3"));
    }

    #[test]
    fn relative_cursor_is_resolved() {
        let base = Url::parse("http://localhost:3000/api/sets/s/types/vehicle/reservables/")
            .unwrap();
        assert_eq!(
            cursor_query(&base, "?page=2").unwrap().as_deref(),
            Some("page=2")
        );
        assert_eq!(cursor_query(&base, "other/").unwrap(), None);
    }

    #[test]
    fn page_payload_parses() {
        let body = r#"{
            "count": 3,
            "next": "https://upstream.example/api/sets/s/types/classroom/reservables/?page=2",
            "previous": null,
            "results": [{"id": 1, "name": "Predavalnica 1", "slug": "P1"}]
        }"#;
        let page: Page<ReservableObject> = serde_json::from_str(body).unwrap();
        assert_eq!(page.count, 3);
        assert!(page.previous.is_none());
        assert_eq!(page.results[0].id, ReservableId(1));
    }
}
