use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_query_map;
use shared_types::{Reservation, ReservableObject, ReservableSet, ReservableType};
use thaw::{Button, ButtonAppearance};
use timeline_core::config::DEFAULT_API_URL;
use timeline_core::selection::{ids_of, sort_for_display, visible_reservables};
use timeline_core::window::parse_day_key;
use timeline_core::{
    ApiClient, ApiError, ClientConfig, ClientSettings, DayCache, GridController, ReservationDraft,
    Selection,
};

use super::filter_controls::FilterControls;
use super::reservable_selector::ReservableSelector;
use super::timeline_grid::TimelineGrid;
use crate::components::draft_panel::DraftPanel;
use crate::components::error::ErrorView;
use crate::components::loading::LoadingView;
use crate::components::reservation_modal::ReservationModal;
use crate::server::client_settings;
use crate::utils::dates::today;
use crate::utils::labels::{label, Lang};

pub const DEFAULT_SET: &str = "rezervacije_fri";

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogState {
    Loading,
    Ready(Vec<ReservableObject>),
    Failed(String),
}

#[component]
pub fn ReservationsPage() -> impl IntoView {
    let (lang, set_lang) = signal(Lang::default());

    // The workspace owns browser-only state; mount it after hydration, once
    // the server has said how to fetch.
    let settings = RwSignal::new(None::<ClientSettings>);
    Effect::new(move |_| {
        spawn_local(async move {
            let loaded = match client_settings().await {
                Ok(loaded) => loaded,
                Err(e) => {
                    tracing::warn!(error = %e, "could not load fetch settings, using defaults");
                    ClientSettings::default()
                }
            };
            settings.set(Some(loaded));
        });
    });

    view! {
        <div class="reservations-page">
            <header class="page-header">
                <h1>{move || label(lang.get(), "app.title")}</h1>
                <Button
                    appearance=ButtonAppearance::Subtle
                    on_click=move |_| set_lang.update(|lang| *lang = lang.other())
                >
                    {move || lang.get().other().code().to_uppercase()}
                </Button>
            </header>
            <Show
                when=move || settings.with(Option::is_some)
                fallback=move || view! { <LoadingView message=label(lang.get(), "grid.loading") /> }
            >
                <TimelineWorkspace lang=lang settings=settings.get_untracked().unwrap_or_default() />
            </Show>
        </div>
    }
}

/// API base of the page's own origin; the server proxies `/api` upstream.
fn browser_config(settings: ClientSettings) -> Result<ClientConfig, ApiError> {
    let base = web_sys::window()
        .and_then(|window| window.location().origin().ok())
        .map(|origin| format!("{}/api/", origin.trim_end_matches('/')))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    Ok(ClientConfig::new(&base)?.with_settings(settings))
}

#[component]
fn TimelineWorkspace(lang: ReadSignal<Lang>, settings: ClientSettings) -> impl IntoView {
    let query = use_query_map();
    let date = Memo::new(move |_| {
        query
            .read()
            .get("date")
            .and_then(|raw| parse_day_key(&raw))
            .unwrap_or_else(today)
    });

    let config = match browser_config(settings) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "cannot build the API address");
            return view! {
                <ErrorView title=label(lang.get_untracked(), "grid.error_title") message=e.user_message() />
            }
            .into_any();
        }
    };
    let client = ApiClient::new(config);
    let controller = GridController::new(Rc::new(client.clone()), DayCache::new());
    let status = RwSignal::new(controller.status());
    controller.on_change(move |next| status.set(next.clone()));
    let grid = StoredValue::new_local(controller);
    let client = StoredValue::new_local(client);

    let sets = RwSignal::new(Vec::<ReservableSet>::new());
    let selected_set = RwSignal::new(DEFAULT_SET.to_string());
    let selected_type = RwSignal::new(ReservableType::Classroom);
    let catalog = RwSignal::new(CatalogState::Loading);
    let catalog_attempt = RwSignal::new(0u32);
    let selection = RwSignal::new(Selection::new());
    let search = RwSignal::new(String::new());
    let active = RwSignal::new(None::<Reservation>);
    let draft = RwSignal::new(None::<ReservationDraft>);

    spawn_local(async move {
        match client.get_value().fetch_sets().await {
            Ok(list) => sets.set(list),
            Err(e) => tracing::warn!(error = %e, "could not load reservable sets"),
        }
    });

    Effect::new(move |_| {
        let set = selected_set.get();
        let kind = selected_type.get();
        catalog_attempt.track();

        selection.set(Selection::new());
        search.set(String::new());
        draft.set(None);
        catalog.set(CatalogState::Loading);

        spawn_local(async move {
            let result = client.get_value().fetch_all_by_type(&set, kind).await;
            if selected_set.get_untracked() != set || selected_type.get_untracked() != kind {
                tracing::debug!(set = %set, kind = %kind, "ignoring catalog for a previous filter");
                return;
            }
            match result {
                Ok(mut objects) => {
                    sort_for_display(&mut objects, kind);
                    catalog.set(CatalogState::Ready(objects));
                }
                Err(e) => {
                    tracing::error!(set = %set, kind = %kind, error = %e, "failed to load catalog");
                    catalog.set(CatalogState::Failed(e.user_message()));
                }
            }
        });
    });

    let rows = Signal::derive(move || {
        catalog.with(|state| match state {
            CatalogState::Ready(objects) => selection.with(|s| visible_reservables(objects, s)),
            _ => Vec::new(),
        })
    });

    Effect::new(move |_| {
        let day = date.get();
        let ready = catalog.with(|state| matches!(state, CatalogState::Ready(_)));
        if !ready {
            return;
        }
        let reservables = rows.with(|rows| ids_of(rows));
        spawn_local(async move {
            let grid = grid.get_value();
            grid.show(day, reservables).await;
            grid.prefetch_neighbors().await;
        });
    });

    let retry_grid = Callback::new(move |_| {
        spawn_local(async move {
            let grid = grid.get_value();
            grid.retry().await;
            grid.prefetch_neighbors().await;
        });
    });
    let retry_catalog = Callback::new(move |_| catalog_attempt.update(|n| *n += 1));

    let draft_name = Signal::derive(move || {
        let kind = selected_type.get();
        let target = draft.with(|d| d.as_ref().and_then(|d| d.reservable));
        catalog.with(|state| match (state, target) {
            (CatalogState::Ready(objects), Some(id)) => objects
                .iter()
                .find(|object| object.id == id)
                .map(|object| object.display_name(kind).to_string())
                .unwrap_or_default(),
            _ => String::new(),
        })
    });

    view! {
        <main class="workspace">
            <FilterControls
                lang=lang
                sets=sets
                selected_set=selected_set
                selected_type=selected_type
                date=date
            />
            <div class="content">
                <ReservableSelector
                    lang=lang
                    kind=selected_type
                    catalog=catalog
                    selection=selection
                    search=search
                    client=client
                    on_retry=retry_catalog
                />
                <div class="main-content">
                    <TimelineGrid
                        lang=lang
                        date=date
                        kind=selected_type
                        rows=rows
                        selection=selection
                        status=status
                        active=active
                        draft=draft
                        on_retry=retry_grid
                    />
                    <DraftPanel lang=lang draft=draft reservable_name=draft_name />
                </div>
            </div>
            <ReservationModal lang=lang reservation=active grid=grid />
        </main>
    }
    .into_any()
}
