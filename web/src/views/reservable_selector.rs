use std::collections::HashMap;

use leptos::prelude::*;
use leptos::task::spawn_local;
use shared_types::{ReservableDetail, ReservableId, ReservableObject, ReservableType};
use thaw::{Button, ButtonAppearance};
use timeline_core::selection::matches_search;
use timeline_core::{ApiClient, Selection};

use super::reservations_page::CatalogState;
use crate::components::error::ErrorView;
use crate::components::loading::LoadingView;
use crate::utils::labels::{label, Lang};

#[derive(Debug, Clone, PartialEq)]
enum DetailState {
    Loading,
    Loaded(ReservableDetail),
    Failed(String),
}

/// Sidebar list of the catalog with search, multi-select and a per-object
/// detail view loaded on demand.
#[component]
pub fn ReservableSelector(
    lang: ReadSignal<Lang>,
    kind: RwSignal<ReservableType>,
    catalog: RwSignal<CatalogState>,
    selection: RwSignal<Selection>,
    search: RwSignal<String>,
    client: StoredValue<ApiClient, LocalStorage>,
    on_retry: Callback<()>,
) -> impl IntoView {
    let details = RwSignal::new(HashMap::<ReservableId, DetailState>::new());
    let expanded = RwSignal::new(None::<ReservableId>);

    let toggle_details = move |id: ReservableId| {
        if expanded.get_untracked() == Some(id) {
            expanded.set(None);
            return;
        }
        expanded.set(Some(id));
        if details.with_untracked(|loaded| matches!(loaded.get(&id), Some(DetailState::Loaded(_)))) {
            return;
        }
        details.update(|loaded| {
            loaded.insert(id, DetailState::Loading);
        });
        spawn_local(async move {
            let state = match client.get_value().fetch_reservable(id).await {
                Ok(detail) => DetailState::Loaded(detail),
                Err(e) => {
                    tracing::warn!(reservable = %id, error = %e, "could not load reservable details");
                    DetailState::Failed(e.user_message())
                }
            };
            details.update(|loaded| {
                loaded.insert(id, state);
            });
        });
    };

    let summary = move || {
        let lang = lang.get();
        selection.with(|selection| {
            if selection.is_empty() {
                label(lang, "selector.all_shown")
            } else {
                format!("{}: {}", label(lang, "selector.selected"), selection.len())
            }
        })
    };

    let render_list = move |objects: Vec<ReservableObject>| {
        let kind = kind.get();
        let term = search.get();
        let matching: Vec<ReservableObject> = objects
            .into_iter()
            .filter(|object| matches_search(object, &term, kind))
            .collect();

        if matching.is_empty() {
            return view! {
                <p class="selector-empty">{move || label(lang.get(), "selector.no_match")}</p>
            }
            .into_any();
        }

        view! {
            <ul class="selector-list">
                {matching
                    .into_iter()
                    .map(|object| {
                        let id = object.id;
                        let name = object.display_name(kind).to_string();
                        let description = object.description.clone().filter(|d| !d.is_empty());
                        view! {
                            <li class="selector-item" class:selected=move || selection.with(|s| s.contains(id))>
                                <label class="selector-check">
                                    <input
                                        type="checkbox"
                                        prop:checked=move || selection.with(|s| s.contains(id))
                                        on:change=move |_| {
                                            selection.update(|s| {
                                                s.toggle(id);
                                            })
                                        }
                                    />
                                    <span class="selector-name">{name}</span>
                                </label>
                                {description.map(|d| view! { <span class="selector-description">{d}</span> })}
                                <button class="selector-info" on:click=move |_| toggle_details(id)>"i"</button>
                                <Show when=move || expanded.get() == Some(id)>
                                    {move || details.with(|loaded| render_detail(loaded.get(&id)))}
                                </Show>
                            </li>
                        }
                    })
                    .collect_view()}
            </ul>
        }
        .into_any()
    };

    view! {
        <aside class="reservable-selector">
            <h2>{move || label(lang.get(), "selector.choose")}</h2>
            <input
                type="search"
                class="selector-search"
                placeholder=move || label(lang.get(), "selector.search")
                prop:value=move || search.get()
                on:input=move |ev| search.set(event_target_value(&ev))
            />
            <div class="selector-summary">
                <span>{summary}</span>
                <Show when=move || selection.with(|s| !s.is_empty())>
                    <Button appearance=ButtonAppearance::Subtle on_click=move |_| selection.update(Selection::clear)>
                        {move || label(lang.get(), "selector.clear")}
                    </Button>
                </Show>
            </div>
            {move || match catalog.get() {
                CatalogState::Loading => view! {
                    <LoadingView message=label(lang.get(), "catalog.loading") />
                }
                .into_any(),
                CatalogState::Failed(message) => view! {
                    <ErrorView
                        title=label(lang.get(), "catalog.error")
                        message=message
                        retry_label=label(lang.get(), "grid.retry")
                        on_retry=on_retry
                    />
                }
                .into_any(),
                CatalogState::Ready(objects) => render_list(objects),
            }}
        </aside>
    }
}

fn render_detail(state: Option<&DetailState>) -> AnyView {
    match state {
        None | Some(DetailState::Loading) => view! { <p class="selector-detail">"..."</p> }.into_any(),
        Some(DetailState::Failed(message)) => {
            view! { <p class="selector-detail selector-detail-error">{message.clone()}</p> }.into_any()
        }
        Some(DetailState::Loaded(detail)) => {
            let location = detail.object.location.clone().filter(|l| !l.is_empty());
            let resources = detail
                .nresources_set
                .iter()
                .map(|count| format!("{} × {}", count.resource.name, count.n))
                .collect::<Vec<_>>();
            view! {
                <div class="selector-detail">
                    {location.map(|l| view! { <p class="selector-location">{l}</p> })}
                    <ul class="selector-resources">
                        {resources.into_iter().map(|r| view! { <li>{r}</li> }).collect_view()}
                    </ul>
                </div>
            }
            .into_any()
        }
    }
}
