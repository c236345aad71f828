use std::str::FromStr;

use chrono::NaiveDate;
use leptos::prelude::*;
use leptos_router::components::A;
use leptos_router::hooks::use_navigate;
use shared_types::{ReservableSet, ReservableType};
use timeline_core::window::{day_key, parse_day_key, shift_days};

use crate::utils::dates::{long_date, today};
use crate::utils::labels::{label, type_label, Lang};

/// Link target that shows `date`. The date lives in the query string so it
/// survives reloads and can be shared.
pub fn date_href(date: NaiveDate) -> String {
    format!("/?date={}", day_key(date))
}

#[component]
pub fn FilterControls(
    lang: ReadSignal<Lang>,
    sets: RwSignal<Vec<ReservableSet>>,
    selected_set: RwSignal<String>,
    selected_type: RwSignal<ReservableType>,
    date: Memo<NaiveDate>,
) -> impl IntoView {
    let navigate = use_navigate();

    let on_date_input = move |ev: leptos::ev::Event| {
        if let Some(picked) = parse_day_key(&event_target_value(&ev)) {
            navigate(&date_href(picked), Default::default());
        }
    };

    let on_type_change = move |ev: leptos::ev::Event| {
        match ReservableType::from_str(&event_target_value(&ev)) {
            Ok(kind) => selected_type.set(kind),
            Err(e) => tracing::warn!(error = %e, "ignoring unknown reservable type"),
        }
    };

    let neighbour = move |offset: i64| {
        let current = date.get();
        date_href(shift_days(current, offset).unwrap_or(current))
    };

    view! {
        <section class="filter-controls">
            <div class="filter-field">
                <label>{move || label(lang.get(), "filter.set")}</label>
                <select
                    prop:value=move || selected_set.get()
                    on:change=move |ev| selected_set.set(event_target_value(&ev))
                >
                    {move || {
                        let current = selected_set.get();
                        let mut options = sets.get();
                        if !options.iter().any(|set| set.key == current) {
                            options.insert(0, ReservableSet { key: current.clone(), label: current.clone() });
                        }
                        options
                            .into_iter()
                            .map(|set| {
                                let selected = set.key == current;
                                view! { <option value=set.key selected=selected>{set.label}</option> }
                            })
                            .collect_view()
                    }}
                </select>
            </div>

            <div class="filter-field">
                <label>{move || label(lang.get(), "filter.type")}</label>
                <select prop:value=move || selected_type.get().as_str() on:change=on_type_change>
                    {move || {
                        let lang = lang.get();
                        let current = selected_type.get();
                        ReservableType::ALL
                            .into_iter()
                            .map(|kind| view! {
                                <option value=kind.as_str() selected=kind == current>
                                    {type_label(lang, kind)}
                                </option>
                            })
                            .collect_view()
                    }}
                </select>
            </div>

            <div class="filter-field date-navigation">
                <label>{move || label(lang.get(), "filter.date")}</label>
                <A href=move || neighbour(-1) attr:class="date-nav-link">
                    {move || label(lang.get(), "filter.previous_day")}
                </A>
                <input type="date" prop:value=move || day_key(date.get()) on:change=on_date_input />
                <A href=move || date_href(today()) attr:class="date-nav-link">
                    {move || label(lang.get(), "filter.today")}
                </A>
                <A href=move || neighbour(1) attr:class="date-nav-link">
                    {move || label(lang.get(), "filter.next_day")}
                </A>
                <span class="date-long">{move || long_date(date.get(), lang.get())}</span>
            </div>
        </section>
    }
}
