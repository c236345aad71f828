use std::sync::Arc;

use chrono::{Local, NaiveDate};
use leptos::prelude::*;
use shared_types::{DaySnapshot, Reservation, ReservableObject, ReservableType};
use thaw::{MessageBar, MessageBarIntent, Spinner, SpinnerSize};
use timeline_core::selection::ids_of;
use timeline_core::{
    build_timeline, day_slots, GridCell, GridKey, GridState, GridStatus, ReservationDraft,
    Selection, TimelineIssue,
};

use crate::components::error::ErrorView;
use crate::components::loading::LoadingView;
use crate::utils::dates::{long_date, time_range};
use crate::utils::labels::{label, type_label, Lang};

const HOUR_CELL_WIDTH: u32 = 90;
const NAME_COLUMN_WIDTH: u32 = 200;

#[component]
pub fn TimelineGrid(
    lang: ReadSignal<Lang>,
    date: Memo<NaiveDate>,
    kind: RwSignal<ReservableType>,
    #[prop(into)] rows: Signal<Vec<ReservableObject>>,
    selection: RwSignal<Selection>,
    status: RwSignal<GridStatus>,
    active: RwSignal<Option<Reservation>>,
    draft: RwSignal<Option<ReservationDraft>>,
    on_retry: Callback<()>,
) -> impl IntoView {
    let body = move || {
        let lang = lang.get();
        let day = date.get();
        let GridStatus { key, state, .. } = status.get();
        let rows = rows.get();
        let shows_day = key_matches(key.as_ref(), day, &rows);

        match state {
            GridState::Error(message) => view! {
                <ErrorView
                    title=label(lang, "grid.error_title")
                    message=message
                    retry_label=label(lang, "grid.retry")
                    on_retry=on_retry
                />
            }
            .into_any(),
            GridState::Ready(snapshot) if shows_day => {
                if rows.is_empty() {
                    view! {
                        <div class="timeline-grid-empty-state">
                            <div class="timeline-grid-empty-title">{label(lang, "grid.empty")}</div>
                        </div>
                    }
                    .into_any()
                } else {
                    render_table(lang, day, kind.get(), rows, snapshot, selection, active, draft)
                }
            }
            _ => view! { <LoadingView message=label(lang, "grid.loading") /> }.into_any(),
        }
    };

    view! {
        <section class="timeline-grid-container">
            <div class="timeline-header">
                <h2 class="timeline-header-text">
                    {move || format!("{} {}", label(lang.get(), "grid.overview"), long_date(date.get(), lang.get()))}
                </h2>
                <Show when=move || status.with(|s| s.background_loading)>
                    <span class="timeline-background" title=move || label(lang.get(), "grid.background")>
                        <Spinner size=SpinnerSize::Tiny />
                    </span>
                </Show>
            </div>
            {body}
        </section>
    }
}

/// Whether the controller's key is the one for `day` and these rows. Until
/// it is, a snapshot on screen belongs to an older selection.
fn key_matches(key: Option<&GridKey>, day: NaiveDate, rows: &[ReservableObject]) -> bool {
    key.is_some_and(|key| key.date == day && key.reservables == ids_of(rows))
}

#[allow(clippy::too_many_arguments)]
fn render_table(
    lang: Lang,
    day: NaiveDate,
    kind: ReservableType,
    rows: Vec<ReservableObject>,
    snapshot: Arc<DaySnapshot>,
    selection: RwSignal<Selection>,
    active: RwSignal<Option<Reservation>>,
    draft: RwSignal<Option<ReservationDraft>>,
) -> AnyView {
    let slots = day_slots();
    let layouts: Vec<_> = rows
        .into_iter()
        .map(|object| {
            let reservations = snapshot.for_reservable(object.id);
            let timeline = build_timeline(day, reservations, &slots, &Local);
            let hidden: Vec<Reservation> = timeline
                .issues
                .iter()
                .filter_map(|issue| match issue {
                    TimelineIssue::OutsideVisibleHours { reservation } => {
                        reservations.iter().find(|r| r.id == *reservation).cloned()
                    }
                    _ => None,
                })
                .collect();
            (object, timeline, hidden)
        })
        .collect();

    let overlaps = layouts.iter().any(|(_, timeline, _)| timeline.has_overlaps());
    let hidden: Vec<(String, Reservation)> = layouts
        .iter()
        .flat_map(|(object, _, hidden)| {
            let name = object.display_name(kind).to_string();
            hidden.iter().map(move |r| (name.clone(), r.clone()))
        })
        .collect();

    let header = slots
        .iter()
        .map(|slot| view! { <th class="timeline-th-hour"><span>{slot.label()}</span></th> })
        .collect_view();

    let body = layouts
        .into_iter()
        .map(|(object, timeline, _)| {
            let id = object.id;
            let name = object.display_name(kind).to_string();
            let description = object.description.clone().filter(|d| !d.is_empty());
            let is_selected = move || selection.with(|s| s.contains(id));

            let cells = timeline
                .cells
                .into_iter()
                .map(|cell| match cell {
                    GridCell::Available { hour, .. } => view! {
                        <td
                            class="timeline-cell timeline-cell-available"
                            class:selected=is_selected
                            on:click=move |_| draft.set(Some(ReservationDraft::anchored(id, day, hour)))
                        ></td>
                    }
                    .into_any(),
                    GridCell::Reserved { reservation, span, .. } => {
                        let title = reservation.title().to_string();
                        let times = time_range(&reservation, &Local);
                        let created_by = reservation.created_by.clone().filter(|c| !c.is_empty());
                        view! {
                            <td
                                class="timeline-cell timeline-cell-reserved"
                                class:selected=is_selected
                                colspan=span.to_string()
                                on:click=move |_| active.set(Some(reservation.clone()))
                            >
                                <div class="reservation-block">
                                    <div class="reservation-title">{title}</div>
                                    {created_by.map(|c| view! { <div class="reservation-meta">{c}</div> })}
                                    <div class="reservation-meta">{times}</div>
                                </div>
                            </td>
                        }
                        .into_any()
                    }
                })
                .collect_view();

            view! {
                <tr class="timeline-row" class:selected=is_selected>
                    <td class="timeline-cell timeline-cell-reservable">
                        <div class="reservable-info">
                            <span class="reservable-name">{name}</span>
                            {description.map(|d| view! { <span class="reservable-description">{d}</span> })}
                        </div>
                    </td>
                    {cells}
                </tr>
            }
        })
        .collect_view();

    view! {
        <div class="timeline-table-wrapper">
            {overlaps.then(|| view! {
                <MessageBar intent=MessageBarIntent::Warning>{label(lang, "grid.overlaps")}</MessageBar>
            })}
            <table class="timeline-table">
                <colgroup>
                    <col style=format!("width: {}px", NAME_COLUMN_WIDTH) />
                    {slots
                        .iter()
                        .map(|_| view! { <col style=format!("width: {}px", HOUR_CELL_WIDTH) /> })
                        .collect_view()}
                </colgroup>
                <thead>
                    <tr>
                        <th class="timeline-th-corner">
                            <span class="timeline-th-corner-text">{type_label(lang, kind)}</span>
                        </th>
                        {header}
                    </tr>
                </thead>
                <tbody>{body}</tbody>
            </table>
            {(!hidden.is_empty()).then(|| view! {
                <div class="timeline-hidden">
                    <h3>{label(lang, "grid.hidden")}</h3>
                    <ul>
                        {hidden
                            .into_iter()
                            .map(|(name, reservation)| {
                                let text = format!("{}: {} ({})", name, reservation.title(), time_range(&reservation, &Local));
                                view! {
                                    <li on:click=move |_| active.set(Some(reservation.clone()))>{text}</li>
                                }
                            })
                            .collect_view()}
                    </ul>
                </div>
            })}
        </div>
    }
    .into_any()
}
