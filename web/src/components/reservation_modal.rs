use chrono::Local;
use leptos::prelude::*;
use leptos::task::spawn_local;
use shared_types::Reservation;
use thaw::{Button, ButtonAppearance, MessageBar, MessageBarIntent};
use timeline_core::window::local_day;
use timeline_core::GridController;

use crate::utils::dates::{long_date, time_range};
use crate::utils::labels::{label, Lang};

/// Details of the clicked reservation, with a delete action. A failed delete
/// is shown inside the modal and keeps it open.
#[component]
pub fn ReservationModal(
    lang: ReadSignal<Lang>,
    reservation: RwSignal<Option<Reservation>>,
    grid: StoredValue<GridController, LocalStorage>,
) -> impl IntoView {
    let deleting = RwSignal::new(false);
    let delete_error = RwSignal::new(None::<String>);

    let close = move || {
        reservation.set(None);
        delete_error.set(None);
    };

    let delete = move || {
        if deleting.get_untracked() {
            return;
        }
        let Some(target) = reservation.get_untracked() else {
            return;
        };
        deleting.set(true);
        delete_error.set(None);

        spawn_local(async move {
            let day = local_day(&target.start, &Local);
            let result = grid.get_value().delete_reservation(target.id, day).await;
            deleting.set(false);

            let still_open = reservation.with_untracked(|open| {
                open.as_ref().map(|open| open.id) == Some(target.id)
            });
            match result {
                Ok(()) => {
                    if still_open {
                        reservation.set(None);
                    }
                }
                Err(e) => {
                    tracing::warn!(reservation = %target.id, error = %e, "could not delete reservation");
                    if still_open {
                        delete_error.set(Some(e.user_message()));
                    }
                }
            }
        });
    };

    view! {
        <Show when=move || reservation.with(Option::is_some)>
            <div class="modal-overlay" on:click=move |_| close()>
                <div class="modal-content" on:click=|ev| ev.stop_propagation()>
                    <button
                        class="modal-close"
                        aria-label=move || label(lang.get(), "modal.close")
                        on:click=move |_| close()
                    >
                        "×"
                    </button>
                    <h2 class="modal-title">{move || label(lang.get(), "modal.title")}</h2>

                    {move || reservation.get().map(|r| details(&r, lang.get()))}

                    {move || delete_error.get().map(|message| view! {
                        <MessageBar intent=MessageBarIntent::Error>{message}</MessageBar>
                    })}

                    <div class="modal-actions">
                        <Button
                            appearance=ButtonAppearance::Primary
                            disabled=deleting
                            on_click=move |_| delete()
                        >
                            {move || {
                                let key = if deleting.get() { "modal.deleting" } else { "modal.delete" };
                                label(lang.get(), key)
                            }}
                        </Button>
                        <Button appearance=ButtonAppearance::Subtle on_click=move |_| close()>
                            {move || label(lang.get(), "modal.close")}
                        </Button>
                    </div>
                </div>
            </div>
        </Show>
    }
}

fn details(reservation: &Reservation, lang: Lang) -> impl IntoView {
    let mut rows = vec![
        (label(lang, "modal.name"), reservation.title().to_string()),
        (label(lang, "modal.time"), time_range(reservation, &Local)),
        (
            label(lang, "modal.date"),
            long_date(reservation.start.with_timezone(&Local).date_naive(), lang),
        ),
    ];
    if let Some(created_by) = reservation.created_by.as_ref().filter(|s| !s.is_empty()) {
        rows.push((label(lang, "modal.created_by"), created_by.clone()));
    }
    if !reservation.owners.is_empty() {
        rows.push((label(lang, "modal.owners"), reservation.owners.join(", ")));
    }
    if !reservation.requirements.is_empty() {
        rows.push((label(lang, "modal.requirements"), reservation.requirements.join(", ")));
    }

    view! {
        <div class="modal-details-grid">
            {rows
                .into_iter()
                .map(|(name, value)| view! {
                    <div class="modal-detail-row">
                        <span class="modal-detail-label">{name}":"</span>
                        <span class="modal-detail-value">{value}</span>
                    </div>
                })
                .collect_view()}
        </div>
    }
}
