use leptos::prelude::*;
use thaw::{Button, ButtonAppearance};
use timeline_core::ReservationDraft;

use crate::utils::dates::long_date;
use crate::utils::labels::{label, Lang};

/// Form opened by clicking a free slot. Edits stay local to the browser.
#[component]
pub fn DraftPanel(
    lang: ReadSignal<Lang>,
    draft: RwSignal<Option<ReservationDraft>>,
    #[prop(into)] reservable_name: Signal<String>,
) -> impl IntoView {
    let set_end = move |ev: leptos::ev::Event| {
        if let Ok(hour) = event_target_value(&ev).parse::<u32>() {
            draft.update(|draft| {
                if let Some(draft) = draft {
                    draft.set_end_hour(hour);
                }
            });
        }
    };

    let set_reason = move |ev: leptos::ev::Event| {
        let reason = event_target_value(&ev);
        draft.update(|draft| {
            if let Some(draft) = draft {
                draft.reason = reason;
            }
        });
    };

    view! {
        <Show when=move || draft.with(Option::is_some)>
            <aside class="draft-panel">
                <h3 class="draft-title">
                    {move || format!("{}: {}", label(lang.get(), "draft.title"), reservable_name.get())}
                </h3>
                <p class="draft-date">
                    {move || draft.with(|d| d.as_ref().map(|d| long_date(d.date, lang.get())))}
                </p>

                <div class="draft-row">
                    <label>{move || label(lang.get(), "draft.start")}</label>
                    <span>
                        {move || draft.with(|d| d.as_ref().map(|d| format!("{:02}:00", d.start_hour)))}
                    </span>
                </div>

                <div class="draft-row">
                    <label>{move || label(lang.get(), "draft.end")}</label>
                    <select on:change=set_end>
                        {move || draft.with(|d| {
                            d.as_ref().map(|d| {
                                let end = d.end_hour;
                                d.end_hour_choices()
                                    .into_iter()
                                    .map(|hour| view! {
                                        <option value=hour.to_string() selected=hour == end>
                                            {format!("{:02}:00", hour)}
                                        </option>
                                    })
                                    .collect_view()
                            })
                        })}
                    </select>
                </div>

                <div class="draft-row">
                    <label>{move || label(lang.get(), "draft.reason")}</label>
                    <input
                        type="text"
                        prop:value=move || draft.with(|d| d.as_ref().map(|d| d.reason.clone()).unwrap_or_default())
                        on:input=set_reason
                    />
                </div>

                {move || draft.with(|d| {
                    d.as_ref()
                        .and_then(|d| d.validate().err())
                        .map(|e| view! { <p class="draft-error">{e.user_message()}</p> })
                })}

                <p class="draft-note">{move || label(lang.get(), "draft.note")}</p>
                <Button appearance=ButtonAppearance::Subtle on_click=move |_| draft.set(None)>
                    {move || label(lang.get(), "modal.close")}
                </Button>
            </aside>
        </Show>
    }
}
