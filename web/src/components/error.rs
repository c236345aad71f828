use leptos::prelude::*;
use thaw::{Button, ButtonAppearance, MessageBar, MessageBarIntent};

/// Error banner. Shows a retry button when `on_retry` is given.
#[component]
pub fn ErrorView(
    #[prop(into)] title: String,
    #[prop(into)] message: String,
    #[prop(optional, into)] retry_label: Option<String>,
    #[prop(optional)] on_retry: Option<Callback<()>>,
) -> impl IntoView {
    let retry_label = retry_label.unwrap_or_else(|| "Poskusi znova".to_string());

    view! {
        <div class="error-state">
            <MessageBar intent=MessageBarIntent::Error>
                <div class="error-state-body">
                    <strong class="error-state-title">{title}</strong>
                    <span class="error-state-message">{message}</span>
                </div>
            </MessageBar>
            {on_retry.map(move |retry| view! {
                <Button appearance=ButtonAppearance::Primary on_click=move |_| retry.run(())>
                    {retry_label}
                </Button>
            })}
        </div>
    }
}
