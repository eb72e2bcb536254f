//! App Root Component
//!
//! Hosts the embedded planner behind a loading overlay.

use leptos::*;

/// Root shell component.
///
/// Renders a full-viewport, border-less iframe pointed at the proxied
/// planner app, with a centered overlay shown until the iframe document
/// finishes loading. The `loaded` flag flips exactly once; a repeated load
/// event is a no-op since the flag is already set. If the frame never
/// loads the overlay simply stays up - there is no timeout or retry.
#[component]
pub fn App() -> impl IntoView {
    let (loaded, set_loaded) = create_signal(false);

    view! {
        <div style="position: fixed; inset: 0;">
            {move || {
                if loaded.get() {
                    view! {}.into_view()
                } else {
                    view! {
                        <div style="position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; color: #555;">
                            "Loading planner…"
                        </div>
                    }.into_view()
                }
            }}

            <iframe
                title="Planner App"
                src="/streamlit/"
                style="border: none; width: 100%; height: 100%;"
                on:load=move |_| set_loaded.set(true)
            />
        </div>
    }
}
