//! Planner Shell
//!
//! Front-end shell for the planner application, built with Leptos (WASM).
//!
//! The shell renders a single full-viewport iframe pointed at the proxied
//! planner app (`/streamlit/`) behind a loading overlay. It owns no other
//! state and performs no communication with the embedded app beyond the
//! browser-level iframe load event.
//!
//! # Architecture
//!
//! This is a client-side rendered (CSR) Leptos application that compiles to
//! WebAssembly. All real traffic flows through the dev server's proxy; the
//! shell itself issues no requests.

use leptos::*;

mod app;

fn main() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();

    // Mount the app to the document body
    mount_to_body(|| view! { <app::App /> });
}
