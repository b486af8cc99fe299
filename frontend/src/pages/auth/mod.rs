use leptos::*;

pub mod repository;
pub mod utils;

mod panel;

pub use panel::AuthPanel;

#[component]
pub fn AuthPage() -> impl IntoView {
    view! { <AuthPanel /> }
}
