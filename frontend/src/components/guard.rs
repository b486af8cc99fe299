use crate::{
    components::layout::LoadingSpinner,
    router::{self, RouteDecision},
    state::auth::use_auth,
};
use leptos::*;
use leptos_router::{use_navigate, NavigateOptions};

fn redirect(target: &'static str) {
    let navigate = use_navigate();
    navigate(
        target,
        NavigateOptions {
            replace: true,
            ..Default::default()
        },
    );
}

/// Renders `children` only when [`router::resolve`] allows the current
/// session on `path`; the roles come from the route table.
#[component]
pub fn RequireRole(path: &'static str, children: ChildrenFn) -> impl IntoView {
    let auth = use_auth();
    let state = auth.state;
    let decision = create_memo(move |_| {
        router::resolve(&state.get(), path, router::protected_route_roles(path))
    });
    let is_restoring = create_memo(move |_| state.get().is_restoring);
    create_effect(move |_| {
        if is_restoring.get() {
            return;
        }
        if let RouteDecision::RedirectTo(target) = decision.get() {
            redirect(target);
        }
    });
    view! {
        <Show
            when=move || should_render_children(decision.get(), is_restoring.get())
            fallback=move || {
                if is_restoring.get() {
                    view! { <LoadingSpinner /> }.into_view()
                } else {
                    ().into_view()
                }
            }
        >
            {children()}
        </Show>
    }
}

fn should_render_children(decision: RouteDecision, is_restoring: bool) -> bool {
    decision == RouteDecision::Allow && !is_restoring
}

#[component]
pub fn RedirectIfAuthenticated(children: ChildrenFn) -> impl IntoView {
    let auth = use_auth();
    let state = auth.state;
    let decision = create_memo(move |_| router::resolve_public(&state.get()));
    create_effect(move |_| {
        if let RouteDecision::RedirectTo(target) = decision.get() {
            redirect(target);
        }
    });
    view! {
        <Show when=move || decision.get() == RouteDecision::Allow>
            {children()}
        </Show>
    }
}

#[component]
pub fn DashboardRedirect() -> impl IntoView {
    let auth = use_auth();
    let state = auth.state;
    create_effect(move |_| {
        if let RouteDecision::RedirectTo(target) = router::resolve_dashboard(&state.get()) {
            redirect(target);
        }
    });
    view! { <LoadingSpinner /> }
}

#[component]
pub fn FallbackRedirect() -> impl IntoView {
    let auth = use_auth();
    let state = auth.state;
    create_effect(move |_| {
        if let RouteDecision::RedirectTo(target) = router::resolve_fallback(&state.get()) {
            redirect(target);
        }
    });
    view! { <LoadingSpinner /> }
}


#[cfg(all(test, not(target_arch = "wasm32")))]
mod ssr_tests {
    use super::*;
    use crate::state::auth::AuthContext;
    use crate::test_support::helpers::{doctor, patient, SessionHarness};
    use crate::test_support::ssr::render_to_string;

    fn provide_signed_in(user: Option<crate::directory::UserRecord>) {
        let h = SessionHarness::new();
        let ctx = AuthContext::new(h.reopen().controller);
        if let Some(user) = user {
            ctx.login(user).unwrap();
        }
        provide_context(ctx);
    }

    #[test]
    fn require_role_renders_children_for_allowed_role() {
        let html = render_to_string(move || {
            provide_signed_in(Some(doctor()));
            view! {
                <RequireRole path="/doctor">
                    {|| view! { <div>"doctor-protected"</div> }}
                </RequireRole>
            }
        });
        assert!(html.contains("doctor-protected"));
    }

    #[test]
    fn require_role_hides_children_for_other_role() {
        let html = render_to_string(move || {
            provide_signed_in(Some(patient()));
            view! {
                <RequireRole path="/doctor">
                    {|| view! { <div>"doctor-protected"</div> }}
                </RequireRole>
            }
        });
        assert!(!html.contains("doctor-protected"));
    }

    #[test]
    fn require_role_hides_children_when_signed_out() {
        let html = render_to_string(move || {
            provide_signed_in(None);
            view! {
                <RequireRole path="/user">
                    {|| view! { <div>"user-protected"</div> }}
                </RequireRole>
            }
        });
        assert!(!html.contains("user-protected"));
    }

    #[test]
    fn public_wrapper_hides_children_when_signed_in() {
        let html = render_to_string(move || {
            provide_signed_in(Some(patient()));
            view! {
                <RedirectIfAuthenticated>
                    {|| view! { <div>"landing"</div> }}
                </RedirectIfAuthenticated>
            }
        });
        assert!(!html.contains("landing"));
    }
}
