use std::rc::Rc;

use leptos::*;
use leptos_meta::*;
use leptos_router::*;
use log::debug;

use crate::{
    components::guard::{DashboardRedirect, FallbackRedirect, RedirectIfAuthenticated, RequireRole},
    directory::{InMemoryUserDirectory, Role, UserDirectory},
    pages::{
        auth::AuthPage,
        dashboard::{AdminDashboard, DoctorDashboard, UserDashboard},
        home::LandingPage,
    },
    state::auth::{AuthProvider, AuthState},
};

pub const AUTH_PATH: &str = "/auth";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const HOME_PATH: &str = "/";

pub const ROUTE_PATHS: &[&str] = &[
    "/",
    "/auth",
    "/dashboard",
    "/doctor",
    "/user",
    "/admin",
    "/preview_page.html",
];

pub const PROTECTED_ROUTE_PATHS: &[&str] = &["/doctor", "/user", "/admin"];

pub const PUBLIC_ROUTE_PATHS: &[&str] = &["/", "/auth"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectTo(&'static str),
}

/// Gate for protected pages. An unauthorized role gets the generic
/// `/dashboard` redirect rather than an error page.
pub fn resolve(
    auth: &AuthState,
    requested_path: &str,
    allowed_roles: Option<&[Role]>,
) -> RouteDecision {
    let Some(role) = auth.current_user.as_ref().map(|user| user.role) else {
        debug!("{requested_path}: not signed in");
        return RouteDecision::RedirectTo(AUTH_PATH);
    };
    match allowed_roles {
        Some(allowed) if !allowed.contains(&role) => {
            debug!("{requested_path}: role {role} not allowed");
            RouteDecision::RedirectTo(DASHBOARD_PATH)
        }
        _ => RouteDecision::Allow,
    }
}

pub fn dashboard_path(role: Role) -> &'static str {
    match role {
        Role::Doctor => "/doctor",
        Role::Admin => "/admin",
        Role::User => "/user",
    }
}

/// Where `/dashboard` sends the current session.
pub fn resolve_dashboard(auth: &AuthState) -> RouteDecision {
    match auth.current_user.as_ref() {
        Some(user) => RouteDecision::RedirectTo(dashboard_path(user.role)),
        None => RouteDecision::RedirectTo(AUTH_PATH),
    }
}

/// Landing and sign-in pages are for signed-out visitors only.
pub fn resolve_public(auth: &AuthState) -> RouteDecision {
    if auth.is_authenticated() {
        RouteDecision::RedirectTo(DASHBOARD_PATH)
    } else {
        RouteDecision::Allow
    }
}

/// Unknown paths.
pub fn resolve_fallback(auth: &AuthState) -> RouteDecision {
    if auth.is_authenticated() {
        RouteDecision::RedirectTo(DASHBOARD_PATH)
    } else {
        RouteDecision::RedirectTo(HOME_PATH)
    }
}

/// Roles allowed under a dashboard section; `/doctor/anything` belongs to
/// `/doctor`.
pub fn protected_route_roles(path: &str) -> Option<&'static [Role]> {
    match path.split('/').nth(1)? {
        "doctor" => Some(&[Role::Doctor]),
        "user" => Some(&[Role::User]),
        "admin" => Some(&[Role::Admin]),
        _ => None,
    }
}

pub fn mount_app() {
    mount_to_body(app_root);
}

pub fn app_root() -> impl IntoView {
    provide_meta_context();
    let directory: Rc<dyn UserDirectory> = Rc::new(InMemoryUserDirectory::with_demo_users());
    provide_context(directory);
    view! {
        <Title text="Retinal-AI"/>
        <AuthProvider>
            <Router>
                <Routes>
                    <Route path="/" view=PublicLanding/>
                    <Route path="/auth" view=PublicAuth/>
                    <Route path="/dashboard" view=DashboardRedirect/>
                    <Route path="/doctor/*any" view=ProtectedDoctor/>
                    <Route path="/user/*any" view=ProtectedUser/>
                    <Route path="/admin/*any" view=ProtectedAdmin/>
                    <Route path="/preview_page.html" view=|| view! { <Redirect path=HOME_PATH/> }/>
                    <Route path="/*any" view=FallbackRedirect/>
                </Routes>
            </Router>
        </AuthProvider>
    }
}

#[component]
fn PublicLanding() -> impl IntoView {
    view! { <RedirectIfAuthenticated><LandingPage/></RedirectIfAuthenticated> }
}

#[component]
fn PublicAuth() -> impl IntoView {
    view! { <RedirectIfAuthenticated><AuthPage/></RedirectIfAuthenticated> }
}

#[component]
fn ProtectedDoctor() -> impl IntoView {
    view! { <RequireRole path="/doctor"><DoctorDashboard/></RequireRole> }
}

#[component]
fn ProtectedUser() -> impl IntoView {
    view! { <RequireRole path="/user"><UserDashboard/></RequireRole> }
}

#[component]
fn ProtectedAdmin() -> impl IntoView {
    view! { <RequireRole path="/admin"><AdminDashboard/></RequireRole> }
}
