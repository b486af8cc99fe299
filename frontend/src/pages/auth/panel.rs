use leptos::{ev::SubmitEvent, *};
use log::warn;

use super::{
    repository::AuthRepository,
    utils::{self, SignUpForm},
};
use crate::{
    components::layout::ErrorMessage,
    directory::{Role, UserRecord},
    state::{
        auth::{use_auth, AuthContext},
        session::LoginOutcome,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthTab {
    SignIn,
    SignUp,
}

/// Starts the session for `user`. The public-route guard moves the visitor to
/// their dashboard once the state flips; the returned message is shown inline
/// when the session could not be started.
fn complete_login(auth: &AuthContext, user: UserRecord) -> Option<String> {
    match auth.login(user) {
        Ok(LoginOutcome::Persisted) => None,
        Ok(LoginOutcome::MemoryOnly) => {
            warn!("session not persisted; it will end on reload");
            None
        }
        Err(err) => Some(err.to_string()),
    }
}

#[component]
pub fn AuthPanel() -> impl IntoView {
    let auth = use_auth();
    let repo = AuthRepository::new(auth.directory());
    let sign_in_repo = repo.clone();
    let sign_up_repo = repo;
    let (tab, set_tab) = create_signal(AuthTab::SignIn);
    let error = create_rw_signal(None::<String>);

    let tab_button = move |target: AuthTab, label: &'static str| {
        view! {
            <button
                type="button"
                class=move || {
                    if tab.get() == target {
                        "flex-1 py-2 text-sm font-medium border-b-2 border-action-primary-bg text-fg"
                    } else {
                        "flex-1 py-2 text-sm font-medium text-fg-muted"
                    }
                }
                on:click=move |_| {
                    error.set(None);
                    set_tab.set(target);
                }
            >
                {label}
            </button>
        }
    };

    view! {
        <div class="min-h-screen flex items-center justify-center bg-surface py-12 px-4 sm:px-6 lg:px-8">
            <div class="max-w-md w-full space-y-6">
                <h2 class="text-center text-3xl font-extrabold text-fg">"Welcome to Retinal-AI"</h2>
                <div class="flex">
                    {tab_button(AuthTab::SignIn, "Sign in")}
                    {tab_button(AuthTab::SignUp, "Create account")}
                </div>
                {move || error.get().map(|message| view! { <ErrorMessage message=message /> })}
                <Show
                    when=move || tab.get() == AuthTab::SignIn
                    fallback=move || view! { <SignUpFields repo=sign_up_repo.clone() error=error /> }
                >
                    <SignInFields repo=sign_in_repo.clone() error=error />
                </Show>
            </div>
        </div>
    }
}

#[component]
fn SignInFields(repo: AuthRepository, error: RwSignal<Option<String>>) -> impl IntoView {
    let auth = use_auth();
    let (email, set_email) = create_signal(String::new());
    let (password, set_password) = create_signal(String::new());

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let request = match utils::validate_sign_in(&email.get_untracked(), &password.get_untracked())
        {
            Ok(request) => request,
            Err(err) => {
                error.set(Some(err.to_string()));
                return;
            }
        };
        let outcome = repo
            .sign_in(&request)
            .map_err(|err| err.to_string())
            .map(|user| complete_login(&auth, user));
        error.set(outcome.unwrap_or_else(Some));
    };

    view! {
        <form class="space-y-4" on:submit=on_submit>
            <input
                type="email"
                placeholder="Email address"
                class="w-full px-3 py-2 border border-border rounded-md"
                prop:value=email
                on:input=move |ev| set_email.set(event_target_value(&ev))
            />
            <input
                type="password"
                placeholder="Password"
                class="w-full px-3 py-2 border border-border rounded-md"
                prop:value=password
                on:input=move |ev| set_password.set(event_target_value(&ev))
            />
            <button type="submit" class="w-full py-2 rounded-md text-action-primary-text bg-action-primary-bg">
                "Sign in"
            </button>
        </form>
    }
}

fn text_input(
    form: RwSignal<SignUpForm>,
    kind: &'static str,
    placeholder: &'static str,
    field: fn(&mut SignUpForm) -> &mut String,
) -> impl IntoView {
    view! {
        <input
            type=kind
            placeholder=placeholder
            class="w-full px-3 py-2 border border-border rounded-md"
            on:input=move |ev| {
                let value = event_target_value(&ev);
                form.update(|f| *field(f) = value);
            }
        />
    }
}

#[component]
fn SignUpFields(repo: AuthRepository, error: RwSignal<Option<String>>) -> impl IntoView {
    let auth = use_auth();
    let form = create_rw_signal(SignUpForm::default());

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let request = match utils::validate_sign_up(&form.get_untracked()) {
            Ok(request) => request,
            Err(err) => {
                error.set(Some(err.to_string()));
                return;
            }
        };
        let outcome = repo
            .sign_up(&request)
            .map_err(|err| err.to_string())
            .map(|user| complete_login(&auth, user));
        error.set(outcome.unwrap_or_else(Some));
    };

    view! {
        <form class="space-y-4" on:submit=on_submit>
            {text_input(form, "text", "Full name", |f| &mut f.name)}
            {text_input(form, "email", "Email address", |f| &mut f.email)}
            {text_input(form, "password", "Password", |f| &mut f.password)}
            {text_input(form, "password", "Confirm password", |f| &mut f.confirm_password)}
            <select
                class="w-full px-3 py-2 border border-border rounded-md"
                on:change=move |ev| {
                    let value = event_target_value(&ev);
                    form.update(|f| f.role = value);
                }
            >
                <option value="">"Select your role"</option>
                {Role::ALL
                    .into_iter()
                    .map(|role| view! { <option value=role.as_str()>{role.label()}</option> })
                    .collect_view()}
            </select>
            <label class="flex items-center space-x-2 text-sm text-fg-muted">
                <input
                    type="checkbox"
                    on:change=move |ev| {
                        let checked = event_target_checked(&ev);
                        form.update(|f| f.agreed_to_terms = checked);
                    }
                />
                <span>"I agree to the terms and conditions"</span>
            </label>
            <button type="submit" class="w-full py-2 rounded-md text-action-primary-text bg-action-primary-bg">
                "Create account"
            </button>
        </form>
    }
}
