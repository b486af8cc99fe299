use leptos::*;

use crate::{
    components::layout::Layout,
    directory::{Role, UserDirectory, UserRecord},
    state::auth::use_auth,
};

/// Accounts of `role`, active first, then by name.
pub fn roster(directory: &dyn UserDirectory, role: Role) -> Vec<UserRecord> {
    let mut users = directory.get_users_by_role(role);
    users.sort_by(|a, b| {
        b.is_active()
            .cmp(&a.is_active())
            .then_with(|| a.name.cmp(&b.name))
    });
    users
}

#[component]
fn Welcome() -> impl IntoView {
    let state = use_auth().state;
    let greeting = move || {
        state
            .get()
            .current_user
            .map(|user| format!("Welcome back, {}", user.name))
            .unwrap_or_default()
    };
    let last_login = move || {
        state
            .get()
            .current_user
            .and_then(|user| user.last_login)
            .map(|at| format!("Last sign-in {}", at.format("%Y-%m-%d %H:%M UTC")))
    };
    view! {
        <div class="mb-6">
            <h2 class="text-2xl font-bold text-fg">{greeting}</h2>
            <p class="text-sm text-fg-muted">{last_login}</p>
        </div>
    }
}

#[component]
fn RosterTable(title: &'static str, users: Vec<UserRecord>) -> impl IntoView {
    let empty = users.is_empty();
    view! {
        <div class="bg-surface-elevated shadow rounded-lg p-4 mb-4">
            <h3 class="text-lg font-semibold text-fg mb-2">{title}</h3>
            <Show when=move || empty>
                <p class="text-sm text-fg-muted">"No accounts yet"</p>
            </Show>
            <ul class="divide-y divide-border">
                {users
                    .into_iter()
                    .map(|user| {
                        let status = if user.is_active() { "active" } else { "inactive" };
                        view! {
                            <li class="py-2 flex justify-between text-sm">
                                <span class="text-fg">{user.name}</span>
                                <span class="text-fg-muted">{user.email}</span>
                                <span class="text-fg-muted">{status}</span>
                            </li>
                        }
                    })
                    .collect_view()}
            </ul>
        </div>
    }
}

#[component]
pub fn DoctorDashboard() -> impl IntoView {
    let patients = roster(use_auth().directory().as_ref(), Role::User);
    view! {
        <Layout>
            <Welcome/>
            <RosterTable title="Patients" users=patients/>
        </Layout>
    }
}

#[component]
pub fn UserDashboard() -> impl IntoView {
    let doctors = roster(use_auth().directory().as_ref(), Role::Doctor);
    view! {
        <Layout>
            <Welcome/>
            <RosterTable title="Your care team" users=doctors/>
        </Layout>
    }
}

#[component]
pub fn AdminDashboard() -> impl IntoView {
    let directory = use_auth().directory();
    view! {
        <Layout>
            <Welcome/>
            {Role::ALL
                .into_iter()
                .map(|role| {
                    let title = match role {
                        Role::Doctor => "Doctors",
                        Role::User => "Patients",
                        Role::Admin => "Administrators",
                    };
                    view! { <RosterTable title=title users=roster(directory.as_ref(), role)/> }
                })
                .collect_view()}
        </Layout>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryUserDirectory, UserStatus};

    #[test]
    fn roster_filters_by_role_and_lists_active_first() {
        let directory = InMemoryUserDirectory::with_demo_users();
        let mut retired = UserRecord::new("10", "Aaron Inactive", "aaron@example.com", Role::User);
        retired.status = UserStatus::Inactive;
        directory.insert_user(retired).unwrap();
        directory
            .insert_user(UserRecord::new("11", "Beth Active", "beth@example.com", Role::User))
            .unwrap();

        let names: Vec<String> = roster(&directory, Role::User)
            .into_iter()
            .map(|user| user.name)
            .collect();
        assert_eq!(names, vec!["Beth Active", "John Doe", "Aaron Inactive"]);
        assert_eq!(roster(&directory, Role::Doctor).len(), 1);
    }
}
