use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::with_auth;
use crate::{AppState, handlers::users, role::Role};

/// User Router
///
/// Nested under `/user`. Register and login are open; everything else needs a credential.
pub fn user_routes(state: &AppState) -> Router<AppState> {
    // POST /register, POST /login
    let public = Router::new()
        .route("/register", post(users::register_user))
        .route("/login", post(users::login));

    // Open to every role. `update` is not scoped to the caller's own id.
    let any_role = Router::new()
        .route("/", get(users::list_users))
        .route("/update/{id}", put(users::update_user));

    // Developer | Admin
    let privileged = Router::new()
        .route("/delete/{id}", delete(users::delete_user))
        .route("/{id}", get(users::get_user));

    public
        .merge(with_auth(any_role, state, Role::ALL))
        .merge(with_auth(privileged, state, Role::PRIVILEGED))
}
