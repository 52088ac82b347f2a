//! Router Module Index
//!
//! One router per resource. Inside each, routes are grouped by the gates they need, and
//! every group gets its layers through `route_layer` so the gates only run for matched
//! routes. No path appears in two groups of the same resource, so the groups can be merged.
//!
//! Layer order inside a group: `ownership_gate` is added first and `auth_gate` last,
//! which makes `auth_gate` the outer layer and guarantees the caller is resolved before
//! ownership is checked.
pub mod boards;
pub mod cards;
pub mod users;

use axum::{Router, middleware};

use crate::{
    AppState,
    auth::{AuthGate, auth_gate},
    ownership::{OwnershipGate, Target, ownership_gate},
    role::Role,
};

/// Wraps `routes` in an `auth_gate` admitting `allowed`.
pub(crate) fn with_auth(routes: Router<AppState>, state: &AppState, allowed: &'static [Role]) -> Router<AppState> {
    routes.route_layer(middleware::from_fn_with_state(
        AuthGate::new(state.tokens.clone(), allowed),
        auth_gate,
    ))
}

/// Wraps `routes` in an `ownership_gate` on `target`, then in an `auth_gate` admitting any role.
pub(crate) fn with_ownership(
    routes: Router<AppState>,
    state: &AppState,
    target: Target,
    owner_only: bool,
) -> Router<AppState> {
    let routes = routes.route_layer(middleware::from_fn_with_state(
        OwnershipGate::new(state.repo.clone(), target, owner_only),
        ownership_gate,
    ));
    with_auth(routes, state, Role::ALL)
}
