use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::{with_auth, with_ownership};
use crate::{AppState, handlers::boards, ownership::Target, role::Role};

/// Board Router
///
/// Nested under `/board`. Every route needs a credential; routes naming a board by `{id}`
/// also pass the ownership gate.
pub fn board_routes(state: &AppState) -> Router<AppState> {
    let any_role = Router::new().route("/create", post(boards::create_board));

    let privileged = Router::new().route("/", get(boards::list_boards));

    // Owner or member.
    let shared = Router::new()
        .route("/update/{id}", put(boards::update_board))
        .route("/{id}", get(boards::get_board))
        .route("/{id}/add-user/{user_id}", put(boards::add_board_member))
        .route("/{id}/remove-user/{user_id}", put(boards::remove_board_member));

    // Owner only.
    let owned = Router::new().route("/delete/{id}", delete(boards::delete_board));

    with_auth(any_role, state, Role::ALL)
        .merge(with_auth(privileged, state, Role::PRIVILEGED))
        .merge(with_ownership(shared, state, Target::Board, false))
        .merge(with_ownership(owned, state, Target::Board, true))
}
