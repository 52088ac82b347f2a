use axum::{
    Router,
    routing::{get, post, put},
};

use super::{with_auth, with_ownership};
use crate::{AppState, handlers::cards, ownership::Target, role::Role};

/// Card Router
///
/// Nested under `/card`. Routes naming a card by `{id}` are checked against the card's
/// parent board; creation takes the board from the body and is open to any role.
pub fn card_routes(state: &AppState) -> Router<AppState> {
    let any_role = Router::new()
        .route("/create-todo", post(cards::create_todo_card))
        .route("/create-doing", post(cards::create_doing_card))
        .route("/create-done", post(cards::create_done_card));

    let privileged = Router::new().route("/", get(cards::list_cards));

    // Owner or member of the card's board.
    let shared = Router::new()
        .route("/update/{id}", put(cards::update_card))
        .route("/{id}", get(cards::get_card).delete(cards::delete_card))
        .route("/{id}/move-to-todo", put(cards::move_to_todo))
        .route("/{id}/move-to-doing", put(cards::move_to_doing))
        .route("/{id}/move-to-done", put(cards::move_to_done))
        .route("/{id}/add-member", put(cards::add_card_member))
        .route("/{id}/remove-member", put(cards::remove_card_member));

    with_auth(any_role, state, Role::ALL)
        .merge(with_auth(privileged, state, Role::PRIVILEGED))
        .merge(with_ownership(shared, state, Target::Card, false))
}
