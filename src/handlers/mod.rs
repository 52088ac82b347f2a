//! Request handlers, one module per resource. Handlers run after the auth and ownership
//! gates configured in `routes`, so they only validate input and talk to the repository.

pub mod boards;
pub mod cards;
pub mod users;

use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Board, BoardDetails, Card, CardDetails},
    repository::RepositoryState,
};

/// Returns the trimmed value, or a `Validation` error naming `field` when absent or blank.
pub(crate) fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{field} is required"))),
    }
}

/// Re-orders `items` to follow `ids`, dropping ids with no matching item
/// (e.g. a member whose account was deleted).
fn in_order<T: Clone>(ids: &[Uuid], items: Vec<T>, key: impl Fn(&T) -> Uuid) -> Vec<T> {
    let by_id: HashMap<Uuid, T> = items.into_iter().map(|item| (key(&item), item)).collect();
    ids.iter().filter_map(|id| by_id.get(id).cloned()).collect()
}

/// expand_board
///
/// Resolves lane ids to cards and member ids to users, keeping lane order.
pub(crate) async fn expand_board(repo: &RepositoryState, board: Board) -> ApiResult<BoardDetails> {
    let card_ids: Vec<Uuid> = board
        .todo_cards
        .iter()
        .chain(&board.doing_cards)
        .chain(&board.done_cards)
        .copied()
        .collect();
    let cards = repo.get_cards(&card_ids).await?;
    let members = repo.get_users(&board.members).await?;

    Ok(BoardDetails {
        id: board.id,
        name: board.name,
        description: board.description,
        owner: board.owner,
        members: in_order(&board.members, members, |u| u.id),
        todo_cards: in_order(&board.todo_cards, cards.clone(), |c| c.id),
        doing_cards: in_order(&board.doing_cards, cards.clone(), |c| c.id),
        done_cards: in_order(&board.done_cards, cards, |c| c.id),
    })
}

/// expand_card
///
/// Resolves member ids to users (no password hashes by construction).
pub(crate) async fn expand_card(repo: &RepositoryState, card: Card) -> ApiResult<CardDetails> {
    let members = repo.get_users(&card.members).await?;
    Ok(CardDetails {
        id: card.id,
        title: card.title,
        description: card.description,
        board: card.board,
        members: in_order(&card.members, members, |u| u.id),
    })
}
