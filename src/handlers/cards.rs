use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{Board, Card, CardChanges, CardDetails, CardRequest, Lane, MemberRequest, MessageResponse, NewCard},
};

use super::{expand_card, required};

async fn create_in_lane(
    state: AppState,
    payload: CardRequest,
    lane: Lane,
) -> ApiResult<(StatusCode, Json<MessageResponse<Card>>)> {
    let title = required(payload.title, "title")?;
    let board = payload
        .board
        .ok_or_else(|| ApiError::Validation("board is required".to_string()))?;

    let card = state
        .repo
        .create_card(
            NewCard {
                title,
                description: payload.description,
                board,
            },
            lane,
        )
        .await?;

    tracing::info!(card = %card.id, board = %board, lane = lane.as_str(), "card created");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_result("Card created", card)),
    ))
}

/// create_todo_card
///
/// [Any role] Creates a card on `board` and appends it to the todo lane.
#[utoipa::path(
    post,
    path = "/card/create-todo",
    request_body = CardRequest,
    responses(
        (status = 201, description = "Card created", body = MessageResponse<Card>),
        (status = 400, description = "title or board missing"),
        (status = 404, description = "Board not found")
    )
)]
pub async fn create_todo_card(
    State(state): State<AppState>,
    Json(payload): Json<CardRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse<Card>>)> {
    create_in_lane(state, payload, Lane::Todo).await
}

/// create_doing_card
#[utoipa::path(
    post,
    path = "/card/create-doing",
    request_body = CardRequest,
    responses(
        (status = 201, description = "Card created", body = MessageResponse<Card>),
        (status = 404, description = "Board not found")
    )
)]
pub async fn create_doing_card(
    State(state): State<AppState>,
    Json(payload): Json<CardRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse<Card>>)> {
    create_in_lane(state, payload, Lane::Doing).await
}

/// create_done_card
#[utoipa::path(
    post,
    path = "/card/create-done",
    request_body = CardRequest,
    responses(
        (status = 201, description = "Card created", body = MessageResponse<Card>),
        (status = 404, description = "Board not found")
    )
)]
pub async fn create_done_card(
    State(state): State<AppState>,
    Json(payload): Json<CardRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse<Card>>)> {
    create_in_lane(state, payload, Lane::Done).await
}

/// update_card
///
/// [Owner or member of the card's board] Replaces the fields present in the body.
/// A new `board` carries the card over into the same lane there.
#[utoipa::path(
    put,
    path = "/card/update/{id}",
    params(("id" = Uuid, Path, description = "Card ID")),
    request_body = CardRequest,
    responses(
        (status = 200, description = "Update successful", body = MessageResponse<Card>),
        (status = 401, description = "Not owner or member"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CardRequest>,
) -> ApiResult<Json<MessageResponse<Card>>> {
    let title = match payload.title {
        Some(title) => Some(required(Some(title), "title")?),
        None => None,
    };
    let changes = CardChanges {
        title,
        description: payload.description,
        board: payload.board,
    };

    let card = state
        .repo
        .update_card(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Card"))?;
    Ok(Json(MessageResponse::with_result("Update successful", card)))
}

/// get_card
///
/// [Owner or member of the card's board] The card with its members expanded.
#[utoipa::path(
    get,
    path = "/card/{id}",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses(
        (status = 200, description = "Card", body = CardDetails),
        (status = 404, description = "Card not found")
    )
)]
pub async fn get_card(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<CardDetails>> {
    let card = state
        .repo
        .get_card(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Card"))?;
    Ok(Json(expand_card(&state.repo, card).await?))
}

/// list_cards
///
/// [Developer | Admin] Every card, members expanded.
#[utoipa::path(
    get,
    path = "/card",
    responses((status = 200, description = "Cards", body = [CardDetails]))
)]
pub async fn list_cards(State(state): State<AppState>) -> ApiResult<Json<Vec<CardDetails>>> {
    let cards = state.repo.list_cards().await?;
    let mut expanded = Vec::with_capacity(cards.len());
    for card in cards {
        expanded.push(expand_card(&state.repo, card).await?);
    }
    Ok(Json(expanded))
}

/// delete_card
///
/// [Owner or member of the card's board] Deletes the card and pulls it from its board's lanes.
#[utoipa::path(
    delete,
    path = "/card/{id}",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses(
        (status = 200, description = "Card deleted"),
        (status = 401, description = "Not owner or member"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse<()>>> {
    if !state.repo.delete_card(id).await? {
        return Err(ApiError::not_found("Card"));
    }
    tracing::info!(card = %id, "card deleted");
    Ok(Json(MessageResponse::message("Card deleted")))
}

async fn move_to(state: AppState, id: Uuid, lane: Lane) -> ApiResult<Json<MessageResponse<Board>>> {
    let board = state.repo.move_card(id, lane).await?;
    tracing::debug!(card = %id, board = %board.id, lane = lane.as_str(), "card moved");
    Ok(Json(MessageResponse::with_result(
        &format!("Card moved to {}", lane.as_str()),
        board,
    )))
}

/// move_to_todo
///
/// [Owner or member of the card's board] Pulls the card from every lane and appends it
/// to todo. Returns the updated board.
#[utoipa::path(
    put,
    path = "/card/{id}/move-to-todo",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses(
        (status = 200, description = "Card moved to todo", body = MessageResponse<Board>),
        (status = 404, description = "Card not found")
    )
)]
pub async fn move_to_todo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse<Board>>> {
    move_to(state, id, Lane::Todo).await
}

/// move_to_doing
#[utoipa::path(
    put,
    path = "/card/{id}/move-to-doing",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses((status = 200, description = "Card moved to doing", body = MessageResponse<Board>))
)]
pub async fn move_to_doing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse<Board>>> {
    move_to(state, id, Lane::Doing).await
}

/// move_to_done
#[utoipa::path(
    put,
    path = "/card/{id}/move-to-done",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses((status = 200, description = "Card moved to done", body = MessageResponse<Board>))
)]
pub async fn move_to_done(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse<Board>>> {
    move_to(state, id, Lane::Done).await
}

/// add_card_member
///
/// [Owner or member of the card's board] Adds `member` to the card. The user must exist.
#[utoipa::path(
    put,
    path = "/card/{id}/add-member",
    params(("id" = Uuid, Path, description = "Card ID")),
    request_body = MemberRequest,
    responses(
        (status = 200, description = "Member added to card", body = MessageResponse<Card>),
        (status = 404, description = "Card or user not found")
    )
)]
pub async fn add_card_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberRequest>,
) -> ApiResult<Json<MessageResponse<Card>>> {
    let card = state.repo.add_card_member(id, payload.member).await?;
    Ok(Json(MessageResponse::with_result("Member added to card", card)))
}

/// remove_card_member
#[utoipa::path(
    put,
    path = "/card/{id}/remove-member",
    params(("id" = Uuid, Path, description = "Card ID")),
    request_body = MemberRequest,
    responses(
        (status = 200, description = "Member removed from card", body = MessageResponse<Card>),
        (status = 404, description = "Card or user not found")
    )
)]
pub async fn remove_card_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberRequest>,
) -> ApiResult<Json<MessageResponse<Card>>> {
    let card = state.repo.remove_card_member(id, payload.member).await?;
    Ok(Json(MessageResponse::with_result("Member removed from card", card)))
}
