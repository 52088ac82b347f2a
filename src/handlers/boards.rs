use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{Board, BoardDetails, BoardRequest, MessageResponse},
};

use super::{expand_board, required};

/// create_board
///
/// [Any role] Creates a board owned by the caller, with no members and empty lanes.
#[utoipa::path(
    post,
    path = "/board/create",
    request_body = BoardRequest,
    responses(
        (status = 201, description = "Board created", body = MessageResponse<Board>),
        (status = 400, description = "name is required")
    )
)]
pub async fn create_board(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<BoardRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse<Board>>)> {
    let name = required(payload.name, "name")?;
    let board = state
        .repo
        .create_board(caller.id, &name, payload.description.as_deref())
        .await?;

    tracing::info!(board = %board.id, owner = %caller.id, "board created");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_result("Board created", board)),
    ))
}

/// update_board
///
/// [Owner or member] Replaces the fields present in the body.
#[utoipa::path(
    put,
    path = "/board/update/{id}",
    params(("id" = Uuid, Path, description = "Board ID")),
    request_body = BoardRequest,
    responses(
        (status = 200, description = "Update successful"),
        (status = 401, description = "Not owner or member"),
        (status = 404, description = "Board not found")
    )
)]
pub async fn update_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BoardRequest>,
) -> ApiResult<Json<MessageResponse<()>>> {
    let name = match payload.name {
        Some(name) => Some(required(Some(name), "name")?),
        None => None,
    };
    if !state
        .repo
        .update_board(id, name.as_deref(), payload.description.as_deref())
        .await?
    {
        return Err(ApiError::not_found("Board"));
    }
    Ok(Json(MessageResponse::message("Update successful")))
}

/// get_board
///
/// [Owner or member] The board with lanes expanded to cards and members expanded to users.
#[utoipa::path(
    get,
    path = "/board/{id}",
    params(("id" = Uuid, Path, description = "Board ID")),
    responses(
        (status = 200, description = "Board", body = BoardDetails),
        (status = 401, description = "Not owner or member"),
        (status = 404, description = "Board not found")
    )
)]
pub async fn get_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BoardDetails>> {
    let board = state
        .repo
        .get_board(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Board"))?;
    Ok(Json(expand_board(&state.repo, board).await?))
}

/// list_boards
///
/// [Developer | Admin] Every board, expanded.
#[utoipa::path(
    get,
    path = "/board",
    responses((status = 200, description = "Boards", body = [BoardDetails]))
)]
pub async fn list_boards(State(state): State<AppState>) -> ApiResult<Json<Vec<BoardDetails>>> {
    let boards = state.repo.list_boards().await?;
    let mut expanded = Vec::with_capacity(boards.len());
    for board in boards {
        expanded.push(expand_board(&state.repo, board).await?);
    }
    Ok(Json(expanded))
}

/// delete_board
///
/// [Owner only] Deletes the board and every card on it.
#[utoipa::path(
    delete,
    path = "/board/delete/{id}",
    params(("id" = Uuid, Path, description = "Board ID")),
    responses(
        (status = 200, description = "Delete successful"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Board not found")
    )
)]
pub async fn delete_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse<()>>> {
    if !state.repo.delete_board(id).await? {
        return Err(ApiError::not_found("Board"));
    }
    tracing::info!(board = %id, "board deleted with its cards");
    Ok(Json(MessageResponse::message("Delete successful")))
}

/// add_board_member
///
/// [Owner or member] Adds `user_id` to the member set. Adding twice is a no-op.
#[utoipa::path(
    put,
    path = "/board/{id}/add-user/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Board ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses((status = 200, description = "Update successful", body = MessageResponse<Board>))
)]
pub async fn add_board_member(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse<Board>>> {
    if !state.repo.add_board_member(id, user_id).await? {
        return Err(ApiError::not_found("Board"));
    }
    updated_board(&state, id).await
}

/// remove_board_member
///
/// [Owner or member] Removes `user_id` from the member set if present.
#[utoipa::path(
    put,
    path = "/board/{id}/remove-user/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Board ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses((status = 200, description = "Update successful", body = MessageResponse<Board>))
)]
pub async fn remove_board_member(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse<Board>>> {
    if !state.repo.remove_board_member(id, user_id).await? {
        return Err(ApiError::not_found("Board"));
    }
    updated_board(&state, id).await
}

async fn updated_board(state: &AppState, id: Uuid) -> ApiResult<Json<MessageResponse<Board>>> {
    let board = state
        .repo
        .get_board(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Board"))?;
    Ok(Json(MessageResponse::with_result("Update successful", board)))
}
