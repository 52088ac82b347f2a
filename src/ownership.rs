use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, Denial},
    models::Board,
    repository::RepositoryState,
};

/// Which entity the `{id}` path parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Board,
    Card,
}

impl Target {
    fn label(&self) -> &'static str {
        match self {
            Target::Board => "Board",
            Target::Card => "Card",
        }
    }
}

/// OwnershipGate
///
/// State for one `ownership_gate` layer. Access is always decided at the board level:
/// for card routes the card is loaded first and its parent board is checked.
#[derive(Clone)]
pub struct OwnershipGate {
    pub repo: RepositoryState,
    pub target: Target,
    pub owner_only: bool,
}

impl OwnershipGate {
    pub fn new(repo: RepositoryState, target: Target, owner_only: bool) -> Self {
        Self {
            repo,
            target,
            owner_only,
        }
    }

    /// resolve_board
    ///
    /// Loads the board governing `id`. A missing card is reported before a missing board.
    /// Storage failures surface as `Internal`, never as not-found.
    pub async fn resolve_board(&self, id: Uuid) -> Result<Board, ApiError> {
        let board_id = match self.target {
            Target::Board => id,
            Target::Card => {
                self.repo
                    .get_card(id)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Card"))?
                    .board
            }
        };

        self.repo
            .get_board(board_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Board"))
    }

    /// check
    ///
    /// The whole gate for one caller and one path id, independent of axum.
    pub async fn check(&self, caller: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let board = self.resolve_board(id).await?;
        authorize(caller, &board, self.owner_only)
    }
}

/// authorize
///
/// Developer and Admin pass unconditionally. A plain User must own the board, or, unless
/// `owner_only`, be one of its members.
pub fn authorize(caller: &AuthUser, board: &Board, owner_only: bool) -> Result<(), ApiError> {
    if caller.role.is_privileged() {
        return Ok(());
    }

    let allowed = if owner_only {
        board.is_owner(caller.id)
    } else {
        board.is_owner_or_member(caller.id)
    };

    if allowed {
        Ok(())
    } else {
        tracing::debug!(caller = %caller.id, board = %board.id, owner_only, "ownership check failed");
        Err(ApiError::Forbidden(Denial::Ownership))
    }
}

/// ownership_gate
///
/// Route-layer middleware; must sit inside `auth_gate` so the caller is already resolved.
/// Reads the `{id}` path parameter of the matched route.
pub async fn ownership_gate(
    State(gate): State<OwnershipGate>,
    Path(params): Path<HashMap<String, String>>,
    caller: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // An id that is not a UUID cannot name a stored entity.
    let id = params
        .get("id")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| ApiError::not_found(gate.target.label()))?;

    gate.check(&caller, id).await?;
    Ok(next.run(request).await)
}
