use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::role::Role;

// --- Core Schemas (Mapped to Database) ---

/// User
///
/// The public view of an account. The password hash lives only in `UserCredentials`,
/// so no response built from this type can leak it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// UserCredentials
///
/// Internal row used by login. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

impl UserCredentials {
    pub fn summary(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Lane
///
/// One of the three buckets of card ids on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Lane {
    Todo,
    Doing,
    Done,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Todo, Lane::Doing, Lane::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Todo => "todo",
            Lane::Doing => "doing",
            Lane::Done => "done",
        }
    }
}

/// Board
///
/// Owner, member ids and the three lane arrays. Invariant: a card id appears in at most
/// one lane. Every repository write that touches lanes preserves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Board {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner: Uuid,
    pub members: Vec<Uuid>,
    pub todo_cards: Vec<Uuid>,
    pub doing_cards: Vec<Uuid>,
    pub done_cards: Vec<Uuid>,
}

impl Board {
    pub fn lane(&self, lane: Lane) -> &Vec<Uuid> {
        match lane {
            Lane::Todo => &self.todo_cards,
            Lane::Doing => &self.doing_cards,
            Lane::Done => &self.done_cards,
        }
    }

    pub fn lane_mut(&mut self, lane: Lane) -> &mut Vec<Uuid> {
        match lane {
            Lane::Todo => &mut self.todo_cards,
            Lane::Doing => &mut self.doing_cards,
            Lane::Done => &mut self.done_cards,
        }
    }

    /// The lane currently holding `card`, if any.
    pub fn lane_of(&self, card: Uuid) -> Option<Lane> {
        Lane::ALL.into_iter().find(|lane| self.lane(*lane).contains(&card))
    }

    /// Pulls `card` from every lane, then appends it to `target`.
    /// Leaves the card in exactly one lane whatever state the arrays were in before.
    pub fn place_card(&mut self, card: Uuid, target: Lane) {
        self.remove_card(card);
        self.lane_mut(target).push(card);
    }

    pub fn remove_card(&mut self, card: Uuid) {
        for lane in Lane::ALL {
            self.lane_mut(lane).retain(|id| *id != card);
        }
    }

    pub fn is_owner(&self, user: Uuid) -> bool {
        self.owner == user
    }

    pub fn is_owner_or_member(&self, user: Uuid) -> bool {
        self.is_owner(user) || self.members.contains(&user)
    }
}

/// Card
///
/// `board` is the back-reference to the parent board; lane placement lives on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Card {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(rename = "board_id")]
    pub board: Uuid,
    pub members: Vec<Uuid>,
}

// --- Expanded Output Schemas ---

/// BoardDetails
///
/// A board with its lanes resolved to cards and its members resolved to users
/// (password hashes stripped by construction).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BoardDetails {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner: Uuid,
    pub members: Vec<User>,
    pub todo_cards: Vec<Card>,
    pub doing_cards: Vec<Card>,
    pub done_cards: Vec<Card>,
}

/// CardDetails
///
/// A card with its members resolved to users.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CardDetails {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub board: Uuid,
    pub members: Vec<User>,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// UpdateUserRequest
///
/// `password` is re-hashed when present; `email` and `role` are replaced.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Already-hashed user changes handed to the repository.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

/// BoardRequest
///
/// Payload for both board create and update. Create requires a non-blank `name`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BoardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// CardRequest
///
/// Payload for card create (all of `title` and `board` required) and update (partial).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<Uuid>,
}

/// Validated card fields handed to the repository on create.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub title: String,
    pub description: Option<String>,
    pub board: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct CardChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub board: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MemberRequest {
    pub member: Uuid,
}

// --- Response Envelopes ---

/// MessageResponse
///
/// `{ message }` or `{ message, result }`, the envelope every mutating route answers with.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse<T> {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> MessageResponse<T> {
    pub fn with_result(message: &str, result: T) -> Self {
        Self {
            message: message.to_string(),
            result: Some(result),
        }
    }
}

impl MessageResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            message: message.to_string(),
            result: None,
        }
    }
}

/// LoginResponse
///
/// Answer to a successful login: the signed credential plus a user summary.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}
