use crate::models::{Board, Card, CardChanges, Lane, NewCard, User, UserChanges, UserCredentials};
use crate::role::Role;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

/// RepoError
///
/// Storage-level failures. `NotFound` names an entity a multi-step write depends on
/// (a card's board, a member's user); plain lookups report absence as `Ok(None)` instead.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return match db_err.constraint() {
                    Some(c) if c.contains("email") => {
                        RepoError::Conflict("Email already exists".to_string())
                    }
                    Some(c) => RepoError::Conflict(format!("Constraint violation: {c}")),
                    None => RepoError::Conflict("Duplicate value".to_string()),
                };
            }
        }
        RepoError::Database(err.to_string())
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository Trait
///
/// The persistence contract for users, boards and cards. Handlers and gates only see
/// `Arc<dyn Repository>`, so the Postgres implementation and the in-memory one are
/// interchangeable.
///
/// Every method that touches more than one row is atomic in each implementation:
/// card create + lane push, card delete + lane pull, board delete + card cascade.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> RepoResult<User>;
    async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_users(&self, ids: &[Uuid]) -> RepoResult<Vec<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    /// `Ok(false)` when no such user exists.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<bool>;
    async fn delete_user(&self, id: Uuid) -> RepoResult<bool>;

    // --- Boards ---
    async fn create_board(&self, owner: Uuid, name: &str, description: Option<&str>) -> RepoResult<Board>;
    async fn get_board(&self, id: Uuid) -> RepoResult<Option<Board>>;
    async fn list_boards(&self) -> RepoResult<Vec<Board>>;
    async fn update_board(&self, id: Uuid, name: Option<&str>, description: Option<&str>) -> RepoResult<bool>;
    /// Deletes the board and, in the same step, every card whose `board` is `id`.
    async fn delete_board(&self, id: Uuid) -> RepoResult<bool>;
    /// Set-add; adding an existing member is a no-op.
    async fn add_board_member(&self, id: Uuid, user: Uuid) -> RepoResult<bool>;
    async fn remove_board_member(&self, id: Uuid, user: Uuid) -> RepoResult<bool>;

    // --- Cards ---
    /// Inserts the card and appends its id to `lane` of its board atomically.
    /// `NotFound("Board")` if the board does not exist; nothing is written then.
    async fn create_card(&self, card: NewCard, lane: Lane) -> RepoResult<Card>;
    async fn get_card(&self, id: Uuid) -> RepoResult<Option<Card>>;
    async fn get_cards(&self, ids: &[Uuid]) -> RepoResult<Vec<Card>>;
    async fn list_cards(&self) -> RepoResult<Vec<Card>>;
    /// Field replace. A new `board` relocates the card id into the same lane on the
    /// new board (todo if it was in none). `Ok(None)` when the card does not exist.
    async fn update_card(&self, id: Uuid, changes: CardChanges) -> RepoResult<Option<Card>>;
    /// Deletes the card and pulls its id from its board's lanes.
    async fn delete_card(&self, id: Uuid) -> RepoResult<bool>;
    /// Pulls the card id from all three lanes of its board and appends it to `lane`.
    /// Returns the updated board.
    async fn move_card(&self, id: Uuid, lane: Lane) -> RepoResult<Board>;
    /// `NotFound("Card")` / `NotFound("User")` when either side is missing.
    async fn add_card_member(&self, id: Uuid, user: Uuid) -> RepoResult<Card>;
    async fn remove_card_member(&self, id: Uuid, user: Uuid) -> RepoResult<Card>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, email, role";
const BOARD_COLUMNS: &str = "id, name, description, owner, members, todo_cards, doing_cards, done_cards";
const CARD_COLUMNS: &str = "id, title, description, board_id, members";

/// Column holding `lane` on `boards`. Only ever interpolated from this closed set.
fn lane_column(lane: Lane) -> &'static str {
    match lane {
        Lane::Todo => "todo_cards",
        Lane::Doing => "doing_cards",
        Lane::Done => "done_cards",
    }
}

/// PostgresRepository
///
/// The production implementation backed by PostgreSQL. Lane and member sets are `uuid[]`
/// columns mutated with `array_remove`/`array_append` inside single statements, so each
/// update is atomic on the row without read-modify-write races.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pull `card` from every lane of `board`, then append it to `lane`.
    async fn place_in_lane(
        tx: &mut Transaction<'_, Postgres>,
        board: Uuid,
        card: Uuid,
        lane: Lane,
    ) -> RepoResult<Option<Board>> {
        Self::pull_from_lanes(tx, board, card).await?;

        let target = lane_column(lane);
        let sql = format!(
            "UPDATE boards SET {target} = array_append({target}, $2) WHERE id = $1 RETURNING {BOARD_COLUMNS}"
        );
        let board = sqlx::query_as::<_, Board>(&sql)
            .bind(board)
            .bind(card)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(board)
    }

    async fn pull_from_lanes(tx: &mut Transaction<'_, Postgres>, board: Uuid, card: Uuid) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE boards SET
                todo_cards = array_remove(todo_cards, $2),
                doing_cards = array_remove(doing_cards, $2),
                done_cards = array_remove(done_cards, $2)
            WHERE id = $1
            "#,
        )
        .bind(board)
        .bind(card)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> RepoResult<User> {
        let sql = format!("INSERT INTO users (id, email, password, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(password_hash)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        let creds = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(creds)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn get_users(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, User>(&sql).bind(ids).fetch_all(&self.pool).await?)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY email");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                password = COALESCE($3, password),
                role = COALESCE($4, role)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.role.map(|r| r.as_str()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_board(&self, owner: Uuid, name: &str, description: Option<&str>) -> RepoResult<Board> {
        let sql = format!(
            "INSERT INTO boards (id, name, description, owner) VALUES ($1, $2, $3, $4) RETURNING {BOARD_COLUMNS}"
        );
        let board = sqlx::query_as::<_, Board>(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(description)
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(board)
    }

    async fn get_board(&self, id: Uuid) -> RepoResult<Option<Board>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = $1");
        Ok(sqlx::query_as::<_, Board>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn list_boards(&self) -> RepoResult<Vec<Board>> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards ORDER BY name");
        Ok(sqlx::query_as::<_, Board>(&sql).fetch_all(&self.pool).await?)
    }

    async fn update_board(&self, id: Uuid, name: Option<&str>, description: Option<&str>) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE boards SET name = COALESCE($2, name), description = COALESCE($3, description) WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_board(&self, id: Uuid) -> RepoResult<bool> {
        // cards.board_id is declared ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_board_member(&self, id: Uuid, user: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE boards
            SET members = CASE WHEN $2 = ANY(members) THEN members ELSE array_append(members, $2) END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(user)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_board_member(&self, id: Uuid, user: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE boards SET members = array_remove(members, $2) WHERE id = $1")
            .bind(id)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_card(&self, card: NewCard, lane: Lane) -> RepoResult<Card> {
        let mut tx = self.pool.begin().await?;

        // Lock the board row so a concurrent delete cannot slip between the two writes.
        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM boards WHERE id = $1 FOR UPDATE")
            .bind(card.board)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepoError::NotFound("Board"));
        }

        let sql = format!(
            "INSERT INTO cards (id, title, description, board_id) VALUES ($1, $2, $3, $4) RETURNING {CARD_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Card>(&sql)
            .bind(Uuid::new_v4())
            .bind(&card.title)
            .bind(&card.description)
            .bind(card.board)
            .fetch_one(&mut *tx)
            .await?;

        let target = lane_column(lane);
        let sql = format!("UPDATE boards SET {target} = array_append({target}, $2) WHERE id = $1");
        sqlx::query(&sql)
            .bind(card.board)
            .bind(created.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_card(&self, id: Uuid) -> RepoResult<Option<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1");
        Ok(sqlx::query_as::<_, Card>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn get_cards(&self, ids: &[Uuid]) -> RepoResult<Vec<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, Card>(&sql).bind(ids).fetch_all(&self.pool).await?)
    }

    async fn list_cards(&self) -> RepoResult<Vec<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards ORDER BY title");
        Ok(sqlx::query_as::<_, Card>(&sql).fetch_all(&self.pool).await?)
    }

    async fn update_card(&self, id: Uuid, changes: CardChanges) -> RepoResult<Option<Card>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1 FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, Card>(&sql).bind(id).fetch_optional(&mut *tx).await? else {
            return Ok(None);
        };

        if let Some(new_board) = changes.board.filter(|b| *b != current.board) {
            let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = $1 FOR UPDATE");
            let old = sqlx::query_as::<_, Board>(&sql)
                .bind(current.board)
                .fetch_optional(&mut *tx)
                .await?;
            let lane = old.and_then(|b| b.lane_of(id)).unwrap_or(Lane::Todo);

            Self::pull_from_lanes(&mut tx, current.board, id).await?;
            if Self::place_in_lane(&mut tx, new_board, id, lane).await?.is_none() {
                return Err(RepoError::NotFound("Board"));
            }
        }

        let sql = format!(
            r#"
            UPDATE cards
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                board_id = COALESCE($4, board_id)
            WHERE id = $1
            RETURNING {CARD_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Card>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.board)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_card(&self, id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let board = sqlx::query_scalar::<_, Uuid>("DELETE FROM cards WHERE id = $1 RETURNING board_id")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(board) = board else {
            return Ok(false);
        };

        Self::pull_from_lanes(&mut tx, board, id).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn move_card(&self, id: Uuid, lane: Lane) -> RepoResult<Board> {
        let mut tx = self.pool.begin().await?;

        let board = sqlx::query_scalar::<_, Uuid>("SELECT board_id FROM cards WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepoError::NotFound("Card"))?;

        let updated = Self::place_in_lane(&mut tx, board, id, lane)
            .await?
            .ok_or(RepoError::NotFound("Board"))?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn add_card_member(&self, id: Uuid, user: Uuid) -> RepoResult<Card> {
        if self.get_card(id).await?.is_none() {
            return Err(RepoError::NotFound("Card"));
        }
        if self.get_user(user).await?.is_none() {
            return Err(RepoError::NotFound("User"));
        }

        let sql = format!(
            r#"
            UPDATE cards
            SET members = CASE WHEN $2 = ANY(members) THEN members ELSE array_append(members, $2) END
            WHERE id = $1
            RETURNING {CARD_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Card>(&sql)
            .bind(id)
            .bind(user)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound("Card"))
    }

    async fn remove_card_member(&self, id: Uuid, user: Uuid) -> RepoResult<Card> {
        if self.get_card(id).await?.is_none() {
            return Err(RepoError::NotFound("Card"));
        }
        if self.get_user(user).await?.is_none() {
            return Err(RepoError::NotFound("User"));
        }

        let sql = format!("UPDATE cards SET members = array_remove(members, $2) WHERE id = $1 RETURNING {CARD_COLUMNS}");
        sqlx::query_as::<_, Card>(&sql)
            .bind(id)
            .bind(user)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound("Card"))
    }
}
