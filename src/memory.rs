use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Board, Card, CardChanges, Lane, NewCard, User, UserChanges, UserCredentials};
use crate::repository::{RepoError, RepoResult, Repository};
use crate::role::Role;

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, UserCredentials>,
    boards: HashMap<Uuid, Board>,
    cards: HashMap<Uuid, Card>,
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory behind one `RwLock`. Each method takes
/// the write lock once, so multi-row operations are atomic exactly like their Postgres
/// counterparts. Used by the test suites and for running the API without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
    /// When set, every call fails with `RepoError::Database`.
    fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose every call reports a storage failure.
    pub fn new_failing() -> Self {
        Self {
            store: RwLock::default(),
            fail: true,
        }
    }

    fn check(&self) -> RepoResult<()> {
        if self.fail {
            return Err(RepoError::Database("simulated storage failure".to_string()));
        }
        Ok(())
    }

    /// Test hook: overwrite a stored board verbatim, e.g. to seed drifted lane arrays.
    pub async fn put_board(&self, board: Board) {
        self.store.write().await.boards.insert(board.id, board);
    }
}

fn sorted_by<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> RepoResult<User> {
        self.check()?;
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == email) {
            return Err(RepoError::Conflict("Email already exists".to_string()));
        }
        let creds = UserCredentials {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: password_hash.to_string(),
            role,
        };
        let user = creds.summary();
        store.users.insert(creds.id, creds);
        Ok(user)
    }

    async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(store.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        self.check()?;
        Ok(self.store.read().await.users.get(&id).map(UserCredentials::summary))
    }

    async fn get_users(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| store.users.get(id).map(UserCredentials::summary))
            .collect())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        self.check()?;
        let store = self.store.read().await;
        let users: Vec<User> = store.users.values().map(UserCredentials::summary).collect();
        Ok(sorted_by(users, |u: &User| u.email.clone()))
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.write().await;
        if let Some(email) = &changes.email {
            if store.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(RepoError::Conflict("Email already exists".to_string()));
            }
        }
        let Some(user) = store.users.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password = hash;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        Ok(true)
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.write().await;
        Ok(store.users.remove(&id).is_some())
    }

    async fn create_board(&self, owner: Uuid, name: &str, description: Option<&str>) -> RepoResult<Board> {
        self.check()?;
        let board = Board {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            owner,
            ..Board::default()
        };
        self.store.write().await.boards.insert(board.id, board.clone());
        Ok(board)
    }

    async fn get_board(&self, id: Uuid) -> RepoResult<Option<Board>> {
        self.check()?;
        Ok(self.store.read().await.boards.get(&id).cloned())
    }

    async fn list_boards(&self) -> RepoResult<Vec<Board>> {
        self.check()?;
        let boards: Vec<Board> = self.store.read().await.boards.values().cloned().collect();
        Ok(sorted_by(boards, |b: &Board| b.name.clone()))
    }

    async fn update_board(&self, id: Uuid, name: Option<&str>, description: Option<&str>) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.write().await;
        let Some(board) = store.boards.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(name) = name {
            board.name = name.to_string();
        }
        if let Some(description) = description {
            board.description = Some(description.to_string());
        }
        Ok(true)
    }

    async fn delete_board(&self, id: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.write().await;
        if store.boards.remove(&id).is_none() {
            return Ok(false);
        }
        store.cards.retain(|_, card| card.board != id);
        Ok(true)
    }

    async fn add_board_member(&self, id: Uuid, user: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.write().await;
        let Some(board) = store.boards.get_mut(&id) else {
            return Ok(false);
        };
        if !board.members.contains(&user) {
            board.members.push(user);
        }
        Ok(true)
    }

    async fn remove_board_member(&self, id: Uuid, user: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.write().await;
        let Some(board) = store.boards.get_mut(&id) else {
            return Ok(false);
        };
        board.members.retain(|m| *m != user);
        Ok(true)
    }

    async fn create_card(&self, card: NewCard, lane: Lane) -> RepoResult<Card> {
        self.check()?;
        let mut guard = self.store.write().await;
        let store = &mut *guard;
        let Some(board) = store.boards.get_mut(&card.board) else {
            return Err(RepoError::NotFound("Board"));
        };
        let created = Card {
            id: Uuid::new_v4(),
            title: card.title,
            description: card.description,
            board: card.board,
            members: Vec::new(),
        };
        board.lane_mut(lane).push(created.id);
        store.cards.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_card(&self, id: Uuid) -> RepoResult<Option<Card>> {
        self.check()?;
        Ok(self.store.read().await.cards.get(&id).cloned())
    }

    async fn get_cards(&self, ids: &[Uuid]) -> RepoResult<Vec<Card>> {
        self.check()?;
        let store = self.store.read().await;
        Ok(ids.iter().filter_map(|id| store.cards.get(id).cloned()).collect())
    }

    async fn list_cards(&self) -> RepoResult<Vec<Card>> {
        self.check()?;
        let cards: Vec<Card> = self.store.read().await.cards.values().cloned().collect();
        Ok(sorted_by(cards, |c: &Card| c.title.clone()))
    }

    async fn update_card(&self, id: Uuid, changes: CardChanges) -> RepoResult<Option<Card>> {
        self.check()?;
        let mut store = self.store.write().await;
        let Some(current_board) = store.cards.get(&id).map(|c| c.board) else {
            return Ok(None);
        };

        if let Some(new_board) = changes.board.filter(|b| *b != current_board) {
            if !store.boards.contains_key(&new_board) {
                return Err(RepoError::NotFound("Board"));
            }
            let lane = match store.boards.get_mut(&current_board) {
                Some(old) => {
                    let lane = old.lane_of(id);
                    old.remove_card(id);
                    lane
                }
                None => None,
            };
            if let Some(target) = store.boards.get_mut(&new_board) {
                target.place_card(id, lane.unwrap_or(Lane::Todo));
            }
        }

        let Some(card) = store.cards.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            card.title = title;
        }
        if let Some(description) = changes.description {
            card.description = Some(description);
        }
        if let Some(board) = changes.board {
            card.board = board;
        }
        Ok(Some(card.clone()))
    }

    async fn delete_card(&self, id: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.write().await;
        let Some(card) = store.cards.remove(&id) else {
            return Ok(false);
        };
        if let Some(board) = store.boards.get_mut(&card.board) {
            board.remove_card(id);
        }
        Ok(true)
    }

    async fn move_card(&self, id: Uuid, lane: Lane) -> RepoResult<Board> {
        self.check()?;
        let mut store = self.store.write().await;
        let board_id = store.cards.get(&id).map(|c| c.board).ok_or(RepoError::NotFound("Card"))?;
        let board = store.boards.get_mut(&board_id).ok_or(RepoError::NotFound("Board"))?;
        board.place_card(id, lane);
        Ok(board.clone())
    }

    async fn add_card_member(&self, id: Uuid, user: Uuid) -> RepoResult<Card> {
        self.check()?;
        let mut store = self.store.write().await;
        if !store.cards.contains_key(&id) {
            return Err(RepoError::NotFound("Card"));
        }
        if !store.users.contains_key(&user) {
            return Err(RepoError::NotFound("User"));
        }
        let card = store.cards.get_mut(&id).ok_or(RepoError::NotFound("Card"))?;
        if !card.members.contains(&user) {
            card.members.push(user);
        }
        Ok(card.clone())
    }

    async fn remove_card_member(&self, id: Uuid, user: Uuid) -> RepoResult<Card> {
        self.check()?;
        let mut store = self.store.write().await;
        if !store.cards.contains_key(&id) {
            return Err(RepoError::NotFound("Card"));
        }
        if !store.users.contains_key(&user) {
            return Err(RepoError::NotFound("User"));
        }
        let card = store.cards.get_mut(&id).ok_or(RepoError::NotFound("Card"))?;
        card.members.retain(|m| *m != user);
        Ok(card.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (InMemoryRepository, User, Board) {
        let repo = InMemoryRepository::new();
        let owner = repo.create_user("owner@example.com", "hash", Role::User).await.unwrap();
        let board = repo.create_board(owner.id, "Sprint", None).await.unwrap();
        (repo, owner, board)
    }

    fn new_card(board: Uuid, title: &str) -> NewCard {
        NewCard {
            title: title.to_string(),
            description: None,
            board,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (repo, _, _) = seeded().await;
        let err = repo.create_user("owner@example.com", "other", Role::Admin).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_card_pushes_into_requested_lane() {
        let (repo, _, board) = seeded().await;
        let card = repo.create_card(new_card(board.id, "a"), Lane::Doing).await.unwrap();

        let board = repo.get_board(board.id).await.unwrap().unwrap();
        assert_eq!(board.doing_cards, vec![card.id]);
        assert!(board.todo_cards.is_empty() && board.done_cards.is_empty());
    }

    #[tokio::test]
    async fn create_card_on_missing_board_writes_nothing() {
        let repo = InMemoryRepository::new();
        let err = repo.create_card(new_card(Uuid::new_v4(), "orphan"), Lane::Todo).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound("Board")));
        assert!(repo.list_cards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_card_to_another_board_relocates_lane_entry() {
        let (repo, owner, first) = seeded().await;
        let second = repo.create_board(owner.id, "Next", None).await.unwrap();
        let card = repo.create_card(new_card(first.id, "c"), Lane::Done).await.unwrap();

        let changes = CardChanges {
            board: Some(second.id),
            ..CardChanges::default()
        };
        let updated = repo.update_card(card.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.board, second.id);

        let first = repo.get_board(first.id).await.unwrap().unwrap();
        let second = repo.get_board(second.id).await.unwrap().unwrap();
        assert_eq!(first.lane_of(card.id), None);
        assert_eq!(second.lane_of(card.id), Some(Lane::Done));
    }

    #[tokio::test]
    async fn delete_card_pulls_it_from_lanes() {
        let (repo, _, board) = seeded().await;
        let card = repo.create_card(new_card(board.id, "gone"), Lane::Todo).await.unwrap();

        assert!(repo.delete_card(card.id).await.unwrap());
        let board = repo.get_board(board.id).await.unwrap().unwrap();
        assert_eq!(board.lane_of(card.id), None);
    }

    #[tokio::test]
    async fn board_members_behave_as_a_set() {
        let (repo, owner, board) = seeded().await;
        let member = Uuid::new_v4();
        repo.add_board_member(board.id, member).await.unwrap();
        repo.add_board_member(board.id, member).await.unwrap();
        assert_eq!(repo.get_board(board.id).await.unwrap().unwrap().members, vec![member]);

        repo.remove_board_member(board.id, member).await.unwrap();
        repo.remove_board_member(board.id, owner.id).await.unwrap();
        assert!(repo.get_board(board.id).await.unwrap().unwrap().members.is_empty());
    }

    #[tokio::test]
    async fn delete_user_leaves_owned_boards_and_cards() {
        let (repo, owner, board) = seeded().await;
        let card = repo.create_card(new_card(board.id, "Keep"), Lane::Todo).await.unwrap();

        assert!(repo.delete_user(owner.id).await.unwrap());
        assert!(repo.get_user(owner.id).await.unwrap().is_none());
        assert_eq!(repo.get_board(board.id).await.unwrap().unwrap().todo_cards, vec![card.id]);
        assert!(repo.get_card(card.id).await.unwrap().is_some());
        assert!(!repo.delete_user(owner.id).await.unwrap());
    }

    #[tokio::test]
    async fn failing_repository_reports_database_errors() {
        let repo = InMemoryRepository::new_failing();
        assert!(matches!(repo.get_board(Uuid::new_v4()).await, Err(RepoError::Database(_))));
    }
}
