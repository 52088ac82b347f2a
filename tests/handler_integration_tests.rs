use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use kanban_backend::{
    ApiError, AppConfig, AppState, AuthUser, InMemoryRepository, Repository, RepositoryState, Role,
    config::PasswordHashConfig,
    handlers::{boards, cards, users},
    models::{Board, BoardRequest, CardRequest, CredentialsRequest, Lane, MemberRequest, UpdateUserRequest},
};
use std::sync::Arc;
use uuid::Uuid;

// --- Test Helpers ---

/// AppState over a fresh in-memory repository. The concrete handle is returned too so
/// tests can seed and inspect storage directly.
fn create_test_state() -> (AppState, Arc<InMemoryRepository>) {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState::new(repo.clone() as RepositoryState, AppConfig::default());
    (state, repo)
}

fn credentials(email: &str, password: &str) -> CredentialsRequest {
    CredentialsRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

async fn seed_user(repo: &InMemoryRepository, email: &str, role: Role) -> AuthUser {
    let user = repo.create_user(email, "unused-hash", role).await.unwrap();
    AuthUser {
        id: user.id,
        email: user.email,
        role: user.role,
    }
}

async fn seed_board(state: &AppState, owner: &AuthUser) -> Board {
    let request = BoardRequest {
        name: Some("Sprint".to_string()),
        description: None,
    };
    let (_, Json(body)) = boards::create_board(owner.clone(), State(state.clone()), Json(request))
        .await
        .unwrap();
    body.result.unwrap()
}

fn card_request(title: &str, board: Uuid) -> CardRequest {
    CardRequest {
        title: Some(title.to_string()),
        description: None,
        board: Some(board),
    }
}

async fn seed_card(state: &AppState, board: Uuid, title: &str) -> Uuid {
    let (_, Json(body)) = cards::create_todo_card(State(state.clone()), Json(card_request(title, board)))
        .await
        .unwrap();
    body.result.unwrap().id
}

// --- User Handlers ---

#[tokio::test]
async fn test_register_then_login() {
    let (state, _) = create_test_state();

    let (status, Json(body)) =
        users::register_user(State(state.clone()), Json(credentials("new@example.com", "pw")))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.message, "User created");
    let user = body.result.unwrap();
    assert_eq!(user.role, Role::User);

    let Json(login) = users::login(State(state.clone()), Json(credentials("new@example.com", "pw")))
        .await
        .unwrap();
    assert_eq!(login.message, "Auth successful");
    assert_eq!(login.user, user);

    let claims = state.tokens.verify(&login.token).unwrap();
    assert_eq!(claims.user_id, user.id);
    assert_eq!(claims.user_role, Role::User);
}

#[tokio::test]
async fn test_register_stores_a_hash_not_the_password() {
    let (state, repo) = create_test_state();
    users::register_user(State(state), Json(credentials("h@example.com", "plaintext")))
        .await
        .unwrap();

    let stored = repo.find_credentials("h@example.com").await.unwrap().unwrap();
    assert_ne!(stored.password, "plaintext");
    assert!(stored.password.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_blanks() {
    let (state, _) = create_test_state();
    users::register_user(State(state.clone()), Json(credentials("dup@example.com", "pw")))
        .await
        .unwrap();

    let duplicate = users::register_user(State(state.clone()), Json(credentials("dup@example.com", "pw"))).await;
    assert!(matches!(duplicate, Err(ApiError::Conflict(_))));

    let blank_email = users::register_user(State(state.clone()), Json(credentials("  ", "pw"))).await;
    assert!(matches!(blank_email, Err(ApiError::Validation(_))));

    let blank_password = users::register_user(State(state), Json(credentials("x@example.com", ""))).await;
    assert!(matches!(blank_password, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (state, _) = create_test_state();
    users::register_user(State(state.clone()), Json(credentials("known@example.com", "right")))
        .await
        .unwrap();

    let wrong_password = users::login(State(state.clone()), Json(credentials("known@example.com", "wrong"))).await;
    let unknown_email = users::login(State(state), Json(credentials("ghost@example.com", "right"))).await;

    assert!(matches!(wrong_password, Err(ApiError::Unauthenticated)));
    assert!(matches!(unknown_email, Err(ApiError::Unauthenticated)));
}

#[tokio::test]
async fn test_unknown_email_login_still_runs_the_hasher() {
    // A cost argon2 rejects makes every hash computation observable as an Internal error.
    let config = AppConfig {
        password_hash: PasswordHashConfig {
            memory_kib: 1,
            ..PasswordHashConfig::fast()
        },
        ..AppConfig::default()
    };
    let state = AppState::new(Arc::new(InMemoryRepository::new()) as RepositoryState, config);

    let unknown_email = users::login(State(state), Json(credentials("ghost@example.com", "pw"))).await;
    assert!(matches!(unknown_email, Err(ApiError::Internal(_))));
}

#[tokio::test]
async fn test_update_user_rehashes_password() {
    let (state, repo) = create_test_state();
    users::register_user(State(state.clone()), Json(credentials("u@example.com", "old")))
        .await
        .unwrap();
    let id = repo.find_credentials("u@example.com").await.unwrap().unwrap().id;

    let request = UpdateUserRequest {
        password: Some("new".to_string()),
        role: Some(Role::Developer),
        ..UpdateUserRequest::default()
    };
    let Json(body) = users::update_user(State(state.clone()), Path(id), Json(request))
        .await
        .unwrap();
    assert_eq!(body.message, "Update successful");

    assert!(users::login(State(state.clone()), Json(credentials("u@example.com", "old"))).await.is_err());
    let Json(login) = users::login(State(state), Json(credentials("u@example.com", "new")))
        .await
        .unwrap();
    assert_eq!(login.user.role, Role::Developer);
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let (state, _) = create_test_state();

    let get = users::get_user(State(state.clone()), Path(Uuid::new_v4())).await;
    assert!(matches!(get, Err(ApiError::NotFound(m)) if m == "User not found"));

    let update = users::update_user(
        State(state.clone()),
        Path(Uuid::new_v4()),
        Json(UpdateUserRequest::default()),
    )
    .await;
    assert!(matches!(update, Err(ApiError::NotFound(_))));

    let delete = users::delete_user(State(state), Path(Uuid::new_v4())).await;
    assert!(matches!(delete, Err(ApiError::NotFound(_))));
}

// --- Board Handlers ---

#[tokio::test]
async fn test_create_board_sets_owner_and_empty_lanes() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;

    let board = seed_board(&state, &owner).await;
    assert_eq!(board.owner, owner.id);
    assert!(board.members.is_empty());
    assert!(board.todo_cards.is_empty() && board.doing_cards.is_empty() && board.done_cards.is_empty());
}

#[tokio::test]
async fn test_create_board_requires_name() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;

    let result = boards::create_board(owner, State(state), Json(BoardRequest::default())).await;
    assert!(matches!(result, Err(ApiError::Validation(m)) if m == "name is required"));
}

#[tokio::test]
async fn test_get_board_expands_lanes_in_order_and_members() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;
    let member = seed_user(&repo, "member@example.com", Role::User).await;
    let board = seed_board(&state, &owner).await;

    let first = seed_card(&state, board.id, "first").await;
    let second = seed_card(&state, board.id, "second").await;
    boards::add_board_member(State(state.clone()), Path((board.id, member.id)))
        .await
        .unwrap();

    let Json(details) = boards::get_board(State(state), Path(board.id)).await.unwrap();
    let todo: Vec<Uuid> = details.todo_cards.iter().map(|c| c.id).collect();
    assert_eq!(todo, vec![first, second]);
    assert_eq!(details.members.len(), 1);
    assert_eq!(details.members[0].email, "member@example.com");
}

#[tokio::test]
async fn test_board_member_add_is_idempotent() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;
    let board = seed_board(&state, &owner).await;
    let member = Uuid::new_v4();

    boards::add_board_member(State(state.clone()), Path((board.id, member)))
        .await
        .unwrap();
    let Json(body) = boards::add_board_member(State(state.clone()), Path((board.id, member)))
        .await
        .unwrap();
    assert_eq!(body.result.unwrap().members, vec![member]);

    let Json(body) = boards::remove_board_member(State(state), Path((board.id, member)))
        .await
        .unwrap();
    assert!(body.result.unwrap().members.is_empty());
}

#[tokio::test]
async fn test_delete_board_cascades_to_cards() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;
    let board = seed_board(&state, &owner).await;
    let card = seed_card(&state, board.id, "doomed").await;

    let Json(body) = boards::delete_board(State(state.clone()), Path(board.id))
        .await
        .unwrap();
    assert_eq!(body.message, "Delete successful");

    assert!(repo.get_card(card).await.unwrap().is_none());
    assert!(repo.list_cards().await.unwrap().iter().all(|c| c.board != board.id));
}

// --- Card Handlers ---

#[tokio::test]
async fn test_create_card_validation_and_missing_board() {
    let (state, _) = create_test_state();

    let no_board = CardRequest {
        title: Some("t".to_string()),
        ..CardRequest::default()
    };
    let result = cards::create_todo_card(State(state.clone()), Json(no_board)).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));

    let no_title = CardRequest {
        board: Some(Uuid::new_v4()),
        ..CardRequest::default()
    };
    let result = cards::create_todo_card(State(state.clone()), Json(no_title)).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));

    let result = cards::create_done_card(State(state), Json(card_request("t", Uuid::new_v4()))).await;
    assert!(matches!(result, Err(ApiError::NotFound(m)) if m == "Board not found"));
}

#[tokio::test]
async fn test_create_card_lands_in_requested_lane() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;
    let board = seed_board(&state, &owner).await;

    let (status, Json(body)) = cards::create_doing_card(State(state.clone()), Json(card_request("wip", board.id)))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let card = body.result.unwrap();
    assert_eq!(card.board, board.id);

    let stored = repo.get_board(board.id).await.unwrap().unwrap();
    assert_eq!(stored.lane_of(card.id), Some(Lane::Doing));
}

#[tokio::test]
async fn test_move_card_between_lanes() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;
    let board = seed_board(&state, &owner).await;
    let card = seed_card(&state, board.id, "task").await;

    let Json(body) = cards::move_to_doing(State(state.clone()), Path(card)).await.unwrap();
    assert_eq!(body.message, "Card moved to doing");
    let moved = body.result.unwrap();
    assert!(!moved.todo_cards.contains(&card));
    assert_eq!(moved.doing_cards, vec![card]);

    // Any lane to any lane; repeating a move changes nothing.
    let Json(once) = cards::move_to_done(State(state.clone()), Path(card)).await.unwrap();
    let Json(twice) = cards::move_to_done(State(state), Path(card)).await.unwrap();
    assert_eq!(once.result, twice.result);
    assert_eq!(twice.result.unwrap().done_cards, vec![card]);
}

#[tokio::test]
async fn test_move_card_heals_drifted_lanes() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;
    let board = seed_board(&state, &owner).await;
    let card = seed_card(&state, board.id, "drifted").await;

    let mut drifted = repo.get_board(board.id).await.unwrap().unwrap();
    drifted.doing_cards.push(card);
    drifted.done_cards.extend([card, card]);
    repo.put_board(drifted).await;

    let Json(body) = cards::move_to_todo(State(state), Path(card)).await.unwrap();
    let healed = body.result.unwrap();
    assert_eq!(healed.todo_cards, vec![card]);
    assert!(healed.doing_cards.is_empty() && healed.done_cards.is_empty());
}

#[tokio::test]
async fn test_move_missing_card_is_not_found() {
    let (state, _) = create_test_state();
    let result = cards::move_to_todo(State(state), Path(Uuid::new_v4())).await;
    assert!(matches!(result, Err(ApiError::NotFound(m)) if m == "Card not found"));
}

#[tokio::test]
async fn test_delete_card_pulls_it_from_board() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;
    let board = seed_board(&state, &owner).await;
    let card = seed_card(&state, board.id, "gone").await;

    let Json(body) = cards::delete_card(State(state.clone()), Path(card)).await.unwrap();
    assert_eq!(body.message, "Card deleted");

    let Json(details) = boards::get_board(State(state), Path(board.id)).await.unwrap();
    assert!(details.todo_cards.is_empty());
    assert_eq!(repo.get_board(board.id).await.unwrap().unwrap().lane_of(card), None);
}

#[tokio::test]
async fn test_card_members_require_existing_user() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;
    let helper = seed_user(&repo, "helper@example.com", Role::User).await;
    let board = seed_board(&state, &owner).await;
    let card = seed_card(&state, board.id, "pair").await;

    let ghost = MemberRequest { member: Uuid::new_v4() };
    let result = cards::add_card_member(State(state.clone()), Path(card), Json(ghost)).await;
    assert!(matches!(result, Err(ApiError::NotFound(m)) if m == "User not found"));

    let Json(body) = cards::add_card_member(
        State(state.clone()),
        Path(card),
        Json(MemberRequest { member: helper.id }),
    )
    .await
    .unwrap();
    assert_eq!(body.message, "Member added to card");
    assert_eq!(body.result.unwrap().members, vec![helper.id]);

    let Json(details) = cards::get_card(State(state.clone()), Path(card)).await.unwrap();
    assert_eq!(details.members[0].email, "helper@example.com");

    let Json(body) = cards::remove_card_member(State(state), Path(card), Json(MemberRequest { member: helper.id }))
        .await
        .unwrap();
    assert_eq!(body.message, "Member removed from card");
    assert!(body.result.unwrap().members.is_empty());
}

#[tokio::test]
async fn test_update_card_to_new_board_keeps_lane() {
    let (state, repo) = create_test_state();
    let owner = seed_user(&repo, "owner@example.com", Role::User).await;
    let from = seed_board(&state, &owner).await;
    let to = seed_board(&state, &owner).await;
    let card = seed_card(&state, from.id, "travelling").await;
    cards::move_to_doing(State(state.clone()), Path(card)).await.unwrap();

    let request = CardRequest {
        board: Some(to.id),
        ..CardRequest::default()
    };
    let Json(body) = cards::update_card(State(state), Path(card), Json(request)).await.unwrap();
    assert_eq!(body.result.unwrap().board, to.id);

    assert_eq!(repo.get_board(from.id).await.unwrap().unwrap().lane_of(card), None);
    assert_eq!(repo.get_board(to.id).await.unwrap().unwrap().lane_of(card), Some(Lane::Doing));
}

// --- Failure Propagation ---

#[tokio::test]
async fn test_storage_failure_is_internal_error() {
    let repo = Arc::new(InMemoryRepository::new_failing()) as RepositoryState;
    let state = AppState::new(repo, AppConfig::default());

    assert!(matches!(users::list_users(State(state.clone())).await, Err(ApiError::Internal(_))));
    assert!(matches!(boards::list_boards(State(state.clone())).await, Err(ApiError::Internal(_))));
    assert!(matches!(
        cards::get_card(State(state), Path(Uuid::new_v4())).await,
        Err(ApiError::Internal(_))
    ));
}
