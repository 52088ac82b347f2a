use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{CredentialsRequest, LoginResponse, MessageResponse, UpdateUserRequest, User, UserChanges},
    password::PasswordHasher,
    role::Role,
};

use super::required;

/// register_user
///
/// [Public Route] Creates an account with role `User`. The password is hashed with the
/// configured Argon2 cost before it reaches storage.
#[utoipa::path(
    post,
    path = "/user/register",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse<User>),
        (status = 400, description = "Missing email or password"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse<User>>)> {
    let email = required(Some(payload.email), "email")?;
    if payload.password.is_empty() {
        return Err(ApiError::Validation("password is required".to_string()));
    }

    let hash = state.passwords.hash(payload.password).await?;
    let user = state.repo.create_user(&email, &hash, Role::User).await?;

    tracing::info!(user = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_result("User created", user)),
    ))
}

/// login
///
/// [Public Route] Exchanges email + password for a signed credential. Unknown email and
/// wrong password are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/user/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Auth successful", body = LoginResponse),
        (status = 401, description = "Auth failed")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let Some(creds) = state.repo.find_credentials(payload.email.trim()).await? else {
        state.passwords.dummy_verify(payload.password).await?;
        return Err(ApiError::Unauthenticated);
    };

    if !PasswordHasher::verify(payload.password, creds.password.clone()).await? {
        return Err(ApiError::Unauthenticated);
    }

    let token = state.tokens.issue(creds.id, &creds.email, creds.role)?;
    Ok(Json(LoginResponse {
        message: "Auth successful".to_string(),
        token,
        user: creds.summary(),
    }))
}

/// update_user
///
/// [User | Developer | Admin] Replaces email/role and re-hashes the password when one is
/// supplied. Not scoped to the caller's own id.
#[utoipa::path(
    put,
    path = "/user/update/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Update successful"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<MessageResponse<()>>> {
    let email = match payload.email {
        Some(email) => Some(required(Some(email), "email")?),
        None => None,
    };
    let password_hash = match payload.password.filter(|p| !p.is_empty()) {
        Some(password) => Some(state.passwords.hash(password).await?),
        None => None,
    };

    let changes = UserChanges {
        email,
        password_hash,
        role: payload.role,
    };
    if !state.repo.update_user(id, changes).await? {
        return Err(ApiError::not_found("User"));
    }
    Ok(Json(MessageResponse::message("Update successful")))
}

/// delete_user
///
/// [Developer | Admin] Removes the account. Boards it owns are removed with it.
#[utoipa::path(
    delete,
    path = "/user/delete/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Delete successful"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse<()>>> {
    if !state.repo.delete_user(id).await? {
        return Err(ApiError::not_found("User"));
    }
    tracing::info!(user = %id, "user deleted");
    Ok(Json(MessageResponse::message("Delete successful")))
}

/// get_user
///
/// [Developer | Admin] One account, without its password hash.
#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<User>> {
    state
        .repo
        .get_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User"))
}

/// list_users
///
/// [User | Developer | Admin] Every account, without password hashes.
#[utoipa::path(
    get,
    path = "/user",
    responses((status = 200, description = "Users", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users().await?))
}
