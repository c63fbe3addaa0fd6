use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::{self, ACCESS_TOKEN_COOKIE},
    domain::{models::UserId, AuthError},
    repositories::{NewUser, RepositoryError, UserRepository},
    routes::{ApiError, MessageResponse},
};

/// The access token itself outlives this on purpose; an idle session falls
/// back to a fresh login once the cookie lapses.
const ACCESS_COOKIE_MAX_AGE: Duration = Duration::minutes(15);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(length(min = 3, max = 30, message = "username must be 3-30 characters"))]
    username: String,
    #[validate(email(message = "email is not valid"))]
    #[validate(length(max = 254, message = "email must be at most 254 characters"))]
    email: String,
    #[validate(length(min = 8, max = 72, message = "password must be 8-72 characters"))]
    password: String,
}

impl RegisterRequest {
    fn trimmed(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    id: UserId,
    username: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let body = body.trimmed();
    body.validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let cost = state.bcrypt_cost;
    let password = body.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || auth::hash_password(&password, cost))
        .await
        .map_err(|err| ApiError::internal(format!("password hashing task failed: {err}")))??;

    let new_user = NewUser::new(body.username.clone(), body.email.clone(), password_hash);
    match state.user_repo.create_user(&new_user).await {
        Ok(user) => Ok((
            StatusCode::CREATED,
            Json(RegisterResponse {
                id: user.id,
                username: user.username,
                email: user.email,
            }),
        )),
        Err(RepositoryError::Conflict(_)) => {
            // Name the offending field(s) instead of a bare conflict.
            let taken = state
                .user_repo
                .conflicting_fields(&body.username, &body.email)
                .await
                .unwrap_or_default();

            let message = if taken.is_empty() {
                "username or email already in use".to_string()
            } else {
                format!("{} already in use", taken.join(", "))
            };
            Err(ApiError::conflict(message))
        }
        Err(err) => Err(err.into()),
    }
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    // Same error for an unknown email and a wrong password; the response
    // must not reveal which one it was.
    let user = state
        .user_repo
        .find_by_email(&body.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let password = body.password;
    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|err| ApiError::internal(format!("password verification task failed: {err}")))??;

    if !matches {
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.jwt.issue(&user.id, &user.username)?;
    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .http_only(true)
        .secure(state.cookies.secure)
        .same_site(SameSite::Lax)
        .max_age(ACCESS_COOKIE_MAX_AGE)
        .path("/")
        .build();

    Ok((
        jar.add(cookie),
        Json(MessageResponse {
            message: "login successful",
        }),
    ))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let removal = Cookie::build((ACCESS_TOKEN_COOKIE, "")).path("/").build();

    (
        jar.remove(removal),
        Json(MessageResponse {
            message: "logout successful",
        }),
    )
}
