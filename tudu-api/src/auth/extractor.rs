use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use crate::{app_state::AppState, domain::models::UserId, routes::ApiError};

use super::ACCESS_TOKEN_COOKIE;

/// A custom Axum extractor for the authenticated caller, decoded from the
/// access-token cookie. Returns 401 Unauthorized when the cookie is absent
/// or the token does not verify.
///
/// Identity always comes from here, never from a request body.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let claims = state
            .jwt
            .verify(&token)
            .map_err(|_| ApiError::unauthorized("Not authenticated"))?;

        Ok(AuthUser {
            id: UserId::new(claims.sub),
            username: claims.username,
        })
    }
}
