use axum::{extract::State, routing::get, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use crate::{app_state::AppState, middleware::csrf::CSRF_COOKIE};

pub fn router() -> Router<AppState> {
    Router::new().route("/csrf", get(issue_csrf))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenResponse {
    csrf_token: String,
}

/// Hand out a fresh double-submit token: the client stores the cookie and
/// echoes the body value in `x-csrf-token` on state-changing requests.
async fn issue_csrf(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<CsrfTokenResponse>) {
    let token = state.csrf.issue();

    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .http_only(true)
        .secure(state.cookies.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build();

    (jar.add(cookie), Json(CsrfTokenResponse { csrf_token: token }))
}
