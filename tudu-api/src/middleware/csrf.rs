use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{app_state::AppState, routes::ApiError};

/// Name of the httpOnly cookie carrying the CSRF token.
pub const CSRF_COOKIE: &str = "csrf_token";
/// Header the client must echo the token back in.
pub const CSRF_HEADER: &str = "x-csrf-token";

type HmacSha256 = Hmac<Sha256>;

/// Double-submit CSRF protection. Tokens are `nonce.tag` where the tag is an
/// HMAC-SHA256 over the nonce, so a token can be checked for authenticity
/// without server-side state.
#[derive(Clone)]
pub struct CsrfProtect {
    secret: Vec<u8>,
}

impl CsrfProtect {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    pub fn issue(&self) -> String {
        let nonce = hex::encode(rand::random::<[u8; 32]>());
        let tag = self.tag(&nonce);
        format!("{nonce}.{tag}")
    }

    pub fn verify(&self, token: &str) -> bool {
        let Some((nonce, tag)) = token.split_once('.') else {
            return false;
        };

        let expected = self.tag(nonce);
        expected.as_bytes().ct_eq(tag.as_bytes()).into()
    }

    fn tag(&self, nonce: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(nonce.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Require a valid double-submitted token on every state-changing request:
/// the `csrf_token` cookie and the `x-csrf-token` header must carry the same
/// authentic token.
pub async fn guard(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return next.run(request).await;
    }

    let cookie = jar.get(CSRF_COOKIE).map(|cookie| cookie.value().to_string());
    let header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let valid = match (cookie, header) {
        (Some(cookie), Some(header)) => {
            bool::from(cookie.as_bytes().ct_eq(header.as_bytes())) && state.csrf.verify(&header)
        }
        _ => false,
    };

    if !valid {
        return ApiError::bad_request("CSRF token invalid or missing").into_response();
    }

    next.run(request).await
}
