mod extractor;
mod jwt;
mod password;

pub use extractor::AuthUser;
pub use jwt::{Claims, JwtCodec};
pub use password::{hash_password, verify_password};

/// Name of the httpOnly cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
