mod error;

pub mod auth;
pub mod security;
pub mod todos;
pub mod users;

pub use error::ApiError;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
