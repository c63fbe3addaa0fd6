use std::sync::Arc;

use crate::{
    auth::JwtCodec,
    domain::ports::inbound::ProfileService,
    middleware::csrf::CsrfProtect,
    repositories::{TodoRepositoryImpl, UserRepositoryImpl},
};

/// Flags shared by every cookie the API sets.
#[derive(Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub profile_service: Arc<dyn ProfileService>,
    pub user_repo: Arc<UserRepositoryImpl>,
    pub todo_repo: Arc<TodoRepositoryImpl>,
    pub jwt: JwtCodec,
    pub cookies: CookiePolicy,
    pub csrf: CsrfProtect,
    pub bcrypt_cost: u32,
}
