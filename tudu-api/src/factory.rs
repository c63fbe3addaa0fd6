//! Composition root — concrete factories for creating service instances.
//!
//! This is the ONLY place that imports concrete outbound adapters.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    adapters::outbound::{
        cloudinary::CloudinaryBlobStore, media::WebpAvatarProcessor, postgres::PostgresProfileStore,
    },
    app_state::{AppState, CookiePolicy},
    auth::JwtCodec,
    config::Settings,
    domain::{models::DefaultAvatars, services::ProfileServiceImpl},
    middleware::csrf::CsrfProtect,
    repositories::{TodoRepositoryImpl, UserRepositoryImpl},
};

pub fn app_state(pool: PgPool, config: &Settings) -> AppState {
    let store = Arc::new(PostgresProfileStore::new(pool.clone()));
    let blob_store = Arc::new(CloudinaryBlobStore::new(&config.blob_store));
    let processor = Arc::new(WebpAvatarProcessor::default());
    let default_avatars = DefaultAvatars::new(config.blob_store.default_asset_ids.iter().cloned());

    let profile_service = Arc::new(ProfileServiceImpl::new(
        store,
        blob_store,
        processor,
        default_avatars,
        config.auth.bcrypt_cost,
    ));

    AppState {
        profile_service,
        user_repo: Arc::new(UserRepositoryImpl::new(pool.clone())),
        todo_repo: Arc::new(TodoRepositoryImpl::new(pool)),
        jwt: JwtCodec::new(&config.auth.jwt_secret, config.auth.token_ttl_hours),
        cookies: CookiePolicy {
            secure: config.application.secure_cookies,
        },
        csrf: CsrfProtect::new(&config.csrf.secret),
        bcrypt_cost: config.auth.bcrypt_cost,
    }
}
