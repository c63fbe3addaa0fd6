use axum::{http::Method, middleware::from_fn_with_state, routing::get, Router};
use sqlx::PgPool;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::{config::Settings, factory, middleware, routes};

pub fn create(connection_pool: PgPool, config: Settings) -> Router {
    let state = factory::app_state(connection_pool, &config);

    let api = Router::new()
        .nest("/auth", routes::auth::router())
        .nest("/user", routes::users::router())
        .nest("/todo", routes::todos::router())
        .merge(routes::security::router())
        .layer(from_fn_with_state(state.clone(), middleware::csrf::guard));

    let allowed_origins = config.application.allowed_origins.clone();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            "content-type".parse().unwrap(),
            "x-csrf-token".parse().unwrap(),
        ])
        .allow_credentials(true)
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .map(|origin| allowed_origins.iter().any(|allowed| allowed == origin))
                .unwrap_or(false)
        }));

    Router::new()
        .route("/", get(|| async { "Hello, little World!" }))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
