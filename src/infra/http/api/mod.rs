pub mod error;
pub mod handlers;
pub mod identity;
pub mod json;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

pub fn build_api_router() -> Router<ApiState> {
    Router::new()
        .route("/api/login", post(handlers::login))
        .route("/api/verify", get(handlers::verify))
        .route("/api/logout", post(handlers::logout))
        .route("/api/blog/list", get(handlers::list_posts))
        .route("/api/blog/find", get(handlers::find_post))
        .route("/api/blog/create", post(handlers::create_post))
        .route("/api/blog/update", patch(handlers::update_post))
        .route("/api/blog/remove", delete(handlers::remove_post))
        .route(
            "/api/blog/draft",
            get(handlers::get_drafts).post(handlers::save_draft),
        )
        .route(
            "/api/settings",
            get(handlers::get_settings).post(handlers::update_settings),
        )
}
