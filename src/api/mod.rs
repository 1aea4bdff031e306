// API module - HTTP endpoints

pub mod admin;
pub mod auth;
pub mod credentials;
pub mod health;
pub mod institutions;
pub mod middleware;
pub mod students;
pub mod verification;

use axum::Router;

use middleware::state::AppState;

/// All routes, without state or layers
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(institutions::router())
        .merge(students::router())
        .merge(credentials::router())
        .merge(verification::router())
        .merge(admin::router())
}
