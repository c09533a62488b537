/// API routes and handlers
pub mod admin;
pub mod extract;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new().merge(admin::routes())
}
