//! API routes for the detection server.

mod routes;
pub mod ws;

pub use routes::SnapshotRequest;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}
