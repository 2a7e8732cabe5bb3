use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Components and their deltas
        .route("/components", get(handlers::list_components::<S>))
        .route(
            "/components/:component_id/delta",
            get(handlers::get_component_delta::<S>),
        )
        .route(
            "/components/:component_id/fix",
            post(handlers::fix_component::<S>),
        )
        // Workspace-wide reconcile
        .route("/reconcile", post(handlers::reconcile_workspace::<S>))
}
