pub mod feeds;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
};

pub use state::{AppState, AppStateInner};

/// All feed routes. Layers (tracing, etc.) are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(feeds::list_feeds))
        .route("/feed", post(feeds::create_feed))
        .route("/feed/{id}", put(feeds::refresh_feed).delete(feeds::delete_feed))
        .route("/feed/{id}/verify", get(feeds::verify_feed))
        .route("/feed/{id}/delete", get(feeds::delete_feed_link))
        .with_state(state)
}
