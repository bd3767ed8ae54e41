use std::sync::Arc;

use freed_core::FeedLifecycle;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub lifecycle: Arc<FeedLifecycle>,
}
