use std::sync::Arc;

use deploy_queue::Queue;
use deploy_store::StateStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub queue: Arc<dyn Queue>,
}
