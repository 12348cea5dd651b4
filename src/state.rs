use std::sync::Arc;
use crate::backend::BackendClient;
use crate::limits::EventLimits;
// app's shared state

pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub limits: EventLimits,
    pub enforce_create_limit: bool, // creation limit is defined but optional
}
