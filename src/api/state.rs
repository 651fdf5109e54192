use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::service::LadderService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LadderService>,
    pub started_at: DateTime<Utc>,
}
