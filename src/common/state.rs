use crate::config::Config;
use crate::external::email::ReportNotifier;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub notifier: Arc<dyn ReportNotifier>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, notifier: Arc<dyn ReportNotifier>) -> Self {
        Self {
            db,
            config,
            notifier,
        }
    }
}
