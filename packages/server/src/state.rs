use std::sync::Arc;

use common::storage::ImageStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::notification::NotificationDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub images: Arc<dyn ImageStore>,
    pub dispatcher: NotificationDispatcher,
}
