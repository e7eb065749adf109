use std::sync::Arc;

use tracing::error;

use convohub_db::Database;
use convohub_gateway::hub::RoomHub;

use crate::error::{ApiError, ApiResult};
use crate::media::MediaStorage;
use crate::tokens::TokenConfig;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub tokens: TokenConfig,
    pub hub: RoomHub,
    pub media: MediaStorage,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: TokenConfig, hub: RoomHub, media: MediaStorage) -> AppState {
        Arc::new(Self {
            db: Arc::new(db),
            tokens,
            hub,
            media,
        })
    }

    /// Run blocking DB work off the async runtime.
    pub async fn db_call<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
            })?
    }
}
