use crate::config::Config;
use crate::oracle::GradingOracle;
use crate::storage::FileStore;
use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub oracle: Arc<dyn GradingOracle>,
    pub storage: Arc<dyn FileStore>,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn GradingOracle> {
    fn from_ref(state: &AppState) -> Self {
        state.oracle.clone()
    }
}

impl FromRef<AppState> for Arc<dyn FileStore> {
    fn from_ref(state: &AppState) -> Self {
        state.storage.clone()
    }
}
