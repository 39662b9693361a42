//! Application state containing the connection and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::infrastructure::auth::RevokedTokens;
use crate::infrastructure::config::Config;
use crate::modules::media::{LocalMediaStore, MediaStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub config: Arc<Config>,
    /// Tokens invalidated by logout
    pub revoked: RevokedTokens,
    /// Storage for captured photos and signatures
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let media = Arc::new(LocalMediaStore::new(config.media_root.clone()));
        Self::with_media(db, config, media)
    }

    pub fn with_media(db: DatabaseConnection, config: Config, media: Arc<dyn MediaStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            revoked: RevokedTokens::default(),
            media,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
