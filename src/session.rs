use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::OwnedRwLockReadGuard;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::data_source::NetworkDataSource;
use crate::db::repository;
use crate::error::AppError;
use crate::models::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// Work that has to run when the signed-in user goes away.
#[async_trait]
pub trait CleanupHandler: Send + Sync {
    async fn cleanup(&self) -> Result<(), AppError>;
}

/// Drops every locally cached table.
pub struct LocalStoreCleanup {
    db: SqlitePool,
}

impl LocalStoreCleanup {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CleanupHandler for LocalStoreCleanup {
    async fn cleanup(&self) -> Result<(), AppError> {
        repository::clear_all(&self.db).await?;
        info!("local store cleared");
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ActiveSession {
    user: User,
    token: String,
    ended: CancelToken,
}

/// Held by work that writes on behalf of the signed-in user.
///
/// `Session::clear` cancels the lease's token and then waits for every lease to be
/// dropped before it runs the cleanup handlers.
pub struct SessionLease {
    ended: CancelToken,
    _writer: OwnedRwLockReadGuard<()>,
}

impl SessionLease {
    /// Fires when the session this lease was taken from ends.
    pub fn ended(&self) -> &CancelToken {
        &self.ended
    }

    pub fn is_ended(&self) -> bool {
        self.ended.is_cancelled()
    }
}

/// Current user and API token, constructed once and handed to collaborators.
pub struct Session {
    active: RwLock<Option<ActiveSession>>,
    cleanup: RwLock<Vec<Arc<dyn CleanupHandler>>>,
    writers: Arc<tokio::sync::RwLock<()>>,
}

impl Session {
    pub fn new(cleanup: Vec<Arc<dyn CleanupHandler>>) -> Self {
        Self {
            active: RwLock::new(None),
            cleanup: RwLock::new(cleanup),
            writers: Arc::new(tokio::sync::RwLock::new(())),
        }
    }

    pub fn init(&self, user: User, token: impl Into<String>) {
        info!("session started for user {}", user.id);
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        let previous = active.replace(ActiveSession {
            user,
            token: token.into(),
            ended: CancelToken::new(),
        });
        if let Some(previous) = previous {
            previous.ended.cancel();
        }
    }

    /// Signs in with `token`. Without a known user the current user is looked up first,
    /// so the session is only initialised with the real identity.
    pub async fn start(
        &self,
        token: String,
        user: Option<User>,
        network: &NetworkDataSource,
    ) -> Result<User, AppError> {
        let user = match user {
            Some(user) => user,
            None => network.fetch_current_user(&token).await?,
        };
        self.init(user.clone(), token);
        Ok(user)
    }

    pub fn register_cleanup(&self, handler: Arc<dyn CleanupHandler>) {
        self.cleanup
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(handler);
    }

    pub fn user(&self) -> Option<User> {
        self.read().map(|s| s.user)
    }

    pub fn token(&self) -> Option<String> {
        self.read().map(|s| s.token)
    }

    pub fn is_active(&self) -> bool {
        self.read().is_some()
    }

    /// A lease on the active session, or `None` when nobody is signed in.
    /// Waits while a `clear` is in progress.
    pub async fn lease(&self) -> Option<SessionLease> {
        let writer = self.writers.clone().read_owned().await;
        let ended = self.read()?.ended;
        Some(SessionLease {
            ended,
            _writer: writer,
        })
    }

    /// Ends the session and runs every cleanup handler once outstanding leases are gone.
    ///
    /// All handlers run even if one fails; the first failure is returned.
    pub async fn clear(&self) -> Result<(), AppError> {
        let ended = self
            .active
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(ended) = &ended {
            info!("session of user {} ended", ended.user.id);
            ended.ended.cancel();
        }

        let _writers = self.writers.write().await;
        let handlers = self
            .cleanup
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let mut first_error = None;
        for handler in &handlers {
            if let Err(e) = handler.cleanup().await {
                warn!("cleanup handler failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn read(&self) -> Option<ActiveSession> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
