//! Unit of Work.
//!
//! A [`UnitOfWork`] owns one database transaction for the duration of a
//! scoped operation: it commits when the operation succeeds, rolls back when
//! it fails, and always releases the session afterwards.
//!
//! [`Persistence`] is the entry point: it holds the connection pool and the
//! repository registry, and opens Units of Work.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait};

use crate::registry::RepoRegistry;
use crate::repository::{CrudRepository, Schema};
use common::{AppError, AppResult};

/// Lifecycle of a [`UnitOfWork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UowState {
    /// No session acquired yet
    Idle,
    /// Session acquired, transaction running
    Open,
    Committed,
    RolledBack,
    /// Session released
    Closed,
}

impl fmt::Display for UowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UowState::Idle => "idle",
            UowState::Open => "open",
            UowState::Committed => "committed",
            UowState::RolledBack => "rolled back",
            UowState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Scoped transactional session.
///
/// Dropping a Unit of Work that is still open rolls its transaction back.
pub struct UnitOfWork {
    txn: Option<DatabaseTransaction>,
    state: UowState,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self {
            txn: None,
            state: UowState::Idle,
        }
    }

    pub fn state(&self) -> UowState {
        self.state
    }

    /// Acquire a session and start its transaction.
    pub async fn open(
        &mut self,
        db: &DatabaseConnection,
        isolation: Option<IsolationLevel>,
    ) -> AppResult<()> {
        self.expect_state(UowState::Idle, "open")?;

        let txn = db
            .begin_with_config(isolation, None)
            .await
            .map_err(AppError::from)?;

        self.txn = Some(txn);
        self.state = UowState::Open;
        tracing::debug!("unit of work opened");
        Ok(())
    }

    /// The running transaction.
    pub fn session(&self) -> AppResult<&DatabaseTransaction> {
        match (&self.txn, self.state) {
            (Some(txn), UowState::Open) => Ok(txn),
            _ => Err(AppError::internal(format!(
                "unit of work is {}, no session available",
                self.state
            ))),
        }
    }

    pub async fn commit(&mut self) -> AppResult<()> {
        let txn = self.take_open("commit")?;
        match txn.commit().await {
            Ok(()) => {
                self.state = UowState::Committed;
                tracing::debug!("unit of work committed");
                Ok(())
            }
            Err(e) => {
                // the transaction is gone; the store discards its changes
                self.state = UowState::RolledBack;
                Err(AppError::from(e))
            }
        }
    }

    pub async fn rollback(&mut self) -> AppResult<()> {
        let txn = self.take_open("rollback")?;
        self.state = UowState::RolledBack;
        txn.rollback().await.map_err(AppError::from)?;
        tracing::debug!("unit of work rolled back");
        Ok(())
    }

    /// Release the session. An open transaction is rolled back first.
    pub async fn close(&mut self) {
        if self.state == UowState::Open {
            if let Err(e) = self.rollback().await {
                tracing::error!("Transaction rollback failed: {}", e);
            }
        }
        self.txn = None;
        self.state = UowState::Closed;
    }

    /// Commit on `Ok`, roll back on `Err`, then close.
    ///
    /// A failed rollback is logged; the caller still receives the error that
    /// caused it.
    pub async fn complete<T>(mut self, result: AppResult<T>) -> AppResult<T> {
        let outcome = match result {
            Ok(value) => self.commit().await.map(|()| value),
            Err(e) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        };
        self.close().await;
        outcome
    }

    fn take_open(&mut self, action: &str) -> AppResult<DatabaseTransaction> {
        self.expect_state(UowState::Open, action)?;
        self.txn
            .take()
            .ok_or_else(|| AppError::internal(format!("cannot {} without a session", action)))
    }

    fn expect_state(&self, expected: UowState, action: &str) -> AppResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AppError::internal(format!(
                "cannot {} a unit of work that is {}",
                action, self.state
            )))
        }
    }
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.state == UowState::Open {
            tracing::warn!("unit of work dropped while open, rolling back");
        }
    }
}

/// Repository access within one transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
    registry: &'a RepoRegistry,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction, registry: &'a RepoRegistry) -> Self {
        Self { txn, registry }
    }

    /// Resolve the repository registered under `key` on this transaction.
    pub fn repository<S: Schema>(&self, key: &str) -> AppResult<Box<dyn CrudRepository<S> + 'a>> {
        self.registry.resolve::<S>(self.txn, key)
    }

    pub fn session(&self) -> &'a DatabaseTransaction {
        self.txn
    }
}

/// Session factory plus repository registry.
pub struct Persistence {
    db: DatabaseConnection,
    registry: Arc<RepoRegistry>,
    isolation: Option<IsolationLevel>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection, registry: RepoRegistry) -> Self {
        Self {
            db,
            registry: Arc::new(registry),
            isolation: None,
        }
    }

    /// Open every transaction with `isolation` instead of the store default.
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }

    pub fn registry(&self) -> &RepoRegistry {
        &self.registry
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Open a new Unit of Work.
    pub async fn begin(&self) -> AppResult<UnitOfWork> {
        let mut uow = UnitOfWork::new();
        uow.open(&self.db, self.isolation).await?;
        Ok(uow)
    }

    /// Run `f` in one Unit of Work.
    ///
    /// Committed when `f` returns `Ok`, rolled back otherwise.
    pub async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(
                TransactionContext<'a>,
            ) -> Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>
            + Send,
        T: Send,
    {
        let uow = self.begin().await?;
        let result = match uow.session() {
            Ok(txn) => f(TransactionContext::new(txn, &self.registry)).await,
            Err(e) => Err(e),
        };
        uow.complete(result).await
    }
}

impl fmt::Debug for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistence")
            .field("registry", &self.registry)
            .field("isolation", &self.isolation)
            .finish()
    }
}
