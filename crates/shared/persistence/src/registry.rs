//! Repository registry.
//!
//! Maps string keys to factories that build a repository on a given
//! transaction. Resolution is typed: the caller names the [`Schema`] it
//! expects, and a key registered for another schema is a wiring defect.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sea_orm::DatabaseTransaction;

use crate::repository::{CrudRepository, CrudStore, Schema};
use common::{AppError, AppResult};

/// Builds a repository bound to one transaction.
pub type RepoFactory<S> = Arc<
    dyn for<'a> Fn(&'a DatabaseTransaction) -> Box<dyn CrudRepository<S> + 'a> + Send + Sync,
>;

struct Entry {
    schema: &'static str,
    factory: Box<dyn Any + Send + Sync>,
}

/// Key to repository factory lookup.
#[derive(Default)]
pub struct RepoRegistry {
    entries: HashMap<String, Entry>,
}

fn store_factory<S: Schema>(txn: &DatabaseTransaction) -> Box<dyn CrudRepository<S> + '_> {
    Box::new(CrudStore::<S>::new(txn))
}

impl RepoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `key`, replacing any previous one.
    pub fn register<S, F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        S: Schema,
        F: for<'a> Fn(&'a DatabaseTransaction) -> Box<dyn CrudRepository<S> + 'a>
            + Send
            + Sync
            + 'static,
    {
        let key = key.into();
        let factory: RepoFactory<S> = Arc::new(factory);

        tracing::debug!(key = %key, schema = type_name::<S>(), "registering repository");
        let previous = self.entries.insert(
            key.clone(),
            Entry {
                schema: type_name::<S>(),
                factory: Box::new(factory),
            },
        );
        if previous.is_some() {
            tracing::warn!(key = %key, "repository registration replaced");
        }
        self
    }

    /// Register the generic [`CrudStore`] for `S` under `key`.
    pub fn register_store<S: Schema>(&mut self, key: impl Into<String>) -> &mut Self {
        self.register::<S, _>(key, store_factory::<S>)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Fail on the first key that has no registration.
    ///
    /// Meant for startup, so a wiring defect stops the process before it
    /// serves any request.
    pub fn ensure_registered<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> AppResult<()> {
        for key in keys {
            if !self.contains(key) {
                return Err(unregistered(key));
            }
        }
        Ok(())
    }

    /// Build the repository registered under `key` on `session`.
    pub fn resolve<'a, S: Schema>(
        &self,
        session: &'a DatabaseTransaction,
        key: &str,
    ) -> AppResult<Box<dyn CrudRepository<S> + 'a>> {
        let entry = self.entries.get(key).ok_or_else(|| unregistered(key))?;

        let factory = entry
            .factory
            .downcast_ref::<RepoFactory<S>>()
            .ok_or_else(|| {
                tracing::error!(
                    key,
                    registered = entry.schema,
                    requested = type_name::<S>(),
                    "repository schema mismatch"
                );
                AppError::configuration(format!(
                    "repository '{}' is registered for {}, not {}",
                    key,
                    entry.schema,
                    type_name::<S>()
                ))
            })?;

        Ok(factory(session))
    }
}

fn unregistered(key: &str) -> AppError {
    tracing::error!(key, "no repository registered");
    AppError::configuration(format!("no repository registered under key '{}'", key))
}

impl fmt::Debug for RepoRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(key, entry)| (key, entry.schema)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, note, NoteSchema, OtherSchema};
    use sea_orm::{ActiveValue::Set, TransactionTrait};

    fn registry() -> RepoRegistry {
        let mut registry = RepoRegistry::new();
        registry.register_store::<NoteSchema>("note");
        registry
    }

    #[test]
    fn test_contains_and_keys() {
        let mut registry = registry();
        registry.register_store::<OtherSchema>("archive");

        assert!(registry.contains("note"));
        assert!(!registry.contains("user"));
        assert_eq!(registry.keys(), vec!["archive", "note"]);
    }

    #[test]
    fn test_ensure_registered_names_missing_key() {
        let registry = registry();

        assert!(registry.ensure_registered(["note"]).is_ok());
        let err = registry.ensure_registered(["note", "user"]).unwrap_err();
        assert!(matches!(err, AppError::Configuration(msg) if msg.contains("'user'")));
    }

    #[tokio::test]
    async fn test_resolve_unknown_key_is_configuration_error() {
        let db = test_support::connect().await;
        let txn = db.begin().await.unwrap();

        let result = registry().resolve::<NoteSchema>(&txn, "user");
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_resolve_schema_mismatch_is_configuration_error() {
        let db = test_support::connect().await;
        let txn = db.begin().await.unwrap();

        let result = registry().resolve::<OtherSchema>(&txn, "note");
        assert!(matches!(result, Err(AppError::Configuration(msg)) if msg.contains("not")));
    }

    #[tokio::test]
    async fn test_resolved_repository_runs_on_session() {
        let db = test_support::connect().await;
        let txn = db.begin().await.unwrap();
        let registry = registry();

        let repo = registry.resolve::<NoteSchema>(&txn, "note").unwrap();
        let created = repo
            .create_one(note::ActiveModel {
                body: Set("first".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.body, "first");
        assert_eq!(repo.count_many(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_custom_factory() {
        let db = test_support::connect().await;
        let txn = db.begin().await.unwrap();

        let mut registry = RepoRegistry::new();
        registry.register::<NoteSchema, _>("note", |txn| Box::new(CrudStore::<NoteSchema>::new(txn)));

        let repo = registry.resolve::<NoteSchema>(&txn, "note").unwrap();
        assert_eq!(repo.count_many(None).await.unwrap(), 0);
    }
}
