//! Shared fixtures: an in-memory SQLite database with migrations applied.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use common::DatabaseConfig;
use domain::{CreateUser, UserRole};
use persistence::Persistence;
use user_service_lib::build_persistence;
use user_service_lib::infra::Database;

pub struct Harness {
    pub persistence: Arc<Persistence>,
    statements: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    /// SQL statements executed since the last call.
    pub fn take_statements(&self) -> Vec<String> {
        std::mem::take(&mut *self.statements.lock().unwrap())
    }

    pub fn count_statements(&self, verb: &str) -> usize {
        self.take_statements()
            .iter()
            .filter(|sql| sql.trim_start().starts_with(verb))
            .count()
    }
}

pub async fn setup() -> Harness {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        // one connection, so every session sees the same in-memory database
        max_connections: 1,
        min_connections: 1,
        ..DatabaseConfig::default()
    };
    let db = Database::connect(&config).await.unwrap();

    let statements = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&statements);
    let mut connection = db.get_connection();
    connection.set_metric_callback(move |info| {
        recorded.lock().unwrap().push(info.statement.sql.clone());
    });

    Harness {
        persistence: build_persistence(connection).unwrap(),
        statements,
    }
}

pub fn new_user(n: usize) -> CreateUser {
    CreateUser::new(
        format!("User {}", n),
        format!("user{}@example.com", n),
        "hashed",
    )
}

pub fn new_admin(n: usize) -> CreateUser {
    new_user(n).with_role(UserRole::Admin)
}
