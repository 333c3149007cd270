//! User service - Handles user-related use cases.
//!
//! Every method is one Unit of Work. Soft delete and restore are plain
//! partial updates of `deleted_at`.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use common::AppResult;
use domain::{CreateUser, UpdateUser, User, UserId, UserRole};
use persistence::{CrudManager, CrudService, Persistence};

use crate::repository::{
    active_users, active_users_filter, active_users_with_role, UserSchema, USER_REPOSITORY,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User service trait for dependency injection.
///
/// Lookups and updates return `None` for a missing user.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create a new user (password already hashed)
    async fn create_user(&self, input: CreateUser) -> AppResult<User>;

    /// Create several users in one statement
    async fn create_users(&self, inputs: Vec<CreateUser>) -> AppResult<Vec<User>>;

    /// One page of users, soft-deleted included
    async fn list_users(&self, page: u64, page_size: u64) -> AppResult<Vec<User>>;

    /// Find a user by ID, soft-deleted included
    async fn get_user(&self, id: UserId) -> AppResult<Option<User>>;

    /// Apply the fields present in `input`
    async fn update_user(&self, id: UserId, input: UpdateUser) -> AppResult<Option<User>>;

    /// Permanently delete a user (no-op when missing)
    async fn delete_user(&self, id: UserId) -> AppResult<()>;

    /// Count all users, soft-deleted included
    async fn count_users(&self) -> AppResult<u64>;

    /// One page of active users, newest first
    async fn list_active_users(&self, page: u64, page_size: u64) -> AppResult<Vec<User>>;

    /// One page of active users holding `role`, newest first
    async fn list_active_users_with_role(
        &self,
        role: UserRole,
        page: u64,
        page_size: u64,
    ) -> AppResult<Vec<User>>;

    /// Count users not soft-deleted
    async fn count_active_users(&self) -> AppResult<u64>;

    /// Set `deleted_at` to now
    async fn soft_delete_user(&self, id: UserId) -> AppResult<Option<User>>;

    /// Clear `deleted_at`
    async fn restore_user(&self, id: UserId) -> AppResult<Option<User>>;
}

/// [`UserService`] on top of the generic user CRUD service.
#[derive(Clone)]
pub struct UserManager {
    users: CrudManager<UserSchema>,
}

impl UserManager {
    /// Bind to the registered user repository.
    pub fn new(persistence: Arc<Persistence>) -> AppResult<Self> {
        Ok(Self {
            users: CrudManager::new(persistence, USER_REPOSITORY)?,
        })
    }

    /// The generic operations, for callers that bring their own specifications.
    pub fn crud(&self) -> &CrudManager<UserSchema> {
        &self.users
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn create_user(&self, input: CreateUser) -> AppResult<User> {
        self.users.create_one(input).await
    }

    async fn create_users(&self, inputs: Vec<CreateUser>) -> AppResult<Vec<User>> {
        self.users.create_many(inputs).await
    }

    async fn list_users(&self, page: u64, page_size: u64) -> AppResult<Vec<User>> {
        self.users.get_many(page, page_size, None).await
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        self.users.get_one_by_id(id, None).await
    }

    async fn update_user(&self, id: UserId, input: UpdateUser) -> AppResult<Option<User>> {
        self.users.update_one_by_id(id, input).await
    }

    async fn delete_user(&self, id: UserId) -> AppResult<()> {
        self.users.delete_one_by_id(id).await
    }

    async fn count_users(&self) -> AppResult<u64> {
        self.users.count_many(None).await
    }

    async fn list_active_users(&self, page: u64, page_size: u64) -> AppResult<Vec<User>> {
        let spec = active_users(page, page_size);
        self.users.get_many(page, page_size, Some(&spec)).await
    }

    async fn list_active_users_with_role(
        &self,
        role: UserRole,
        page: u64,
        page_size: u64,
    ) -> AppResult<Vec<User>> {
        let spec = active_users_with_role(role, page, page_size);
        self.users.get_many(page, page_size, Some(&spec)).await
    }

    async fn count_active_users(&self) -> AppResult<u64> {
        let spec = active_users_filter();
        self.users.count_many(Some(&spec)).await
    }

    async fn soft_delete_user(&self, id: UserId) -> AppResult<Option<User>> {
        let input = UpdateUser::default().soft_delete(Utc::now());
        self.users.update_one_by_id(id, input).await
    }

    async fn restore_user(&self, id: UserId) -> AppResult<Option<User>> {
        self.users
            .update_one_by_id(id, UpdateUser::default().restore())
            .await
    }
}
