//! User repository: schema binding and the listing specifications.
//!
//! Users are never filtered implicitly. Soft-deleted rows stay visible to the
//! generic operations; "active" listings opt in through the chains below.

use persistence::{OrderBy, Paginate, RepoRegistry, Schema, SpecChain, Where};
use sea_orm::ColumnTrait;

use super::entities::user::{self, ActiveModel, Column, Entity as UserEntity, Model};
use domain::{CreateUser, UpdateUser, User, UserRole};

/// Registry key of the user repository.
pub const USER_REPOSITORY: &str = "user";

/// Binds the user shapes to the `users` table.
pub struct UserSchema;

impl Schema for UserSchema {
    type Table = UserEntity;
    type Row = Model;
    type Active = ActiveModel;
    type Create = CreateUser;
    type Update = UpdateUser;
    type Record = User;

    fn id_column() -> Column {
        Column::Id
    }
}

/// Register the user repository.
pub fn register(registry: &mut RepoRegistry) -> &mut RepoRegistry {
    registry.register_store::<UserSchema>(USER_REPOSITORY)
}

/// Rows not soft-deleted. Safe to use for counting.
pub fn active_users_filter() -> SpecChain<UserEntity> {
    SpecChain::new().then(Where::new(user::Column::DeletedAt.is_null()))
}

/// One page of active users, newest first.
pub fn active_users(page: u64, page_size: u64) -> SpecChain<UserEntity> {
    active_users_filter()
        .then(OrderBy::desc(user::Column::Id))
        .then(Paginate::new(page, page_size))
}

/// One page of active users holding `role`, newest first.
pub fn active_users_with_role(role: UserRole, page: u64, page_size: u64) -> SpecChain<UserEntity> {
    active_users(page, page_size).then(Where::new(user::Column::Role.eq(role.as_str())))
}
