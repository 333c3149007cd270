//! Repository layer for data access.

pub mod entities;
mod user_repository;

pub use user_repository::{
    active_users, active_users_filter, active_users_with_role, register, UserSchema,
    USER_REPOSITORY,
};
