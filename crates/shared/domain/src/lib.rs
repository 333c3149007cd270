//! Domain layer - Core business entities and data transfer shapes.
//!
//! This crate contains pure domain types with no infrastructure dependencies.
//! Each entity comes in three shapes: a create input, a partial update input
//! and the full persisted record.

pub mod constants;
pub mod error;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use user::{CreateUser, UpdateUser, User, UserId, UserRole};
