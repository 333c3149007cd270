//! Generic data-access layer over SeaORM.
//!
//! - **spec**: composable query specifications (filter, order, eager-load, paginate)
//! - **repository**: type-parameterized CRUD against one backing table
//! - **registry**: string key to repository factory lookup
//! - **unit_of_work**: scoped transactional sessions
//! - **service**: one Unit of Work per operation, delegating to a registered repository
//!
//! # Example
//!
//! ```ignore
//! let mut registry = RepoRegistry::new();
//! registry.register_store::<UserSchema>("user");
//! let persistence = Arc::new(Persistence::new(db, registry));
//! let users = CrudManager::<UserSchema>::new(persistence, "user")?;
//!
//! let page = users.get_many(1, 10, Some(&active_users)).await?;
//! ```

pub mod registry;
pub mod repository;
pub mod service;
pub mod spec;
pub mod unit_of_work;

#[cfg(test)]
mod test_support;

pub use registry::{RepoFactory, RepoRegistry};
pub use repository::{CrudRepository, CrudStore, RecordId, Schema};
pub use service::{CrudManager, CrudService};
pub use spec::{EagerLoad, OrderBy, Paginate, SpecChain, Specification, Where};
pub use unit_of_work::{Persistence, TransactionContext, UnitOfWork, UowState};
