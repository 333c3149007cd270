//! Query specifications.
//!
//! A [`Specification`] is a pure transformation of a SeaORM `Select<E>`. Every
//! specification knows two things: how it changes a query that fetches rows,
//! and how it changes a query that only counts them. Ordering, eager-load
//! joins and pagination do not affect a count, so they leave the count query
//! untouched.
//!
//! Specifications compose into a [`SpecChain`], applied left to right.
//!
//! ```ignore
//! let active = SpecChain::new()
//!     .then(Where::new(user::Column::DeletedAt.is_null()))
//!     .then(OrderBy::desc(user::Column::Id))
//!     .then(Paginate::new(1, 10));
//!
//! let admins = active.clone().then(Where::new(user::Column::Role.eq("admin")));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use sea_orm::sea_query::{IntoCondition, SimpleExpr};
use sea_orm::{
    Condition, EntityTrait, JoinType, Order, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select,
};

/// A reusable, side-effect-free query transformation for entity `E`.
pub trait Specification<E: EntityTrait>: Send + Sync {
    /// Transform a query that fetches rows.
    fn apply_fetch(&self, query: Select<E>) -> Select<E>;

    /// Transform a query whose rows will only be counted.
    fn apply_count(&self, query: Select<E>) -> Select<E>;

    /// Whether this specification sets offset and limit itself.
    fn paginates(&self) -> bool {
        false
    }
}

impl<E, S> Specification<E> for Arc<S>
where
    E: EntityTrait,
    S: Specification<E> + ?Sized,
{
    fn apply_fetch(&self, query: Select<E>) -> Select<E> {
        (**self).apply_fetch(query)
    }

    fn apply_count(&self, query: Select<E>) -> Select<E> {
        (**self).apply_count(query)
    }

    fn paginates(&self) -> bool {
        (**self).paginates()
    }
}

pub(crate) fn fetch_with<E: EntityTrait>(
    query: Select<E>,
    spec: Option<&dyn Specification<E>>,
) -> Select<E> {
    match spec {
        Some(spec) => spec.apply_fetch(query),
        None => query,
    }
}

pub(crate) fn count_with<E: EntityTrait>(
    query: Select<E>,
    spec: Option<&dyn Specification<E>>,
) -> Select<E> {
    match spec {
        Some(spec) => spec.apply_count(query),
        None => query,
    }
}

pub(crate) fn paginates<E: EntityTrait>(spec: Option<&dyn Specification<E>>) -> bool {
    spec.is_some_and(|spec| spec.paginates())
}

// =============================================================================
// Chain
// =============================================================================

/// Ordered sequence of specifications. The empty chain is the identity.
pub struct SpecChain<E: EntityTrait> {
    specs: Vec<Arc<dyn Specification<E>>>,
}

impl<E: EntityTrait> SpecChain<E> {
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// Build a chain from already shared specifications
    pub fn of(specs: impl IntoIterator<Item = Arc<dyn Specification<E>>>) -> Self {
        Self {
            specs: specs.into_iter().collect(),
        }
    }

    /// Append one specification.
    pub fn then<S>(mut self, spec: S) -> Self
    where
        S: Specification<E> + 'static,
    {
        self.specs.push(Arc::new(spec));
        self
    }

    /// Append every member of `other`, keeping its order.
    pub fn extend(mut self, other: &SpecChain<E>) -> Self {
        self.specs.extend(other.specs.iter().cloned());
        self
    }

    /// `first` followed by `second`.
    pub fn concat(first: &SpecChain<E>, second: &SpecChain<E>) -> Self {
        Self::new().extend(first).extend(second)
    }

    pub fn specs(&self) -> &[Arc<dyn Specification<E>>] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<E: EntityTrait> Default for SpecChain<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> Clone for SpecChain<E> {
    fn clone(&self) -> Self {
        Self {
            specs: self.specs.clone(),
        }
    }
}

impl<E: EntityTrait> fmt::Debug for SpecChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecChain")
            .field("len", &self.specs.len())
            .field("paginates", &self.paginates())
            .finish()
    }
}

impl<E: EntityTrait> Specification<E> for SpecChain<E> {
    fn apply_fetch(&self, query: Select<E>) -> Select<E> {
        self.specs
            .iter()
            .fold(query, |query, spec| spec.apply_fetch(query))
    }

    fn apply_count(&self, query: Select<E>) -> Select<E> {
        self.specs
            .iter()
            .fold(query, |query, spec| spec.apply_count(query))
    }

    /// Looks through nested chains as well.
    fn paginates(&self) -> bool {
        self.specs.iter().any(|spec| spec.paginates())
    }
}

// =============================================================================
// Built-in specifications
// =============================================================================

/// Restricts rows; every predicate must hold.
#[derive(Debug, Clone)]
pub struct Where<E: EntityTrait> {
    condition: Condition,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityTrait> Where<E> {
    pub fn new(condition: impl IntoCondition) -> Self {
        Self {
            condition: Condition::all().add(condition.into_condition()),
            _entity: PhantomData,
        }
    }

    pub fn of(predicates: impl IntoIterator<Item = SimpleExpr>) -> Self {
        let condition = predicates
            .into_iter()
            .fold(Condition::all(), |condition, predicate| condition.add(predicate));
        Self {
            condition,
            _entity: PhantomData,
        }
    }

    pub fn and(mut self, predicate: impl IntoCondition) -> Self {
        self.condition = self.condition.add(predicate.into_condition());
        self
    }
}

impl<E: EntityTrait> Specification<E> for Where<E> {
    fn apply_fetch(&self, query: Select<E>) -> Select<E> {
        query.filter(self.condition.clone())
    }

    fn apply_count(&self, query: Select<E>) -> Select<E> {
        query.filter(self.condition.clone())
    }
}

/// Imposes a row order. Keys are applied in the order given.
#[derive(Debug, Clone)]
pub struct OrderBy<E: EntityTrait> {
    keys: Vec<(E::Column, Order)>,
}

impl<E: EntityTrait> OrderBy<E> {
    pub fn asc(column: E::Column) -> Self {
        Self {
            keys: vec![(column, Order::Asc)],
        }
    }

    pub fn desc(column: E::Column) -> Self {
        Self {
            keys: vec![(column, Order::Desc)],
        }
    }

    pub fn then_asc(mut self, column: E::Column) -> Self {
        self.keys.push((column, Order::Asc));
        self
    }

    pub fn then_desc(mut self, column: E::Column) -> Self {
        self.keys.push((column, Order::Desc));
        self
    }
}

impl<E: EntityTrait> Specification<E> for OrderBy<E> {
    fn apply_fetch(&self, query: Select<E>) -> Select<E> {
        self.keys
            .iter()
            .fold(query, |query, (column, order)| {
                query.order_by(*column, order.clone())
            })
    }

    fn apply_count(&self, query: Select<E>) -> Select<E> {
        query
    }
}

/// Eager-load hint: LEFT JOINs the given relations into the fetch statement
/// so related tables travel with the root rows in one round trip.
///
/// Only root columns are materialized, and the fetch is `DISTINCT`, so a
/// to-many relation still yields one row per root record and a [`Paginate`]
/// window counts records, not joined rows. Ordering must stay on root
/// columns.
#[derive(Debug)]
pub struct EagerLoad<E: EntityTrait> {
    relations: Vec<E::Relation>,
}

impl<E: EntityTrait> EagerLoad<E> {
    pub fn of(relations: impl IntoIterator<Item = E::Relation>) -> Self {
        Self {
            relations: relations.into_iter().collect(),
        }
    }
}

impl<E> Specification<E> for EagerLoad<E>
where
    E: EntityTrait,
    E::Relation: Send + Sync,
{
    fn apply_fetch(&self, query: Select<E>) -> Select<E> {
        if self.relations.is_empty() {
            return query;
        }
        self.relations
            .iter()
            .fold(query, |query, relation| {
                query.join(JoinType::LeftJoin, relation.def())
            })
            .distinct()
    }

    fn apply_count(&self, query: Select<E>) -> Select<E> {
        query
    }
}

/// 1-based page window: `offset = max(page - 1, 0) * page_size`, `limit = page_size`.
#[derive(Debug, Clone, Copy)]
pub struct Paginate<E: EntityTrait> {
    page: u64,
    page_size: u64,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityTrait> Paginate<E> {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page,
            page_size,
            _entity: PhantomData,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

impl<E: EntityTrait> Specification<E> for Paginate<E> {
    fn apply_fetch(&self, query: Select<E>) -> Select<E> {
        query.offset(self.offset()).limit(self.limit())
    }

    fn apply_count(&self, query: Select<E>) -> Select<E> {
        query
    }

    fn paginates(&self) -> bool {
        true
    }
}
