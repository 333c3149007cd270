//! Generic repository over one backing table.
//!
//! A [`Schema`] binds the four shapes of an entity (create input, partial
//! update, record, table row) to a SeaORM entity. [`CrudStore`] implements
//! every operation of [`CrudRepository`] once for any schema, running on the
//! transaction of the Unit of Work that owns it.

use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait,
    DatabaseTransaction, EntityName, EntityTrait, FromQueryResult, IdenStatic, IntoActiveModel, Iterable,
    ModelTrait, PaginatorTrait, QueryFilter, QueryTrait,
};

use crate::spec::{self, Paginate, Specification};
use common::{AppError, AppResult};

/// Store-assigned integer identity.
pub type RecordId = i32;

/// Binds the shapes of one entity type to its backing table.
pub trait Schema: Send + Sync + 'static {
    /// Backing table
    type Table: EntityTrait<Model = Self::Row>;
    /// Row as read from the table
    type Row: ModelTrait<Entity = Self::Table>
        + FromQueryResult
        + IntoActiveModel<Self::Active>
        + Send
        + Sync;
    /// Mutable row used for inserts and updates
    type Active: ActiveModelTrait<Entity = Self::Table> + ActiveModelBehavior + Send + Sync + 'static;
    /// Create input; fields left `NotSet` fall back to store defaults.
    /// Every input of one bulk insert must set the same columns.
    type Create: IntoActiveModel<Self::Active> + Send + 'static;
    /// Partial update; only `Set` columns are applied
    type Update: IntoActiveModel<Self::Active> + Send + 'static;
    /// Record handed back to callers
    type Record: From<Self::Row> + Send + 'static;

    /// Identity column of the table.
    fn id_column() -> <Self::Table as EntityTrait>::Column;
}

/// CRUD, pagination and filtering for one schema.
#[async_trait]
pub trait CrudRepository<S: Schema>: Send + Sync {
    /// Insert one row built from the set fields of `input`.
    async fn create_one(&self, input: S::Create) -> AppResult<S::Record>;

    /// Bulk insert in one statement, then re-fetch the inserted rows by identity.
    async fn create_many(&self, inputs: Vec<S::Create>) -> AppResult<Vec<S::Record>>;

    /// List rows. `page`/`page_size` apply only when `spec` does not paginate.
    async fn get_many(
        &self,
        page: u64,
        page_size: u64,
        spec: Option<&dyn Specification<S::Table>>,
    ) -> AppResult<Vec<S::Record>>;

    /// Find by identity; `None` when no row matches.
    async fn get_one_by_id(
        &self,
        id: RecordId,
        spec: Option<&dyn Specification<S::Table>>,
    ) -> AppResult<Option<S::Record>>;

    /// Apply the set fields of `input`; `None` when no row matches.
    async fn update_one_by_id(&self, id: RecordId, input: S::Update)
        -> AppResult<Option<S::Record>>;

    /// Hard delete; a missing row is a no-op.
    async fn delete_one_by_id(&self, id: RecordId) -> AppResult<()>;

    /// Count rows; ordering and pagination in `spec` are ignored.
    async fn count_many(&self, spec: Option<&dyn Specification<S::Table>>) -> AppResult<u64>;
}

/// Transaction-bound generic repository.
///
/// Borrows the transaction so it cannot outlive the Unit of Work.
pub struct CrudStore<'a, S: Schema> {
    txn: &'a DatabaseTransaction,
    _schema: PhantomData<fn() -> S>,
}

impl<'a, S: Schema> CrudStore<'a, S> {
    pub fn new(txn: &'a DatabaseTransaction) -> Self {
        Self {
            txn,
            _schema: PhantomData,
        }
    }

    async fn find_row(&self, id: RecordId) -> AppResult<Option<S::Row>> {
        S::Table::find()
            .filter(S::id_column().eq(id))
            .one(self.txn)
            .await
            .map_err(AppError::from)
    }
}

#[async_trait]
impl<'a, S: Schema> CrudRepository<S> for CrudStore<'a, S> {
    async fn create_one(&self, input: S::Create) -> AppResult<S::Record> {
        let active: S::Active = input.into_active_model();
        let row = active.insert(self.txn).await?;

        tracing::debug!(table = S::Table::default().table_name(), "inserted one row");
        Ok(S::Record::from(row))
    }

    async fn create_many(&self, inputs: Vec<S::Create>) -> AppResult<Vec<S::Record>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        // insert_many bypasses ActiveModelBehavior, so run the save hook per row here
        let mut actives = Vec::with_capacity(inputs.len());
        for input in inputs {
            let active: S::Active = input.into_active_model();
            actives.push(active.before_save(self.txn, true).await?);
        }

        let id_column = S::id_column();
        let mut insert = S::Table::insert_many(actives).into_query();
        insert.returning_col(id_column);

        let backend = self.txn.get_database_backend();
        let ids = self
            .txn
            .query_all(backend.build(&insert))
            .await?
            .iter()
            .map(|row| row.try_get::<RecordId>("", id_column.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = S::Table::find()
            .filter(id_column.is_in(ids.iter().copied()))
            .all(self.txn)
            .await?;

        tracing::debug!(
            table = S::Table::default().table_name(),
            inserted = ids.len(),
            "bulk inserted rows"
        );
        Ok(rows.into_iter().map(S::Record::from).collect())
    }

    async fn get_many(
        &self,
        page: u64,
        page_size: u64,
        spec: Option<&dyn Specification<S::Table>>,
    ) -> AppResult<Vec<S::Record>> {
        let mut query = S::Table::find();
        if !spec::paginates(spec) {
            query = Paginate::<S::Table>::new(page, page_size).apply_fetch(query);
        }
        let query = spec::fetch_with(query, spec);

        let rows = query.all(self.txn).await?;
        Ok(rows.into_iter().map(S::Record::from).collect())
    }

    async fn get_one_by_id(
        &self,
        id: RecordId,
        spec: Option<&dyn Specification<S::Table>>,
    ) -> AppResult<Option<S::Record>> {
        let query = S::Table::find().filter(S::id_column().eq(id));
        let query = spec::fetch_with(query, spec);

        let row = query.one(self.txn).await?;
        Ok(row.map(S::Record::from))
    }

    async fn update_one_by_id(
        &self,
        id: RecordId,
        input: S::Update,
    ) -> AppResult<Option<S::Record>> {
        let Some(row) = self.find_row(id).await? else {
            return Ok(None);
        };

        let patch: S::Active = input.into_active_model();
        let mut active: S::Active = row.into_active_model();
        let id_column = S::id_column();

        for column in <<S::Table as EntityTrait>::Column as Iterable>::iter() {
            // identity is immutable
            if column.as_str() == id_column.as_str() {
                continue;
            }
            if let ActiveValue::Set(value) = patch.get(column) {
                active.set(column, value);
            }
        }

        let row = active.update(self.txn).await?;

        tracing::debug!(table = S::Table::default().table_name(), id, "updated row");
        Ok(Some(S::Record::from(row)))
    }

    async fn delete_one_by_id(&self, id: RecordId) -> AppResult<()> {
        let Some(row) = self.find_row(id).await? else {
            return Ok(());
        };

        let active: S::Active = row.into_active_model();
        active.delete(self.txn).await?;

        tracing::debug!(table = S::Table::default().table_name(), id, "deleted row");
        Ok(())
    }

    async fn count_many(&self, spec: Option<&dyn Specification<S::Table>>) -> AppResult<u64> {
        let query = spec::count_with(S::Table::find(), spec);
        query.count(self.txn).await.map_err(AppError::from)
    }
}
