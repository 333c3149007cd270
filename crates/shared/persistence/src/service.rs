//! Generic service.
//!
//! Every operation opens its own Unit of Work, resolves one repository from
//! the registry on that Unit of Work's session, makes exactly one repository
//! call, and lets the outcome decide between commit and rollback.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::repository::{CrudRepository, RecordId, Schema};
use crate::spec::Specification;
use crate::unit_of_work::{Persistence, UnitOfWork};
use common::AppResult;

/// The seven generic operations, each in its own transaction.
#[async_trait]
pub trait CrudService<S: Schema>: Send + Sync {
    async fn create_one(&self, input: S::Create) -> AppResult<S::Record>;

    async fn create_many(&self, inputs: Vec<S::Create>) -> AppResult<Vec<S::Record>>;

    async fn get_many(
        &self,
        page: u64,
        page_size: u64,
        spec: Option<&dyn Specification<S::Table>>,
    ) -> AppResult<Vec<S::Record>>;

    async fn get_one_by_id(
        &self,
        id: RecordId,
        spec: Option<&dyn Specification<S::Table>>,
    ) -> AppResult<Option<S::Record>>;

    async fn update_one_by_id(&self, id: RecordId, input: S::Update)
        -> AppResult<Option<S::Record>>;

    async fn delete_one_by_id(&self, id: RecordId) -> AppResult<()>;

    async fn count_many(&self, spec: Option<&dyn Specification<S::Table>>) -> AppResult<u64>;
}

/// [`CrudService`] backed by the repository registered under one key.
pub struct CrudManager<S: Schema> {
    persistence: Arc<Persistence>,
    key: String,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> CrudManager<S> {
    /// Bind to the repository under `key`.
    ///
    /// Fails with a configuration error when nothing is registered under it.
    pub fn new(persistence: Arc<Persistence>, key: impl Into<String>) -> AppResult<Self> {
        let key = key.into();
        persistence.registry().ensure_registered([key.as_str()])?;

        Ok(Self {
            persistence,
            key,
            _schema: PhantomData,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn repository<'u>(&self, uow: &'u UnitOfWork) -> AppResult<Box<dyn CrudRepository<S> + 'u>> {
        self.persistence
            .registry()
            .resolve::<S>(uow.session()?, &self.key)
    }
}

impl<S: Schema> Clone for CrudManager<S> {
    fn clone(&self) -> Self {
        Self {
            persistence: Arc::clone(&self.persistence),
            key: self.key.clone(),
            _schema: PhantomData,
        }
    }
}

#[async_trait]
impl<S: Schema> CrudService<S> for CrudManager<S> {
    async fn create_one(&self, input: S::Create) -> AppResult<S::Record> {
        let uow = self.persistence.begin().await?;
        let result = async { self.repository(&uow)?.create_one(input).await }.await;
        uow.complete(result).await
    }

    async fn create_many(&self, inputs: Vec<S::Create>) -> AppResult<Vec<S::Record>> {
        let uow = self.persistence.begin().await?;
        let result = async { self.repository(&uow)?.create_many(inputs).await }.await;
        uow.complete(result).await
    }

    async fn get_many(
        &self,
        page: u64,
        page_size: u64,
        spec: Option<&dyn Specification<S::Table>>,
    ) -> AppResult<Vec<S::Record>> {
        let uow = self.persistence.begin().await?;
        let result = async {
            self.repository(&uow)?
                .get_many(page, page_size, spec)
                .await
        }
        .await;
        uow.complete(result).await
    }

    async fn get_one_by_id(
        &self,
        id: RecordId,
        spec: Option<&dyn Specification<S::Table>>,
    ) -> AppResult<Option<S::Record>> {
        let uow = self.persistence.begin().await?;
        let result = async { self.repository(&uow)?.get_one_by_id(id, spec).await }.await;
        uow.complete(result).await
    }

    async fn update_one_by_id(
        &self,
        id: RecordId,
        input: S::Update,
    ) -> AppResult<Option<S::Record>> {
        let uow = self.persistence.begin().await?;
        let result = async { self.repository(&uow)?.update_one_by_id(id, input).await }.await;
        uow.complete(result).await
    }

    async fn delete_one_by_id(&self, id: RecordId) -> AppResult<()> {
        let uow = self.persistence.begin().await?;
        let result = async { self.repository(&uow)?.delete_one_by_id(id).await }.await;
        uow.complete(result).await
    }

    async fn count_many(&self, spec: Option<&dyn Specification<S::Table>>) -> AppResult<u64> {
        let uow = self.persistence.begin().await?;
        let result = async { self.repository(&uow)?.count_many(spec).await }.await;
        uow.complete(result).await
    }
}
