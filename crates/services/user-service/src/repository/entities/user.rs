//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::{IntoActiveModel, Set};

use domain::{CreateUser, UpdateUser, User, UserRole};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    /// Soft delete timestamp (NULL = active, set = deleted)
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// Stamps `created_at` on insert and `updated_at` on every save.
///
/// Both timestamps come from the application clock, not the database.
#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}

/// Convert database model to domain entity
impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            id: model.id,
            name: model.name,
            email: model.email,
            password_hash: model.password_hash,
            role: UserRole::from(model.role.as_str()),
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

impl IntoActiveModel<ActiveModel> for CreateUser {
    fn into_active_model(self) -> ActiveModel {
        ActiveModel {
            name: Set(self.name),
            email: Set(self.email),
            password_hash: Set(self.password_hash),
            // always set, so every row of a bulk insert has the same columns
            role: Set(self.role.unwrap_or(UserRole::User).into()),
            ..Default::default()
        }
    }
}

/// Only the fields present in the update become `Set`.
impl IntoActiveModel<ActiveModel> for UpdateUser {
    fn into_active_model(self) -> ActiveModel {
        let mut active = <ActiveModel as Default>::default();
        if let Some(name) = self.name {
            active.name = Set(name);
        }
        if let Some(email) = self.email {
            active.email = Set(email);
        }
        if let Some(password_hash) = self.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(role) = self.role {
            active.role = Set(role.into());
        }
        if let Some(deleted_at) = self.deleted_at {
            active.deleted_at = Set(deleted_at);
        }
        active
    }
}
