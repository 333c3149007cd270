//! In-memory SQLite fixtures for unit tests.

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

use crate::repository::Schema;

pub(crate) mod note {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "notes")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub body: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::tag::Entity")]
        Tags,
    }

    impl Related<super::tag::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Tags.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub(crate) mod tag {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "tags")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub label: String,
        pub note_id: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::note::Entity",
            from = "Column::NoteId",
            to = "super::note::Column::Id"
        )]
        Note,
    }

    impl Related<super::note::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Note.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub(crate) struct NoteSchema;

impl Schema for NoteSchema {
    type Table = note::Entity;
    type Row = note::Model;
    type Active = note::ActiveModel;
    type Create = note::ActiveModel;
    type Update = note::ActiveModel;
    type Record = note::Model;

    fn id_column() -> note::Column {
        note::Column::Id
    }
}

pub(crate) struct OtherSchema;

impl Schema for OtherSchema {
    type Table = tag::Entity;
    type Row = tag::Model;
    type Active = tag::ActiveModel;
    type Create = tag::ActiveModel;
    type Update = tag::ActiveModel;
    type Record = tag::Model;

    fn id_column() -> tag::Column {
        tag::Column::Id
    }
}

/// One shared in-memory database with the fixture tables created.
pub(crate) async fn connect() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();

    let backend = db.get_database_backend();
    let schema = sea_orm::Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(note::Entity)))
        .await
        .unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(tag::Entity)))
        .await
        .unwrap();
    db
}

pub(crate) async fn note_count(db: &DatabaseConnection) -> u64 {
    use sea_orm::{EntityTrait, PaginatorTrait};
    note::Entity::find().count(db).await.unwrap()
}
