use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub date: Date,
    /// Free-form start time as shown to members (e.g. "18:30").
    pub time: String,
    pub venue: String,
    #[sea_orm(indexed)]
    pub category: String,

    /// Hex content hash in the image store.
    pub image_ref: Option<String>,
    pub image_content_type: Option<String>,

    /// NULL keeps registration open indefinitely.
    pub registration_deadline: Option<DateTimeUtc>,

    #[sea_orm(has_many)]
    pub registrations: HasMany<super::registration::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
