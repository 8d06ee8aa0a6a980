use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One uniqueness key held by a registration within an event.
///
/// The composite primary key makes a second claim on the same
/// `(event_id, kind, value)` fail at insert time.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registration_claim")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: i32,
    /// One of: email, roll, team_name, account.
    #[sea_orm(primary_key, auto_increment = false)]
    pub kind: String,
    /// Normalised key value.
    #[sea_orm(primary_key, auto_increment = false)]
    pub value: String,

    #[sea_orm(indexed)]
    pub registration_id: i32,
    #[sea_orm(belongs_to, from = "registration_id", to = "id")]
    pub registration: HasOne<super::registration::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
