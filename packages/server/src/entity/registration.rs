use common::RegistrationStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which submission path produced a registration.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter, utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RegistrationKind {
    #[sea_orm(string_value = "individual")]
    Individual,
    #[sea_orm(string_value = "team")]
    Team,
    /// Signed-in member registering through their account.
    #[sea_orm(string_value = "account")]
    Account,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registration")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub event_id: i32,
    #[sea_orm(belongs_to, from = "event_id", to = "id")]
    pub event: HasOne<super::event::Entity>,

    pub kind: RegistrationKind,

    /// Registrant name; the team leader for team registrations.
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub roll: Option<String>,
    /// External account id for account registrations.
    #[sea_orm(indexed)]
    pub user_id: Option<String>,

    pub team_name: Option<String>,
    pub member1_name: Option<String>,
    pub member1_roll: Option<String>,
    pub member2_name: Option<String>,
    pub member2_roll: Option<String>,

    #[sea_orm(indexed)]
    pub status: RegistrationStatus,
    #[sea_orm(default_value = false)]
    pub attended: bool,

    #[sea_orm(has_many)]
    pub claims: HasMany<super::registration_claim::Entity>,

    #[sea_orm(has_many)]
    pub deliveries: HasMany<super::notification_delivery::Entity>,

    pub registered_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
