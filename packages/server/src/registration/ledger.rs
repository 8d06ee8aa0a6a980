use chrono::{DateTime, Utc};
use common::RegistrationStatus;
use sea_orm::*;
use tracing::{info, warn};

use super::claims::{Claim, claims_for};
use super::registrant::{FieldError, Registrant, normalize_roll};
use crate::directory::EventDirectory;
use crate::entity::event;
use crate::entity::registration::{self, RegistrationKind};
use crate::entity::registration_claim;
use crate::models::shared::page_offset;

/// Why a submission was refused. Variants are checked in declaration order.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("event {0} not found")]
    EventNotFound(i32),
    #[error("registration for event {0} is closed")]
    RegistrationClosed(i32),
    #[error("roll numbers repeat within the team: {0:?}")]
    DuplicateRollWithinTeam(Vec<&'static str>),
    #[error("invalid registration fields")]
    Invalid(Vec<FieldError>),
    #[error("{} already claimed for event", .0.kind.as_str())]
    Duplicate(Claim),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Filter for the admin registration listing.
#[derive(Debug)]
pub struct RegistrationFilter {
    pub status: Option<RegistrationStatus>,
    pub page: u64,
    pub per_page: u64,
}

/// Registration is open while `now` has not passed the deadline. Events
/// without a deadline stay open.
pub fn registration_open(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    deadline.is_none_or(|deadline| now <= deadline)
}

/// Append-only store of registrations and the rules for adding to it.
pub struct RegistrationLedger<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> RegistrationLedger<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<registration::Model>, DbErr> {
        registration::Entity::find_by_id(id).one(self.conn).await
    }

    /// Registrations for an event, newest first.
    pub async fn list_for_event(
        &self,
        event_id: i32,
        filter: &RegistrationFilter,
    ) -> Result<(Vec<registration::Model>, u64), DbErr> {
        let mut select =
            registration::Entity::find().filter(registration::Column::EventId.eq(event_id));
        if let Some(status) = filter.status {
            select = select.filter(registration::Column::Status.eq(status));
        }

        let total = select.clone().count(self.conn).await?;
        let rows = select
            .order_by_desc(registration::Column::RegisteredAt)
            .order_by_desc(registration::Column::Id)
            .offset(page_offset(filter.page, filter.per_page))
            .limit(filter.per_page)
            .all(self.conn)
            .await?;

        Ok((rows, total))
    }

    /// Every registration for an event, newest first. Used for exports.
    pub async fn all_for_event(&self, event_id: i32) -> Result<Vec<registration::Model>, DbErr> {
        registration::Entity::find()
            .filter(registration::Column::EventId.eq(event_id))
            .order_by_desc(registration::Column::RegisteredAt)
            .order_by_desc(registration::Column::Id)
            .all(self.conn)
            .await
    }

    /// Account registrations with their events, newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<(registration::Model, Option<event::Model>)>, DbErr> {
        registration::Entity::find()
            .filter(registration::Column::UserId.eq(user_id))
            .order_by_desc(registration::Column::RegisteredAt)
            .order_by_desc(registration::Column::Id)
            .find_also_related(event::Entity)
            .all(self.conn)
            .await
    }

    /// Returns `None` if the registration does not exist.
    pub async fn set_attendance(
        &self,
        id: i32,
        attended: bool,
    ) -> Result<Option<registration::Model>, DbErr> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        let mut model = existing.into_active_model();
        model.attended = Set(attended);
        model.updated_at = Set(Utc::now());
        model.update(self.conn).await.map(Some)
    }
}

impl<C: ConnectionTrait + TransactionTrait> RegistrationLedger<'_, C> {
    /// Validate and persist a submission as a `pending` registration.
    ///
    /// The row and all of its uniqueness claims are written in one
    /// transaction. Two concurrent submissions sharing a key cannot both
    /// commit: the second claim insert hits the primary key of
    /// `registration_claim` and the whole submission rolls back.
    pub async fn submit(
        &self,
        event_id: i32,
        registrant: Registrant,
        now: DateTime<Utc>,
    ) -> Result<registration::Model, LedgerError> {
        let event = EventDirectory::new(self.conn)
            .get(event_id)
            .await?
            .ok_or(LedgerError::EventNotFound(event_id))?;

        if !registration_open(event.registration_deadline, now) {
            return Err(LedgerError::RegistrationClosed(event_id));
        }

        if let Registrant::Team(ref team) = registrant {
            let fields = team.duplicate_roll_fields();
            if !fields.is_empty() {
                return Err(LedgerError::DuplicateRollWithinTeam(fields));
            }
        }

        registrant.validate().map_err(LedgerError::Invalid)?;

        let claims = claims_for(&registrant);
        let txn = self.conn.begin().await?;

        let row = new_row(event_id, &registrant, now).insert(&txn).await?;

        for claim in claims {
            let insert = registration_claim::ActiveModel {
                event_id: Set(event_id),
                kind: Set(claim.kind.as_str().to_owned()),
                value: Set(claim.value.clone()),
                registration_id: Set(row.id),
            }
            .insert(&txn)
            .await;

            match insert {
                Ok(_) => {}
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    warn!(event_id, field = claim.field, "Duplicate registrant rejected");
                    return Err(LedgerError::Duplicate(claim));
                }
                Err(e) => return Err(e.into()),
            }
        }

        txn.commit().await?;

        info!(
            event_id,
            registration_id = row.id,
            kind = ?row.kind,
            "Registration recorded"
        );
        Ok(row)
    }
}

fn new_row(event_id: i32, registrant: &Registrant, now: DateTime<Utc>) -> registration::ActiveModel {
    let mut model = registration::ActiveModel {
        event_id: Set(event_id),
        name: Set(registrant.primary_name().to_owned()),
        email: Set(registrant.primary_email().to_owned()),
        phone: Set(None),
        roll: Set(None),
        user_id: Set(None),
        team_name: Set(None),
        member1_name: Set(None),
        member1_roll: Set(None),
        member2_name: Set(None),
        member2_roll: Set(None),
        status: Set(RegistrationStatus::Pending),
        attended: Set(false),
        registered_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match registrant {
        Registrant::Individual(c) => {
            model.kind = Set(RegistrationKind::Individual);
            model.phone = Set(Some(c.phone.trim().to_owned()));
            model.roll = Set(Some(normalize_roll(&c.roll)));
        }
        Registrant::Team(t) => {
            model.kind = Set(RegistrationKind::Team);
            model.phone = Set(Some(t.leader.phone.trim().to_owned()));
            model.roll = Set(Some(normalize_roll(&t.leader.roll)));
            model.team_name = Set(Some(t.team_name.trim().to_owned()));
            model.member1_name = Set(Some(t.member1.name.trim().to_owned()));
            model.member1_roll = Set(Some(normalize_roll(&t.member1.roll)));
            model.member2_name = Set(Some(t.member2.name.trim().to_owned()));
            model.member2_roll = Set(Some(normalize_roll(&t.member2.roll)));
        }
        Registrant::Account(a) => {
            model.kind = Set(RegistrationKind::Account);
            model.user_id = Set(Some(a.user_id.clone()));
        }
    }

    model
}
