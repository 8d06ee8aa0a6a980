use chrono::{DateTime, Utc};
use common::{ParseStatusError, RegistrationStatus};
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::{error, info, warn};

use crate::directory::EventDirectory;
use crate::entity::{notification_delivery, registration};
use crate::notification::NotificationDispatcher;

#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("registration {0} not found")]
    NotFound(i32),
    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Result of a status change request.
#[derive(Debug)]
pub struct ApprovalOutcome {
    pub registration: registration::Model,
    /// False when the registration already had the requested status.
    pub transitioned: bool,
    /// Confirmation queued because the registration just became approved.
    pub notification: Option<notification_delivery::Model>,
}

/// Parse a status an administrator may set. `pending` is not one of them.
pub fn parse_reviewable(raw: &str) -> Result<RegistrationStatus, ApprovalError> {
    const REVIEWABLE_NAMES: &[&str] = &["approved", "rejected"];

    match raw.parse::<RegistrationStatus>() {
        Ok(status) if RegistrationStatus::REVIEWABLE.contains(&status) => Ok(status),
        _ => Err(ParseStatusError::new(raw, REVIEWABLE_NAMES).into()),
    }
}

/// Moves registrations between review states and triggers confirmations.
pub struct ApprovalWorkflow<'a> {
    db: &'a DatabaseConnection,
    dispatcher: &'a NotificationDispatcher,
}

impl<'a> ApprovalWorkflow<'a> {
    pub fn new(db: &'a DatabaseConnection, dispatcher: &'a NotificationDispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Set the status of a registration.
    ///
    /// Any reviewed status may replace any other. The write is a single
    /// conditional update that only matches when the status actually
    /// changes, so repeating a request is a no-op and a confirmation is
    /// queued at most once per transition into `approved`. Notification
    /// failures are logged and never undo the status change.
    pub async fn set_status(
        &self,
        registration_id: i32,
        status: RegistrationStatus,
        expected_event: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let mut update = registration::Entity::update_many()
            .col_expr(registration::Column::Status, Expr::value(status))
            .col_expr(registration::Column::UpdatedAt, Expr::value(now))
            .filter(registration::Column::Id.eq(registration_id))
            .filter(registration::Column::Status.ne(status));
        if let Some(event_id) = expected_event {
            update = update.filter(registration::Column::EventId.eq(event_id));
        }
        let result = update.exec(self.db).await?;
        let transitioned = result.rows_affected > 0;

        let registration = registration::Entity::find_by_id(registration_id)
            .one(self.db)
            .await?
            .filter(|r| expected_event.is_none_or(|event_id| r.event_id == event_id))
            .ok_or(ApprovalError::NotFound(registration_id))?;

        if transitioned {
            info!(registration_id, status = %status, "Registration status changed");
        }

        let notification = if transitioned && status == RegistrationStatus::Approved {
            self.queue_confirmation(&registration).await
        } else {
            None
        };

        Ok(ApprovalOutcome {
            registration,
            transitioned,
            notification,
        })
    }

    async fn queue_confirmation(
        &self,
        registration: &registration::Model,
    ) -> Option<notification_delivery::Model> {
        let event = match EventDirectory::new(self.db).get(registration.event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                warn!(
                    registration_id = registration.id,
                    event_id = registration.event_id,
                    "Approved registration has no event; confirmation skipped"
                );
                return None;
            }
            Err(e) => {
                error!(registration_id = registration.id, error = %e, "Event lookup failed; confirmation skipped");
                return None;
            }
        };

        match self.dispatcher.enqueue(registration, &event).await {
            Ok(delivery) => Some(delivery),
            Err(e) => {
                error!(registration_id = registration.id, error = %e, "Failed to queue confirmation");
                None
            }
        }
    }
}
