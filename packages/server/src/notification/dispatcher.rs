use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use common::DeliveryStatus;
use common::retry::RetryPolicy;
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::{error, info, warn};

use super::template::{ConfirmationContext, render_confirmation};
use super::transport::{Notifier, OutgoingMessage};
use crate::config::NotificationConfig;
use crate::entity::{event, notification_delivery, registration};
use crate::models::shared::page_offset;

/// Most deliveries a single sweep attempts.
const SWEEP_BATCH: u64 = 100;

/// Why a delivery could not be attempted.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification {0} not found")]
    NotFound(i32),
    #[error("notification {0} was already sent")]
    AlreadySent(i32),
    #[error("notification {0} is being delivered")]
    InFlight(i32),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Filter for the operator delivery listing.
#[derive(Debug, Default)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub registration_id: Option<i32>,
    pub page: u64,
    pub per_page: u64,
}

/// Queues confirmation messages and records the outcome of every attempt.
///
/// Each message is a `notification_delivery` row. An attempt first claims the
/// row with a conditional update, so the spawned task, the retry sweeper and
/// a manual retry never deliver the same row concurrently.
#[derive(Clone)]
pub struct NotificationDispatcher {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    config: Arc<NotificationConfig>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    pub fn new(
        db: DatabaseConnection,
        notifier: Arc<dyn Notifier>,
        config: NotificationConfig,
    ) -> Self {
        let policy = RetryPolicy::from(&config.retry);
        Self {
            db,
            notifier,
            config: Arc::new(config),
            policy,
        }
    }

    /// Pending or sending rows last touched before this instant are treated as
    /// abandoned. `None` when the window reaches past the representable range.
    fn stale_before(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        i64::try_from(self.config.retry.stale_after_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|window| now.checked_sub_signed(window))
    }

    /// Record a confirmation for `registration` and deliver it in the background.
    pub async fn enqueue(
        &self,
        registration: &registration::Model,
        event: &event::Model,
    ) -> Result<notification_delivery::Model, DbErr> {
        let delivery = notification_delivery::ActiveModel {
            registration_id: Set(registration.id),
            recipient: Set(registration.email.clone()),
            recipient_name: Set(registration.name.clone()),
            event_title: Set(event.title.clone()),
            event_date: Set(event.date),
            status: Set(DeliveryStatus::Pending),
            attempts: Set(0),
            last_error: Set(None),
            created_at: Set(Utc::now()),
            last_attempt_at: Set(None),
            sent_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(
            delivery_id = delivery.id,
            registration_id = registration.id,
            "Confirmation queued"
        );

        let dispatcher = self.clone();
        let delivery_id = delivery.id;
        tokio::spawn(async move {
            match dispatcher.attempt(delivery_id, Utc::now()).await {
                Ok(_) | Err(DispatchError::AlreadySent(_)) | Err(DispatchError::InFlight(_)) => {}
                Err(e) => error!(delivery_id, error = %e, "Confirmation attempt aborted"),
            }
        });

        Ok(delivery)
    }

    /// Claim the delivery and make one attempt. Returns the row as recorded
    /// after the attempt, whether the channel accepted the message or not.
    pub async fn attempt(
        &self,
        id: i32,
        now: DateTime<Utc>,
    ) -> Result<notification_delivery::Model, DispatchError> {
        let mut claimable = Condition::any().add(
            notification_delivery::Column::Status
                .is_in([DeliveryStatus::Pending, DeliveryStatus::Failed]),
        );
        if let Some(stale_before) = self.stale_before(now) {
            claimable = claimable.add(
                Condition::all()
                    .add(notification_delivery::Column::Status.eq(DeliveryStatus::Sending))
                    .add(notification_delivery::Column::LastAttemptAt.lt(stale_before)),
            );
        }

        let claimed = notification_delivery::Entity::update_many()
            .col_expr(
                notification_delivery::Column::Status,
                Expr::value(DeliveryStatus::Sending),
            )
            .col_expr(
                notification_delivery::Column::Attempts,
                Expr::col(notification_delivery::Column::Attempts).add(1),
            )
            .col_expr(
                notification_delivery::Column::LastAttemptAt,
                Expr::value(Some(now)),
            )
            .filter(notification_delivery::Column::Id.eq(id))
            .filter(claimable)
            .exec(&self.db)
            .await?;

        let delivery = notification_delivery::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DispatchError::NotFound(id))?;

        if claimed.rows_affected == 0 {
            return Err(match delivery.status {
                DeliveryStatus::Sent => DispatchError::AlreadySent(id),
                _ => DispatchError::InFlight(id),
            });
        }

        let content = render_confirmation(&ConfirmationContext {
            club_name: &self.config.club_name,
            recipient_name: &delivery.recipient_name,
            event_title: &delivery.event_title,
            event_date: delivery.event_date,
            events_url: &self.config.events_url,
            support_email: &self.config.support_email,
        });
        let message = OutgoingMessage {
            to_name: delivery.recipient_name.clone(),
            to_address: delivery.recipient.clone(),
            content,
        };

        let result = self.notifier.send(&message).await;

        let attempts = delivery.attempts;
        let mut model: notification_delivery::ActiveModel = delivery.into();
        match result {
            Ok(()) => {
                info!(
                    delivery_id = id,
                    attempts,
                    transport = self.notifier.name(),
                    "Confirmation sent"
                );
                model.status = Set(DeliveryStatus::Sent);
                model.sent_at = Set(Some(Utc::now()));
                model.last_error = Set(None);
            }
            Err(e) => {
                warn!(
                    delivery_id = id,
                    attempts,
                    transport = self.notifier.name(),
                    error = %e,
                    "Confirmation delivery failed"
                );
                model.status = Set(DeliveryStatus::Failed);
                model.last_error = Set(Some(e.to_string()));
            }
        }

        Ok(model.update(&self.db).await?)
    }

    /// Attempt every delivery that is due: failed rows whose backoff has
    /// elapsed, and pending or sending rows left behind by a crash.
    /// Returns how many were attempted.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, DbErr> {
        let mut due = Condition::any();
        let mut branches = 0;

        for attempts in 0..self.policy.max_attempts() {
            let Some(cutoff) = self.policy.due_cutoff(attempts, now) else {
                continue;
            };
            due = due.add(
                Condition::all()
                    .add(notification_delivery::Column::Status.eq(DeliveryStatus::Failed))
                    .add(notification_delivery::Column::Attempts.eq(i32::from(attempts)))
                    .add(
                        Condition::any()
                            .add(notification_delivery::Column::LastAttemptAt.is_null())
                            .add(notification_delivery::Column::LastAttemptAt.lte(cutoff)),
                    ),
            );
            branches += 1;
        }

        if let Some(stale_before) = self.stale_before(now) {
            due = due
                .add(
                    Condition::all()
                        .add(notification_delivery::Column::Status.eq(DeliveryStatus::Pending))
                        .add(notification_delivery::Column::CreatedAt.lt(stale_before)),
                )
                .add(
                    Condition::all()
                        .add(notification_delivery::Column::Status.eq(DeliveryStatus::Sending))
                        .add(notification_delivery::Column::LastAttemptAt.lt(stale_before)),
                );
            branches += 2;
        }
        if branches == 0 {
            return Ok(0);
        }

        let candidates: Vec<i32> = notification_delivery::Entity::find()
            .select_only()
            .column(notification_delivery::Column::Id)
            .filter(due)
            .order_by_asc(notification_delivery::Column::Id)
            .limit(SWEEP_BATCH)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut attempted = 0;
        for id in candidates {
            match self.attempt(id, now).await {
                Ok(_) => attempted += 1,
                Err(DispatchError::Db(e)) => return Err(e),
                Err(_) => {}
            }
        }

        Ok(attempted)
    }

    pub async fn list(
        &self,
        filter: &DeliveryFilter,
    ) -> Result<(Vec<notification_delivery::Model>, u64), DbErr> {
        let mut select = notification_delivery::Entity::find();
        if let Some(status) = filter.status {
            select = select.filter(notification_delivery::Column::Status.eq(status));
        }
        if let Some(registration_id) = filter.registration_id {
            select = select.filter(notification_delivery::Column::RegistrationId.eq(registration_id));
        }

        let total = select.clone().count(&self.db).await?;
        let deliveries = select
            .order_by_desc(notification_delivery::Column::CreatedAt)
            .order_by_desc(notification_delivery::Column::Id)
            .offset(page_offset(filter.page, filter.per_page))
            .limit(filter.per_page)
            .all(&self.db)
            .await?;

        Ok((deliveries, total))
    }
}

/// Run the retry sweeper as a background task.
pub async fn run_retry_sweeper(dispatcher: NotificationDispatcher) {
    let interval_secs = std::cmp::max(dispatcher.config.retry.sweep_interval_secs, 1);

    info!(
        interval_secs,
        max_attempts = dispatcher.policy.max_attempts(),
        "Starting notification retry sweeper"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match dispatcher.sweep(Utc::now()).await {
            Ok(0) => {}
            Ok(attempted) => info!(attempted, "Retried due confirmations"),
            Err(e) => error!(error = %e, "Notification sweep failed"),
        }
    }
}
