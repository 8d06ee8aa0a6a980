use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
    TransactionSession, TransactionTrait,
};
use tracing::info;

use crate::entity::{event, notification_delivery, registration, registration_claim};
use crate::models::event::{CreateEventRequest, UpdateEventRequest};
use crate::models::shared::page_offset;

/// Filter for the public event listing.
#[derive(Debug, Default)]
pub struct EventFilter {
    pub category: Option<String>,
    pub page: u64,
    pub per_page: u64,
}

/// Take the transaction-scoped advisory lock for an image reference.
///
/// Attaching an image to an event and deleting an unreferenced image both
/// hold this lock, so a release never removes a file that a concurrent upload
/// is about to point at.
pub async fn lock_image<C: ConnectionTrait>(txn: &C, image_ref: &str) -> Result<(), DbErr> {
    txn.execute_raw(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtext($1))",
        [image_ref.into()],
    ))
    .await?;
    Ok(())
}

/// Read model over events, plus the admin writes that maintain it.
pub struct EventDirectory<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> EventDirectory<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<event::Model>, DbErr> {
        event::Entity::find_by_id(id).one(self.conn).await
    }

    /// Events ordered by date, latest first.
    pub async fn list(&self, filter: &EventFilter) -> Result<(Vec<event::Model>, u64), DbErr> {
        let mut select = event::Entity::find();
        if let Some(ref category) = filter.category {
            select = select.filter(event::Column::Category.eq(category.trim()));
        }

        let total = select.clone().count(self.conn).await?;
        let events = select
            .order_by_desc(event::Column::Date)
            .order_by_desc(event::Column::Id)
            .offset(page_offset(filter.page, filter.per_page))
            .limit(filter.per_page)
            .all(self.conn)
            .await?;

        Ok((events, total))
    }

    pub async fn create(&self, req: CreateEventRequest) -> Result<event::Model, DbErr> {
        let now = Utc::now();
        let model = event::ActiveModel {
            title: Set(req.title.trim().to_owned()),
            description: Set(req.description),
            date: Set(req.date),
            time: Set(req.time.trim().to_owned()),
            venue: Set(req.venue.trim().to_owned()),
            category: Set(req.category.trim().to_owned()),
            image_ref: Set(None),
            image_content_type: Set(None),
            registration_deadline: Set(req.registration_deadline),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await?;

        info!(event_id = model.id, "Event created");
        Ok(model)
    }

    /// Apply a partial update. Returns `None` if the event does not exist.
    pub async fn update(
        &self,
        id: i32,
        req: UpdateEventRequest,
    ) -> Result<Option<event::Model>, DbErr> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let mut model = existing.into_active_model();
        if let Some(title) = req.title {
            model.title = Set(title.trim().to_owned());
        }
        if let Some(description) = req.description {
            model.description = Set(description);
        }
        if let Some(date) = req.date {
            model.date = Set(date);
        }
        if let Some(time) = req.time {
            model.time = Set(time.trim().to_owned());
        }
        if let Some(venue) = req.venue {
            model.venue = Set(venue.trim().to_owned());
        }
        if let Some(category) = req.category {
            model.category = Set(category.trim().to_owned());
        }
        if let Some(deadline) = req.registration_deadline {
            model.registration_deadline = Set(deadline);
        }
        model.updated_at = Set(Utc::now());

        model.update(self.conn).await.map(Some)
    }

    /// Point the event at a stored image. Returns the updated event and the
    /// reference it replaced.
    pub async fn set_image(
        &self,
        id: i32,
        image_ref: String,
        content_type: String,
    ) -> Result<Option<(event::Model, Option<String>)>, DbErr> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        let previous = existing.image_ref.clone();

        let mut model = existing.into_active_model();
        model.image_ref = Set(Some(image_ref));
        model.image_content_type = Set(Some(content_type));
        model.updated_at = Set(Utc::now());
        let updated = model.update(self.conn).await?;

        Ok(Some((updated, previous)))
    }

    /// Number of events that still point at an image.
    pub async fn image_ref_count(&self, image_ref: &str) -> Result<u64, DbErr> {
        event::Entity::find()
            .filter(event::Column::ImageRef.eq(image_ref))
            .count(self.conn)
            .await
    }
}

impl<C: ConnectionTrait + TransactionTrait> EventDirectory<'_, C> {
    /// Delete an event together with its registrations, their uniqueness
    /// claims and their notification records. Returns the deleted event.
    pub async fn delete(&self, id: i32) -> Result<Option<event::Model>, DbErr> {
        let txn = self.conn.begin().await?;

        let Some(existing) = event::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let registration_ids: Vec<i32> = registration::Entity::find()
            .select_only()
            .column(registration::Column::Id)
            .filter(registration::Column::EventId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        if !registration_ids.is_empty() {
            notification_delivery::Entity::delete_many()
                .filter(notification_delivery::Column::RegistrationId.is_in(registration_ids))
                .exec(&txn)
                .await?;
        }
        registration_claim::Entity::delete_many()
            .filter(registration_claim::Column::EventId.eq(id))
            .exec(&txn)
            .await?;
        let removed = registration::Entity::delete_many()
            .filter(registration::Column::EventId.eq(id))
            .exec(&txn)
            .await?;
        event::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(
            event_id = id,
            registrations = removed.rows_affected,
            "Event deleted"
        );
        Ok(Some(existing))
    }
}
