use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, double_option};
use crate::entity::event;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[schema(example = "Intro to Rust Workshop")]
    pub title: String,
    pub description: String,
    #[schema(example = "2025-03-01")]
    pub date: NaiveDate,
    #[schema(example = "18:30")]
    pub time: String,
    #[schema(example = "Seminar Hall 2")]
    pub venue: String,
    #[schema(example = "workshop")]
    pub category: String,
    /// Registrations are refused after this instant. Omit to keep them open.
    pub registration_deadline: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub category: Option<String>,
    /// `null` removes the deadline.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub registration_deadline: Option<Option<DateTime<Utc>>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct EventListQuery {
    /// Only events of this category.
    pub category: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub venue: String,
    pub category: String,
    /// Content hash of the event image, if one was uploaded.
    pub image_ref: Option<String>,
    /// Where the image can be fetched.
    pub image_url: Option<String>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event fields embedded in registration listings.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: i32,
    pub title: String,
    pub date: NaiveDate,
    pub time: String,
    pub venue: String,
    pub category: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub image_ref: String,
    pub content_type: String,
    pub size: u64,
}

pub fn image_url(event_id: i32) -> String {
    format!("/api/v1/events/{event_id}/image")
}

impl From<event::Model> for EventResponse {
    fn from(m: event::Model) -> Self {
        Self {
            image_url: m.image_ref.as_ref().map(|_| image_url(m.id)),
            id: m.id,
            title: m.title,
            description: m.description,
            date: m.date,
            time: m.time,
            venue: m.venue,
            category: m.category,
            image_ref: m.image_ref,
            registration_deadline: m.registration_deadline,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<event::Model> for EventSummary {
    fn from(m: event::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            date: m.date,
            time: m.time,
            venue: m.venue,
            category: m.category,
        }
    }
}

fn validate_text(label: &str, value: &str, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len == 0 || len > max {
        return Err(AppError::Validation(format!(
            "{label} must be 1-{max} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty() || description.len() > 100_000 {
        return Err(AppError::Validation(
            "Description must be non-empty and at most 100KB".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_event(req: &CreateEventRequest) -> Result<(), AppError> {
    validate_text("Title", &req.title, 200)?;
    validate_description(&req.description)?;
    validate_text("Time", &req.time, 32)?;
    validate_text("Venue", &req.venue, 200)?;
    validate_text("Category", &req.category, 50)?;
    Ok(())
}

pub fn validate_update_event(req: &UpdateEventRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_text("Title", title, 200)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let Some(ref time) = req.time {
        validate_text("Time", time, 32)?;
    }
    if let Some(ref venue) = req.venue {
        validate_text("Venue", venue, 200)?;
    }
    if let Some(ref category) = req.category {
        validate_text("Category", category, 50)?;
    }
    Ok(())
}
