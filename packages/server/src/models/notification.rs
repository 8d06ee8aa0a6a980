use chrono::{DateTime, Utc};
use common::DeliveryStatus;
use serde::{Deserialize, Serialize};

use super::shared::Pagination;
use crate::entity::notification_delivery;

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResponse {
    pub id: i32,
    pub registration_id: i32,
    pub recipient: String,
    pub status: DeliveryStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<notification_delivery::Model> for DeliveryResponse {
    fn from(m: notification_delivery::Model) -> Self {
        Self {
            id: m.id,
            registration_id: m.registration_id,
            recipient: m.recipient,
            status: m.status,
            attempts: m.attempts,
            last_error: m.last_error,
            created_at: m.created_at,
            last_attempt_at: m.last_attempt_at,
            sent_at: m.sent_at,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryListQuery {
    /// pending, sending, sent or failed.
    pub status: Option<String>,
    pub registration_id: Option<i32>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeliveryListResponse {
    pub deliveries: Vec<DeliveryResponse>,
    pub pagination: Pagination,
}
