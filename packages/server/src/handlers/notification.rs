use axum::Json;
use axum::extract::State;
use chrono::Utc;
use common::DeliveryStatus;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::path::{AppPath, AppQuery};
use crate::models::notification::*;
use crate::models::shared::{Pagination, page_params};
use crate::notification::DeliveryFilter;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Notifications",
    operation_id = "listNotifications",
    summary = "List confirmation deliveries",
    description = "Newest first, with the outcome of the latest attempt. Requires the `admin` role.",
    params(DeliveryListQuery),
    responses(
        (status = 200, description = "Deliveries", body = DeliveryListResponse),
        (status = 400, description = "Invalid filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_notifications(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<DeliveryListQuery>,
) -> Result<Json<DeliveryListResponse>, AppError> {
    auth_user.require_admin()?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<DeliveryStatus>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (page, per_page) = page_params(query.page, query.per_page, 50, 200);
    let filter = DeliveryFilter {
        status,
        registration_id: query.registration_id,
        page,
        per_page,
    };
    let (deliveries, total) = state.dispatcher.list(&filter).await?;

    Ok(Json(DeliveryListResponse {
        deliveries: deliveries.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/retry",
    tag = "Notifications",
    operation_id = "retryNotification",
    summary = "Retry a confirmation delivery",
    description = "Makes one delivery attempt now and returns the recorded outcome. A failed \
        attempt is reported in the body, not as an error status. Requires the `admin` role.",
    params(("id" = i32, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Attempt recorded", body = DeliveryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Delivery not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already sent or in progress (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn retry_notification(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<DeliveryResponse>, AppError> {
    auth_user.require_admin()?;

    let delivery = state.dispatcher.attempt(id, Utc::now()).await?;
    Ok(Json(delivery.into()))
}
