use axum::Json;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::ImageRef;
use sea_orm::{TransactionSession, TransactionTrait};
use tokio_util::io::ReaderStream;
use tracing::{instrument, warn};

use crate::directory::{EventDirectory, EventFilter, lock_image};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::extractors::path::{AppPath, AppQuery};
use crate::models::event::*;
use crate::models::shared::{Pagination, page_params};
use crate::state::AppState;

/// Multipart overhead allowed on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn image_upload_body_limit(max_image_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(
        usize::try_from(max_image_size)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD),
    )
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Events",
    operation_id = "listEvents",
    summary = "List events",
    description = "Public listing ordered by event date, latest first. Optional `category` filter.",
    params(EventListQuery),
    responses(
        (status = 200, description = "List of events", body = EventListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_events(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<EventListQuery>,
) -> Result<Json<EventListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page, 20, 100);
    let filter = EventFilter {
        category: query.category.filter(|c| !c.trim().is_empty()),
        page,
        per_page,
    };

    let (events, total) = EventDirectory::new(&state.db).list(&filter).await?;

    Ok(Json(EventListResponse {
        events: events.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Events",
    operation_id = "getEvent",
    summary = "Get an event by ID",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event details", body = EventResponse),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<EventResponse>, AppError> {
    let event = EventDirectory::new(&state.db)
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
    Ok(Json(event.into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Events",
    operation_id = "createEvent",
    summary = "Create an event",
    description = "Requires the `admin` role.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    validate_create_event(&payload)?;

    let event = EventDirectory::new(&state.db).create(payload).await?;
    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Events",
    operation_id = "updateEvent",
    summary = "Update an event",
    description = "Partial update; omitted fields are unchanged. `registrationDeadline: null` \
        removes the deadline. Requires the `admin` role.",
    params(("id" = i32, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn update_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateEventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    auth_user.require_admin()?;
    validate_update_event(&payload)?;

    let event = EventDirectory::new(&state.db)
        .update(id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
    Ok(Json(event.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Events",
    operation_id = "deleteEvent",
    summary = "Delete an event",
    description = "Deletes the event together with its registrations and their notification \
        records. Requires the `admin` role.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_admin()?;

    let directory = EventDirectory::new(&state.db);
    let deleted = directory
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;

    if let Some(image_ref) = deleted.image_ref {
        release_image(&state, &image_ref).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/image",
    tag = "Events",
    operation_id = "uploadEventImage",
    summary = "Upload the event image",
    description = "Stores the `image` multipart field and makes it the event's image. The part \
        must carry an `image/*` content type. Requires the `admin` role.",
    params(("id" = i32, Path, description = "Event ID")),
    request_body(content_type = "multipart/form-data", description = "Image upload"),
    responses(
        (status = 200, description = "Image stored", body = ImageUploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Image storage failed (DEPENDENCY_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn upload_event_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    mut multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, AppError> {
    auth_user.require_admin()?;

    let directory = EventDirectory::new(&state.db);
    if directory.get(id).await?.is_none() {
        return Err(AppError::NotFound("Event not found".into()));
    }

    let mut upload: Option<(Vec<u8>, String)> = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_owned)
            .or_else(|| {
                field
                    .file_name()
                    .and_then(|name| mime_guess::from_path(name).first())
                    .map(|m| m.to_string())
            })
            .unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation(
                "The 'image' field must have an image/* content type".into(),
            ));
        }

        let limit = state.config.storage.max_image_size;
        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read image: {e}")))?
        {
            data.extend_from_slice(&chunk);
            if data.len() as u64 > limit {
                return Err(AppError::Validation(format!(
                    "Image exceeds the {limit} byte limit"
                )));
            }
        }
        upload = Some((data, content_type));
        break;
    }

    let (data, content_type) =
        upload.ok_or_else(|| AppError::Validation("Missing 'image' field".into()))?;

    let image_ref = ImageRef::compute(&data).to_hex();
    let txn = state.db.begin().await?;
    lock_image(&txn, &image_ref).await?;
    state.images.put(&data).await?;
    let updated = EventDirectory::new(&txn)
        .set_image(id, image_ref.clone(), content_type.clone())
        .await?;
    txn.commit().await?;
    let (_, previous) = updated.ok_or_else(|| AppError::NotFound("Event not found".into()))?;

    if let Some(previous) = previous.filter(|p| *p != image_ref) {
        release_image(&state, &previous).await;
    }

    Ok(Json(ImageUploadResponse {
        image_ref,
        content_type,
        size: data.len() as u64,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/image",
    tag = "Events",
    operation_id = "getEventImage",
    summary = "Download the event image",
    description = "Streams the stored image. Supports ETag-based caching via If-None-Match.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Image content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "Event or image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn get_event_image(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let event = EventDirectory::new(&state.db)
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
    let image_ref = event
        .image_ref
        .ok_or_else(|| AppError::NotFound("Event has no image".into()))?;

    let etag_value = format!("\"{image_ref}\"");
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let image: ImageRef = image_ref.parse()?;
    let reader = state.images.open(&image).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = event
        .image_content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Remove an image from the store once no event points at it.
async fn release_image(state: &AppState, image_ref: &str) {
    if let Err(e) = delete_if_unreferenced(state, image_ref).await {
        warn!(image_ref, error = ?e, "Failed to release image");
    }
}

async fn delete_if_unreferenced(state: &AppState, image_ref: &str) -> Result<(), AppError> {
    let image = image_ref.parse::<ImageRef>()?;

    let txn = state.db.begin().await?;
    lock_image(&txn, image_ref).await?;
    if EventDirectory::new(&txn).image_ref_count(image_ref).await? == 0 {
        state.images.delete(&image).await?;
    }
    txn.commit().await?;

    Ok(())
}
