use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use common::RegistrationStatus;
use tracing::instrument;

use crate::directory::EventDirectory;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::extractors::path::{AppPath, AppQuery};
use crate::models::registration::*;
use crate::models::shared::{Pagination, page_params};
use crate::registration::export::{registrations_csv, slug};
use crate::registration::{
    AccountIdentity, ApprovalWorkflow, Registrant, RegistrationFilter, RegistrationLedger,
    parse_reviewable,
};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/event-registration",
    tag = "Registrations",
    operation_id = "submitRegistration",
    summary = "Register for an event",
    description = "Public registration form. The `type` field selects the individual or team \
        shape. Checks run in order: event exists, registration still open, no repeated roll \
        numbers within the team, field validation, then uniqueness of email, roll numbers and \
        team name within the event.",
    request_body = SubmitRegistrationRequest,
    responses(
        (status = 200, description = "Registration recorded as pending", body = SubmitRegistrationResponse),
        (status = 400, description = "Rejected (VALIDATION_ERROR, DUPLICATE_ROLL_IN_TEAM, EVENT_NOT_FOUND, REGISTRATION_CLOSED, DUPLICATE_REGISTRANT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(event_id = payload.event_id()))]
pub async fn submit_registration(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SubmitRegistrationRequest>,
) -> Result<Json<SubmitRegistrationResponse>, AppError> {
    let (event_id, registrant) = payload.into_parts();

    let registration = RegistrationLedger::new(&state.db)
        .submit(event_id, registrant, Utc::now())
        .await?;

    Ok(Json(SubmitRegistrationResponse {
        message: "Registration successful".into(),
        registration_id: registration.id,
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Registrations",
    operation_id = "registerAccount",
    summary = "Register the signed-in account for an event",
    description = "Registrant name and email come from the bearer token. An account can hold \
        one registration per event.",
    request_body = AccountRegistrationRequest,
    responses(
        (status = 201, description = "Registration recorded as pending", body = AccountRegistrationResponse),
        (status = 400, description = "Rejected (VALIDATION_ERROR, EVENT_NOT_FOUND, REGISTRATION_CLOSED, DUPLICATE_REGISTRANT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(event_id = payload.event_id, user_id = %auth_user.user_id))]
pub async fn register_account(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AccountRegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let registrant = Registrant::Account(AccountIdentity {
        user_id: auth_user.user_id,
        name: auth_user.name,
        email: auth_user.email,
    });

    let registration = RegistrationLedger::new(&state.db)
        .submit(payload.event_id, registrant, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountRegistrationResponse {
            message: "Registration successful".into(),
            registration: registration.into(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/event/{eventId}",
    tag = "Registrations",
    operation_id = "listEventRegistrations",
    summary = "List registrations for an event",
    description = "Newest first. Requires the `admin` role.",
    params(("eventId" = i32, Path, description = "Event ID"), RegistrationListQuery),
    responses(
        (status = 200, description = "Registrations", body = RegistrationListResponse),
        (status = 400, description = "Malformed ID or filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_event_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(event_id): AppPath<i32>,
    AppQuery(query): AppQuery<RegistrationListQuery>,
) -> Result<Json<RegistrationListResponse>, AppError> {
    auth_user.require_admin()?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<RegistrationStatus>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if EventDirectory::new(&state.db).get(event_id).await?.is_none() {
        return Err(AppError::NotFound("Event not found".into()));
    }

    let (page, per_page) = page_params(query.page, query.per_page, 100, 500);
    let filter = RegistrationFilter {
        status,
        page,
        per_page,
    };
    let (rows, total) = RegistrationLedger::new(&state.db)
        .list_for_event(event_id, &filter)
        .await?;

    Ok(Json(RegistrationListResponse {
        registrations: rows.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/event/{eventId}/export",
    tag = "Registrations",
    operation_id = "exportEventRegistrations",
    summary = "Export registrations as CSV",
    description = "All registrations of the event, newest first. Requires the `admin` role.",
    params(("eventId" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn export_event_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(event_id): AppPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;

    let event = EventDirectory::new(&state.db)
        .get(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
    let rows = RegistrationLedger::new(&state.db)
        .all_for_event(event_id)
        .await?;

    let disposition = format!(
        "attachment; filename=\"{}-registrations.csv\"",
        slug(&event.title)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        registrations_csv(&rows),
    ))
}

#[utoipa::path(
    get,
    path = "/user/{userId}",
    tag = "Registrations",
    operation_id = "listUserRegistrations",
    summary = "List an account's registrations",
    description = "Registrations made through the account, newest first, each with its event. \
        Only the account itself may ask.",
    params(("userId" = String, Path, description = "External account ID")),
    responses(
        (status = 200, description = "Registrations", body = UserRegistrationsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_user_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(user_id): AppPath<String>,
) -> Result<Json<UserRegistrationsResponse>, AppError> {
    auth_user.require_self(&user_id)?;

    let rows = RegistrationLedger::new(&state.db)
        .list_for_user(&user_id)
        .await?;

    Ok(Json(UserRegistrationsResponse {
        registrations: rows
            .into_iter()
            .map(|(registration, event)| UserRegistrationResponse {
                registration: registration.into(),
                event: event.map(Into::into),
            })
            .collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Registrations",
    operation_id = "setAttendance",
    summary = "Mark attendance",
    description = "Requires the `admin` role.",
    params(("id" = i32, Path, description = "Registration ID")),
    request_body = SetAttendanceRequest,
    responses(
        (status = 200, description = "Registration updated", body = RegistrationResponse),
        (status = 400, description = "Non-boolean `attended` (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Registration not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(attended = payload.attended))]
pub async fn set_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<SetAttendanceRequest>,
) -> Result<Json<RegistrationResponse>, AppError> {
    auth_user.require_admin()?;

    let registration = RegistrationLedger::new(&state.db)
        .set_attendance(id, payload.attended)
        .await?
        .ok_or_else(|| AppError::NotFound("Registration not found".into()))?;
    Ok(Json(registration.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}/status",
    tag = "Registrations",
    operation_id = "setRegistrationStatus",
    summary = "Approve or reject a registration",
    description = "Sets the status to `approved` or `rejected`; either may replace the other. \
        A confirmation email is queued when the registration becomes approved. Delivery \
        happens in the background and its failure never undoes the status change. Repeating \
        the same status is a no-op. Requires the `admin` role.",
    params(("id" = i32, Path, description = "Registration ID")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status recorded", body = SetStatusResponse),
        (status = 400, description = "Invalid status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Registration not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(status = %payload.status))]
pub async fn set_registration_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<SetStatusRequest>,
) -> Result<Json<SetStatusResponse>, AppError> {
    auth_user.require_admin()?;
    let status = parse_reviewable(&payload.status)?;

    let outcome = ApprovalWorkflow::new(&state.db, &state.dispatcher)
        .set_status(id, status, payload.event_id, Utc::now())
        .await?;

    Ok(Json(SetStatusResponse {
        registration: outcome.registration.into(),
        notification: outcome.notification.map(Into::into),
    }))
}
