use chrono::{DateTime, Utc};
use common::RegistrationStatus;
use serde::{Deserialize, Serialize};

use super::event::EventSummary;
use super::notification::DeliveryResponse;
use super::shared::Pagination;
use crate::entity::registration::{self, RegistrationKind};
use crate::registration::registrant::{ContactDetails, MemberDetails, Registrant, TeamDetails};

/// Public registration form submission. The `type` tag selects the shape.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SubmitRegistrationRequest {
    Individual(IndividualSubmission),
    Team(TeamSubmission),
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndividualSubmission {
    pub event_id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub roll: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamSubmission {
    pub event_id: i32,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub leader: ContactDetails,
    #[serde(default)]
    pub member1: MemberDetails,
    #[serde(default)]
    pub member2: MemberDetails,
}

impl SubmitRegistrationRequest {
    pub fn event_id(&self) -> i32 {
        match self {
            SubmitRegistrationRequest::Individual(s) => s.event_id,
            SubmitRegistrationRequest::Team(s) => s.event_id,
        }
    }

    pub fn into_parts(self) -> (i32, Registrant) {
        match self {
            SubmitRegistrationRequest::Individual(s) => (
                s.event_id,
                Registrant::Individual(ContactDetails {
                    name: s.name,
                    email: s.email,
                    phone: s.phone,
                    roll: s.roll,
                }),
            ),
            SubmitRegistrationRequest::Team(s) => (
                s.event_id,
                Registrant::Team(TeamDetails {
                    team_name: s.team_name,
                    leader: s.leader,
                    member1: s.member1,
                    member2: s.member2,
                }),
            ),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRegistrationResponse {
    #[schema(example = "Registration successful")]
    pub message: String,
    pub registration_id: i32,
}

/// Registration of the signed-in account; identity comes from the token.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountRegistrationRequest {
    pub event_id: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AccountRegistrationResponse {
    pub message: String,
    pub registration: RegistrationResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberResponse {
    pub name: String,
    pub roll: String,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: i32,
    pub event_id: i32,
    #[serde(rename = "type")]
    pub kind: RegistrationKind,
    /// Registrant, or team leader for team registrations.
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<TeamMemberResponse>,
    pub status: RegistrationStatus,
    pub attended: bool,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<registration::Model> for RegistrationResponse {
    fn from(m: registration::Model) -> Self {
        let members = [
            (m.member1_name, m.member1_roll),
            (m.member2_name, m.member2_roll),
        ]
        .into_iter()
        .filter_map(|(name, roll)| Some(TeamMemberResponse { name: name?, roll: roll? }))
        .collect();

        Self {
            id: m.id,
            event_id: m.event_id,
            kind: m.kind,
            name: m.name,
            email: m.email,
            phone: m.phone,
            roll: m.roll,
            user_id: m.user_id,
            team_name: m.team_name,
            members,
            status: m.status,
            attended: m.attended,
            registered_at: m.registered_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationListQuery {
    /// Page number (default 1).
    pub page: Option<u64>,
    /// Items per page (default 100, max 500).
    pub per_page: Option<u64>,
    /// Only registrations in this status: pending, approved or rejected.
    pub status: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationListResponse {
    pub registrations: Vec<RegistrationResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserRegistrationResponse {
    #[serde(flatten)]
    pub registration: RegistrationResponse,
    /// `null` if the event no longer exists.
    pub event: Option<EventSummary>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserRegistrationsResponse {
    pub registrations: Vec<UserRegistrationResponse>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetAttendanceRequest {
    pub attended: bool,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    /// `approved` or `rejected`.
    #[schema(example = "approved")]
    pub status: String,
    /// When given, must match the registration's event.
    pub event_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SetStatusResponse {
    pub registration: RegistrationResponse,
    /// Confirmation queued by this call, if the registration just became approved.
    pub notification: Option<DeliveryResponse>,
}
