#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review state of an event registration.
///
/// Every registration starts as `Pending`. An administrator moves it to
/// `Approved` or `Rejected`; the two terminal states may be swapped at any
/// time, but nothing moves a registration back to `Pending`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")
)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Submitted, awaiting review.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pending"))]
    Pending,
    /// Accepted by an administrator; the registrant is notified.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "approved"))]
    Approved,
    /// Declined by an administrator.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "rejected"))]
    Rejected,
}

impl RegistrationStatus {
    pub const ALL: &'static [RegistrationStatus] = &[Self::Pending, Self::Approved, Self::Rejected];

    /// States an administrator may set explicitly.
    pub const REVIEWABLE: &'static [RegistrationStatus] = &[Self::Approved, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns true for the states produced by a review decision.
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
    expected: &'static [&'static str],
}

impl ParseStatusError {
    pub fn new(invalid: impl Into<String>, expected: &'static [&'static str]) -> Self {
        Self {
            invalid: invalid.into(),
            expected,
        }
    }
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for RegistrationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseStatusError::new(
                s,
                &["pending", "approved", "rejected"],
            )),
        }
    }
}
