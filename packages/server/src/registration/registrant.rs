use std::str::FromStr;

use lettre::Address;
use serde::{Deserialize, Serialize};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 50;
pub const TEAM_NAME_MIN: usize = 3;
pub const TEAM_NAME_MAX: usize = 50;
pub const ROLL_MAX: usize = 50;

/// Fallback display name for accounts that carry none.
pub const ANONYMOUS_NAME: &str = "Anonymous User";

/// A single participant who can be contacted directly.
///
/// Used for individual registrations and for the team leader.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactDetails {
    #[schema(example = "Asha Verma")]
    pub name: String,
    #[schema(example = "asha@example.org")]
    pub email: String,
    /// Exactly 10 digits.
    #[schema(example = "9876543210")]
    pub phone: String,
    /// Institutional roll number.
    #[schema(example = "CS21B042")]
    pub roll: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberDetails {
    pub name: String,
    pub roll: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamDetails {
    #[schema(example = "Null Pointers")]
    pub team_name: String,
    pub leader: ContactDetails,
    pub member1: MemberDetails,
    pub member2: MemberDetails,
}

/// Identity of a signed-in member, taken from their bearer token.
#[derive(Debug, Clone)]
pub struct AccountIdentity {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AccountIdentity {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS_NAME)
    }
}

/// Everything the ledger needs to know about who is registering.
#[derive(Debug, Clone)]
pub enum Registrant {
    Individual(ContactDetails),
    Team(TeamDetails),
    Account(AccountIdentity),
}

/// A rejected request field, named as the client sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn normalize_roll(roll: &str) -> String {
    roll.trim().to_uppercase()
}

pub fn normalize_team_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Registrant {
    /// Check every field and report all failures at once.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        match self {
            Registrant::Individual(c) => {
                check_contact(c, ["name", "email", "phone", "roll"], &mut errors);
            }
            Registrant::Team(t) => {
                check_len(
                    "teamName",
                    "Team name",
                    &t.team_name,
                    TEAM_NAME_MIN,
                    TEAM_NAME_MAX,
                    &mut errors,
                );
                check_contact(
                    &t.leader,
                    ["leaderName", "leaderEmail", "leaderPhone", "leaderRoll"],
                    &mut errors,
                );
                check_name("member1Name", &t.member1.name, &mut errors);
                check_roll("member1Roll", &t.member1.roll, &mut errors);
                check_name("member2Name", &t.member2.name, &mut errors);
                check_roll("member2Roll", &t.member2.roll, &mut errors);
            }
            Registrant::Account(a) => {
                if a.user_id.trim().is_empty() {
                    errors.push(FieldError::new("userId", "Account id is required"));
                }
                match a.email.as_deref().map(str::trim) {
                    None | Some("") => errors.push(FieldError::new(
                        "email",
                        "Your account has no email address",
                    )),
                    Some(email) => check_email("email", email, &mut errors),
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Names and contact address as stored on the registration row.
    pub fn primary_name(&self) -> &str {
        match self {
            Registrant::Individual(c) => c.name.trim(),
            Registrant::Team(t) => t.leader.name.trim(),
            Registrant::Account(a) => a.display_name(),
        }
    }

    pub fn primary_email(&self) -> &str {
        match self {
            Registrant::Individual(c) => c.email.trim(),
            Registrant::Team(t) => t.leader.email.trim(),
            Registrant::Account(a) => a.email.as_deref().map(str::trim).unwrap_or_default(),
        }
    }
}

impl TeamDetails {
    /// Roll fields that repeat another roll in the same team.
    ///
    /// Rolls are compared after normalisation; blank rolls are left to field
    /// validation. Every position sharing a roll is reported, in form order.
    pub fn duplicate_roll_fields(&self) -> Vec<&'static str> {
        let rolls = [
            ("leaderRoll", normalize_roll(&self.leader.roll)),
            ("member1Roll", normalize_roll(&self.member1.roll)),
            ("member2Roll", normalize_roll(&self.member2.roll)),
        ];

        rolls
            .iter()
            .filter(|(field, roll)| {
                !roll.is_empty()
                    && rolls
                        .iter()
                        .any(|(other, other_roll)| other != field && other_roll == roll)
            })
            .map(|(field, _)| *field)
            .collect()
    }
}

fn check_contact(c: &ContactDetails, fields: [&'static str; 4], errors: &mut Vec<FieldError>) {
    let [name, email, phone, roll] = fields;
    check_name(name, &c.name, errors);
    check_email(email, &c.email, errors);
    check_phone(phone, &c.phone, errors);
    check_roll(roll, &c.roll, errors);
}

fn check_name(field: &'static str, value: &str, errors: &mut Vec<FieldError>) {
    check_len(field, "Name", value, NAME_MIN, NAME_MAX, errors);
}

fn check_len(
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
    max: usize,
    errors: &mut Vec<FieldError>,
) {
    let len = value.trim().chars().count();
    if len < min {
        errors.push(FieldError::new(
            field,
            format!("{label} must be at least {min} characters"),
        ));
    } else if len > max {
        errors.push(FieldError::new(
            field,
            format!("{label} must be at most {max} characters"),
        ));
    }
}

fn check_email(field: &'static str, value: &str, errors: &mut Vec<FieldError>) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(FieldError::new(field, "Email is required"));
    } else if Address::from_str(value).is_err() {
        errors.push(FieldError::new(field, "Invalid email address"));
    }
}

fn check_phone(field: &'static str, value: &str, errors: &mut Vec<FieldError>) {
    let value = value.trim();
    if value.len() != 10 || !value.bytes().all(|b| b.is_ascii_digit()) {
        errors.push(FieldError::new(field, "Phone number must be 10 digits"));
    }
}

fn check_roll(field: &'static str, value: &str, errors: &mut Vec<FieldError>) {
    let len = value.trim().chars().count();
    if len == 0 {
        errors.push(FieldError::new(field, "Roll number is required"));
    } else if len > ROLL_MAX {
        errors.push(FieldError::new(
            field,
            format!("Roll number must be at most {ROLL_MAX} characters"),
        ));
    }
}
