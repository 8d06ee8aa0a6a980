use super::registrant::{Registrant, normalize_email, normalize_roll, normalize_team_name};

/// Uniqueness key families. Keys of the same kind collide across
/// registration types, so an individual's roll blocks a team member with the
/// same roll in the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    Email,
    Roll,
    TeamName,
    Account,
}

impl ClaimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimKind::Email => "email",
            ClaimKind::Roll => "roll",
            ClaimKind::TeamName => "team_name",
            ClaimKind::Account => "account",
        }
    }

    pub fn duplicate_message(&self) -> &'static str {
        match self {
            ClaimKind::Email => "This email is already registered for this event",
            ClaimKind::Roll => "This roll number is already registered for this event",
            ClaimKind::TeamName => "This team name is already taken for this event",
            ClaimKind::Account => "You are already registered for this event",
        }
    }
}

/// One key a submission wants to hold, with the request field it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub kind: ClaimKind,
    pub value: String,
    pub field: &'static str,
}

impl Claim {
    fn new(kind: ClaimKind, value: String, field: &'static str) -> Self {
        Self { kind, value, field }
    }
}

/// Keys a registrant must hold exclusively within an event, in the order
/// they are inserted.
pub fn claims_for(registrant: &Registrant) -> Vec<Claim> {
    match registrant {
        Registrant::Individual(c) => vec![
            Claim::new(ClaimKind::Email, normalize_email(&c.email), "email"),
            Claim::new(ClaimKind::Roll, normalize_roll(&c.roll), "roll"),
        ],
        Registrant::Team(t) => vec![
            Claim::new(
                ClaimKind::TeamName,
                normalize_team_name(&t.team_name),
                "teamName",
            ),
            Claim::new(ClaimKind::Email, normalize_email(&t.leader.email), "leaderEmail"),
            Claim::new(ClaimKind::Roll, normalize_roll(&t.leader.roll), "leaderRoll"),
            Claim::new(ClaimKind::Roll, normalize_roll(&t.member1.roll), "member1Roll"),
            Claim::new(ClaimKind::Roll, normalize_roll(&t.member2.roll), "member2Roll"),
        ],
        Registrant::Account(a) => {
            let mut claims = vec![Claim::new(ClaimKind::Account, a.user_id.clone(), "userId")];
            if let Some(email) = a.email.as_deref() {
                claims.push(Claim::new(ClaimKind::Email, normalize_email(email), "email"));
            }
            claims
        }
    }
}
