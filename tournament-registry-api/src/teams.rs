use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::TeamId;

/// A registered team.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub id: TeamId,
    pub name: String,
    pub captain_name: String,
    pub captain_telegram: String,
    pub members_count: u32,
    /// One player per line.
    pub members_info: String,
    pub auth_code: String,
    pub status: TeamStatus,
    #[serde(default)]
    pub admin_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Merges the set fields of `partial` into the team.
    pub fn update(&mut self, partial: PartialTeam) {
        if let Some(name) = partial.name {
            self.name = name;
        }

        if let Some(captain_name) = partial.captain_name {
            self.captain_name = captain_name;
        }

        if let Some(captain_telegram) = partial.captain_telegram {
            self.captain_telegram = captain_telegram;
        }

        if let Some(members_info) = partial.members_info {
            self.members_count = members_count(&members_info);
            self.members_info = members_info;
        }

        if let Some(status) = partial.status {
            self.status = status;
        }

        if let Some(admin_comment) = partial.admin_comment {
            self.admin_comment = Some(admin_comment);
        }
    }
}

/// The moderation state of a team.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl TeamStatus {
    #[inline]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Rejected => 2,
        }
    }

    #[inline]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Pending),
            1 => Some(Self::Approved),
            2 => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl Display for TeamStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

/// The public registration payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterTeam {
    pub name: String,
    pub captain_name: String,
    pub captain_telegram: String,
    #[serde(default)]
    pub members_info: String,
}

/// The response to a successful registration. The auth code is the captain's
/// only credential for later self-service edits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamRegistered {
    pub team_id: TeamId,
    pub auth_code: String,
}

/// A partial [`Team`] used for updates. `status` and `admin_comment` may only
/// be changed by admins.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PartialTeam {
    pub name: Option<String>,
    pub captain_name: Option<String>,
    pub captain_telegram: Option<String>,
    pub members_info: Option<String>,
    pub status: Option<TeamStatus>,
    pub admin_comment: Option<String>,
}

impl PartialTeam {
    /// Returns `true` if the update touches admin-only fields.
    #[inline]
    pub fn is_moderation(&self) -> bool {
        self.status.is_some() || self.admin_comment.is_some()
    }
}

/// Normalizes an auth code for comparison: captains paste codes with and
/// without the `REG` prefix, dashes and spaces, in any case.
pub fn normalize_auth_code(code: &str) -> String {
    code.to_uppercase()
        .replace("REG", "")
        .replace('-', "")
        .replace(' ', "")
}

/// Counts the non-empty roster lines.
pub fn members_count(members_info: &str) -> u32 {
    members_info.lines().filter(|line| !line.trim().is_empty()).count() as u32
}

#[cfg(test)]
mod tests {
    use super::{members_count, normalize_auth_code, PartialTeam, TeamStatus};

    #[test]
    fn test_normalize_auth_code() {
        assert_eq!(normalize_auth_code("REG-AB12-CD34"), "AB12CD34");
        assert_eq!(normalize_auth_code("reg-ab12-cd34"), "AB12CD34");
        assert_eq!(normalize_auth_code(" ab12 cd34 "), "AB12CD34");
        assert_eq!(normalize_auth_code("AB12CD34"), "AB12CD34");
    }

    #[test]
    fn test_members_count() {
        assert_eq!(members_count(""), 0);
        assert_eq!(members_count("alice\nbob"), 2);
        assert_eq!(members_count("alice\n\n  \nbob\n"), 2);
    }

    #[test]
    fn test_team_status_serde() {
        use serde_test::{assert_tokens, Token};

        assert_tokens(
            &TeamStatus::Approved,
            &[Token::UnitVariant {
                name: "TeamStatus",
                variant: "approved",
            }],
        );
    }

    #[test]
    fn test_team_status_u8_roundtrip() {
        for status in [TeamStatus::Pending, TeamStatus::Approved, TeamStatus::Rejected] {
            assert_eq!(TeamStatus::from_u8(status.to_u8()), Some(status));
        }
        assert_eq!(TeamStatus::from_u8(3), None);
    }

    #[test]
    fn test_partial_team_is_moderation() {
        assert!(!PartialTeam::default().is_moderation());

        let partial = PartialTeam {
            status: Some(TeamStatus::Approved),
            ..PartialTeam::default()
        };
        assert!(partial.is_moderation());
    }
}
