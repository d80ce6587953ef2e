use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tournament_registry_core::options::BracketType;
use tournament_registry_core::{Match, MatchStatus, SlotIndex};

use crate::id::{MatchId, TeamId};

/// A stored match: the core match record plus its row id and schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(default)]
    pub id: MatchId,
    #[serde(flatten)]
    pub inner: Match<TeamId>,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
}

/// The settings of one bracket generation run.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateBracket {
    pub bracket_type: BracketType,
    /// Randomize the seed order before pairing.
    pub shuffle: bool,
    pub grand_final: bool,
}

impl Default for GenerateBracket {
    fn default() -> Self {
        Self {
            bracket_type: BracketType::Single,
            shuffle: false,
            grand_final: true,
        }
    }
}

/// The summary returned by a successful generation run.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct BracketSummary {
    pub matches_created: usize,
    pub teams_count: usize,
}

/// The body of a `412 Precondition Failed` response when too few teams are
/// approved to build a bracket.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct InsufficientTeams {
    pub approved_count: usize,
}

/// A partial [`MatchRecord`] used for admin match edits. Assigning a team to
/// a slot is how upper-bracket losers are wired into the lower bracket.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PartialMatch {
    pub team1: Option<TeamId>,
    pub team2: Option<TeamId>,
    pub scores: Option<[u64; 2]>,
    pub winner: Option<SlotIndex>,
    pub status: Option<MatchStatus>,
    pub scheduled_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use tournament_registry_core::options::BracketType;
    use tournament_registry_core::{Match, Segment, Slot};

    use crate::id::TeamId;

    use super::{GenerateBracket, MatchRecord};

    #[test]
    fn test_generate_bracket_defaults() {
        let settings: GenerateBracket = serde_json::from_str("{}").unwrap();

        assert_eq!(settings.bracket_type, BracketType::Single);
        assert!(!settings.shuffle);
        assert!(settings.grand_final);

        let settings: GenerateBracket =
            serde_json::from_str(r#"{"bracket_type":"double","shuffle":true}"#).unwrap();

        assert_eq!(settings.bracket_type, BracketType::Double);
        assert!(settings.shuffle);
        assert!(settings.grand_final);
    }

    #[test]
    fn test_match_record_flattens_core_match() {
        let record = MatchRecord {
            id: 7.into(),
            inner: Match::new(
                1,
                Segment::Upper,
                1,
                [Slot::Team(TeamId(2)), Slot::Winner(4)],
            ),
            scheduled_time: None,
        };

        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["number"], 1);
        assert_eq!(value["segment"], "upper");
        assert_eq!(value["slots"][0]["team"], 2);
        assert_eq!(value["slots"][1]["winner"], 4);
        assert_eq!(value["status"], "upcoming");
    }
}
