//! # tournament-registry-core
//!
//! This crate contains the match model and the bracket generator for the
//! tournament registry. It is pure computation: no I/O, no clock and no
//! randomness of its own (shuffling is injected by the caller).
//!
//! Important types:
//! - [`generate`]/[`generate_with`]: Build a full elimination bracket from an
//! ordered team list.
//! - [`Bracket`]: The generated match list, with result reporting and
//! placeholder resolution.
//! - [`Match`]: A single match between two [`Slot`]s.
//! - [`Slot`]: A spot within a match: a concrete team, a `winner of match #K`
//! placeholder, a bye, or a not-yet-wired spot.
//!
//! ## Feature Flags
//!
//! `serde`: Adds `Serialize` and `Deserialize` impls to all model types.

pub mod options;

mod generate;

pub use generate::{generate, generate_with, Bracket};

use std::fmt::{self, Display, Formatter};
use std::result;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The sequential number of a match within one generation run. Numbers start
/// at 1 and are contiguous across the whole bracket.
pub type MatchNumber = u64;

/// The minimum number of teams required to build a bracket.
pub const MIN_TEAMS: usize = 2;

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("not enough teams for a bracket: found {found}, need at least 2")]
    NotEnoughTeams { found: usize },
    #[error("no match with number {number}")]
    UnknownMatch { number: MatchNumber },
    #[error("slot {slot} of match {number} does not hold a team")]
    UnresolvedSlot { number: MatchNumber, slot: SlotIndex },
}

/// The bracket segment a match belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Segment {
    Upper,
    Lower,
    GrandFinal,
}

impl Segment {
    #[inline]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Upper => 0,
            Self::Lower => 1,
            Self::GrandFinal => 2,
        }
    }

    #[inline]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Upper),
            1 => Some(Self::Lower),
            2 => Some(Self::GrandFinal),
            _ => None,
        }
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::GrandFinal => "grand_final",
        })
    }
}

/// The lifecycle state of a match.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchStatus {
    #[default]
    Upcoming,
    Live,
    Finished,
}

/// One of the two slots of a match.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SlotIndex {
    First,
    Second,
}

impl SlotIndex {
    /// Returns the array index of the slot.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// Returns the other slot of the match.
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl Display for SlotIndex {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Second => "second",
        })
    }
}

/// A spot for a team in a match.
///
/// At generation time only round-1 upper-bracket matches hold [`Team`] values
/// (and at most one [`Bye`]); every later spot is a [`Winner`] placeholder
/// referencing an earlier match, or [`Tbd`] for lower-bracket spots that are
/// wired only once upper-bracket losers are known.
///
/// [`Team`]: Self::Team
/// [`Bye`]: Self::Bye
/// [`Winner`]: Self::Winner
/// [`Tbd`]: Self::Tbd
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Slot<T> {
    Team(T),
    Winner(MatchNumber),
    Bye,
    Tbd,
}

impl<T> Slot<T> {
    /// Returns `true` if the slot holds a concrete team.
    #[inline]
    pub fn is_team(&self) -> bool {
        matches!(self, Self::Team(_))
    }

    /// Returns `true` if the slot is a `winner of match #K` placeholder.
    #[inline]
    pub fn is_winner(&self) -> bool {
        matches!(self, Self::Winner(_))
    }

    #[inline]
    pub fn is_bye(&self) -> bool {
        matches!(self, Self::Bye)
    }

    #[inline]
    pub fn is_tbd(&self) -> bool {
        matches!(self, Self::Tbd)
    }

    /// Returns the team in the slot, if any.
    #[inline]
    pub fn team(&self) -> Option<&T> {
        match self {
            Self::Team(team) => Some(team),
            _ => None,
        }
    }

    /// Converts an `&Slot<T>` into an `Slot<&T>`.
    pub fn as_ref(&self) -> Slot<&T> {
        match self {
            Self::Team(team) => Slot::Team(team),
            Self::Winner(number) => Slot::Winner(*number),
            Self::Bye => Slot::Bye,
            Self::Tbd => Slot::Tbd,
        }
    }

    /// Maps `Slot<T>` to `Slot<U>` by applying `f` to a contained team.
    pub fn map<U, F>(self, f: F) -> Slot<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Team(team) => Slot::Team(f(team)),
            Self::Winner(number) => Slot::Winner(number),
            Self::Bye => Slot::Bye,
            Self::Tbd => Slot::Tbd,
        }
    }
}

/// A single match between two [`Slot`]s.
///
/// `scores` and `winner` are only meaningful once `status` is
/// [`MatchStatus::Finished`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Match<T> {
    pub number: MatchNumber,
    pub segment: Segment,
    /// 1-based within the segment.
    pub round: u32,
    pub slots: [Slot<T>; 2],
    pub status: MatchStatus,
    pub scores: [u64; 2],
    pub winner: Option<SlotIndex>,
}

impl<T> Match<T> {
    /// Creates a new upcoming `Match` with no result.
    pub fn new(number: MatchNumber, segment: Segment, round: u32, slots: [Slot<T>; 2]) -> Self {
        Self {
            number,
            segment,
            round,
            slots,
            status: MatchStatus::Upcoming,
            scores: [0, 0],
            winner: None,
        }
    }

    /// Returns a reference to the slot at `index`.
    #[inline]
    pub fn slot(&self, index: SlotIndex) -> &Slot<T> {
        &self.slots[index.index()]
    }

    /// Returns the winning team, if the match is finished and the winning
    /// slot is resolved.
    pub fn winner_team(&self) -> Option<&T> {
        self.winner.and_then(|index| self.slot(index).team())
    }
}

#[cfg(test)]
mod tests {
    use super::{Match, MatchStatus, Segment, Slot, SlotIndex};

    #[test]
    fn test_slot_accessors() {
        let slot: Slot<u32> = Slot::Team(3);
        assert!(slot.is_team());
        assert_eq!(slot.team(), Some(&3));
        assert_eq!(slot.map(|t| t + 1), Slot::Team(4));

        let slot: Slot<u32> = Slot::Winner(7);
        assert!(slot.is_winner());
        assert_eq!(slot.team(), None);
        assert_eq!(slot.map(|t| t + 1), Slot::Winner(7));
    }

    #[test]
    fn test_segment_u8_roundtrip() {
        for segment in [Segment::Upper, Segment::Lower, Segment::GrandFinal] {
            assert_eq!(Segment::from_u8(segment.to_u8()), Some(segment));
        }
        assert_eq!(Segment::from_u8(3), None);
    }

    #[test]
    fn test_winner_team() {
        let mut m = Match::new(1, Segment::Upper, 1, [Slot::Team("a"), Slot::Team("b")]);
        assert_eq!(m.winner_team(), None);

        m.status = MatchStatus::Finished;
        m.winner = Some(SlotIndex::Second);
        assert_eq!(m.winner_team(), Some(&"b"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_slot_serde_repr() {
        let json = serde_json::to_string(&Slot::Team(5u64)).unwrap();
        assert_eq!(json, r#"{"team":5}"#);

        let json = serde_json::to_string(&Slot::<u64>::Winner(3)).unwrap();
        assert_eq!(json, r#"{"winner":3}"#);

        let json = serde_json::to_string(&Slot::<u64>::Bye).unwrap();
        assert_eq!(json, r#""bye""#);
    }
}
