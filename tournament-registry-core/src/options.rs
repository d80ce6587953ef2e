//! Options accepted by the bracket generator.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The elimination mode of the bracket.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BracketType {
    /// Upper bracket only.
    #[default]
    Single,
    /// Upper and lower bracket, usually followed by a grand final.
    Double,
}

/// Options for a single generation run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenerateOptions {
    pub bracket_type: BracketType,
    /// Whether a double elimination bracket ends in a grand final between
    /// the upper and lower champions. Ignored for single elimination.
    pub grand_final: bool,
}

impl GenerateOptions {
    /// Creates new options for the given [`BracketType`] with a grand final
    /// enabled.
    #[inline]
    pub fn new(bracket_type: BracketType) -> Self {
        Self {
            bracket_type,
            grand_final: true,
        }
    }
}

impl Default for GenerateOptions {
    #[inline]
    fn default() -> Self {
        Self::new(BracketType::default())
    }
}
