//! Marker kinds.

use chaser_core::ChaserError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How many positions a marker kind holds per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly one position.
    Single,
    /// A variable-length list of positions, updated round-robin.
    Multi,
}

/// Every landmark that can be placed on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Nose,
    Head,
    Tail,
    Water,
    Block,
    Ear,
    Food,
}

impl MarkerKind {
    /// All kinds, single-instance first.
    pub const ALL: [MarkerKind; 7] = [
        Self::Nose,
        Self::Head,
        Self::Tail,
        Self::Water,
        Self::Block,
        Self::Ear,
        Self::Food,
    ];

    /// Multi-instance kinds, in cycler slot order.
    pub const MULTI: [MarkerKind; 2] = [Self::Ear, Self::Food];

    /// Arity lookup.
    pub fn arity(self) -> Arity {
        match self {
            Self::Nose | Self::Head | Self::Tail | Self::Water | Self::Block => Arity::Single,
            Self::Ear | Self::Food => Arity::Multi,
        }
    }

    /// Whether this kind holds a list of positions.
    #[inline]
    pub fn is_multi(self) -> bool {
        self.arity() == Arity::Multi
    }

    /// Number of slots a fresh record gets for this kind.
    pub fn seed_slots(self) -> usize {
        match self.arity() {
            Arity::Single => 1,
            Arity::Multi => 2,
        }
    }

    /// Lowercase identifier.
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::Head => "head",
            Self::Tail => "tail",
            Self::Water => "water",
            Self::Block => "block",
            Self::Ear => "ear",
            Self::Food => "food",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MarkerKind {
    type Err = ChaserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ChaserError::InvalidParameter(format!("Unknown marker kind: {s}")))
    }
}
