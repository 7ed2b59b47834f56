use serde::{Deserialize, Serialize};

/// A card a player can pick. The deck is closed: the usual planning-poker
/// progression plus two cards that carry no numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Zero,
    One,
    Two,
    Three,
    Five,
    Eight,
    Thirteen,
    Twenty,
    Forty,
    Hundred,
    Unsure,
    Infinity,
}

impl Choice {
    /// Every card in deck order. Tallies report one entry per card, in this
    /// order, including cards nobody picked.
    pub const ALL: [Choice; 12] = [
        Choice::Zero,
        Choice::One,
        Choice::Two,
        Choice::Three,
        Choice::Five,
        Choice::Eight,
        Choice::Thirteen,
        Choice::Twenty,
        Choice::Forty,
        Choice::Hundred,
        Choice::Unsure,
        Choice::Infinity,
    ];

    /// Numeric magnitude of the card. `Unsure` and `Infinity` have none and
    /// are excluded from numeric aggregation.
    pub fn magnitude(self) -> Option<u32> {
        match self {
            Choice::Zero => Some(0),
            Choice::One => Some(1),
            Choice::Two => Some(2),
            Choice::Three => Some(3),
            Choice::Five => Some(5),
            Choice::Eight => Some(8),
            Choice::Thirteen => Some(13),
            Choice::Twenty => Some(20),
            Choice::Forty => Some(40),
            Choice::Hundred => Some(100),
            Choice::Unsure | Choice::Infinity => None,
        }
    }
}
