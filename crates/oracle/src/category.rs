//! Action categories.

use serde::{Deserialize, Serialize};

/// Category of an eco-friendly action, in tally slot order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[derive(strum::Display, strum::IntoStaticStr)] // Display, Into<&'static str>
#[derive(strum::EnumString)] // FromStr
#[derive(strum::EnumIter, strum::EnumCount)] // Category::iter, Category::COUNT
#[strum(ascii_case_insensitive)]
pub enum Category {
    #[strum(serialize = "recycling")]
    #[serde(rename = "recycling")]
    Recycling,
    #[strum(serialize = "gardening")]
    #[serde(rename = "gardening")]
    Gardening,
    #[strum(serialize = "reusing/repurposing")]
    #[serde(rename = "reusing/repurposing")]
    ReusingRepurposing,
    #[strum(serialize = "reducing waste")]
    #[serde(rename = "reducing waste")]
    ReducingWaste,
    #[strum(serialize = "other")]
    #[serde(rename = "other")]
    Other,
}

impl Category {
    /// Slot of this category in a five-slot tally.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
