use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Garden theme. Themes cycle in declaration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum GardenTheme {
    #[default]
    Garden,
    Rainforest,
    Desert,
}

impl GardenTheme {
    /// The theme after this one, wrapping to the first.
    pub fn next(self) -> Self {
        match self {
            Self::Garden => Self::Rainforest,
            Self::Rainforest => Self::Desert,
            Self::Desert => Self::Garden,
        }
    }

    /// Flowers sold in this theme.
    pub fn flowers(self) -> impl Iterator<Item = Flower> {
        Flower::iter().filter(move |flower| flower.theme() == self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Flower {
    Sunflower,
    Rose,
    Lavender,
    Mushroom,
    Ivy,
    Orchid,
    Lilypad,
    Bromeliad,
    Cactus,
    #[strum(to_string = "aloe vera", serialize = "aloevera", serialize = "aloe-vera")]
    #[serde(rename = "aloe vera")]
    AloeVera,
    Marigold,
    #[strum(to_string = "prickly pear", serialize = "pricklypear", serialize = "prickly-pear")]
    #[serde(rename = "prickly pear")]
    PricklyPear,
}

impl Flower {
    pub fn cost(self) -> u64 {
        match self {
            Self::Sunflower => 5,
            Self::Rose => 8,
            Self::Lavender => 10,
            Self::Mushroom => 14,
            Self::Ivy => 4,
            Self::Orchid => 6,
            Self::Lilypad => 5,
            Self::Bromeliad => 7,
            Self::Cactus => 4,
            Self::AloeVera => 5,
            Self::Marigold => 7,
            Self::PricklyPear => 6,
        }
    }

    pub fn theme(self) -> GardenTheme {
        match self {
            Self::Sunflower | Self::Rose | Self::Lavender | Self::Mushroom => GardenTheme::Garden,
            Self::Ivy | Self::Orchid | Self::Lilypad | Self::Bromeliad => GardenTheme::Rainforest,
            Self::Cactus | Self::AloeVera | Self::Marigold | Self::PricklyPear => {
                GardenTheme::Desert
            }
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}
