//! Point spending: a wallet and a twelve-plot garden per theme.

mod flower;
mod garden;
mod wallet;

use thiserror::Error;

pub use flower::{Flower, GardenTheme};
pub use garden::{Garden, PLOT_COUNT};
pub use wallet::{STARTING_POINTS, Wallet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GardenError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },
    #[error("{flower} does not grow in the {theme} theme")]
    WrongTheme { flower: Flower, theme: GardenTheme },
    #[error("{0} is waiting to be planted")]
    PlantPending(Flower),
    #[error("no flower purchased")]
    NothingSelected,
    #[error("plot {0} is already planted")]
    PlotOccupied(usize),
    #[error("no plot {index}; plots are 0..{PLOT_COUNT}")]
    NoSuchPlot { index: usize },
    #[error("garden incomplete: {planted} of {PLOT_COUNT} plots planted")]
    Incomplete { planted: usize },
}
