use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::GardenError;
use crate::flower::{Flower, GardenTheme};
use crate::wallet::Wallet;

/// Plots per garden.
pub const PLOT_COUNT: usize = 12;

/// The current garden: its theme, plots, and a flower bought but not yet
/// planted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garden {
    theme: GardenTheme,
    plots: [Option<Flower>; PLOT_COUNT],
    pending: Option<Flower>,
}

impl Garden {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme(&self) -> GardenTheme {
        self.theme
    }

    pub fn plots(&self) -> &[Option<Flower>; PLOT_COUNT] {
        &self.plots
    }

    pub fn pending(&self) -> Option<Flower> {
        self.pending
    }

    pub fn planted(&self) -> usize {
        self.plots.iter().flatten().count()
    }

    pub fn is_complete(&self) -> bool {
        self.plots.iter().all(Option::is_some)
    }

    /// Buy `flower` from `wallet`. It stays pending until planted; only one
    /// flower can be pending at a time.
    pub fn purchase(&mut self, flower: Flower, wallet: &mut Wallet) -> Result<(), GardenError> {
        if flower.theme() != self.theme {
            return Err(GardenError::WrongTheme {
                flower,
                theme: self.theme,
            });
        }
        if let Some(pending) = self.pending {
            return Err(GardenError::PlantPending(pending));
        }

        wallet.debit(flower.cost())?;
        self.pending = Some(flower);
        debug!(%flower, cost = flower.cost(), balance = wallet.balance, "flower purchased");
        Ok(())
    }

    /// Plant the pending flower in plot `index`. Returns whether the garden
    /// is now complete.
    pub fn plant(&mut self, index: usize) -> Result<bool, GardenError> {
        let Some(plot) = self.plots.get_mut(index) else {
            return Err(GardenError::NoSuchPlot { index });
        };
        let Some(flower) = self.pending else {
            return Err(GardenError::NothingSelected);
        };
        if plot.is_some() {
            return Err(GardenError::PlotOccupied(index));
        }

        *plot = Some(flower);
        self.pending = None;
        debug!(%flower, index, planted = self.planted(), "flower planted");
        Ok(self.is_complete())
    }

    /// Move to the next theme with empty plots. Requires a complete garden.
    pub fn advance(&mut self) -> Result<GardenTheme, GardenError> {
        if !self.is_complete() {
            return Err(GardenError::Incomplete {
                planted: self.planted(),
            });
        }

        self.theme = self.theme.next();
        self.plots = [None; PLOT_COUNT];
        debug!(theme = %self.theme, "advanced to next garden");
        Ok(self.theme)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn fill(garden: &mut Garden, wallet: &mut Wallet) {
        let flower = garden.theme().flowers().min_by_key(|f| f.cost()).unwrap();
        for index in 0..PLOT_COUNT {
            if garden.plots()[index].is_some() {
                continue;
            }
            wallet.credit(flower.cost() as u32);
            garden.purchase(flower, wallet).unwrap();
            garden.plant(index).unwrap();
        }
    }

    #[test]
    fn test_purchase_and_plant() {
        let mut garden = Garden::new();
        let mut wallet = Wallet::default();

        garden.purchase(Flower::Mushroom, &mut wallet).unwrap();
        assert_eq!(wallet.balance, 6);
        assert_eq!(garden.pending(), Some(Flower::Mushroom));

        assert!(!garden.plant(3).unwrap());
        assert_eq!(garden.plots()[3], Some(Flower::Mushroom));
        assert_eq!(garden.pending(), None);
        assert_eq!(garden.planted(), 1);
    }

    #[test]
    fn test_purchase_errors() {
        let mut garden = Garden::new();
        let mut wallet = Wallet::default();

        assert_matches!(
            garden.purchase(Flower::Cactus, &mut wallet),
            Err(GardenError::WrongTheme { flower: Flower::Cactus, theme: GardenTheme::Garden })
        );

        garden.purchase(Flower::Lavender, &mut wallet).unwrap();
        assert_matches!(
            garden.purchase(Flower::Rose, &mut wallet),
            Err(GardenError::PlantPending(Flower::Lavender))
        );
        garden.plant(0).unwrap();

        assert_matches!(
            garden.purchase(Flower::Mushroom, &mut wallet),
            Err(GardenError::InsufficientBalance { needed: 14, available: 10 })
        );
        assert_eq!(garden.pending(), None);
        assert_eq!(wallet.balance, 10);
    }

    #[test]
    fn test_plant_errors() {
        let mut garden = Garden::new();
        let mut wallet = Wallet::default();

        assert_matches!(garden.plant(0), Err(GardenError::NothingSelected));
        assert_matches!(garden.plant(PLOT_COUNT), Err(GardenError::NoSuchPlot { index: 12 }));

        garden.purchase(Flower::Sunflower, &mut wallet).unwrap();
        garden.plant(0).unwrap();
        garden.purchase(Flower::Sunflower, &mut wallet).unwrap();
        assert_matches!(garden.plant(0), Err(GardenError::PlotOccupied(0)));
        assert_eq!(garden.pending(), Some(Flower::Sunflower));
    }

    #[test]
    fn test_advance_cycles_themes() {
        let mut garden = Garden::new();
        let mut wallet = Wallet::default();

        assert_matches!(garden.advance(), Err(GardenError::Incomplete { planted: 0 }));

        fill(&mut garden, &mut wallet);
        assert!(garden.is_complete());
        assert_eq!(garden.advance().unwrap(), GardenTheme::Rainforest);
        assert_eq!(garden.planted(), 0);

        fill(&mut garden, &mut wallet);
        assert_eq!(garden.advance().unwrap(), GardenTheme::Desert);
        fill(&mut garden, &mut wallet);
        assert_eq!(garden.advance().unwrap(), GardenTheme::Garden);
    }

    #[test]
    fn test_last_plot_completes() {
        let mut garden = Garden::new();
        let mut wallet = Wallet {
            balance: 1_000,
            lifetime: 1_000,
        };
        for index in 0..PLOT_COUNT - 1 {
            garden.purchase(Flower::Rose, &mut wallet).unwrap();
            assert!(!garden.plant(index).unwrap());
        }
        garden.purchase(Flower::Rose, &mut wallet).unwrap();
        assert!(garden.plant(PLOT_COUNT - 1).unwrap());
    }

    #[test]
    fn test_serde() {
        let mut garden = Garden::new();
        let mut wallet = Wallet::default();
        garden.purchase(Flower::Rose, &mut wallet).unwrap();
        garden.plant(5).unwrap();
        garden.purchase(Flower::Sunflower, &mut wallet).unwrap();

        let json = serde_json::to_string(&garden).unwrap();
        assert_eq!(serde_json::from_str::<Garden>(&json).unwrap(), garden);
    }
}
