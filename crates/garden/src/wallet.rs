use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::GardenError;

/// Points every new wallet starts with.
pub const STARTING_POINTS: u64 = 20;

/// Spendable balance plus the lifetime total reported to the leaderboard.
///
/// Spending lowers only the balance, so the lifetime total never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub balance: u64,
    pub lifetime: u64,
}

impl Default for Wallet {
    fn default() -> Self {
        Self {
            balance: STARTING_POINTS,
            lifetime: STARTING_POINTS,
        }
    }
}

impl Wallet {
    pub fn credit(&mut self, points: u32) {
        self.balance = self.balance.saturating_add(u64::from(points));
        self.lifetime = self.lifetime.saturating_add(u64::from(points));
        trace!(points, balance = self.balance, lifetime = self.lifetime, "wallet credited");
    }

    pub fn debit(&mut self, cost: u64) -> Result<(), GardenError> {
        if cost > self.balance {
            return Err(GardenError::InsufficientBalance {
                needed: cost,
                available: self.balance,
            });
        }
        self.balance -= cost;
        trace!(cost, balance = self.balance, "wallet debited");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_starts_at_twenty() {
        let wallet = Wallet::default();
        assert_eq!(wallet.balance, 20);
        assert_eq!(wallet.lifetime, 20);
    }

    #[test]
    fn test_debit() {
        let mut wallet = Wallet::default();
        wallet.debit(14).unwrap();
        assert_eq!(wallet.balance, 6);
        assert_eq!(wallet.lifetime, 20);

        assert_matches!(
            wallet.debit(8),
            Err(GardenError::InsufficientBalance { needed: 8, available: 6 })
        );
        assert_eq!(wallet.balance, 6);
    }

    proptest! {
        #[test]
        fn test_lifetime_never_decreases(ops in proptest::collection::vec((any::<bool>(), 0u32..30), 0..50)) {
            let mut wallet = Wallet::default();
            let mut last = wallet.lifetime;
            for (is_credit, amount) in ops {
                if is_credit {
                    wallet.credit(amount);
                } else {
                    let _ = wallet.debit(u64::from(amount));
                }
                prop_assert!(wallet.lifetime >= last);
                prop_assert!(wallet.balance <= wallet.lifetime);
                last = wallet.lifetime;
            }
        }
    }
}
