use flourish_oracle::Category;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};

/// Count of entries per category, one slot per [`Category`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    slots: [u32; Category::COUNT],
}

impl CategoryTally {
    pub fn increment(&mut self, category: Category) {
        if let Some(slot) = self.slots.get_mut(category.index()) {
            *slot = slot.saturating_add(1);
        }
    }

    pub fn count(&self, category: Category) -> u32 {
        self.slots.get(category.index()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.slots.iter().sum()
    }

    /// Every category with its count, in slot order.
    pub fn distribution(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::iter().map(|category| (category, self.count(category)))
    }
}
