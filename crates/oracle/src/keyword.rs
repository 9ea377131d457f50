//! Offline oracle driven by keyword matching.

use async_trait::async_trait;

use crate::{ActionEntry, Category, OracleError, ScoringOracle};

/// Checked in order; the first category with a matching keyword wins.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Gardening,
        &["garden", "plant", "tree", "seed", "weed", "invasive", "flower", "soil"],
    ),
    (
        Category::Recycling,
        &["recycl", "bottle", "cardboard", "aluminum", "glass"],
    ),
    (
        Category::ReducingWaste,
        &[
            "carpool", "bike", "cycled", "walk", "bus", "train", "compost", "refill", "reusable",
            "trash", "litter", "leftover", "plastic",
        ],
    ),
    (
        Category::ReusingRepurposing,
        &[
            "reus", "repurpos", "upcycl", "thrift", "second-hand", "secondhand", "repair", "mend",
            "donat",
        ],
    ),
];

/// Anchor scores, highest first.
const SCORE_ANCHORS: &[(u32, &[&str])] = &[
    (20, &["volunteer", "trash", "litter", "invasive"]),
    (15, &["thrift", "second-hand", "secondhand"]),
    (10, &["carpool"]),
    (5, &["recycl"]),
];

/// Deterministic oracle for offline use.
///
/// Scores follow the anchor scale quoted to the hosted model (recycling 5,
/// carpooling 10, thrifting 15, volunteering or trash and invasive plant
/// pickup 20); other actions get a per-category baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOracle;

impl KeywordOracle {
    pub fn classify_text(text: &str) -> Category {
        let text = text.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
            .map_or(Category::Other, |(category, _)| *category)
    }

    pub fn score_text(text: &str) -> u32 {
        let lower = text.to_lowercase();
        SCORE_ANCHORS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map_or_else(|| baseline(Self::classify_text(text)), |(score, _)| *score)
    }
}

fn baseline(category: Category) -> u32 {
    match category {
        Category::Recycling => 5,
        Category::ReducingWaste => 10,
        Category::Gardening | Category::ReusingRepurposing => 12,
        Category::Other => 8,
    }
}

#[async_trait]
impl ScoringOracle for KeywordOracle {
    async fn classify(&self, entry: &ActionEntry) -> Result<Category, OracleError> {
        Ok(Self::classify_text(&entry.text()))
    }

    async fn score(&self, entry: &ActionEntry) -> Result<u32, OracleError> {
        Ok(Self::score_text(&entry.text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MAX_SCORE, MIN_SCORE};

    #[test]
    fn test_classify() {
        assert_eq!(KeywordOracle::classify_text("Recycled cans"), Category::Recycling);
        assert_eq!(KeywordOracle::classify_text("planted basil"), Category::Gardening);
        assert_eq!(KeywordOracle::classify_text("brought a reusable bag"), Category::ReducingWaste);
        assert_eq!(KeywordOracle::classify_text("thrifted a jacket"), Category::ReusingRepurposing);
        assert_eq!(KeywordOracle::classify_text("turned off the lights"), Category::Other);
    }

    #[test]
    fn test_anchor_scores() {
        assert_eq!(KeywordOracle::score_text("recycling: sorted bottles"), 5);
        assert_eq!(KeywordOracle::score_text("carpooled to class"), 10);
        assert_eq!(KeywordOracle::score_text("went thrifting"), 15);
        assert_eq!(KeywordOracle::score_text("volunteered at the creek"), 20);
        assert_eq!(KeywordOracle::score_text("pulled invasive plants"), 20);
    }

    #[test]
    fn test_baseline_in_range() {
        for text in ["planted a tree", "turned off the tap", "repaired a chair", "took the bus"] {
            let score = KeywordOracle::score_text(text);
            assert!((MIN_SCORE..=MAX_SCORE).contains(&score), "{text}: {score}");
        }
    }

    #[tokio::test]
    async fn test_oracle_trait() {
        let entry = ActionEntry::new("Beach day", "picked up trash along the shore");
        assert_eq!(KeywordOracle.classify(&entry).await.unwrap(), Category::ReducingWaste);
        assert_eq!(KeywordOracle.score(&entry).await.unwrap(), 20);
    }
}
