use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use flourish_garden::{Flower, Garden, GardenError, GardenTheme, Wallet};
use flourish_journal::{Journal, JournalEntry};
use flourish_ledger::{LedgerError, RenameOutcome, ScoreLedger};
use flourish_oracle::{ActionEntry, OracleError, ScoringOracle};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SubmitError {
    /// No score was obtained; nothing was recorded.
    #[error("could not score action: {0}")]
    Scoring(#[source] OracleError),
    /// The entry was journaled and paid out locally, but the new total did
    /// not reach the leaderboard. [`Session::sync_points`] retries.
    #[error("entry saved but the leaderboard update failed: {source}")]
    Ledger {
        entry: Box<JournalEntry>,
        #[source]
        source: LedgerError,
    },
}

/// Local state kept between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub journal: Journal,
    pub wallet: Wallet,
    pub garden: Garden,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub entry: JournalEntry,
    /// Lifetime total now on the leaderboard.
    pub total: u64,
}

pub struct Session {
    oracle: Arc<dyn ScoringOracle>,
    ledger: Arc<ScoreLedger>,
    state: SessionState,
}

impl Session {
    pub fn new(oracle: Arc<dyn ScoringOracle>, ledger: Arc<ScoreLedger>) -> Self {
        Self::with_state(oracle, ledger, SessionState::default())
    }

    pub fn with_state(
        oracle: Arc<dyn ScoringOracle>,
        ledger: Arc<ScoreLedger>,
        state: SessionState,
    ) -> Self {
        Self {
            oracle,
            ledger,
            state,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub async fn submit(
        &mut self,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Submission, SubmitError> {
        self.submit_at(title, body, Utc::now()).await
    }

    /// Submit an action recorded at `at`.
    ///
    /// A classification failure is logged and the entry is kept without a
    /// category. A scoring failure aborts before anything is recorded.
    pub async fn submit_at(
        &mut self,
        title: impl Into<String>,
        body: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Submission, SubmitError> {
        let action = ActionEntry::new(title, body);

        let category = match self.oracle.classify(&action).await {
            Ok(category) => Some(category),
            Err(e) => {
                warn!(error = %e, "classification failed, keeping entry uncategorised");
                None
            }
        };

        let points = self.oracle.score(&action).await.map_err(|e| {
            warn!(error = %e, "scoring failed, submission dropped");
            SubmitError::Scoring(e)
        })?;

        let entry = self
            .state
            .journal
            .append(action.title, action.body, points, category, at);
        self.state.wallet.credit(points);
        let total = self.state.wallet.lifetime;
        info!(points, ?category, total, "action recorded");

        match self.ledger.record_points(total, None).await {
            Ok(total) => Ok(Submission { entry, total }),
            Err(source) => Err(SubmitError::Ledger {
                entry: Box::new(entry),
                source,
            }),
        }
    }

    /// Push the lifetime total again, optionally setting the display name.
    pub async fn sync_points(&self, display_name: Option<&str>) -> Result<u64, LedgerError> {
        self.ledger
            .record_points(self.state.wallet.lifetime, display_name)
            .await
    }

    pub async fn rename(&self, name: &str) -> Result<RenameOutcome, LedgerError> {
        self.ledger.rename_user(name).await
    }

    pub fn purchase(&mut self, flower: Flower) -> Result<(), GardenError> {
        let SessionState { garden, wallet, .. } = &mut self.state;
        garden.purchase(flower, wallet)
    }

    /// Plant the pending flower; returns whether the garden is complete.
    pub fn plant(&mut self, index: usize) -> Result<bool, GardenError> {
        let complete = self.state.garden.plant(index)?;
        if complete {
            debug!(theme = %self.state.garden.theme(), "garden complete");
        }
        Ok(complete)
    }

    pub fn advance_garden(&mut self) -> Result<GardenTheme, GardenError> {
        self.state.garden.advance()
    }

    pub fn streak<Tz: TimeZone>(&self, tz: &Tz) -> u32 {
        self.state.journal.streak(tz)
    }
}
