//! Per-user score records on the shared leaderboard collection.
//!
//! [`ScoreLedger`] writes the caller's absolute point total and display name.
//! The caller is resolved through an [`IdentityProvider`]; without one every
//! operation fails with [`LedgerError::NotAuthenticated`] before touching the
//! store.

mod identity;
mod ledger;

pub use identity::{AnonymousIdentity, IdentityProvider, StaticIdentity};
pub use ledger::{LedgerConfig, LedgerError, RenameOutcome, ScoreLedger};
