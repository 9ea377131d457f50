//! A user's session: the sequenced submit flow plus garden spending.
//!
//! Submitting an action classifies it, scores it, journals it, credits the
//! wallet and publishes the wallet's lifetime total to the leaderboard, one
//! step after the other. Only the final publish touches shared state.

mod session;

pub use session::{Session, SessionState, SubmitError, Submission};
