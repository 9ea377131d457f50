//! Identity providers: the source of the caller's user id.

use auto_impl::auto_impl;
use flourish_primitives::UserId;
use parking_lot::RwLock;
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::debug;

/// Length of minted anonymous ids.
const ANONYMOUS_ID_LEN: usize = 28;

/// Supplies the currently authenticated user, if any.
#[auto_impl(&, Box, Arc)]
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Fixed identity, or none.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn signed_in(id: impl Into<UserId>) -> Self {
        Self(Some(id.into()))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.0.clone()
    }
}

/// Anonymous sign-in: mints a random id on first sign-in and keeps it until
/// sign-out.
#[derive(Debug, Default)]
pub struct AnonymousIdentity {
    current: RwLock<Option<UserId>>,
}

impl AnonymousIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-install a previously issued id.
    pub fn restore(id: UserId) -> Self {
        Self {
            current: RwLock::new(Some(id)),
        }
    }

    /// Current id, minting one if signed out.
    pub fn sign_in(&self) -> UserId {
        if let Some(id) = self.current.read().as_ref() {
            return id.clone();
        }

        let mut current = self.current.write();
        // Double-check after acquiring write lock
        if let Some(id) = current.as_ref() {
            return id.clone();
        }

        let id = UserId::new(mint_anonymous_id());
        debug!(%id, "signed in anonymously");
        *current = Some(id.clone());
        id
    }

    pub fn sign_out(&self) {
        self.current.write().take();
    }
}

impl IdentityProvider for AnonymousIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.current.read().clone()
    }
}

fn mint_anonymous_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ANONYMOUS_ID_LEN)
        .map(char::from)
        .collect()
}
