//! Live query subscription handle.

use std::fmt;

use tokio::sync::mpsc;

use crate::StoreError;
use crate::document::Document;

/// One delivery on a live query: the full current result, or a transport error.
pub type QueryEvent = Result<Vec<Document>, StoreError>;

type CancelFn = Box<dyn FnOnce() + Send>;

/// Receiving end of a live query. Dropping it unregisters the listener.
pub struct QuerySubscription {
    rx: mpsc::UnboundedReceiver<QueryEvent>,
    cancel: Option<CancelFn>,
}

impl QuerySubscription {
    /// Wrap a backend channel. `cancel` runs once, on drop or [`Self::cancel`].
    pub fn new(
        rx: mpsc::UnboundedReceiver<QueryEvent>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Wait for the next delivery. `None` once the backend has gone away.
    pub async fn next(&mut self) -> Option<QueryEvent> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Self::next`].
    pub fn try_next(&mut self) -> Option<QueryEvent> {
        self.rx.try_recv().ok()
    }

    /// Unregister from the backend and discard anything still buffered.
    pub fn cancel(mut self) {
        self.unregister();
    }

    fn unregister(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.rx.close();
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl fmt::Debug for QuerySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
