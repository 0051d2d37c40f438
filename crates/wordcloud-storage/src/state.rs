//! Shared word cloud state.

use std::sync::Arc;

use tracing::debug;
use wordcloud_core::{Result, Snapshot};

use crate::notifier::{ChangeNotifier, Subscription};
use crate::store::StateStore;

/// Handle on the store and notifier, cheap to clone into every execution
/// context (stdio dispatcher, HTTP handlers, event streams).
#[derive(Clone)]
pub struct CloudState {
    store: Arc<StateStore>,
    notifier: Arc<ChangeNotifier>,
}

impl CloudState {
    pub fn new(store: StateStore) -> Self {
        Self {
            store: Arc::new(store),
            notifier: Arc::new(ChangeNotifier::new()),
        }
    }

    /// Mutate the cloud, persist it, then wake every viewer.
    ///
    /// Viewers are only notified when the mutation was committed and
    /// actually changed something.
    pub fn apply<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> Result<T>,
    {
        let (value, changed) = self.store.mutate_tracked(f)?;
        if changed {
            let woken = self.notifier.notify_all();
            debug!(viewers = woken, "Notified viewers");
        }
        Ok(value)
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Start following changes.
    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}
