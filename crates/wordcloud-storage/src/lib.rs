//! Persistent snapshot storage and change notification.
//!
//! - [`StateStore`] owns the live [`Snapshot`](wordcloud_core::Snapshot) and
//!   writes it through a [`SnapshotBackend`] on every mutation.
//! - [`ChangeNotifier`] wakes subscribed viewers when the snapshot changes.
//! - [`CloudState`] ties the two together so every mutation path, whether a
//!   tool call or an HTTP request, follows the same mutate-then-notify sequence.
//!
//! # Example
//!
//! ```ignore
//! use wordcloud_core::NewWord;
//! use wordcloud_storage::{CloudState, JsonFileBackend, StateStore};
//!
//! let store = StateStore::open(JsonFileBackend::new("words.json"))?;
//! let state = CloudState::new(store);
//!
//! state.apply(|cloud| cloud.upsert_word(NewWord::new("Rust").size(8)))?;
//! ```

pub mod backend;
pub mod notifier;
pub mod state;
pub mod store;

pub use backend::{JsonFileBackend, MemoryBackend, SnapshotBackend};
pub use notifier::{ChangeNotifier, Subscription, SubscriptionId, Wake};
pub use state::CloudState;
pub use store::StateStore;
