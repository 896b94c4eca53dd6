//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod cache;
pub mod event_bus;
pub mod pane_transport;
pub mod state_store;

pub use cache::{Cache, CacheError};
pub use event_bus::{EnsembleEvent, EventBus};
pub use pane_transport::{PaneTransport, PaneTransportError};
pub use state_store::{StateStore, StateStoreError};
