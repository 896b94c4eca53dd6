//! Infrastructure layer for the ensemble reasoning pipeline.
//!
//! Concrete adapters implementing the ports defined in
//! `ensemble-application`: a TOML+figment catalog/preset loader, a
//! two-tier fingerprint cache, a rusqlite-backed state store, a
//! broadcast event bus, and tmux/in-memory pane transports.

pub mod cache;
pub mod catalog_loader;
pub mod event_bus;
pub mod pane_transport;
pub mod state_store;

pub use cache::TwoTierCache;
pub use catalog_loader::CatalogLoader;
pub use event_bus::BroadcastEventBus;
pub use pane_transport::{InMemoryPaneTransport, TmuxPaneTransport};
pub use state_store::SqliteStateStore;
