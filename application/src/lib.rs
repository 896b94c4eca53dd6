//! Application layer for the ensemble reasoning pipeline.
//!
//! Contains use cases and port definitions. Depends only on the domain
//! layer plus `tokio`/`async-trait` for the async seams; concrete
//! adapters live in `ensemble-infrastructure`.

pub mod ports;
pub mod use_cases;

pub use ports::{Cache, EventBus, PaneTransport, StateStore};
pub use use_cases::run_ensemble::{EnsembleOrchestrator, RunEnsembleError, RunEnsembleInput, Services};
