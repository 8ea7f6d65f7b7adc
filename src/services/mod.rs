//! Service layer: scrape orchestration entry points and reconciliation.

pub mod ingest;
pub mod reconcile;

pub use ingest::{IngestError, IngestService};
pub use reconcile::{BatchOutcome, ReconcileError, Reconciler};
