//! Relational catalog: registered nodes and submitted tasks

pub mod confirm;
pub mod store;
pub mod tasks;

pub use confirm::{Confirmer, FixedAnswer, TerminalConfirmer};
pub use store::{CatalogRow, CatalogStore, UpsertOutcome};
