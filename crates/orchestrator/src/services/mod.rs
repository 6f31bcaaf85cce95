//! Seams for the remote catalog and ledger services.
//!
//! Each seam is a trait with an HTTP implementation built on
//! [`crate::remote`] and an in-memory double for tests.

pub mod catalog;
pub mod ledger;

pub use catalog::{CatalogItem, CatalogService, HttpCatalogService, InMemoryCatalogService};
pub use ledger::{HttpLedgerService, InMemoryLedgerService, LedgerService};
