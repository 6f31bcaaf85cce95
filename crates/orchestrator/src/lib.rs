//! Transaction orchestration for the POS service.
//!
//! The three stores involved in a sale (catalog, loyalty ledger, local
//! transaction record) share no database transaction, so this crate
//! coordinates them with an explicit step sequence instead of ACID
//! guarantees:
//!
//! 1. Creation: validate → price concurrently → persist → best-effort
//!    point credit. Pricing and credit failures are absorbed and recorded
//!    on the transaction; persistence failure is fatal.
//! 2. Redemption: balance check → discount → version-checked local apply →
//!    ledger debit, with a compensating reversal of the local apply when
//!    the debit fails.

pub mod coordinator;
pub mod error;
pub mod pricing;
pub mod remote;
pub mod services;
pub mod state;

pub use coordinator::{
    CreateTransaction, RedemptionReceipt, RedemptionRequest, TransactionCoordinator,
};
pub use error::OrchestratorError;
pub use pricing::{ItemRequest, PriceResolver, PricingOutcome};
pub use remote::{ClientError, RetryPolicy, build_client};
pub use services::{
    CatalogItem, CatalogService, HttpCatalogService, HttpLedgerService, InMemoryCatalogService,
    InMemoryLedgerService, LedgerService,
};
pub use state::{CreationPhase, RedemptionPhase};
