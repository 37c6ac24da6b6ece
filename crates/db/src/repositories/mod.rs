//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application. Every multi-step operation opens one database
//! transaction and threads it through `*_in` helpers, so orchestrators
//! can compose postings and stock movements atomically.

pub mod invoice;
pub mod ledger;
pub mod purchase;
pub mod stock;
pub mod user;

pub use invoice::{
    CreateInvoiceInput, InvoiceError, InvoiceItemInput, InvoiceListFilter, InvoiceRepository,
    InvoiceWithItems, SaleKind, UpdateInvoiceInput, UpdateItemInput,
};
pub use ledger::{
    AccountLedgerReport, EntryFilter, LedgerError, LedgerRepository, ManualPostingInput,
    PostedEntries,
};
pub use purchase::{
    CreatePurchaseOrderInput, OrderWithItems, PurchaseError, PurchaseItemInput,
    PurchaseListFilter, PurchaseRepository,
};
pub use stock::{
    MovementFilter, MovementInput, MovementReference, StockError, StockMovement, StockRepository,
};
