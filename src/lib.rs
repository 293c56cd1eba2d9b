// Rent Ledger - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod period;
pub mod revision;
pub mod service;
pub mod telemetry;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use db::{
    count_rent_collections, count_tenants, create_rent_collection, create_tenant,
    delete_rent_collection, delete_tenant, find_rent_collection_by_id,
    find_rent_collections_by_tenant, find_tenant_by_id, import_tenants, list_rent_collections,
    list_tenants, load_tenants_csv, next_serial_number, open_database, save_tenant,
    setup_database, ImportReport,
};
pub use entities::{
    HistoryEntry, NewTenant, PaymentInput, QuoteInput, RentCollection, RentCollectionDraft,
    RentCollectionWithTenant, Tenant, TenantSummary, TenantUpdate,
};
pub use error::{LedgerError, Result};
pub use period::{compute, compute_with_policy, RangePolicy, RentPeriod};
pub use revision::{apply_update, record_revision};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
