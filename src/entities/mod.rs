// Entity Models
//
// Tenant: stable identity, current values, append-only history
// RentCollection: one payment, totals frozen at creation

pub mod tenant;
pub mod rent_collection;

pub use tenant::{HistoryEntry, NewTenant, Tenant, TenantUpdate};
pub use rent_collection::{
    PaymentInput, QuoteInput, RentCollection, RentCollectionDraft, RentCollectionWithTenant,
    TenantSummary,
};
