// 🕰️ Tenant Revision Tracker
//
// "Identity persists. Values change." Before a tenant's values are overwritten,
// the outgoing values are appended to the tenant's history. Entries are never
// edited or removed afterwards; the history is the audit trail.
//
// Ordering is the whole point: record first, then apply. An entry must always
// describe the state *before* the update.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::entities::{HistoryEntry, Tenant, TenantUpdate};

/// Append a snapshot of the tenant's current values, stamped now.
///
/// Mutates only the in-memory history; persisting it is the caller's job.
pub fn record_revision(tenant: &mut Tenant) -> &HistoryEntry {
    record_revision_at(tenant, Utc::now())
}

/// [`record_revision`] with an explicit timestamp
pub fn record_revision_at(tenant: &mut Tenant, changed_at: DateTime<Utc>) -> &HistoryEntry {
    let entry = HistoryEntry::snapshot_of(tenant, changed_at);
    tenant.push_history(entry);

    debug!(
        tenant_id = %tenant.id,
        revisions = tenant.history().len(),
        "recorded tenant revision"
    );

    &tenant.history()[tenant.history().len() - 1]
}

/// Record a revision and apply `update`, but only if it changes something.
///
/// Returns whether the tenant was modified.
pub fn apply_update(tenant: &mut Tenant, update: TenantUpdate) -> bool {
    if !update.changes(tenant) {
        return false;
    }

    record_revision(tenant);
    update.apply_to(tenant);
    true
}

// ============================================================================
// TESTS
// ============================================================================
