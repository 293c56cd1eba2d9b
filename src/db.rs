use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::entities::{
    HistoryEntry, NewTenant, RentCollection, RentCollectionDraft, RentCollectionWithTenant,
    Tenant, TenantSummary,
};
use crate::error::{is_unique_violation, LedgerError, Result};

/// Open (or create) the ledger database and make sure the schema exists.
///
/// The returned connection is the session object handed to every repository
/// function below; open it once per process and share it.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    info!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (in-memory databases answer "memory")
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Tenants + their append-only history
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            sr_no INTEGER UNIQUE NOT NULL,
            name TEXT NOT NULL,
            mobile_number TEXT NOT NULL,
            rent_amount REAL NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tenant_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            name TEXT NOT NULL,
            mobile_number TEXT NOT NULL,
            rent_amount REAL NOT NULL,
            changed_at TEXT NOT NULL,
            UNIQUE (tenant_id, seq)
        )",
        [],
    )?;

    // ==========================================================================
    // Rent collections
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS rent_collections (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            receipt_no TEXT UNIQUE NOT NULL,
            collection_date TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            total_months INTEGER NOT NULL,
            total_rent REAL NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_rent_tenant ON rent_collections(tenant_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_rent_collection_date ON rent_collections(collection_date)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// Row helpers
// ============================================================================

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains("FOREIGN KEY")
    )
}

fn tenant_write_error(err: rusqlite::Error, sr_no: i64) -> LedgerError {
    if is_unique_violation(&err, "tenants.sr_no") {
        LedgerError::DuplicateSerialNumber(sr_no)
    } else {
        err.into()
    }
}

const TENANT_COLUMNS: &str = "id, sr_no, name, mobile_number, rent_amount, created_at";

const COLLECTION_COLUMNS: &str = "id, tenant_id, receipt_no, collection_date, start_date, \
     end_date, total_months, total_rent";

fn tenant_from_row(row: &Row, history: Vec<HistoryEntry>) -> rusqlite::Result<Tenant> {
    Ok(Tenant::from_storage(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        timestamp_column(row, 5)?,
        history,
    ))
}

fn collection_from_row(row: &Row) -> rusqlite::Result<RentCollection> {
    Ok(RentCollection {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        receipt_no: row.get(2)?,
        collection_date: timestamp_column(row, 3)?,
        start_date: date_column(row, 4)?,
        end_date: date_column(row, 5)?,
        total_months: row.get(6)?,
        total_rent: row.get(7)?,
    })
}

// ============================================================================
// Tenants
// ============================================================================

/// Insert a new tenant. Input is assumed validated.
pub fn create_tenant(conn: &Connection, input: NewTenant) -> Result<Tenant> {
    let tenant = Tenant::new(input);

    conn.execute(
        "INSERT INTO tenants (id, sr_no, name, mobile_number, rent_amount, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            tenant.id,
            tenant.sr_no,
            tenant.name,
            tenant.mobile_number,
            tenant.rent_amount,
            format_timestamp(&tenant.created_at),
        ],
    )
    .map_err(|e| tenant_write_error(e, tenant.sr_no))?;

    debug!(tenant_id = %tenant.id, sr_no = tenant.sr_no, "tenant inserted");
    Ok(tenant)
}

fn load_history(conn: &Connection, tenant_id: &str) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT name, mobile_number, rent_amount, changed_at
         FROM tenant_history
         WHERE tenant_id = ?1
         ORDER BY seq ASC",
    )?;

    let history = stmt
        .query_map(params![tenant_id], |row| {
            Ok(HistoryEntry {
                name: row.get(0)?,
                mobile_number: row.get(1)?,
                rent_amount: row.get(2)?,
                changed_at: timestamp_column(row, 3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(history)
}

/// Load a tenant with its full history
pub fn find_tenant_by_id(conn: &Connection, id: &str) -> Result<Option<Tenant>> {
    let history = load_history(conn, id)?;

    let tenant = conn
        .query_row(
            &format!("SELECT {} FROM tenants WHERE id = ?1", TENANT_COLUMNS),
            params![id],
            |row| tenant_from_row(row, history),
        )
        .optional()?;

    Ok(tenant)
}

/// All tenants ordered by serial number, each with its history
pub fn list_tenants(conn: &Connection) -> Result<Vec<Tenant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tenants ORDER BY sr_no ASC",
        TENANT_COLUMNS
    ))?;

    let mut tenants = stmt
        .query_map([], |row| tenant_from_row(row, Vec::new()))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for tenant in &mut tenants {
        for entry in load_history(conn, &tenant.id)? {
            tenant.push_history(entry);
        }
    }

    Ok(tenants)
}

/// Persist a tenant's current values and any history entries not yet stored.
///
/// Runs as one SQLite transaction. Stored history rows are never rewritten.
pub fn save_tenant(conn: &Connection, tenant: &Tenant) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    let updated = tx
        .execute(
            "UPDATE tenants
             SET sr_no = ?2, name = ?3, mobile_number = ?4, rent_amount = ?5
             WHERE id = ?1",
            params![
                tenant.id,
                tenant.sr_no,
                tenant.name,
                tenant.mobile_number,
                tenant.rent_amount,
            ],
        )
        .map_err(|e| tenant_write_error(e, tenant.sr_no))?;

    if updated == 0 {
        return Err(LedgerError::TenantNotFound);
    }

    let stored: i64 = tx.query_row(
        "SELECT COUNT(*) FROM tenant_history WHERE tenant_id = ?1",
        params![tenant.id],
        |row| row.get(0),
    )?;

    let mut appended = 0;
    for (seq, entry) in tenant.history().iter().enumerate().skip(stored as usize) {
        tx.execute(
            "INSERT INTO tenant_history (
                tenant_id, seq, name, mobile_number, rent_amount, changed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tenant.id,
                seq as i64,
                entry.name,
                entry.mobile_number,
                entry.rent_amount,
                format_timestamp(&entry.changed_at),
            ],
        )?;
        appended += 1;
    }

    tx.commit()?;

    debug!(tenant_id = %tenant.id, appended, "tenant saved");
    Ok(())
}

/// Delete a tenant; its history and rent collections go with it.
/// Returns false when no such tenant existed.
pub fn delete_tenant(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM tenants WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Suggested serial number for the next tenant: highest + 1, or 1
pub fn next_serial_number(conn: &Connection) -> Result<i64> {
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sr_no), 0) + 1 FROM tenants",
        [],
        |row| row.get(0),
    )?;
    Ok(next)
}

pub fn count_tenants(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM tenants", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// Rent collections
// ============================================================================

/// Store a payment whose totals were already computed
pub fn create_rent_collection(
    conn: &Connection,
    draft: RentCollectionDraft,
) -> Result<RentCollection> {
    let collection = draft.into_collection();

    conn.execute(
        "INSERT INTO rent_collections (
            id, tenant_id, receipt_no, collection_date, start_date, end_date,
            total_months, total_rent
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            collection.id,
            collection.tenant_id,
            collection.receipt_no,
            format_timestamp(&collection.collection_date),
            format_date(&collection.start_date),
            format_date(&collection.end_date),
            collection.total_months,
            collection.total_rent,
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e, "rent_collections.receipt_no") {
            LedgerError::DuplicateReceiptNumber(collection.receipt_no.clone())
        } else if is_foreign_key_violation(&e) {
            LedgerError::TenantNotFound
        } else {
            e.into()
        }
    })?;

    Ok(collection)
}

pub fn find_rent_collection_by_id(conn: &Connection, id: &str) -> Result<Option<RentCollection>> {
    let collection = conn
        .query_row(
            &format!("SELECT {} FROM rent_collections WHERE id = ?1", COLLECTION_COLUMNS),
            params![id],
            collection_from_row,
        )
        .optional()?;

    Ok(collection)
}

/// A tenant's collections, newest collection date first
pub fn find_rent_collections_by_tenant(
    conn: &Connection,
    tenant_id: &str,
) -> Result<Vec<RentCollection>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM rent_collections
         WHERE tenant_id = ?1
         ORDER BY collection_date DESC",
        COLLECTION_COLUMNS
    ))?;

    let collections = stmt
        .query_map(params![tenant_id], collection_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(collections)
}

/// Every collection with its tenant, newest collection date first
pub fn list_rent_collections(conn: &Connection) -> Result<Vec<RentCollectionWithTenant>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.tenant_id, r.receipt_no, r.collection_date, r.start_date,
                r.end_date, r.total_months, r.total_rent,
                t.sr_no, t.name, t.mobile_number, t.rent_amount
         FROM rent_collections r
         JOIN tenants t ON t.id = r.tenant_id
         ORDER BY r.collection_date DESC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let collection = collection_from_row(row)?;
            let tenant = TenantSummary {
                id: collection.tenant_id.clone(),
                sr_no: row.get(8)?,
                name: row.get(9)?,
                mobile_number: row.get(10)?,
                rent_amount: row.get(11)?,
            };
            Ok(RentCollectionWithTenant { collection, tenant })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Delete one collection. The tenant and other collections are untouched.
pub fn delete_rent_collection(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM rent_collections WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn count_rent_collections(conn: &Connection) -> Result<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM rent_collections", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// CSV import
// ============================================================================

/// Outcome of a bulk tenant import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// Read tenants from a CSV with headers `sr_no,name,mobile_number,rent_amount`
pub fn load_tenants_csv(csv_path: &Path) -> Result<Vec<NewTenant>> {
    let mut rdr = csv::Reader::from_path(csv_path)?;

    let mut tenants = Vec::new();
    for result in rdr.deserialize() {
        let tenant: NewTenant = result?;
        tenants.push(tenant);
    }

    Ok(tenants)
}

/// Insert tenants, skipping rows that fail validation or reuse a serial number
pub fn import_tenants(conn: &Connection, tenants: &[NewTenant]) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    for input in tenants {
        if let Err(e) = input.validate() {
            let err = LedgerError::from(e);
            warn!(sr_no = input.sr_no, error = %err, "skipping invalid tenant row");
            report.invalid += 1;
            continue;
        }

        match create_tenant(conn, input.clone()) {
            Ok(_) => report.inserted += 1,
            Err(LedgerError::DuplicateSerialNumber(sr_no)) => {
                debug!(sr_no, "skipping duplicate serial number");
                report.duplicates += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        inserted = report.inserted,
        duplicates = report.duplicates,
        invalid = report.invalid,
        "tenant import finished"
    );

    Ok(report)
}

// ============================================================================
// TESTS
// ============================================================================
