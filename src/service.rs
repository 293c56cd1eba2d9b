// Ledger service
//
// The caller flows: validate the input, load what is needed, run the
// calculator / revision tracker, persist. Storage is always the connection
// passed in; nothing here holds state between calls.

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;
use validator::Validate;

use crate::db;
use crate::entities::{
    NewTenant, PaymentInput, QuoteInput, RentCollection, RentCollectionDraft, Tenant,
    TenantUpdate,
};
use crate::error::{LedgerError, Result};
use crate::period::{compute_with_policy, parse_month, parse_timestamp, RangePolicy, RentPeriod};
use crate::revision;

// ============================================================================
// Tenants
// ============================================================================

pub fn register_tenant(conn: &Connection, input: NewTenant) -> Result<Tenant> {
    input.validate()?;

    let tenant = db::create_tenant(conn, input)?;
    info!(tenant_id = %tenant.id, sr_no = tenant.sr_no, "tenant registered");

    Ok(tenant)
}

pub fn get_tenant(conn: &Connection, id: &str) -> Result<Tenant> {
    db::find_tenant_by_id(conn, id)?.ok_or(LedgerError::TenantNotFound)
}

/// Apply an allow-listed update, recording the previous values first.
///
/// An update that changes nothing leaves the tenant (and its history) as is.
pub fn update_tenant(conn: &Connection, id: &str, update: TenantUpdate) -> Result<Tenant> {
    update.validate()?;

    let mut tenant = get_tenant(conn, id)?;

    if revision::apply_update(&mut tenant, update) {
        db::save_tenant(conn, &tenant)?;
        info!(
            tenant_id = %tenant.id,
            revisions = tenant.history().len(),
            "tenant updated"
        );
    }

    Ok(tenant)
}

pub fn remove_tenant(conn: &Connection, id: &str) -> Result<()> {
    if !db::delete_tenant(conn, id)? {
        return Err(LedgerError::TenantNotFound);
    }

    info!(tenant_id = %id, "tenant deleted");
    Ok(())
}

// ============================================================================
// Payments
// ============================================================================

/// Months and total for a prospective payment, without storing anything
pub fn quote_payment(
    conn: &Connection,
    input: &QuoteInput,
    policy: RangePolicy,
) -> Result<RentPeriod> {
    input.validate()?;

    let tenant = get_tenant(conn, &input.tenant_id)?;
    let start = parse_month(&input.start_date)?;
    let end = parse_month(&input.end_date)?;

    compute_with_policy(start, end, tenant.rent_amount, policy)
}

/// Record a payment at the tenant's current rent.
///
/// The totals are computed here and frozen into the stored record.
pub fn record_payment(
    conn: &Connection,
    input: PaymentInput,
    policy: RangePolicy,
) -> Result<RentCollection> {
    input.validate()?;

    let tenant = get_tenant(conn, &input.tenant_id)?;
    let start_date = parse_month(&input.start_date)?;
    let end_date = parse_month(&input.end_date)?;

    let collection_date = match input.collection_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_timestamp(raw)?,
        _ => Utc::now(),
    };

    let period = compute_with_policy(start_date, end_date, tenant.rent_amount, policy)?;

    let collection = db::create_rent_collection(
        conn,
        RentCollectionDraft {
            tenant_id: tenant.id,
            receipt_no: input.receipt_no,
            collection_date,
            start_date,
            end_date,
            period,
        },
    )?;

    info!(
        collection_id = %collection.id,
        tenant_id = %collection.tenant_id,
        receipt_no = %collection.receipt_no,
        total_months = collection.total_months,
        total_rent = collection.total_rent,
        "payment recorded"
    );

    Ok(collection)
}

pub fn remove_payment(conn: &Connection, id: &str) -> Result<()> {
    if !db::delete_rent_collection(conn, id)? {
        return Err(LedgerError::RentCollectionNotFound);
    }

    info!(collection_id = %id, "payment deleted");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        conn
    }

    fn register(conn: &Connection, sr_no: i64, rent: f64) -> Tenant {
        register_tenant(
            conn,
            NewTenant {
                sr_no,
                name: format!("Tenant {}", sr_no),
                mobile_number: "9800000000".to_string(),
                rent_amount: rent,
            },
        )
        .unwrap()
    }

    fn payment(tenant_id: &str, receipt: &str, start: &str, end: &str) -> PaymentInput {
        PaymentInput {
            tenant_id: tenant_id.to_string(),
            receipt_no: receipt.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            collection_date: Some("2024-04-01".to_string()),
        }
    }

    #[test]
    fn test_register_validates() {
        let conn = test_db();

        let err = register_tenant(
            &conn,
            NewTenant {
                sr_no: 1,
                name: "n".repeat(101),
                mobile_number: "1".to_string(),
                rent_amount: 10.0,
            },
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(db::count_tenants(&conn).unwrap(), 0);
    }

    #[test]
    fn test_record_payment_uses_current_rent() {
        let conn = test_db();
        let tenant = register(&conn, 1, 1000.0);

        let collection = record_payment(
            &conn,
            payment(&tenant.id, "R-1", "2024-01", "2024-03"),
            RangePolicy::Reject,
        )
        .unwrap();

        assert_eq!(collection.total_months, 3);
        assert_eq!(collection.total_rent, 3000.0);
        assert_eq!(collection.collection_date.to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_payment_totals_frozen_after_rent_change() {
        let conn = test_db();
        let tenant = register(&conn, 1, 1000.0);
        let first = record_payment(
            &conn,
            payment(&tenant.id, "R-1", "2024-01", "2024-02"),
            RangePolicy::Reject,
        )
        .unwrap();

        update_tenant(
            &conn,
            &tenant.id,
            TenantUpdate {
                rent_amount: Some(1500.0),
                ..Default::default()
            },
        )
        .unwrap();
        let second = record_payment(
            &conn,
            payment(&tenant.id, "R-2", "2024-03", "2024-04"),
            RangePolicy::Reject,
        )
        .unwrap();

        let stored = db::find_rent_collection_by_id(&conn, &first.id).unwrap().unwrap();
        assert_eq!(stored.total_rent, 2000.0);
        assert_eq!(second.total_rent, 3000.0);
    }

    #[test]
    fn test_record_payment_unknown_tenant() {
        let conn = test_db();

        let err = record_payment(
            &conn,
            payment("nope", "R-1", "2024-01", "2024-01"),
            RangePolicy::Reject,
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::TenantNotFound));
    }

    #[test]
    fn test_reversed_range_follows_policy() {
        let conn = test_db();
        let tenant = register(&conn, 1, 1000.0);

        let err = record_payment(
            &conn,
            payment(&tenant.id, "R-1", "2024-03", "2024-01"),
            RangePolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDateRange { .. }));
        assert_eq!(db::count_rent_collections(&conn).unwrap(), 0);

        let passed = record_payment(
            &conn,
            payment(&tenant.id, "R-2", "2024-03", "2024-01"),
            RangePolicy::PassThrough,
        )
        .unwrap();
        assert_eq!(passed.total_months, -1);
        assert_eq!(passed.total_rent, -1000.0);

        let clamped = record_payment(
            &conn,
            payment(&tenant.id, "R-3", "2024-03", "2024-01"),
            RangePolicy::Clamp,
        )
        .unwrap();
        assert_eq!(clamped.total_months, 0);
        assert_eq!(clamped.total_rent, 0.0);
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        let conn = test_db();
        let tenant = register(&conn, 1, 1000.0);

        let err = record_payment(
            &conn,
            payment(&tenant.id, "R-1", "January", "2024-01"),
            RangePolicy::Reject,
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidDate(_)));
    }

    #[test]
    fn test_blank_collection_date_defaults_to_now() {
        let conn = test_db();
        let tenant = register(&conn, 1, 1000.0);
        let before = Utc::now();

        let mut input = payment(&tenant.id, "R-1", "2024-01", "2024-01");
        input.collection_date = Some("  ".to_string());
        let collection = record_payment(&conn, input, RangePolicy::Reject).unwrap();

        assert!(collection.collection_date >= before);
    }

    #[test]
    fn test_quote_does_not_persist() {
        let conn = test_db();
        let tenant = register(&conn, 1, 750.0);

        let quote = quote_payment(
            &conn,
            &QuoteInput {
                tenant_id: tenant.id.clone(),
                start_date: "2024-01".to_string(),
                end_date: "2024-12".to_string(),
            },
            RangePolicy::Reject,
        )
        .unwrap();

        assert_eq!(quote.total_months, 12);
        assert_eq!(quote.total_rent, 9000.0);
        assert_eq!(db::count_rent_collections(&conn).unwrap(), 0);
    }

    #[test]
    fn test_update_tenant_records_each_revision() {
        let conn = test_db();
        let tenant = register(&conn, 1, 1000.0);

        for rent in [1100.0, 1200.0, 1300.0] {
            update_tenant(
                &conn,
                &tenant.id,
                TenantUpdate {
                    rent_amount: Some(rent),
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let stored = get_tenant(&conn, &tenant.id).unwrap();
        let rents: Vec<f64> = stored.history().iter().map(|h| h.rent_amount).collect();
        assert_eq!(rents, vec![1000.0, 1100.0, 1200.0]);
        assert_eq!(stored.rent_amount, 1300.0);
    }

    #[test]
    fn test_noop_update_adds_no_history() {
        let conn = test_db();
        let tenant = register(&conn, 1, 1000.0);

        let updated = update_tenant(&conn, &tenant.id, TenantUpdate::default()).unwrap();

        assert!(updated.history().is_empty());
    }

    #[test]
    fn test_update_validation_and_missing_tenant() {
        let conn = test_db();
        let tenant = register(&conn, 1, 1000.0);

        let invalid = TenantUpdate {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            update_tenant(&conn, &tenant.id, invalid),
            Err(LedgerError::Validation(_))
        ));

        let not_a_number = TenantUpdate {
            rent_amount: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(
            update_tenant(&conn, &tenant.id, not_a_number),
            Err(LedgerError::Validation(ref msg)) if msg.contains("finite")
        ));
        assert_eq!(get_tenant(&conn, &tenant.id).unwrap().rent_amount, 1000.0);

        assert!(matches!(
            update_tenant(&conn, "missing", TenantUpdate::default()),
            Err(LedgerError::TenantNotFound)
        ));
        assert!(get_tenant(&conn, &tenant.id).unwrap().history().is_empty());
    }

    #[test]
    fn test_remove_payment_and_tenant() {
        let conn = test_db();
        let tenant = register(&conn, 1, 1000.0);
        let collection = record_payment(
            &conn,
            payment(&tenant.id, "R-1", "2024-01", "2024-01"),
            RangePolicy::Reject,
        )
        .unwrap();

        remove_payment(&conn, &collection.id).unwrap();
        assert!(matches!(
            remove_payment(&conn, &collection.id),
            Err(LedgerError::RentCollectionNotFound)
        ));
        assert_eq!(get_tenant(&conn, &tenant.id).unwrap().rent_amount, 1000.0);

        remove_tenant(&conn, &tenant.id).unwrap();
        assert!(matches!(
            remove_tenant(&conn, &tenant.id),
            Err(LedgerError::TenantNotFound)
        ));
    }
}
