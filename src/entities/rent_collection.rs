// 🧾 Rent Collection Entity
//
// One recorded payment covering a contiguous range of months.
// total_months / total_rent are computed once, at creation, from the tenant's
// rent in effect at that moment. They are stored and never recomputed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::period::RentPeriod;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentCollection {
    pub id: String,

    /// Owning tenant's UUID
    pub tenant_id: String,

    pub receipt_no: String,
    pub collection_date: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_months: i64,
    pub total_rent: f64,
}

/// A payment ready to be stored: range parsed, totals already computed
#[derive(Debug, Clone)]
pub struct RentCollectionDraft {
    pub tenant_id: String,
    pub receipt_no: String,
    pub collection_date: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period: RentPeriod,
}

impl RentCollectionDraft {
    pub fn into_collection(self) -> RentCollection {
        RentCollection {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: self.tenant_id,
            receipt_no: self.receipt_no,
            collection_date: self.collection_date,
            start_date: self.start_date,
            end_date: self.end_date,
            total_months: self.period.total_months,
            total_rent: self.period.total_rent,
        }
    }
}

/// Tenant fields shown next to a collection in the ledger listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSummary {
    pub id: String,
    pub sr_no: i64,
    pub name: String,
    pub mobile_number: String,
    pub rent_amount: f64,
}

/// A collection with its tenant attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentCollectionWithTenant {
    #[serde(flatten)]
    pub collection: RentCollection,
    pub tenant: TenantSummary,
}

// ============================================================================
// INPUT SCHEMA
// ============================================================================

/// Body of a "record payment" request.
///
/// Totals are never accepted from the caller; they are always computed.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentInput {
    #[validate(length(min = 1, message = "Please provide a tenant id"))]
    pub tenant_id: String,

    #[validate(length(min = 1, message = "Please provide a receipt number"))]
    pub receipt_no: String,

    #[validate(length(min = 1, message = "Please provide a start month"))]
    pub start_date: String,

    #[validate(length(min = 1, message = "Please provide an end month"))]
    pub end_date: String,

    /// Defaults to now when absent or blank
    #[serde(default)]
    pub collection_date: Option<String>,
}

/// Body of a "preview payment" request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuoteInput {
    #[validate(length(min = 1, message = "Please provide a tenant id"))]
    pub tenant_id: String,

    #[validate(length(min = 1, message = "Please provide a start month"))]
    pub start_date: String,

    #[validate(length(min = 1, message = "Please provide an end month"))]
    pub end_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_freezes_totals() {
        let draft = RentCollectionDraft {
            tenant_id: "t-1".to_string(),
            receipt_no: "R-001".to_string(),
            collection_date: Utc::now(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            period: RentPeriod {
                total_months: 3,
                total_rent: 3000.0,
            },
        };

        let collection = draft.into_collection();

        assert_eq!(collection.total_months, 3);
        assert_eq!(collection.total_rent, 3000.0);
        assert_eq!(collection.id.len(), 36);
    }

    #[test]
    fn test_payment_input_ignores_client_totals() {
        // The browser form sends its own preview totals; they are dropped.
        let input: PaymentInput = serde_json::from_str(
            r#"{"tenant_id":"t-1","receipt_no":"R-9","start_date":"2024-01",
                "end_date":"2024-02","total_months":99,"total_rent":1}"#,
        )
        .unwrap();

        assert_eq!(input.receipt_no, "R-9");
        assert!(input.collection_date.is_none());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_payment_input_requires_receipt() {
        let input: PaymentInput = serde_json::from_str(
            r#"{"tenant_id":"t-1","receipt_no":"","start_date":"2024-01","end_date":"2024-02"}"#,
        )
        .unwrap();

        assert!(input.validate().is_err());
    }
}
