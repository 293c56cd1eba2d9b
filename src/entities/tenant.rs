// 🏠 Tenant Entity
//
// Identity: UUID (storage key) + serial number (what people write on receipts)
// Values:   name, mobile number, current monthly rent
// History:  append-only snapshots of the values as they were before each change

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

// ============================================================================
// HISTORY ENTRY
// ============================================================================

/// Immutable snapshot of a tenant's values, taken just before they changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    pub mobile_number: String,
    pub rent_amount: f64,
    pub changed_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Capture the tenant's current values, stamped with `changed_at`
    pub fn snapshot_of(tenant: &Tenant, changed_at: DateTime<Utc>) -> Self {
        HistoryEntry {
            name: tenant.name.clone(),
            mobile_number: tenant.mobile_number.clone(),
            rent_amount: tenant.rent_amount,
            changed_at,
        }
    }
}

// ============================================================================
// TENANT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Stable identity (UUID) - never changes
    pub id: String,

    /// Human-facing ordinal, unique across tenants
    pub sr_no: i64,

    pub name: String,
    pub mobile_number: String,

    /// Current monthly rent
    pub rent_amount: f64,

    pub created_at: DateTime<Utc>,

    /// Oldest first. Only `revision::record_revision` appends here.
    history: Vec<HistoryEntry>,
}

impl Tenant {
    /// Create a brand-new tenant with a fresh UUID and empty history
    pub fn new(input: NewTenant) -> Self {
        Tenant {
            id: uuid::Uuid::new_v4().to_string(),
            sr_no: input.sr_no,
            name: input.name,
            mobile_number: input.mobile_number,
            rent_amount: input.rent_amount,
            created_at: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Rebuild a tenant loaded from storage
    pub(crate) fn from_storage(
        id: String,
        sr_no: i64,
        name: String,
        mobile_number: String,
        rent_amount: f64,
        created_at: DateTime<Utc>,
        history: Vec<HistoryEntry>,
    ) -> Self {
        Tenant {
            id,
            sr_no,
            name,
            mobile_number,
            rent_amount,
            created_at,
            history,
        }
    }

    /// Previous values, oldest first
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub(crate) fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }
}

// ============================================================================
// INPUT SCHEMA
// ============================================================================

/// Body of a tenant creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewTenant {
    #[validate(range(min = 1, message = "Serial number must be at least 1"))]
    pub sr_no: i64,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "Please provide the tenant's mobile number"))]
    pub mobile_number: String,

    #[validate(
        range(min = 0.0, message = "Rent amount cannot be negative"),
        custom(function = "finite_amount")
    )]
    pub rent_amount: f64,
}

/// Fields a tenant update may touch. Anything else in the body is rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TenantUpdate {
    #[validate(range(min = 1, message = "Serial number must be at least 1"))]
    pub sr_no: Option<i64>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "Mobile number cannot be empty"))]
    pub mobile_number: Option<String>,

    #[validate(
        range(min = 0.0, message = "Rent amount cannot be negative"),
        custom(function = "finite_amount")
    )]
    pub rent_amount: Option<f64>,
}

/// `range` lets NaN and infinity through, so amounts get their own check
fn finite_amount(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        return Ok(());
    }

    Err(ValidationError::new("finite")
        .with_message(Cow::Borrowed("Rent amount must be a finite number")))
}

impl TenantUpdate {
    /// True when applying this update would change at least one value
    pub fn changes(&self, tenant: &Tenant) -> bool {
        self.sr_no.is_some_and(|v| v != tenant.sr_no)
            || self.name.as_ref().is_some_and(|v| *v != tenant.name)
            || self
                .mobile_number
                .as_ref()
                .is_some_and(|v| *v != tenant.mobile_number)
            || self.rent_amount.is_some_and(|v| v != tenant.rent_amount)
    }

    /// Overwrite the present fields; absent fields are left as they are
    pub fn apply_to(self, tenant: &mut Tenant) {
        if let Some(sr_no) = self.sr_no {
            tenant.sr_no = sr_no;
        }
        if let Some(name) = self.name {
            tenant.name = name;
        }
        if let Some(mobile_number) = self.mobile_number {
            tenant.mobile_number = mobile_number;
        }
        if let Some(rent_amount) = self.rent_amount {
            tenant.rent_amount = rent_amount;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tenant {
        Tenant::new(NewTenant {
            sr_no: 1,
            name: "Asha Verma".to_string(),
            mobile_number: "9876543210".to_string(),
            rent_amount: 8000.0,
        })
    }

    #[test]
    fn test_new_tenant_has_identity_and_no_history() {
        let tenant = sample();

        assert_eq!(tenant.id.len(), 36);
        assert!(tenant.history().is_empty());
    }

    #[test]
    fn test_new_tenant_validation() {
        let ok = NewTenant {
            sr_no: 3,
            name: "x".repeat(100),
            mobile_number: "1".to_string(),
            rent_amount: 0.0,
        };
        assert!(ok.validate().is_ok());

        let long_name = NewTenant {
            name: "x".repeat(101),
            ..ok.clone()
        };
        assert!(long_name.validate().is_err());

        let no_mobile = NewTenant {
            mobile_number: String::new(),
            ..ok.clone()
        };
        assert!(no_mobile.validate().is_err());

        let negative_rent = NewTenant {
            rent_amount: -1.0,
            ..ok
        };
        assert!(negative_rent.validate().is_err());
    }

    #[test]
    fn test_non_finite_rent_is_rejected() {
        for rent_amount in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let input = NewTenant {
                sr_no: 1,
                name: "Asha Verma".to_string(),
                mobile_number: "9876543210".to_string(),
                rent_amount,
            };
            let errors = input.validate().unwrap_err();
            assert!(errors.field_errors().contains_key("rent_amount"));

            let update = TenantUpdate {
                rent_amount: Some(rent_amount),
                ..Default::default()
            };
            assert!(update.validate().is_err());
        }

        let update = TenantUpdate {
            rent_amount: Some(9000.0),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_update_rejects_unknown_fields() {
        let parsed: Result<TenantUpdate, _> =
            serde_json::from_str(r#"{"name":"B","history":[]}"#);
        assert!(parsed.is_err());

        let parsed: TenantUpdate = serde_json::from_str(r#"{"rent_amount":9000}"#).unwrap();
        assert_eq!(parsed.rent_amount, Some(9000.0));
        assert!(parsed.name.is_none());
    }

    #[test]
    fn test_update_changes_and_apply() {
        let mut tenant = sample();

        let same = TenantUpdate {
            name: Some("Asha Verma".to_string()),
            ..Default::default()
        };
        assert!(!same.changes(&tenant));
        assert!(!TenantUpdate::default().changes(&tenant));

        let raise = TenantUpdate {
            rent_amount: Some(8500.0),
            ..Default::default()
        };
        assert!(raise.changes(&tenant));

        raise.apply_to(&mut tenant);
        assert_eq!(tenant.rent_amount, 8500.0);
        assert_eq!(tenant.name, "Asha Verma");
        assert_eq!(tenant.mobile_number, "9876543210");
    }
}
