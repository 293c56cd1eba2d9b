// Ledger errors
//
// One tagged error for every failure the library surfaces. Nothing is retried
// locally; callers (HTTP handlers, CLI) decide how to report it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Tenant not found")]
    TenantNotFound,

    #[error("Rent collection not found")]
    RentCollectionNotFound,

    #[error("Invalid date range: end month {end} precedes start month {start}")]
    InvalidDateRange { start: String, end: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Receipt number already exists: {0}")]
    DuplicateReceiptNumber(String),

    #[error("Serial number already exists: {0}")]
    DuplicateSerialNumber(i64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        messages.sort();
        LedgerError::Validation(messages.join("; "))
    }
}

/// True when a SQLite failure is a UNIQUE violation on `table.column`.
pub(crate) fn is_unique_violation(err: &rusqlite::Error, table_column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            msg.contains("UNIQUE") && msg.contains(table_column)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct NamedInput {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
    }

    #[test]
    fn test_validation_errors_are_flattened() {
        let input = NamedInput { name: String::new() };
        let err: LedgerError = input.validate().unwrap_err().into();

        match err {
            LedgerError::Validation(msg) => assert_eq!(msg, "name: must not be empty"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(LedgerError::TenantNotFound.to_string(), "Tenant not found");
        assert_eq!(
            LedgerError::DuplicateSerialNumber(7).to_string(),
            "Serial number already exists: 7"
        );
    }
}
