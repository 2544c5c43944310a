//! # Error Types
//!
//! Domain-specific error types for medistock-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  medistock-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule rejections                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  medistock-db errors (separate crate)                                  │
//! │  ├── DbError          - Store operation failures                       │
//! │  └── ServiceError     - CoreError | DbError for the transaction layer  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rejections Are Outcomes, Not Crashes
//! Exhausted credit, an expired scheme or a short batch are everyday events at
//! a distributor's counter. Every one of them is a `CoreError` variant that
//! carries enough detail for the operator message, and every one is returned
//! *before* any collection is touched.

use chrono::NaiveDate;
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Entity exists but is flagged inactive.
    #[error("{entity} {id} is inactive")]
    Inactive { entity: &'static str, id: i64 },

    /// Selling (or reversing) more than a batch holds.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line: batch B-1042, qty 60
    ///      │
    ///      ▼
    /// Batch B-1042 on hand: 45
    ///      │
    ///      ▼
    /// InsufficientStock { batch_code: "B-1042", available: 45, requested: 60 }
    ///      │
    ///      ▼
    /// Operator adds a second line drawing from the next FEFO batch
    /// ```
    #[error("Insufficient stock in batch {batch_code}: available {available}, requested {requested}")]
    InsufficientStock {
        batch_code: String,
        available: i64,
        requested: i64,
    },

    /// Sale line names a batch that belongs to another product.
    #[error("Batch {batch_id} does not hold product {product_id}")]
    BatchProductMismatch { batch_id: i64, product_id: i64 },

    /// Sale total is larger than the customer's remaining credit.
    #[error("Credit limit exceeded for customer {customer_id}: available {available}, requested {requested}")]
    CreditLimitExceeded {
        customer_id: i64,
        available: Money,
        requested: Money,
    },

    /// Payment is larger than what the customer owes.
    #[error("Payment {amount} exceeds outstanding {outstanding} for customer {customer_id}")]
    PaymentExceedsOutstanding {
        customer_id: i64,
        outstanding: Money,
        amount: Money,
    },

    /// Payment is larger than the remaining balance of the invoice it targets.
    #[error("Payment {amount} exceeds balance {balance} of sale {sale_id}")]
    PaymentExceedsInvoiceBalance {
        sale_id: i64,
        balance: Money,
        amount: Money,
    },

    /// Payment names an invoice that is already settled (or cancelled).
    #[error("Sale {sale_id} has no open balance")]
    InvoiceNotOpen { sale_id: i64 },

    /// Paid amount recorded at sale/purchase time is larger than the total.
    #[error("Paid amount {paid} exceeds total {total}")]
    OverPayment { paid: Money, total: Money },

    /// Selected scheme gives no benefit for this line.
    #[error("Scheme {scheme_id} not applicable: {reason}")]
    SchemeNotApplicable {
        scheme_id: i64,
        reason: crate::scheme::Inapplicability,
    },

    /// Purchase line quantity changed after a scheme was applied and the
    /// scheme was not re-applied.
    #[error("Scheme benefit on line {line} is stale; re-apply the scheme after changing quantity")]
    StaleSchemeBenefit { line: usize },

    /// Sale is already cancelled.
    #[error("Sale {0} is already cancelled")]
    SaleCancelled(i64),

    /// Transaction date is missing or nonsensical.
    #[error("Invalid date {date}: {reason}")]
    InvalidDate { date: NaiveDate, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        CoreError::NotFound { entity, id }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid batch code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate invoice number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            batch_code: "B-1042".to_string(),
            available: 45,
            requested: 60,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock in batch B-1042: available 45, requested 60"
        );

        let err = CoreError::CreditLimitExceeded {
            customer_id: 7,
            available: Money::from_paise(2_000_000),
            requested: Money::from_paise(3_000_000),
        };
        assert_eq!(
            err.to_string(),
            "Credit limit exceeded for customer 7: available ₹20000.00, requested ₹30000.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "batch_code".to_string(),
        };
        assert_eq!(err.to_string(), "batch_code is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
