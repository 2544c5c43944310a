//! # Validation Module
//!
//! Input validation for purchase, sale and payment entry.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE - field rules                                    │
//! │  ├── required text, lengths, formats                                   │
//! │  └── positive quantities and rates                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: transaction rules (ledger module)                            │
//! │  ├── stock on hand, credit limit, outstanding                          │
//! │  └── scheme minimums                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: mutation (only after layers 1 and 2 pass)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use medistock_core::validation::{validate_batch_code, validate_quantity};
//!
//! validate_batch_code("CP2401").unwrap();
//! validate_quantity("quantity", 5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Percent, TaxRate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest quantity accepted on a single line.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// GST slabs top out at 28%.
pub const MAX_GST_BPS: u32 = 2_800;

/// Margins above 1000% are treated as entry mistakes.
pub const MAX_MARGIN_BPS: u32 = 100_000;

// =============================================================================
// String Validators
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a display name (product, company, customer).
///
/// ```rust
/// use medistock_core::validation::validate_name;
///
/// assert!(validate_name("name", "Calpol 500").is_ok());
/// assert!(validate_name("name", "  ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    required_text(field, name, 200)
}

/// Validates a supplier or sale invoice number.
pub fn validate_invoice_number(invoice: &str) -> ValidationResult<()> {
    required_text("invoice_number", invoice, 50)
}

/// Validates a batch code.
///
/// ## Rules
/// - Must not be empty
/// - At most 30 characters
/// - Letters, digits, hyphens, slashes only (as printed on strips)
pub fn validate_batch_code(code: &str) -> ValidationResult<()> {
    required_text("batch_code", code, 30)?;

    if !code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: "batch_code".to_string(),
            reason: "must contain only letters, digits, hyphens and slashes".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative quantity such as scheme free goods.
pub fn validate_non_negative_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if !(0..=MAX_LINE_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a unit rate; zero and negative rates are rejected.
pub fn validate_rate(field: &str, rate: Money) -> ValidationResult<()> {
    if !rate.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a payment amount.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    validate_rate("payment amount", amount)
}

/// Validates an amount that may be zero (paid-at-sale, credit limit).
pub fn validate_non_negative_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a GST rate (0% to 28%).
pub fn validate_gst_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > MAX_GST_BPS {
        return Err(ValidationError::OutOfRange {
            field: "gst_rate".to_string(),
            min: 0,
            max: MAX_GST_BPS as i64,
        });
    }
    Ok(())
}

/// Validates a margin percentage.
pub fn validate_margin(margin: Percent) -> ValidationResult<()> {
    if margin.bps() > MAX_MARGIN_BPS {
        return Err(ValidationError::OutOfRange {
            field: "margin".to_string(),
            min: 0,
            max: MAX_MARGIN_BPS as i64,
        });
    }
    Ok(())
}

/// Validates a discount percentage (0% to 100%).
pub fn validate_discount(field: &str, discount: Percent) -> ValidationResult<()> {
    if discount.bps() > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_batch_code() {
        assert!(validate_batch_code("CP2401").is_ok());
        assert!(validate_batch_code("AB-12/24").is_ok());

        assert!(validate_batch_code("").is_err());
        assert!(validate_batch_code("has space").is_err());
        assert!(validate_batch_code(&"A".repeat(31)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("quantity", 1).is_ok());
        assert!(validate_quantity("quantity", 0).is_err());
        assert!(validate_quantity("quantity", -5).is_err());
        assert!(validate_quantity("quantity", MAX_LINE_QUANTITY + 1).is_err());

        assert!(validate_non_negative_quantity("free_quantity", 0).is_ok());
        assert!(validate_non_negative_quantity("free_quantity", -1).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_rate("rate", Money::from_paise(1)).is_ok());
        assert!(validate_rate("rate", Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_paise(-100)).is_err());
        assert!(validate_non_negative_amount("paid_amount", Money::zero()).is_ok());
    }

    #[test]
    fn test_validate_rates() {
        assert!(validate_gst_rate(TaxRate::from_bps(1200)).is_ok());
        assert!(validate_gst_rate(TaxRate::from_bps(2801)).is_err());
        assert!(validate_margin(Percent::whole(50)).is_ok());
        assert!(validate_discount("discount", Percent::whole(101)).is_err());
    }

    #[test]
    fn test_validate_invoice_number() {
        assert!(validate_invoice_number("INV-000001").is_ok());
        assert!(validate_invoice_number(" ").is_err());
    }
}
