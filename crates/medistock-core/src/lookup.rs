//! Display lookups and invoice numbering.
//!
//! Label lookups never fail: a dangling reference renders as `"Unknown"`
//! instead of breaking the whole listing.

use crate::types::{Company, Customer, Product, Record};

pub const UNKNOWN: &str = "Unknown";

/// Default sale invoice prefix.
pub const SALE_INVOICE_PREFIX: &str = "INV";

/// Default purchase reference prefix.
pub const PURCHASE_INVOICE_PREFIX: &str = "PUR";

fn find<R: Record>(records: &[R], id: i64) -> Option<&R> {
    records.iter().find(|r| r.id() == id)
}

pub fn company_name(companies: &[Company], id: i64) -> &str {
    find(companies, id).map_or(UNKNOWN, |c| c.name.as_str())
}

pub fn product_name(products: &[Product], id: i64) -> &str {
    find(products, id).map_or(UNKNOWN, |p| p.name.as_str())
}

pub fn customer_name(customers: &[Customer], id: i64) -> &str {
    find(customers, id).map_or(UNKNOWN, |c| c.name.as_str())
}

/// Formats an invoice number as `PREFIX-000042`.
///
/// ```rust
/// use medistock_core::lookup::invoice_number;
///
/// assert_eq!(invoice_number("INV", 42), "INV-000042");
/// ```
pub fn invoice_number(prefix: &str, id: i64) -> String {
    format!("{}-{:06}", prefix.trim(), id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentTerms;

    #[test]
    fn test_missing_company_is_unknown() {
        let companies = vec![Company {
            id: 1,
            name: "Cipla".to_string(),
            contact: None,
            payment_terms: PaymentTerms::default(),
            is_active: true,
        }];
        assert_eq!(company_name(&companies, 1), "Cipla");
        assert_eq!(company_name(&companies, 2), UNKNOWN);
        assert_eq!(product_name(&[], 7), UNKNOWN);
        assert_eq!(customer_name(&[], 7), UNKNOWN);
    }

    #[test]
    fn test_invoice_number() {
        assert_eq!(invoice_number("PUR", 7), "PUR-000007");
        assert_eq!(invoice_number("INV", 1_234_567), "INV-1234567");
    }
}
