//! # Domain Types
//!
//! Core records held in the distributor's ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Company      │   │    Product      │   │    Customer     │       │
//! │  │  (supplier)     │   │  gst_rate_bps   │   │  customer_type  │       │
//! │  │  payment_terms  │   │  min_stock      │   │  credit_limit   │       │
//! │  └────────┬────────┘   └────────┬────────┘   │  outstanding    │       │
//! │           │                     │            └────────┬────────┘       │
//! │           ▼                     ▼                     ▼                │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Purchase     │──►│ InventoryBatch  │◄──│      Sale       │       │
//! │  │  lines + scheme │   │ batch_code      │   │  lines → batch  │       │
//! │  │  free_quantity  │   │ expiry_date     │   │  paid_amount    │       │
//! │  └─────────────────┘   │ quantity ≥ 0    │   └────────▲────────┘       │
//! │                        └─────────────────┘            │                │
//! │                                              ┌────────┴────────┐       │
//! │                                              │     Payment     │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every record carries an integer `id` allocated by the ledger store
//! (max id + 1). Business identifiers such as invoice numbers and batch codes
//! are human-facing and separate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Records stored in a ledger collection.
pub trait Record {
    fn id(&self) -> i64;
}

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(impl Record for $ty {
            #[inline]
            fn id(&self) -> i64 {
                self.id
            }
        })*
    };
}

// =============================================================================
// Rates
// =============================================================================

/// GST rate represented in basis points (1200 = 12%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// A margin or discount percentage in basis points.
///
/// Margins may be fractional (12.5% = 1250 bps). Basis points keep every
/// calculation in integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Whole percentage points, e.g. `Percent::whole(30)` is 30%.
    #[inline]
    pub const fn whole(pct: u32) -> Self {
        Percent(pct * 100)
    }

    /// Creates a percentage from a decimal value (12.5 → 1250 bps).
    /// Negative input is clamped to zero.
    pub fn from_percentage(pct: f64) -> Self {
        Percent((pct * 100.0).round().max(0.0) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
        }
    }
}

// =============================================================================
// Customer Type
// =============================================================================

/// Pricing tier of a pharmacy customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum CustomerType {
    A,
    B,
    C,
}

impl CustomerType {
    pub const ALL: [CustomerType; 3] = [CustomerType::A, CustomerType::B, CustomerType::C];
}

impl std::fmt::Display for CustomerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomerType::A => write!(f, "A"),
            CustomerType::B => write!(f, "B"),
            CustomerType::C => write!(f, "C"),
        }
    }
}

impl std::str::FromStr for CustomerType {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(CustomerType::A),
            "B" => Ok(CustomerType::B),
            "C" => Ok(CustomerType::C),
            other => Err(crate::error::ValidationError::InvalidFormat {
                field: "customer_type".to_string(),
                reason: format!("unknown tier '{}', expected A, B or C", other),
            }),
        }
    }
}

// =============================================================================
// Masters
// =============================================================================

/// A medicine the distributor stocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: i64,
    /// Molecule / generic name (e.g. "Paracetamol").
    pub generic_name: String,
    /// Brand-level display name (e.g. "Calpol 500").
    pub name: String,
    pub hsn_code: String,
    /// GST rate in basis points.
    pub gst_rate_bps: u32,
    /// Packing description (e.g. "10x10 tabs").
    pub packing: String,
    /// Low-stock threshold across all batches.
    pub min_stock: i64,
    pub is_active: bool,
}

impl Product {
    #[inline]
    pub fn gst_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.gst_rate_bps)
    }
}

/// When a supplier expects to be paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentTerms {
    CashOnDelivery,
    Credit { days: u32 },
}

impl Default for PaymentTerms {
    fn default() -> Self {
        PaymentTerms::Credit { days: 30 }
    }
}

/// A manufacturer / supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub contact: Option<String>,
    pub payment_terms: PaymentTerms,
    pub is_active: bool,
}

/// A pharmacy buying from the distributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub customer_type: CustomerType,
    pub phone: Option<String>,
    pub credit_limit: Money,
    /// Running unpaid balance. Only the credit module writes this field.
    pub outstanding: Money,
    pub credit_days: u32,
    pub is_active: bool,
}

impl Customer {
    /// Credit still available for new sales. Negative when the customer is
    /// already over the limit.
    #[inline]
    pub fn available_credit(&self) -> Money {
        self.credit_limit - self.outstanding
    }
}

/// Margin override for one (customer type, product) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarginRule {
    pub id: i64,
    pub customer_type: CustomerType,
    pub product_id: i64,
    pub margin: Percent,
    /// Absolute minimum selling price, if any.
    pub min_price: Option<Money>,
}

// =============================================================================
// Inventory Batch
// =============================================================================

/// A physical lot of one product.
///
/// Depleted batches (quantity 0) are kept for history and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryBatch {
    pub id: i64,
    pub product_id: i64,
    pub supplier_id: i64,
    pub brand: String,
    pub batch_code: String,
    /// Units on hand, including free goods received.
    pub quantity: i64,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub unit_cost: Money,
}

impl InventoryBatch {
    /// Whole days until expiry; negative once expired.
    #[inline]
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    /// Expired when the expiry date is strictly before today.
    #[inline]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.quantity <= 0
    }

    /// True when this batch is the lot a purchase line refers to.
    pub fn matches(&self, product_id: i64, batch_code: &str) -> bool {
        self.product_id == product_id && self.batch_code.eq_ignore_ascii_case(batch_code.trim())
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// Settlement state of a purchase invoice towards the supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchasePaymentStatus {
    Paid,
    Partial,
    Pending,
}

impl PurchasePaymentStatus {
    pub fn from_amounts(paid: Money, total: Money) -> Self {
        if paid.is_positive() && paid >= total {
            PurchasePaymentStatus::Paid
        } else if paid.is_positive() {
            PurchasePaymentStatus::Partial
        } else {
            PurchasePaymentStatus::Pending
        }
    }
}

/// A line on a supplier invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLine {
    pub product_id: i64,
    pub brand: String,
    /// Billed units.
    pub quantity: i64,
    /// Scheme free goods received on top of `quantity`.
    pub free_quantity: i64,
    pub batch_code: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    /// Invoice rate per billed unit.
    pub rate: Money,
    /// Scheme applied to this line, if any.
    pub scheme_id: Option<i64>,
    /// Scheme discount on the line.
    pub discount: Money,
    /// Cost per received unit after scheme benefits.
    pub effective_rate: Money,
    /// `quantity × rate − discount`.
    pub amount: Money,
}

impl PurchaseLine {
    /// Units that enter stock for this line.
    #[inline]
    pub fn received_quantity(&self) -> i64 {
        self.quantity + self.free_quantity
    }
}

/// A supplier invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Purchase {
    pub id: i64,
    pub supplier_id: i64,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub lines: Vec<PurchaseLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub payment_status: PurchasePaymentStatus,
    pub paid_amount: Money,
}

// =============================================================================
// Sale
// =============================================================================

/// Collection state of a sale invoice.
///
/// Derived from amounts: `Paid` iff paid == total, `Partial` iff
/// 0 < paid < total, else `Unpaid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Paid,
    Partial,
    Unpaid,
}

impl SaleStatus {
    pub fn from_amounts(paid: Money, total: Money) -> Self {
        if paid == total {
            SaleStatus::Paid
        } else if paid.is_positive() && paid < total {
            SaleStatus::Partial
        } else {
            SaleStatus::Unpaid
        }
    }
}

/// A line on a sale invoice. Draws from exactly one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: i64,
    pub batch_id: i64,
    /// Batch code at time of sale (frozen for the printed invoice).
    pub batch_code: String,
    pub quantity: i64,
    /// Operator-entered selling rate.
    pub rate: Money,
    pub amount: Money,
}

/// A sale invoice to a pharmacy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub customer_id: i64,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub lines: Vec<SaleLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub status: SaleStatus,
    pub paid_amount: Money,
    /// Cancelled sales stay on record but no longer hold stock or balance.
    #[serde(default)]
    pub cancelled: bool,
}

impl Sale {
    /// Uncollected amount on this invoice.
    #[inline]
    pub fn balance(&self) -> Money {
        (self.total - self.paid_amount).clamp_non_negative()
    }

    /// Open for collection: not cancelled and not fully paid.
    #[inline]
    pub fn is_open(&self) -> bool {
        !self.cancelled && self.status != SaleStatus::Paid
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Cheque,
    Upi,
    BankTransfer,
}

/// Money received from a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: i64,
    pub customer_id: i64,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub mode: PaymentMode,
    /// Cheque number, UPI reference, etc.
    pub reference: Option<String>,
    /// Sale ids this payment settled. Empty for on-account payments.
    pub applied_to: Vec<i64>,
}

impl_record!(
    Product,
    Company,
    Customer,
    MarginRule,
    InventoryBatch,
    Purchase,
    Sale,
    Payment,
    crate::scheme::Scheme,
);

/// One greater than the largest id in `records`, or 1 when empty.
pub fn next_id<R: Record>(records: &[R]) -> i64 {
    records.iter().map(Record::id).max().unwrap_or(0) + 1
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_percent_display_and_parse() {
        assert_eq!(Percent::whole(30).to_string(), "30%");
        assert_eq!(Percent::from_bps(1250).to_string(), "12.50%");
        assert_eq!(Percent::from_percentage(12.5).bps(), 1250);
        assert_eq!(Percent::from_percentage(-3.0).bps(), 0);
    }

    #[test]
    fn test_customer_type_parsing() {
        assert_eq!("a".parse::<CustomerType>().unwrap(), CustomerType::A);
        assert_eq!(" C ".parse::<CustomerType>().unwrap(), CustomerType::C);
        assert!("D".parse::<CustomerType>().is_err());
    }

    #[test]
    fn test_sale_status_from_amounts() {
        let total = Money::from_rupees(10_000);
        assert_eq!(SaleStatus::from_amounts(total, total), SaleStatus::Paid);
        assert_eq!(
            SaleStatus::from_amounts(Money::from_rupees(4_000), total),
            SaleStatus::Partial
        );
        assert_eq!(SaleStatus::from_amounts(Money::zero(), total), SaleStatus::Unpaid);
        assert_eq!(SaleStatus::from_amounts(Money::zero(), Money::zero()), SaleStatus::Paid);
    }

    #[test]
    fn test_purchase_status_from_amounts() {
        let total = Money::from_rupees(500);
        assert_eq!(
            PurchasePaymentStatus::from_amounts(Money::zero(), total),
            PurchasePaymentStatus::Pending
        );
        assert_eq!(
            PurchasePaymentStatus::from_amounts(Money::from_rupees(100), total),
            PurchasePaymentStatus::Partial
        );
        assert_eq!(
            PurchasePaymentStatus::from_amounts(total, total),
            PurchasePaymentStatus::Paid
        );
    }

    #[test]
    fn test_batch_expiry_helpers() {
        let batch = InventoryBatch {
            id: 1,
            product_id: 1,
            supplier_id: 1,
            brand: "Calpol".to_string(),
            batch_code: "CP2401".to_string(),
            quantity: 10,
            purchase_date: date(2025, 1, 1),
            expiry_date: date(2025, 3, 1),
            unit_cost: Money::from_rupees(10),
        };
        assert_eq!(batch.days_to_expiry(date(2025, 2, 1)), 28);
        assert!(!batch.is_expired(date(2025, 3, 1)));
        assert!(batch.is_expired(date(2025, 3, 2)));
        assert!(batch.matches(1, " cp2401 "));
        assert!(!batch.matches(2, "CP2401"));
    }

    #[test]
    fn test_next_id() {
        let empty: Vec<Company> = Vec::new();
        assert_eq!(next_id(&empty), 1);

        let companies = vec![
            Company {
                id: 4,
                name: "Cipla".to_string(),
                contact: None,
                payment_terms: PaymentTerms::CashOnDelivery,
                is_active: true,
            },
            Company {
                id: 2,
                name: "Sun Pharma".to_string(),
                contact: None,
                payment_terms: PaymentTerms::default(),
                is_active: true,
            },
        ];
        assert_eq!(next_id(&companies), 5);
    }
}
