//! # Scheme Evaluator
//!
//! Supplier promotional schemes: free goods and discounts granted on
//! purchase lines.
//!
//! ## Evaluation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SchemeLine (supplier, product, qty, rate, date)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Step 1: eligibility                                                    │
//! │  ├── status active?            no  → Inactive                           │
//! │  ├── date in [from, to]?       no  → Upcoming / Expired                 │
//! │  ├── same supplier?            no  → SupplierMismatch                   │
//! │  └── product in scope?         no  → ProductNotCovered                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Step 2: threshold gate (before any arithmetic)                        │
//! │  ├── qty ≥ minimum?            no  → MinimumQuantityNotMet{req, ord}   │
//! │  ├── amount ≥ minimum?         no  → MinimumAmountNotMet{req, ord}     │
//! │  └── combo products present?   no  → ComboIncomplete{missing}          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Step 3: payload → SchemeBenefit { free_qty, discount, effective_rate } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A scheme whose minimum is unmet never reaches step 3, so it can never
//! produce a non-zero benefit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::types::Percent;

// =============================================================================
// Scheme Record
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SchemeStatus {
    Active,
    Inactive,
}

/// Which products a scheme covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ProductScope {
    AllProducts,
    Products { product_ids: Vec<i64> },
}

impl ProductScope {
    pub fn covers(&self, product_id: i64) -> bool {
        match self {
            ProductScope::AllProducts => true,
            ProductScope::Products { product_ids } => product_ids.contains(&product_id),
        }
    }
}

/// A quantity tier. `max` of `None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuantitySlab {
    pub min: i64,
    pub max: Option<i64>,
    pub discount: Percent,
}

impl QuantitySlab {
    fn contains(&self, qty: i64) -> bool {
        qty >= self.min && self.max.map_or(true, |max| qty <= max)
    }
}

/// A line-amount tier. `max` of `None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AmountSlab {
    pub min: Money,
    pub max: Option<Money>,
    pub discount: Percent,
}

impl AmountSlab {
    fn contains(&self, amount: Money) -> bool {
        amount >= self.min && self.max.map_or(true, |max| amount <= max)
    }
}

/// Payload of a scheme; one variant per scheme type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemeKind {
    /// Buy `buy_qty`, get `free_qty` free, repeated per full multiple.
    FreeQuantity { buy_qty: i64, free_qty: i64 },
    /// Percentage off the line, optionally gated by a minimum quantity.
    FlatDiscount {
        discount: Percent,
        min_qty: Option<i64>,
    },
    /// Discount chosen by the tier containing the ordered quantity.
    QuantitySlab { slabs: Vec<QuantitySlab> },
    /// Early-payment discount.
    CashDiscount { discount: Percent, days: u32 },
    /// Discount chosen by the tier containing the line amount.
    VolumeDiscount { slabs: Vec<AmountSlab> },
    TradeDiscount { discount: Percent },
    /// Named promotional discount (festive, monsoon, ...).
    Seasonal { label: String, discount: Percent },
    /// Discount that only holds when every listed product is on the invoice.
    Combo {
        product_ids: Vec<i64>,
        discount: Percent,
    },
}

impl SchemeKind {
    /// Short type tag for display.
    pub fn tag(&self) -> &'static str {
        match self {
            SchemeKind::FreeQuantity { .. } => "free_quantity",
            SchemeKind::FlatDiscount { .. } => "flat_discount",
            SchemeKind::QuantitySlab { .. } => "quantity_slab",
            SchemeKind::CashDiscount { .. } => "cash_discount",
            SchemeKind::VolumeDiscount { .. } => "volume_discount",
            SchemeKind::TradeDiscount { .. } => "trade_discount",
            SchemeKind::Seasonal { .. } => "seasonal",
            SchemeKind::Combo { .. } => "combo",
        }
    }

    /// Minimum ordered quantity for quantity-threshold types.
    pub fn minimum_quantity(&self) -> Option<i64> {
        match self {
            SchemeKind::FreeQuantity { buy_qty, .. } => Some(*buy_qty),
            SchemeKind::FlatDiscount { min_qty, .. } => *min_qty,
            SchemeKind::QuantitySlab { slabs } => slabs.iter().map(|s| s.min).min(),
            _ => None,
        }
    }
}

/// A supplier-granted promotional scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Scheme {
    pub id: i64,
    pub supplier_id: i64,
    pub name: String,
    /// First day the scheme applies (inclusive).
    #[ts(as = "String")]
    pub valid_from: NaiveDate,
    /// Last day the scheme applies (inclusive).
    #[ts(as = "String")]
    pub valid_to: NaiveDate,
    pub scope: ProductScope,
    pub status: SchemeStatus,
    pub kind: SchemeKind,
}

/// Where a date falls relative to a scheme's validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SchemeWindow {
    Upcoming,
    Current,
    Expired,
}

impl Scheme {
    pub fn window_on(&self, date: NaiveDate) -> SchemeWindow {
        if date < self.valid_from {
            SchemeWindow::Upcoming
        } else if date > self.valid_to {
            SchemeWindow::Expired
        } else {
            SchemeWindow::Current
        }
    }

    /// Active status and the date inside the window.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.status == SchemeStatus::Active && self.window_on(date) == SchemeWindow::Current
    }
}

// =============================================================================
// Evaluation Input / Output
// =============================================================================

/// The purchase line a scheme is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct SchemeLine<'a> {
    pub supplier_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub rate: Money,
    pub date: NaiveDate,
    /// Every product on the purchase invoice (for combo schemes).
    pub invoice_products: &'a [i64],
}

impl SchemeLine<'_> {
    #[inline]
    pub fn amount(&self) -> Money {
        self.rate * self.quantity
    }
}

/// Why a scheme gives no benefit on a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Inapplicability {
    Inactive,
    Upcoming {
        #[ts(as = "String")]
        valid_from: NaiveDate,
    },
    Expired {
        #[ts(as = "String")]
        valid_to: NaiveDate,
    },
    SupplierMismatch { scheme_supplier: i64, line_supplier: i64 },
    ProductNotCovered { product_id: i64 },
    MinimumQuantityNotMet { required: i64, ordered: i64 },
    MinimumAmountNotMet { required: Money, ordered: Money },
    NoMatchingSlab { quantity: i64 },
    NoMatchingAmountSlab { amount: Money },
    ComboIncomplete { missing: Vec<i64> },
    MalformedPayload { detail: String },
}

impl fmt::Display for Inapplicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inapplicability::Inactive => write!(f, "scheme is inactive"),
            Inapplicability::Upcoming { valid_from } => {
                write!(f, "scheme starts on {}", valid_from)
            }
            Inapplicability::Expired { valid_to } => write!(f, "scheme expired on {}", valid_to),
            Inapplicability::SupplierMismatch {
                scheme_supplier,
                line_supplier,
            } => write!(
                f,
                "scheme belongs to supplier {}, purchase is from supplier {}",
                scheme_supplier, line_supplier
            ),
            Inapplicability::ProductNotCovered { product_id } => {
                write!(f, "product {} is not covered", product_id)
            }
            Inapplicability::MinimumQuantityNotMet { required, ordered } => write!(
                f,
                "minimum quantity required: {}, ordered: {}",
                required, ordered
            ),
            Inapplicability::MinimumAmountNotMet { required, ordered } => write!(
                f,
                "minimum amount required: {}, ordered: {}",
                required, ordered
            ),
            Inapplicability::NoMatchingSlab { quantity } => {
                write!(f, "no slab covers quantity {}", quantity)
            }
            Inapplicability::NoMatchingAmountSlab { amount } => {
                write!(f, "no slab covers amount {}", amount)
            }
            Inapplicability::ComboIncomplete { missing } => {
                write!(f, "combo requires products {:?} on the invoice", missing)
            }
            Inapplicability::MalformedPayload { detail } => {
                write!(f, "malformed scheme: {}", detail)
            }
        }
    }
}

/// Benefit a scheme grants on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SchemeBenefit {
    pub scheme_id: i64,
    pub free_quantity: i64,
    pub discount: Percent,
    pub discount_amount: Money,
    /// Cost per received unit.
    pub effective_rate: Money,
}

// =============================================================================
// Arithmetic
// =============================================================================

/// Free units for a buy-N-get-M scheme: `floor(qty / buy) × free`.
///
/// ```rust
/// use medistock_core::scheme::free_units;
///
/// assert_eq!(free_units(250, 100, 10), 20);
/// assert_eq!(free_units(99, 100, 10), 0);
/// ```
pub fn free_units(quantity: i64, buy_qty: i64, free_qty: i64) -> i64 {
    if buy_qty <= 0 || quantity < buy_qty {
        return 0;
    }
    (quantity / buy_qty) * free_qty
}

/// Cost per received unit.
///
/// With free goods the billed value is spread over every received unit:
/// `(qty × rate) / (qty + free)`. Otherwise `rate × (1 − discount)`.
pub fn effective_rate(quantity: i64, free_quantity: i64, rate: Money, discount: Percent) -> Money {
    if free_quantity > 0 {
        Money::per_unit(rate * quantity, quantity + free_quantity)
    } else {
        rate.discounted(discount)
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Step 1: status, window, supplier and product scope.
pub fn check_eligibility(scheme: &Scheme, line: &SchemeLine<'_>) -> Result<(), Inapplicability> {
    if scheme.status != SchemeStatus::Active {
        return Err(Inapplicability::Inactive);
    }

    match scheme.window_on(line.date) {
        SchemeWindow::Upcoming => {
            return Err(Inapplicability::Upcoming {
                valid_from: scheme.valid_from,
            })
        }
        SchemeWindow::Expired => {
            return Err(Inapplicability::Expired {
                valid_to: scheme.valid_to,
            })
        }
        SchemeWindow::Current => {}
    }

    if scheme.supplier_id != line.supplier_id {
        return Err(Inapplicability::SupplierMismatch {
            scheme_supplier: scheme.supplier_id,
            line_supplier: line.supplier_id,
        });
    }

    if !scheme.scope.covers(line.product_id) {
        return Err(Inapplicability::ProductNotCovered {
            product_id: line.product_id,
        });
    }

    Ok(())
}

/// Step 2: threshold gate. Runs before any benefit is computed.
fn check_thresholds(kind: &SchemeKind, line: &SchemeLine<'_>) -> Result<(), Inapplicability> {
    if let SchemeKind::FreeQuantity { buy_qty, free_qty } = kind {
        if *buy_qty <= 0 || *free_qty <= 0 {
            return Err(Inapplicability::MalformedPayload {
                detail: format!("buy {} get {} free", buy_qty, free_qty),
            });
        }
    }

    if let Some(required) = kind.minimum_quantity() {
        if line.quantity < required {
            return Err(Inapplicability::MinimumQuantityNotMet {
                required,
                ordered: line.quantity,
            });
        }
    }

    match kind {
        SchemeKind::VolumeDiscount { slabs } => {
            if let Some(required) = slabs.iter().map(|s| s.min).min() {
                let ordered = line.amount();
                if ordered < required {
                    return Err(Inapplicability::MinimumAmountNotMet { required, ordered });
                }
            }
        }
        SchemeKind::Combo { product_ids, .. } => {
            let missing: Vec<i64> = product_ids
                .iter()
                .copied()
                .filter(|id| *id != line.product_id && !line.invoice_products.contains(id))
                .collect();
            if !missing.is_empty() {
                return Err(Inapplicability::ComboIncomplete { missing });
            }
        }
        _ => {}
    }

    Ok(())
}

/// Evaluates one scheme against one line, from the line's ordered quantity.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use medistock_core::money::Money;
/// use medistock_core::scheme::*;
///
/// let scheme = Scheme {
///     id: 1,
///     supplier_id: 3,
///     name: "100+10".into(),
///     valid_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
///     valid_to: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
///     scope: ProductScope::AllProducts,
///     status: SchemeStatus::Active,
///     kind: SchemeKind::FreeQuantity { buy_qty: 100, free_qty: 10 },
/// };
/// let line = SchemeLine {
///     supplier_id: 3,
///     product_id: 9,
///     quantity: 100,
///     rate: Money::from_paise(9090),
///     date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
///     invoice_products: &[9],
/// };
/// let benefit = evaluate(&scheme, &line).unwrap();
/// assert_eq!(benefit.free_quantity, 10);
/// assert_eq!(benefit.effective_rate, Money::from_paise(8264));
/// ```
pub fn evaluate(scheme: &Scheme, line: &SchemeLine<'_>) -> Result<SchemeBenefit, Inapplicability> {
    check_eligibility(scheme, line)?;
    check_thresholds(&scheme.kind, line)?;

    let (free_quantity, discount) = match &scheme.kind {
        SchemeKind::FreeQuantity { buy_qty, free_qty } => {
            (free_units(line.quantity, *buy_qty, *free_qty), Percent::zero())
        }
        SchemeKind::FlatDiscount { discount, .. }
        | SchemeKind::CashDiscount { discount, .. }
        | SchemeKind::TradeDiscount { discount }
        | SchemeKind::Seasonal { discount, .. }
        | SchemeKind::Combo { discount, .. } => (0, *discount),
        SchemeKind::QuantitySlab { slabs } => {
            let slab = slabs
                .iter()
                .find(|s| s.contains(line.quantity))
                .ok_or(Inapplicability::NoMatchingSlab {
                    quantity: line.quantity,
                })?;
            (0, slab.discount)
        }
        SchemeKind::VolumeDiscount { slabs } => {
            let amount = line.amount();
            let slab = slabs
                .iter()
                .find(|s| s.contains(amount))
                .ok_or(Inapplicability::NoMatchingAmountSlab { amount })?;
            (0, slab.discount)
        }
    };

    Ok(SchemeBenefit {
        scheme_id: scheme.id,
        free_quantity,
        discount,
        discount_amount: line.amount().percent_of(discount),
        effective_rate: effective_rate(line.quantity, free_quantity, line.rate, discount),
    })
}

/// Step 1 filter over the whole scheme collection: the schemes worth
/// offering for this line.
pub fn candidate_schemes<'s>(schemes: &'s [Scheme], line: &SchemeLine<'_>) -> Vec<&'s Scheme> {
    schemes
        .iter()
        .filter(|s| check_eligibility(s, line).is_ok())
        .collect()
}

/// A candidate scheme with its outcome for the line, for the operator's
/// scheme picker. Unmet thresholds are kept so the reason can be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeOption<'s> {
    pub scheme: &'s Scheme,
    pub outcome: Result<SchemeBenefit, Inapplicability>,
}

pub fn scheme_options<'s>(schemes: &'s [Scheme], line: &SchemeLine<'_>) -> Vec<SchemeOption<'s>> {
    candidate_schemes(schemes, line)
        .into_iter()
        .map(|scheme| SchemeOption {
            scheme,
            outcome: evaluate(scheme, line),
        })
        .collect()
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

    fn scheme(kind: SchemeKind) -> Scheme {
        Scheme {
            id: 1,
            supplier_id: 3,
            name: "January scheme".to_string(),
            valid_from: date(2025, 1, 1),
            valid_to: date(2025, 1, 31),
            scope: ProductScope::AllProducts,
            status: SchemeStatus::Active,
            kind,
        }
    }

    fn line(quantity: i64, rate_paise: i64) -> SchemeLine<'static> {
        SchemeLine {
            supplier_id: 3,
            product_id: 9,
            quantity,
            rate: Money::from_paise(rate_paise),
            date: date(2025, 1, 15),
            invoice_products: &[9],
        }
    }

    #[test]
    fn test_free_units_multiplier_semantics() {
        assert_eq!(free_units(250, 100, 10), 20);
        assert_eq!(free_units(100, 100, 10), 10);
        assert_eq!(free_units(99, 100, 10), 0);
        assert_eq!(free_units(0, 100, 10), 0);
        assert_eq!(free_units(50, 0, 10), 0);
    }

    #[test]
    fn test_effective_rate_with_free_goods() {
        let rate = effective_rate(100, 10, Money::from_paise(9090), Percent::zero());
        assert_eq!(rate, Money::from_paise(8264));
    }

    #[test]
    fn test_free_quantity_scheme() {
        let s = scheme(SchemeKind::FreeQuantity {
            buy_qty: 100,
            free_qty: 10,
        });
        let benefit = evaluate(&s, &line(250, 5000)).unwrap();
        assert_eq!(benefit.free_quantity, 20);
        assert_eq!(benefit.discount_amount, Money::zero());
        // 250 × 50.00 / 270
        assert_eq!(benefit.effective_rate, Money::from_paise(4630));
    }

    #[test]
    fn test_minimum_quantity_gate_reports_detail() {
        let s = scheme(SchemeKind::FreeQuantity {
            buy_qty: 100,
            free_qty: 10,
        });
        let err = evaluate(&s, &line(60, 5000)).unwrap_err();
        assert_eq!(
            err,
            Inapplicability::MinimumQuantityNotMet {
                required: 100,
                ordered: 60
            }
        );
        assert_eq!(err.to_string(), "minimum quantity required: 100, ordered: 60");

        let flat = scheme(SchemeKind::FlatDiscount {
            discount: Percent::whole(5),
            min_qty: Some(50),
        });
        assert!(matches!(
            evaluate(&flat, &line(49, 1000)),
            Err(Inapplicability::MinimumQuantityNotMet { .. })
        ));
    }

    #[test]
    fn test_flat_discount() {
        let s = scheme(SchemeKind::FlatDiscount {
            discount: Percent::whole(10),
            min_qty: None,
        });
        let benefit = evaluate(&s, &line(20, 1000)).unwrap();
        assert_eq!(benefit.free_quantity, 0);
        assert_eq!(benefit.discount_amount, Money::from_rupees(20));
        assert_eq!(benefit.effective_rate, Money::from_rupees(9));
    }

    #[test]
    fn test_quantity_slab_selects_containing_tier() {
        let s = scheme(SchemeKind::QuantitySlab {
            slabs: vec![
                QuantitySlab {
                    min: 10,
                    max: Some(49),
                    discount: Percent::whole(2),
                },
                QuantitySlab {
                    min: 50,
                    max: Some(99),
                    discount: Percent::whole(5),
                },
                QuantitySlab {
                    min: 100,
                    max: None,
                    discount: Percent::whole(8),
                },
            ],
        });
        assert_eq!(evaluate(&s, &line(10, 1000)).unwrap().discount, Percent::whole(2));
        assert_eq!(evaluate(&s, &line(75, 1000)).unwrap().discount, Percent::whole(5));
        assert_eq!(evaluate(&s, &line(500, 1000)).unwrap().discount, Percent::whole(8));
        assert_eq!(
            evaluate(&s, &line(9, 1000)).unwrap_err(),
            Inapplicability::MinimumQuantityNotMet {
                required: 10,
                ordered: 9
            }
        );
    }

    #[test]
    fn test_quantity_slab_gap_is_reported() {
        let s = scheme(SchemeKind::QuantitySlab {
            slabs: vec![
                QuantitySlab {
                    min: 10,
                    max: Some(20),
                    discount: Percent::whole(2),
                },
                QuantitySlab {
                    min: 50,
                    max: Some(60),
                    discount: Percent::whole(5),
                },
            ],
        });
        assert_eq!(
            evaluate(&s, &line(30, 1000)).unwrap_err(),
            Inapplicability::NoMatchingSlab { quantity: 30 }
        );
    }

    #[test]
    fn test_volume_discount_keys_on_amount() {
        let s = scheme(SchemeKind::VolumeDiscount {
            slabs: vec![
                AmountSlab {
                    min: Money::from_rupees(5_000),
                    max: Some(Money::from_rupees(19_999)),
                    discount: Percent::whole(3),
                },
                AmountSlab {
                    min: Money::from_rupees(20_000),
                    max: None,
                    discount: Percent::whole(6),
                },
            ],
        });
        // 100 × ₹60 = ₹6000
        assert_eq!(evaluate(&s, &line(100, 6000)).unwrap().discount, Percent::whole(3));
        // 400 × ₹60 = ₹24000
        let benefit = evaluate(&s, &line(400, 6000)).unwrap();
        assert_eq!(benefit.discount, Percent::whole(6));
        assert_eq!(benefit.discount_amount, Money::from_rupees(1_440));
        // 10 × ₹60 = ₹600
        assert!(matches!(
            evaluate(&s, &line(10, 6000)),
            Err(Inapplicability::MinimumAmountNotMet { .. })
        ));
    }

    #[test]
    fn test_flat_percentage_kinds() {
        for kind in [
            SchemeKind::CashDiscount {
                discount: Percent::whole(2),
                days: 7,
            },
            SchemeKind::TradeDiscount {
                discount: Percent::whole(2),
            },
            SchemeKind::Seasonal {
                label: "Monsoon".to_string(),
                discount: Percent::whole(2),
            },
        ] {
            let benefit = evaluate(&scheme(kind), &line(10, 10_000)).unwrap();
            assert_eq!(benefit.effective_rate, Money::from_rupees(98));
            assert_eq!(benefit.discount_amount, Money::from_rupees(20));
        }
    }

    #[test]
    fn test_combo_requires_all_products() {
        let s = scheme(SchemeKind::Combo {
            product_ids: vec![9, 11, 12],
            discount: Percent::whole(4),
        });

        let partial = SchemeLine {
            invoice_products: &[9, 11],
            ..line(10, 1000)
        };
        assert_eq!(
            evaluate(&s, &partial).unwrap_err(),
            Inapplicability::ComboIncomplete { missing: vec![12] }
        );

        let full = SchemeLine {
            invoice_products: &[9, 11, 12],
            ..line(10, 1000)
        };
        assert_eq!(evaluate(&s, &full).unwrap().discount, Percent::whole(4));
    }

    #[test]
    fn test_validity_window() {
        let s = scheme(SchemeKind::TradeDiscount {
            discount: Percent::whole(1),
        });

        assert_eq!(s.window_on(date(2025, 2, 1)), SchemeWindow::Expired);
        assert_eq!(s.window_on(date(2024, 12, 31)), SchemeWindow::Upcoming);
        assert_eq!(s.window_on(date(2025, 1, 1)), SchemeWindow::Current);
        assert_eq!(s.window_on(date(2025, 1, 31)), SchemeWindow::Current);

        let late = SchemeLine {
            date: date(2025, 2, 1),
            ..line(10, 1000)
        };
        assert!(matches!(evaluate(&s, &late), Err(Inapplicability::Expired { .. })));

        let early = SchemeLine {
            date: date(2024, 12, 31),
            ..line(10, 1000)
        };
        assert!(matches!(evaluate(&s, &early), Err(Inapplicability::Upcoming { .. })));
    }

    #[test]
    fn test_candidate_filtering() {
        let mut other_supplier = scheme(SchemeKind::TradeDiscount {
            discount: Percent::whole(1),
        });
        other_supplier.id = 2;
        other_supplier.supplier_id = 4;

        let mut inactive = scheme(SchemeKind::TradeDiscount {
            discount: Percent::whole(1),
        });
        inactive.id = 3;
        inactive.status = SchemeStatus::Inactive;

        let mut other_product = scheme(SchemeKind::TradeDiscount {
            discount: Percent::whole(1),
        });
        other_product.id = 4;
        other_product.scope = ProductScope::Products {
            product_ids: vec![1, 2],
        };

        let mut gated = scheme(SchemeKind::FreeQuantity {
            buy_qty: 100,
            free_qty: 10,
        });
        gated.id = 5;

        let schemes = vec![other_supplier, inactive, other_product, gated];
        let candidates = candidate_schemes(&schemes, &line(10, 1000));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, 5);

        let options = scheme_options(&schemes, &line(10, 1000));
        assert_eq!(options.len(), 1);
        assert!(options[0].outcome.is_err());
    }

    #[test]
    fn test_malformed_free_scheme_is_rejected() {
        let s = scheme(SchemeKind::FreeQuantity {
            buy_qty: 0,
            free_qty: 10,
        });
        assert!(matches!(
            evaluate(&s, &line(10, 1000)),
            Err(Inapplicability::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_scheme_json_shape() {
        let s = scheme(SchemeKind::FreeQuantity {
            buy_qty: 100,
            free_qty: 10,
        });
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["kind"]["type"], "free_quantity");
        assert_eq!(json["scope"]["scope"], "all_products");

        let back: Scheme = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
