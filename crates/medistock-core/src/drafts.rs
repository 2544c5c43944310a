//! # Transaction Drafts
//!
//! Operator input for purchases, sales and payments before the ledger
//! commits them.
//!
//! ## Scheme Selection on a Purchase Line
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  select_scheme(S1)  ──► benefit computed from ordered quantity         │
//! │  select_scheme(S2)  ──► S1 discarded, S2 computed from ordered quantity │
//! │                         (never stacked on S1's free goods)             │
//! │  set_quantity(q)    ──► selection kept but marked STALE                │
//! │  set_rate(r)        ──► selection kept but marked STALE                │
//! │  reapply_scheme()   ──► recomputed for q and r, fresh again            │
//! │                                                                         │
//! │  A stale line is rejected at commit with StaleSchemeBenefit, as is a   │
//! │  line whose recorded benefit no longer matches the invoice.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Recomputation is always explicit. Nothing here re-evaluates a scheme
//! behind the caller's back.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::scheme::{evaluate, Inapplicability, Scheme, SchemeBenefit, SchemeLine};
use crate::types::PaymentMode;

// =============================================================================
// Purchase
// =============================================================================

/// A scheme chosen for a line, with the inputs it was evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SchemeSelection {
    pub scheme_id: i64,
    pub evaluated_quantity: i64,
    pub evaluated_rate: Money,
    pub benefit: SchemeBenefit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLineDraft {
    pub product_id: i64,
    pub brand: String,
    pub quantity: i64,
    pub batch_code: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub rate: Money,
    pub scheme: Option<SchemeSelection>,
}

impl PurchaseLineDraft {
    pub fn new(
        product_id: i64,
        brand: impl Into<String>,
        quantity: i64,
        batch_code: impl Into<String>,
        expiry_date: NaiveDate,
        rate: Money,
    ) -> Self {
        PurchaseLineDraft {
            product_id,
            brand: brand.into(),
            quantity,
            batch_code: batch_code.into(),
            expiry_date,
            rate,
            scheme: None,
        }
    }

    fn scheme_line<'a>(&self, supplier_id: i64, date: NaiveDate, invoice_products: &'a [i64]) -> SchemeLine<'a> {
        SchemeLine {
            supplier_id,
            product_id: self.product_id,
            quantity: self.quantity,
            rate: self.rate,
            date,
            invoice_products,
        }
    }

    /// Replaces any current selection with `scheme`, evaluated from the
    /// ordered quantity. On failure the previous selection is kept.
    pub fn select_scheme(
        &mut self,
        scheme: &Scheme,
        supplier_id: i64,
        date: NaiveDate,
        invoice_products: &[i64],
    ) -> Result<SchemeBenefit, Inapplicability> {
        let benefit = evaluate(scheme, &self.scheme_line(supplier_id, date, invoice_products))?;
        self.scheme = Some(SchemeSelection {
            scheme_id: scheme.id,
            evaluated_quantity: self.quantity,
            evaluated_rate: self.rate,
            benefit,
        });
        Ok(benefit)
    }

    /// Re-evaluates the selected scheme for the current quantity. When the
    /// scheme no longer applies the selection is dropped and the reason
    /// returned.
    pub fn reapply_scheme(
        &mut self,
        schemes: &[Scheme],
        supplier_id: i64,
        date: NaiveDate,
        invoice_products: &[i64],
    ) -> Option<Result<SchemeBenefit, Inapplicability>> {
        let scheme_id = self.scheme?.scheme_id;
        let Some(scheme) = schemes.iter().find(|s| s.id == scheme_id) else {
            self.scheme = None;
            return None;
        };

        let outcome = self.select_scheme(scheme, supplier_id, date, invoice_products);
        if outcome.is_err() {
            self.scheme = None;
        }
        Some(outcome)
    }

    pub fn clear_scheme(&mut self) {
        self.scheme = None;
    }

    /// Changes the ordered quantity. Any selected scheme becomes stale.
    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    /// Changes the purchase rate. Any selected scheme becomes stale.
    pub fn set_rate(&mut self, rate: Money) {
        self.rate = rate;
    }

    /// True when a scheme was selected for a different quantity or rate.
    pub fn is_stale(&self) -> bool {
        self.scheme
            .is_some_and(|s| s.evaluated_quantity != self.quantity || s.evaluated_rate != self.rate)
    }

    pub fn free_quantity(&self) -> i64 {
        self.scheme.map_or(0, |s| s.benefit.free_quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseDraft {
    pub supplier_id: i64,
    /// Supplier's invoice number. Generated from the purchase prefix when
    /// absent.
    pub invoice_number: Option<String>,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub lines: Vec<PurchaseLineDraft>,
    pub paid_amount: Money,
}

impl PurchaseDraft {
    pub fn new(supplier_id: i64, date: NaiveDate) -> Self {
        PurchaseDraft {
            supplier_id,
            invoice_number: None,
            date,
            lines: Vec::new(),
            paid_amount: Money::zero(),
        }
    }

    /// Every product on the invoice, for combo schemes.
    pub fn product_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Selects `scheme` on line `index`. See [`PurchaseLineDraft::select_scheme`].
    pub fn select_scheme(&mut self, index: usize, scheme: &Scheme) -> Option<Result<SchemeBenefit, Inapplicability>> {
        let products = self.product_ids();
        let (supplier_id, date) = (self.supplier_id, self.date);
        let line = self.lines.get_mut(index)?;
        Some(line.select_scheme(scheme, supplier_id, date, &products))
    }

    /// Re-evaluates the selection on line `index`, stale or not. Needed after
    /// an invoice-level change such as adding a product a combo scheme reads.
    pub fn reapply_scheme(&mut self, index: usize, schemes: &[Scheme]) -> Option<Result<SchemeBenefit, Inapplicability>> {
        let products = self.product_ids();
        let (supplier_id, date) = (self.supplier_id, self.date);
        self.lines
            .get_mut(index)?
            .reapply_scheme(schemes, supplier_id, date, &products)
    }

    /// Re-applies every stale selection against `schemes`.
    pub fn reapply_stale(&mut self, schemes: &[Scheme]) -> Vec<(usize, Inapplicability)> {
        let products = self.product_ids();
        let (supplier_id, date) = (self.supplier_id, self.date);
        let mut dropped = Vec::new();

        for (idx, line) in self.lines.iter_mut().enumerate() {
            if !line.is_stale() {
                continue;
            }
            if let Some(Err(reason)) = line.reapply_scheme(schemes, supplier_id, date, &products) {
                dropped.push((idx, reason));
            }
        }

        dropped
    }

    pub(crate) fn scheme_line<'a>(&self, index: usize, invoice_products: &'a [i64]) -> Option<SchemeLine<'a>> {
        self.lines
            .get(index)
            .map(|l| l.scheme_line(self.supplier_id, self.date, invoice_products))
    }
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineDraft {
    pub product_id: i64,
    /// Batch the operator picked from the FEFO list.
    pub batch_id: i64,
    pub quantity: i64,
    /// Final selling rate, typed by the operator.
    pub rate: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDraft {
    pub customer_id: i64,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub lines: Vec<SaleLineDraft>,
    /// Collected at the counter.
    pub paid_amount: Money,
}

impl SaleDraft {
    pub fn new(customer_id: i64, date: NaiveDate) -> Self {
        SaleDraft {
            customer_id,
            date,
            lines: Vec::new(),
            paid_amount: Money::zero(),
        }
    }

    pub fn line(mut self, product_id: i64, batch_id: i64, quantity: i64, rate: Money) -> Self {
        self.lines.push(SaleLineDraft {
            product_id,
            batch_id,
            quantity,
            rate,
        });
        self
    }

    pub fn paid(mut self, amount: Money) -> Self {
        self.paid_amount = amount;
        self
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentDraft {
    pub customer_id: i64,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub mode: PaymentMode,
    pub reference: Option<String>,
    /// Invoice to settle; the oldest open one when `None`.
    pub sale_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{AmountSlab, ProductScope, SchemeKind, SchemeStatus};
    use crate::types::Percent;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn scheme(id: i64, kind: SchemeKind) -> Scheme {
        Scheme {
            id,
            supplier_id: 3,
            name: format!("scheme {}", id),
            valid_from: date(2025, 1, 1),
            valid_to: date(2025, 12, 31),
            scope: ProductScope::AllProducts,
            status: SchemeStatus::Active,
            kind,
        }
    }

    fn draft(quantity: i64) -> PurchaseDraft {
        let mut d = PurchaseDraft::new(3, date(2025, 3, 1));
        d.lines.push(PurchaseLineDraft::new(
            9,
            "Calpol",
            quantity,
            "CP2501",
            date(2027, 3, 1),
            Money::from_paise(9090),
        ));
        d
    }

    #[test]
    fn test_switching_schemes_never_compounds() {
        let free = scheme(1, SchemeKind::FreeQuantity {
            buy_qty: 100,
            free_qty: 10,
        });
        let flat = scheme(2, SchemeKind::TradeDiscount {
            discount: Percent::whole(5),
        });
        let mut d = draft(250);

        let benefit = d.select_scheme(0, &free).unwrap().unwrap();
        assert_eq!(benefit.free_quantity, 20);

        let benefit = d.select_scheme(0, &flat).unwrap().unwrap();
        assert_eq!(benefit.free_quantity, 0);
        assert_eq!(d.lines[0].quantity, 250);
        assert_eq!(d.lines[0].free_quantity(), 0);
        assert_eq!(d.lines[0].scheme.unwrap().scheme_id, 2);

        let benefit = d.select_scheme(0, &free).unwrap().unwrap();
        assert_eq!(benefit.free_quantity, 20);
    }

    #[test]
    fn test_failed_selection_keeps_previous() {
        let free = scheme(1, SchemeKind::FreeQuantity {
            buy_qty: 100,
            free_qty: 10,
        });
        let big = scheme(2, SchemeKind::FreeQuantity {
            buy_qty: 500,
            free_qty: 60,
        });
        let mut d = draft(250);
        d.select_scheme(0, &free).unwrap().unwrap();

        let err = d.select_scheme(0, &big).unwrap().unwrap_err();
        assert_eq!(
            err,
            Inapplicability::MinimumQuantityNotMet {
                required: 500,
                ordered: 250
            }
        );
        assert_eq!(d.lines[0].scheme.unwrap().scheme_id, 1);
    }

    #[test]
    fn test_quantity_change_marks_stale_until_reapplied() {
        let free = scheme(1, SchemeKind::FreeQuantity {
            buy_qty: 100,
            free_qty: 10,
        });
        let schemes = vec![free.clone()];
        let mut d = draft(250);
        d.select_scheme(0, &free).unwrap().unwrap();

        d.lines[0].set_quantity(300);
        assert!(d.lines[0].is_stale());
        assert_eq!(d.lines[0].free_quantity(), 20);

        assert!(d.reapply_stale(&schemes).is_empty());
        assert!(!d.lines[0].is_stale());
        assert_eq!(d.lines[0].free_quantity(), 30);

        d.lines[0].set_quantity(50);
        let dropped = d.reapply_stale(&schemes);
        assert_eq!(dropped.len(), 1);
        assert!(d.lines[0].scheme.is_none());
        assert_eq!(d.lines[0].free_quantity(), 0);
    }

    #[test]
    fn test_rate_change_marks_stale_until_reapplied() {
        let volume = scheme(1, SchemeKind::VolumeDiscount {
            slabs: vec![
                AmountSlab {
                    min: Money::from_rupees(1_000),
                    max: Some(Money::from_rupees(10_000)),
                    discount: Percent::whole(5),
                },
                AmountSlab {
                    min: Money::from_rupees(10_001),
                    max: None,
                    discount: Percent::whole(10),
                },
            ],
        });
        let schemes = vec![volume.clone()];
        let mut d = draft(100);
        d.lines[0].rate = Money::from_rupees(50);

        let benefit = d.select_scheme(0, &volume).unwrap().unwrap();
        assert_eq!(benefit.discount_amount, Money::from_rupees(250));

        d.lines[0].set_rate(Money::from_rupees(200));
        assert!(d.lines[0].is_stale());
        assert_eq!(d.lines[0].scheme.unwrap().benefit.discount_amount, Money::from_rupees(250));

        assert!(d.reapply_stale(&schemes).is_empty());
        assert!(!d.lines[0].is_stale());
        assert_eq!(d.lines[0].scheme.unwrap().benefit.discount_amount, Money::from_rupees(2_000));
    }

    #[test]
    fn test_sale_draft_builder() {
        let d = SaleDraft::new(1, date(2025, 3, 1))
            .line(9, 4, 10, Money::from_rupees(14))
            .paid(Money::from_rupees(50));
        assert_eq!(d.lines.len(), 1);
        assert_eq!(d.paid_amount, Money::from_rupees(50));
    }
}
