//! # Credit & Settlement Tracker
//!
//! Sole writer of `Customer::outstanding` and of a sale's `paid_amount` and
//! `status`.
//!
//! ## Balance Flow
//! ```text
//!                  ┌──────────────────────────────┐
//!   sale commit ──►│ outstanding += total − paid  │
//!                  └──────────────────────────────┘
//!                  ┌──────────────────────────────┐
//!   payment ──────►│ sale.paid += amount          │  oldest open sale
//!                  │ sale.status recomputed       │  (or the named one)
//!                  │ outstanding −= amount        │
//!                  └──────────────────────────────┘
//!                  ┌──────────────────────────────┐
//!   cancellation ─►│ outstanding −= sale.balance  │
//!                  └──────────────────────────────┘
//! ```
//!
//! Payments are split into a validating `plan_payment` and a mutating
//! `apply_payment` so the ledger can check every rule before touching state.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Customer, Sale, SaleStatus};
use crate::validation::{validate_non_negative_amount, validate_payment_amount};

// =============================================================================
// Sale-Time Checks
// =============================================================================

/// Rejects a sale whose total exceeds `credit_limit − outstanding`.
pub fn check_credit(customer: &Customer, sale_total: Money) -> CoreResult<()> {
    let available = customer.available_credit();
    if sale_total > available {
        return Err(CoreError::CreditLimitExceeded {
            customer_id: customer.id,
            available,
            requested: sale_total,
        });
    }
    Ok(())
}

/// Amount collected at the counter must be within `0..=total`.
pub fn check_paid_at_sale(paid: Money, total: Money) -> CoreResult<()> {
    validate_non_negative_amount("paid_amount", paid)?;
    if paid > total {
        return Err(CoreError::OverPayment { paid, total });
    }
    Ok(())
}

/// Adds a committed sale's uncollected amount to the customer's balance.
pub fn record_sale(customer: &mut Customer, sale: &Sale) {
    customer.outstanding += sale.balance();
}

/// Drops a sale's uncollected amount from the balance and marks it
/// cancelled. Returns the amount released.
pub fn cancel_sale(customer: &mut Customer, sale: &mut Sale) -> CoreResult<Money> {
    if sale.cancelled {
        return Err(CoreError::SaleCancelled(sale.id));
    }
    let released = sale.balance();
    customer.outstanding -= released;
    sale.cancelled = true;
    Ok(released)
}

// =============================================================================
// Payments
// =============================================================================

/// Where a validated payment will land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentPlan {
    pub customer_id: i64,
    pub amount: Money,
    /// `None` for an on-account payment (no open invoice).
    pub sale_id: Option<i64>,
}

/// The customer's oldest open sale, by date then id.
pub fn oldest_open_sale(sales: &[Sale], customer_id: i64) -> Option<&Sale> {
    sales
        .iter()
        .filter(|s| s.customer_id == customer_id && s.is_open() && s.balance().is_positive())
        .min_by_key(|s| (s.date, s.id))
}

/// Validates a payment and picks the invoice it settles.
///
/// ## Rules
/// - amount > 0 and ≤ the customer's outstanding
/// - with `target`, that sale must be the customer's, open, and have a
///   balance ≥ amount
/// - without `target`, the oldest open sale is used under the same balance
///   rule; when none exists the payment is taken on account
pub fn plan_payment(
    customer: &Customer,
    sales: &[Sale],
    amount: Money,
    target: Option<i64>,
) -> CoreResult<PaymentPlan> {
    validate_payment_amount(amount)?;

    if amount > customer.outstanding {
        return Err(CoreError::PaymentExceedsOutstanding {
            customer_id: customer.id,
            outstanding: customer.outstanding,
            amount,
        });
    }

    let sale = match target {
        Some(sale_id) => {
            let sale = sales
                .iter()
                .find(|s| s.id == sale_id && s.customer_id == customer.id)
                .ok_or_else(|| CoreError::not_found("sale", sale_id))?;
            if !sale.is_open() {
                return Err(CoreError::InvoiceNotOpen { sale_id });
            }
            Some(sale)
        }
        None => oldest_open_sale(sales, customer.id),
    };

    if let Some(sale) = sale {
        let balance = sale.balance();
        if amount > balance {
            return Err(CoreError::PaymentExceedsInvoiceBalance {
                sale_id: sale.id,
                balance,
                amount,
            });
        }
    }

    Ok(PaymentPlan {
        customer_id: customer.id,
        amount,
        sale_id: sale.map(|s| s.id),
    })
}

/// Applies a plan produced by [`plan_payment`] against the same state.
///
/// Returns the settled sale's new status, if the payment targeted one.
pub fn apply_payment(customer: &mut Customer, sales: &mut [Sale], plan: &PaymentPlan) -> Option<SaleStatus> {
    customer.outstanding -= plan.amount;

    let sale_id = plan.sale_id?;
    let sale = sales.iter_mut().find(|s| s.id == sale_id)?;
    sale.paid_amount += plan.amount;
    sale.status = SaleStatus::from_amounts(sale.paid_amount, sale.total);
    Some(sale.status)
}

// =============================================================================
// Audit
// =============================================================================

/// Σ(total − paid) over the customer's open sales.
pub fn outstanding_from_sales(sales: &[Sale], customer_id: i64) -> Money {
    sales
        .iter()
        .filter(|s| s.customer_id == customer_id && s.is_open())
        .map(Sale::balance)
        .sum()
}

/// Stored running balance next to the value recomputed from invoices.
///
/// Drift is expected for customers carrying an opening balance or
/// on-account payments, which have no invoice behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OutstandingAudit {
    pub customer_id: i64,
    pub stored: Money,
    pub from_invoices: Money,
}

impl OutstandingAudit {
    #[inline]
    pub fn drift(&self) -> Money {
        self.stored - self.from_invoices
    }

    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.drift().is_zero()
    }
}

/// Read-only comparison for every customer.
pub fn audit_outstanding(customers: &[Customer], sales: &[Sale]) -> Vec<OutstandingAudit> {
    customers
        .iter()
        .map(|c| OutstandingAudit {
            customer_id: c.id,
            stored: c.outstanding,
            from_invoices: outstanding_from_sales(sales, c.id),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
