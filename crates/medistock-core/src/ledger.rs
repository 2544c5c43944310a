//! # Ledger Transactions
//!
//! Purchase receipt, sale commit, payment, cancellation and purchase
//! revision over an in-memory copy of every collection.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Transaction                                    │
//! │                                                                         │
//! │  1. VALIDATE  (no mutation)                                            │
//! │     fields → references → stock → schemes → credit                     │
//! │        │                                                                │
//! │        │ any rejection ──► Err(CoreError), Books unchanged             │
//! │        ▼                                                                │
//! │  2. MUTATE   (cannot fail past the first stock movement)               │
//! │     batches → sale/purchase/payment → customer outstanding             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  3. RECEIPT  returned to the caller, who persists the touched          │
//! │     collections through the ledger store                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purchase Flow
//! ```text
//! PurchaseDraft ──► scheme re-evaluation (must equal the selected benefit)
//!               ──► lines priced (free qty, discount, effective rate)
//!               ──► inventory::receive_purchase
//! ```
//!
//! ## Sale Flow
//! ```text
//! SaleDraft ──► allocation::select_batch per line
//!           ──► totals + GST ──► credit::check_credit
//!           ──► inventory::consume_sale ──► credit::record_sale
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::{candidate_batches, select_batch, BatchCandidate, PricingContext};
use crate::credit;
use crate::drafts::{PaymentDraft, PurchaseDraft, SaleDraft};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::inventory::{self, BatchReceipt, StockAdjustment};
use crate::lookup::{invoice_number, PURCHASE_INVOICE_PREFIX, SALE_INVOICE_PREFIX};
use crate::margin::{MarginDefaults, MarginTable};
use crate::money::Money;
use crate::pricing::{suggest_price, PriceSuggestion};
use crate::scheme::{evaluate, Scheme};
use crate::types::{
    next_id, Company, Customer, InventoryBatch, MarginRule, Payment, Product, Purchase,
    PurchaseLine, PurchasePaymentStatus, Record, Sale, SaleLine, SaleStatus,
};
use crate::validation::{
    validate_batch_code, validate_invoice_number, validate_name, validate_quantity, validate_rate,
};

// =============================================================================
// Settings
// =============================================================================

/// Tunables the ledger needs from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerSettings {
    pub margins: MarginDefaults,
    pub sale_prefix: String,
    pub purchase_prefix: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            margins: MarginDefaults::default(),
            sale_prefix: SALE_INVOICE_PREFIX.to_string(),
            purchase_prefix: PURCHASE_INVOICE_PREFIX.to_string(),
        }
    }
}

// =============================================================================
// Receipts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub batches: Vec<BatchReceipt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub stock: StockAdjustment,
    pub outstanding: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub sale_status: Option<SaleStatus>,
    pub outstanding: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CancellationReceipt {
    pub sale_id: i64,
    pub released: Money,
    pub stock: StockAdjustment,
}

// =============================================================================
// Books
// =============================================================================

/// Every collection a transaction can read or write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Books {
    pub companies: Vec<Company>,
    pub products: Vec<Product>,
    pub customers: Vec<Customer>,
    pub margin_rules: Vec<MarginRule>,
    pub schemes: Vec<Scheme>,
    pub batches: Vec<InventoryBatch>,
    pub purchases: Vec<Purchase>,
    pub sales: Vec<Sale>,
    pub payments: Vec<Payment>,
}

fn find_by_id<R: Record>(items: &[R], id: i64) -> Option<&R> {
    items.iter().find(|item| item.id() == id)
}

impl Books {
    fn active_supplier(&self, id: i64) -> CoreResult<&Company> {
        let company = find_by_id(&self.companies, id).ok_or_else(|| CoreError::not_found("company", id))?;
        if !company.is_active {
            return Err(CoreError::Inactive { entity: "company", id });
        }
        Ok(company)
    }

    fn active_product(&self, id: i64) -> CoreResult<&Product> {
        let product = find_by_id(&self.products, id).ok_or_else(|| CoreError::not_found("product", id))?;
        if !product.is_active {
            return Err(CoreError::Inactive { entity: "product", id });
        }
        Ok(product)
    }

    fn customer_index(&self, id: i64) -> CoreResult<usize> {
        self.customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CoreError::not_found("customer", id))
    }

    pub fn margin_table(&self, defaults: MarginDefaults) -> MarginTable<'_> {
        MarginTable::new(&self.margin_rules, defaults)
    }

    /// GST on `amount` at the product's rate.
    fn line_tax(&self, product_id: i64, amount: Money) -> Money {
        find_by_id(&self.products, product_id)
            .map_or(Money::zero(), |p| amount.calculate_tax(p.gst_rate()))
    }

    // -------------------------------------------------------------------------
    // Price Suggestions
    // -------------------------------------------------------------------------

    /// FEFO batch list for a sale line, with suggested prices when a
    /// customer is given.
    pub fn batch_candidates(
        &self,
        product_id: i64,
        customer_id: Option<i64>,
        today: NaiveDate,
        defaults: MarginDefaults,
    ) -> CoreResult<Vec<BatchCandidate>> {
        let pricing = match customer_id {
            Some(id) => {
                let customer = &self.customers[self.customer_index(id)?];
                Some(PricingContext {
                    table: self.margin_table(defaults),
                    customer_type: customer.customer_type,
                })
            }
            None => None,
        };
        Ok(candidate_batches(&self.batches, product_id, today, pricing))
    }

    /// Suggested selling rate for one batch and customer.
    pub fn suggest_rate(&self, customer_id: i64, batch_id: i64, defaults: MarginDefaults) -> CoreResult<PriceSuggestion> {
        let customer = &self.customers[self.customer_index(customer_id)?];
        let batch = find_by_id(&self.batches, batch_id).ok_or_else(|| CoreError::not_found("batch", batch_id))?;
        Ok(suggest_price(
            &self.margin_table(defaults),
            customer.customer_type,
            batch.product_id,
            batch.unit_cost,
        ))
    }

    // -------------------------------------------------------------------------
    // Purchases
    // -------------------------------------------------------------------------

    /// Validates a purchase draft and prices its lines. Pure.
    fn build_purchase(&self, id: i64, draft: &PurchaseDraft, settings: &LedgerSettings) -> CoreResult<Purchase> {
        self.active_supplier(draft.supplier_id)?;

        let invoice = match draft.invoice_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => {
                validate_invoice_number(number)?;
                let duplicate = self.purchases.iter().any(|p| {
                    p.id != id && p.supplier_id == draft.supplier_id && p.invoice_number.eq_ignore_ascii_case(number)
                });
                if duplicate {
                    return Err(ValidationError::Duplicate {
                        field: "invoice_number".to_string(),
                        value: number.to_string(),
                    }
                    .into());
                }
                number.to_string()
            }
            _ => invoice_number(&settings.purchase_prefix, id),
        };

        if draft.lines.is_empty() {
            return Err(ValidationError::Required {
                field: "lines".to_string(),
            }
            .into());
        }

        let invoice_products = draft.product_ids();
        let mut lines = Vec::with_capacity(draft.lines.len());

        for (index, line) in draft.lines.iter().enumerate() {
            let product = self.active_product(line.product_id)?;
            validate_quantity("quantity", line.quantity)?;
            validate_rate("rate", line.rate)?;
            validate_batch_code(&line.batch_code)?;

            if line.expiry_date <= draft.date {
                return Err(CoreError::InvalidDate {
                    date: line.expiry_date,
                    reason: format!("batch {} expires on or before the purchase date", line.batch_code.trim()),
                });
            }

            if line.is_stale() {
                return Err(CoreError::StaleSchemeBenefit { line: index });
            }

            let benefit = match line.scheme {
                Some(selection) => {
                    let scheme = find_by_id(&self.schemes, selection.scheme_id)
                        .ok_or_else(|| CoreError::not_found("scheme", selection.scheme_id))?;
                    let scheme_line = draft
                        .scheme_line(index, &invoice_products)
                        .ok_or_else(|| CoreError::not_found("purchase line", index as i64))?;
                    let benefit = evaluate(scheme, &scheme_line).map_err(|reason| CoreError::SchemeNotApplicable {
                        scheme_id: scheme.id,
                        reason,
                    })?;
                    // The operator accepted `selection.benefit`; commit nothing else.
                    if benefit != selection.benefit {
                        return Err(CoreError::StaleSchemeBenefit { line: index });
                    }
                    Some(benefit)
                }
                None => None,
            };

            let brand = if line.brand.trim().is_empty() {
                product.name.clone()
            } else {
                validate_name("brand", &line.brand)?;
                line.brand.trim().to_string()
            };

            let discount = benefit.map_or(Money::zero(), |b| b.discount_amount);
            lines.push(PurchaseLine {
                product_id: line.product_id,
                brand,
                quantity: line.quantity,
                free_quantity: benefit.map_or(0, |b| b.free_quantity),
                batch_code: line.batch_code.trim().to_string(),
                expiry_date: line.expiry_date,
                rate: line.rate,
                scheme_id: benefit.map(|b| b.scheme_id),
                discount,
                effective_rate: benefit.map_or(line.rate, |b| b.effective_rate),
                amount: line.rate * line.quantity - discount,
            });
        }

        let subtotal: Money = lines.iter().map(|l| l.amount).sum();
        let tax: Money = lines.iter().map(|l| self.line_tax(l.product_id, l.amount)).sum();
        let total = subtotal + tax;

        credit::check_paid_at_sale(draft.paid_amount, total)?;

        Ok(Purchase {
            id,
            supplier_id: draft.supplier_id,
            invoice_number: invoice,
            date: draft.date,
            lines,
            subtotal,
            tax,
            total,
            payment_status: PurchasePaymentStatus::from_amounts(draft.paid_amount, total),
            paid_amount: draft.paid_amount,
        })
    }

    /// Records a supplier invoice and receives its stock.
    pub fn record_purchase(&mut self, draft: &PurchaseDraft, settings: &LedgerSettings) -> CoreResult<PurchaseReceipt> {
        let id = next_id(&self.purchases);
        let purchase = self.build_purchase(id, draft, settings)?;

        let batches = inventory::receive_purchase(&mut self.batches, &purchase);
        self.purchases.push(purchase.clone());

        Ok(PurchaseReceipt { purchase, batches })
    }

    /// Replaces a saved purchase, moving stock by the net difference.
    pub fn revise_purchase(
        &mut self,
        purchase_id: i64,
        draft: &PurchaseDraft,
        settings: &LedgerSettings,
    ) -> CoreResult<PurchaseReceipt> {
        let index = self
            .purchases
            .iter()
            .position(|p| p.id == purchase_id)
            .ok_or_else(|| CoreError::not_found("purchase", purchase_id))?;

        let revised = self.build_purchase(purchase_id, draft, settings)?;
        let batches = inventory::revise_purchase(&mut self.batches, &self.purchases[index], &revised)?;
        self.purchases[index] = revised.clone();

        Ok(PurchaseReceipt {
            purchase: revised,
            batches,
        })
    }

    // -------------------------------------------------------------------------
    // Sales
    // -------------------------------------------------------------------------

    /// Commits a sale: stock leaves its batches and the uncollected amount
    /// is added to the customer's outstanding.
    pub fn record_sale(&mut self, draft: &SaleDraft, settings: &LedgerSettings) -> CoreResult<SaleReceipt> {
        let customer_idx = self.customer_index(draft.customer_id)?;
        if !self.customers[customer_idx].is_active {
            return Err(CoreError::Inactive {
                entity: "customer",
                id: draft.customer_id,
            });
        }

        if draft.lines.is_empty() {
            return Err(ValidationError::Required {
                field: "lines".to_string(),
            }
            .into());
        }

        let mut lines = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            self.active_product(line.product_id)?;
            validate_quantity("quantity", line.quantity)?;
            validate_rate("rate", line.rate)?;
            let batch = select_batch(&self.batches, line.product_id, line.batch_id, line.quantity)?;

            lines.push(SaleLine {
                product_id: line.product_id,
                batch_id: batch.id,
                batch_code: batch.batch_code.clone(),
                quantity: line.quantity,
                rate: line.rate,
                amount: line.rate * line.quantity,
            });
        }

        let subtotal: Money = lines.iter().map(|l| l.amount).sum();
        let tax: Money = lines.iter().map(|l| self.line_tax(l.product_id, l.amount)).sum();
        let total = subtotal + tax;

        credit::check_paid_at_sale(draft.paid_amount, total)?;
        credit::check_credit(&self.customers[customer_idx], total)?;

        // First mutation. Rejects (without touching stock) when lines on the
        // same batch jointly exceed it.
        let stock = inventory::consume_sale(&mut self.batches, &lines)?;

        let id = next_id(&self.sales);
        let sale = Sale {
            id,
            customer_id: draft.customer_id,
            invoice_number: invoice_number(&settings.sale_prefix, id),
            date: draft.date,
            lines,
            subtotal,
            tax,
            total,
            status: SaleStatus::from_amounts(draft.paid_amount, total),
            paid_amount: draft.paid_amount,
            cancelled: false,
        };

        let customer = &mut self.customers[customer_idx];
        credit::record_sale(customer, &sale);
        let outstanding = customer.outstanding;
        self.sales.push(sale.clone());

        Ok(SaleReceipt {
            sale,
            stock,
            outstanding,
        })
    }

    /// Cancels a sale: its stock returns to the batches and its unpaid
    /// balance leaves the customer's outstanding.
    pub fn cancel_sale(&mut self, sale_id: i64) -> CoreResult<CancellationReceipt> {
        let sale_idx = self
            .sales
            .iter()
            .position(|s| s.id == sale_id)
            .ok_or_else(|| CoreError::not_found("sale", sale_id))?;
        let customer_idx = self.customer_index(self.sales[sale_idx].customer_id)?;

        let sale = &mut self.sales[sale_idx];
        let released = credit::cancel_sale(&mut self.customers[customer_idx], sale)?;
        let stock = inventory::restore_sale(&mut self.batches, &sale.lines);

        Ok(CancellationReceipt {
            sale_id,
            released,
            stock,
        })
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    pub fn record_payment(&mut self, draft: &PaymentDraft) -> CoreResult<PaymentReceipt> {
        let customer_idx = self.customer_index(draft.customer_id)?;
        let plan = credit::plan_payment(&self.customers[customer_idx], &self.sales, draft.amount, draft.sale_id)?;

        let customer = &mut self.customers[customer_idx];
        let sale_status = credit::apply_payment(customer, &mut self.sales, &plan);
        let outstanding = customer.outstanding;

        let payment = Payment {
            id: next_id(&self.payments),
            customer_id: draft.customer_id,
            amount: draft.amount,
            date: draft.date,
            mode: draft.mode,
            reference: draft
                .reference
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            applied_to: plan.sale_id.into_iter().collect(),
        };
        self.payments.push(payment.clone());

        Ok(PaymentReceipt {
            payment,
            sale_status,
            outstanding,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
