//! # Ledger Service
//!
//! Runs medistock-core transactions against a [`LedgerStore`].
//!
//! ## Transaction Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    LedgerService::record_sale                           │
//! │                                                                         │
//! │  writer lock ──► load every collection ──► Books                       │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                               Books::record_sale (pure, core)          │
//! │                                              │                          │
//! │               Err(CoreError) ◄───────────────┤                          │
//! │               nothing written                │ Ok(receipt)              │
//! │                                              ▼                          │
//! │                 store.write([batches, sales, customers]) in one step   │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                   info!(sale committed)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transactions are serialized by the writer lock; queries read without it.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use medistock_core::allocation::BatchCandidate;
use medistock_core::credit::{self, OutstandingAudit};
use medistock_core::drafts::{PaymentDraft, PurchaseDraft, SaleDraft};
use medistock_core::inventory::{self, ExpirySummary, LowStock, StockAdjustment};
use medistock_core::ledger::{CancellationReceipt, PaymentReceipt, PurchaseReceipt, SaleReceipt};
use medistock_core::lookup;
use medistock_core::pricing::PriceSuggestion;
use medistock_core::scheme::{scheme_options, Inapplicability, Scheme, SchemeBenefit, SchemeLine};
use medistock_core::validation::{
    validate_gst_rate, validate_margin, validate_name, validate_non_negative_amount,
    validate_non_negative_quantity,
};
use medistock_core::{
    Books, Company, CoreError, Customer, InventoryBatch, LedgerSettings, MarginRule, Product, Record,
    ValidationError,
};

use crate::error::{DbResult, ServiceResult};
use crate::store::{encode, Collection, LedgerStore};

/// A scheme offered for a purchase line, with its outcome on that line.
pub type SchemeChoice = (Scheme, Result<SchemeBenefit, Inapplicability>);

pub struct LedgerService<S> {
    store: S,
    settings: LedgerSettings,
    writer: Mutex<()>,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S, settings: LedgerSettings) -> Self {
        LedgerService {
            store,
            settings,
            writer: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // =========================================================================
    // Load / Commit
    // =========================================================================

    /// Snapshot of every collection.
    pub async fn load_books(&self) -> DbResult<Books> {
        let books = Books {
            companies: self.store.load(Collection::Companies).await?,
            products: self.store.load(Collection::Products).await?,
            customers: self.store.load(Collection::Customers).await?,
            margin_rules: self.store.load(Collection::MarginRules).await?,
            schemes: self.store.load(Collection::Schemes).await?,
            batches: self.store.load(Collection::Batches).await?,
            purchases: self.store.load(Collection::Purchases).await?,
            sales: self.store.load(Collection::Sales).await?,
            payments: self.store.load(Collection::Payments).await?,
        };
        debug!(
            products = books.products.len(),
            batches = books.batches.len(),
            sales = books.sales.len(),
            "Books loaded"
        );
        Ok(books)
    }

    /// Writes `touched` collections from `books` in one atomic store write.
    async fn commit(&self, books: &Books, touched: &[Collection]) -> DbResult<()> {
        let entries = touched
            .iter()
            .map(|&collection| encode_collection(books, collection))
            .collect::<DbResult<Vec<_>>>()?;
        self.store.write(entries).await
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Records a supplier invoice and receives its stock.
    pub async fn record_purchase(&self, draft: &PurchaseDraft) -> ServiceResult<PurchaseReceipt> {
        let _guard = self.writer.lock().await;
        let mut books = self.load_books().await?;

        let receipt = books.record_purchase(draft, &self.settings)?;
        self.commit(&books, &[Collection::Batches, Collection::Purchases]).await?;

        info!(
            purchase_id = receipt.purchase.id,
            invoice = %receipt.purchase.invoice_number,
            total = %receipt.purchase.total,
            batches = receipt.batches.len(),
            "Purchase committed"
        );
        Ok(receipt)
    }

    /// Replaces a saved purchase, moving stock by the difference.
    pub async fn revise_purchase(&self, purchase_id: i64, draft: &PurchaseDraft) -> ServiceResult<PurchaseReceipt> {
        let _guard = self.writer.lock().await;
        let mut books = self.load_books().await?;

        let receipt = books.revise_purchase(purchase_id, draft, &self.settings)?;
        self.commit(&books, &[Collection::Batches, Collection::Purchases]).await?;

        info!(
            purchase_id,
            total = %receipt.purchase.total,
            "Purchase revised"
        );
        Ok(receipt)
    }

    /// Commits a sale against the chosen batches.
    pub async fn record_sale(&self, draft: &SaleDraft) -> ServiceResult<SaleReceipt> {
        let _guard = self.writer.lock().await;
        let mut books = self.load_books().await?;

        let receipt = books.record_sale(draft, &self.settings)?;
        self.commit(&books, &[Collection::Batches, Collection::Sales, Collection::Customers])
            .await?;

        log_missing_batches(receipt.sale.id, &receipt.stock);
        info!(
            sale_id = receipt.sale.id,
            invoice = %receipt.sale.invoice_number,
            customer_id = receipt.sale.customer_id,
            total = %receipt.sale.total,
            outstanding = %receipt.outstanding,
            "Sale committed"
        );
        Ok(receipt)
    }

    pub async fn cancel_sale(&self, sale_id: i64) -> ServiceResult<CancellationReceipt> {
        let _guard = self.writer.lock().await;
        let mut books = self.load_books().await?;

        let receipt = books.cancel_sale(sale_id)?;
        self.commit(&books, &[Collection::Batches, Collection::Sales, Collection::Customers])
            .await?;

        log_missing_batches(sale_id, &receipt.stock);
        info!(
            sale_id,
            released = %receipt.released,
            units = receipt.stock.units,
            "Sale cancelled"
        );
        Ok(receipt)
    }

    /// Records money received from a customer.
    pub async fn record_payment(&self, draft: &PaymentDraft) -> ServiceResult<PaymentReceipt> {
        let _guard = self.writer.lock().await;
        let mut books = self.load_books().await?;

        let receipt = books.record_payment(draft)?;
        self.commit(&books, &[Collection::Customers, Collection::Sales, Collection::Payments])
            .await?;

        info!(
            payment_id = receipt.payment.id,
            customer_id = receipt.payment.customer_id,
            amount = %receipt.payment.amount,
            on_account = receipt.payment.applied_to.is_empty(),
            outstanding = %receipt.outstanding,
            "Payment committed"
        );
        Ok(receipt)
    }

    // =========================================================================
    // Masters
    // =========================================================================

    /// Appends a record under the next free id.
    async fn append<R, F>(&self, collection: Collection, build: F) -> DbResult<R>
    where
        R: Record + Clone + Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce(i64) -> R,
    {
        let id = self.store.next_id(collection).await?;
        let mut records: Vec<R> = self.store.load(collection).await?;
        let record = build(id);
        records.push(record.clone());
        self.store.save(collection, &records).await?;
        debug!(%collection, id = record.id(), "Record added");
        Ok(record)
    }

    /// Adds a supplier. The given id is ignored.
    pub async fn add_company(&self, company: Company) -> ServiceResult<Company> {
        validate_name("name", &company.name).map_err(CoreError::from)?;

        let _guard = self.writer.lock().await;
        let company = self
            .append(Collection::Companies, |id| Company {
                id,
                name: company.name.trim().to_string(),
                ..company
            })
            .await?;
        Ok(company)
    }

    /// Adds a product. The given id is ignored.
    pub async fn add_product(&self, product: Product) -> ServiceResult<Product> {
        validate_name("name", &product.name).map_err(CoreError::from)?;
        validate_name("generic_name", &product.generic_name).map_err(CoreError::from)?;
        validate_gst_rate(product.gst_rate()).map_err(CoreError::from)?;
        validate_non_negative_quantity("min_stock", product.min_stock).map_err(CoreError::from)?;

        let _guard = self.writer.lock().await;
        let product = self
            .append(Collection::Products, |id| Product {
                id,
                name: product.name.trim().to_string(),
                ..product
            })
            .await?;
        Ok(product)
    }

    /// Adds a customer. `outstanding` is taken as the opening balance.
    pub async fn add_customer(&self, customer: Customer) -> ServiceResult<Customer> {
        validate_name("name", &customer.name).map_err(CoreError::from)?;
        validate_non_negative_amount("credit_limit", customer.credit_limit).map_err(CoreError::from)?;
        validate_non_negative_amount("outstanding", customer.outstanding).map_err(CoreError::from)?;

        let _guard = self.writer.lock().await;
        let customer = self
            .append(Collection::Customers, |id| Customer {
                id,
                name: customer.name.trim().to_string(),
                ..customer
            })
            .await?;
        Ok(customer)
    }

    /// Adds a margin override. One rule per (customer type, product).
    pub async fn add_margin_rule(&self, rule: MarginRule) -> ServiceResult<MarginRule> {
        validate_margin(rule.margin).map_err(CoreError::from)?;
        if let Some(floor) = rule.min_price {
            validate_non_negative_amount("min_price", floor).map_err(CoreError::from)?;
        }

        let _guard = self.writer.lock().await;
        let products: Vec<Product> = self.store.load(Collection::Products).await?;
        if !products.iter().any(|p| p.id == rule.product_id) {
            return Err(CoreError::not_found("product", rule.product_id).into());
        }
        let rules: Vec<MarginRule> = self.store.load(Collection::MarginRules).await?;
        if rules
            .iter()
            .any(|r| r.customer_type == rule.customer_type && r.product_id == rule.product_id)
        {
            return Err(CoreError::from(ValidationError::Duplicate {
                field: "margin_rule".to_string(),
                value: format!("{}/{}", rule.customer_type, rule.product_id),
            })
            .into());
        }

        let rule = self
            .append(Collection::MarginRules, |id| MarginRule { id, ..rule })
            .await?;
        Ok(rule)
    }

    /// Adds a supplier scheme.
    pub async fn add_scheme(&self, scheme: Scheme) -> ServiceResult<Scheme> {
        validate_name("name", &scheme.name).map_err(CoreError::from)?;
        if scheme.valid_to < scheme.valid_from {
            return Err(CoreError::InvalidDate {
                date: scheme.valid_to,
                reason: format!("scheme ends before it starts on {}", scheme.valid_from),
            }
            .into());
        }

        let _guard = self.writer.lock().await;
        let companies: Vec<Company> = self.store.load(Collection::Companies).await?;
        if !companies.iter().any(|c| c.id == scheme.supplier_id) {
            return Err(CoreError::not_found("company", scheme.supplier_id).into());
        }

        let scheme = self
            .append(Collection::Schemes, |id| Scheme { id, ..scheme })
            .await?;
        Ok(scheme)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// FEFO batch list for a sale line.
    pub async fn batch_candidates(
        &self,
        product_id: i64,
        customer_id: Option<i64>,
        today: NaiveDate,
    ) -> ServiceResult<Vec<BatchCandidate>> {
        let books = self.load_books().await?;
        Ok(books.batch_candidates(product_id, customer_id, today, self.settings.margins)?)
    }

    pub async fn suggest_rate(&self, customer_id: i64, batch_id: i64) -> ServiceResult<PriceSuggestion> {
        let books = self.load_books().await?;
        Ok(books.suggest_rate(customer_id, batch_id, self.settings.margins)?)
    }

    /// Schemes worth offering on line `index` of a purchase draft.
    pub async fn scheme_choices(&self, draft: &PurchaseDraft, index: usize) -> ServiceResult<Vec<SchemeChoice>> {
        let line = draft
            .lines
            .get(index)
            .ok_or_else(|| CoreError::not_found("purchase line", index as i64))?;
        let schemes: Vec<Scheme> = self.store.load(Collection::Schemes).await?;
        let invoice_products = draft.product_ids();
        let scheme_line = SchemeLine {
            supplier_id: draft.supplier_id,
            product_id: line.product_id,
            quantity: line.quantity,
            rate: line.rate,
            date: draft.date,
            invoice_products: &invoice_products,
        };
        Ok(scheme_options(&schemes, &scheme_line)
            .into_iter()
            .map(|option| (option.scheme.clone(), option.outcome))
            .collect())
    }

    pub async fn active_batches(&self) -> DbResult<Vec<InventoryBatch>> {
        let batches: Vec<InventoryBatch> = self.store.load(Collection::Batches).await?;
        Ok(inventory::active_batches(&batches))
    }

    pub async fn stock_by_product(&self) -> DbResult<std::collections::BTreeMap<i64, i64>> {
        let batches: Vec<InventoryBatch> = self.store.load(Collection::Batches).await?;
        Ok(inventory::stock_by_product(&batches))
    }

    pub async fn low_stock(&self) -> DbResult<Vec<LowStock>> {
        let products: Vec<Product> = self.store.load(Collection::Products).await?;
        let batches: Vec<InventoryBatch> = self.store.load(Collection::Batches).await?;
        Ok(inventory::low_stock(&products, &batches))
    }

    pub async fn expiry_summary(&self, today: NaiveDate) -> DbResult<ExpirySummary> {
        let batches: Vec<InventoryBatch> = self.store.load(Collection::Batches).await?;
        Ok(inventory::expiry_summary(&batches, today))
    }

    /// Customers whose stored outstanding disagrees with their invoices.
    pub async fn outstanding_drift(&self) -> DbResult<Vec<OutstandingAudit>> {
        let books = self.load_books().await?;
        let drifted: Vec<OutstandingAudit> = credit::audit_outstanding(&books.customers, &books.sales)
            .into_iter()
            .filter(|audit| !audit.is_consistent())
            .collect();
        if !drifted.is_empty() {
            warn!(customers = drifted.len(), "Outstanding balances drifted from invoices");
        }
        Ok(drifted)
    }

    pub async fn company_name(&self, id: i64) -> DbResult<String> {
        let companies: Vec<Company> = self.store.load(Collection::Companies).await?;
        Ok(lookup::company_name(&companies, id).to_string())
    }

    pub async fn product_name(&self, id: i64) -> DbResult<String> {
        let products: Vec<Product> = self.store.load(Collection::Products).await?;
        Ok(lookup::product_name(&products, id).to_string())
    }

    pub async fn customer_name(&self, id: i64) -> DbResult<String> {
        let customers: Vec<Customer> = self.store.load(Collection::Customers).await?;
        Ok(lookup::customer_name(&customers, id).to_string())
    }
}

fn encode_collection(books: &Books, collection: Collection) -> DbResult<(Collection, String)> {
    match collection {
        Collection::Companies => encode(collection, &books.companies),
        Collection::Products => encode(collection, &books.products),
        Collection::Customers => encode(collection, &books.customers),
        Collection::MarginRules => encode(collection, &books.margin_rules),
        Collection::Schemes => encode(collection, &books.schemes),
        Collection::Batches => encode(collection, &books.batches),
        Collection::Purchases => encode(collection, &books.purchases),
        Collection::Sales => encode(collection, &books.sales),
        Collection::Payments => encode(collection, &books.payments),
    }
}

fn log_missing_batches(sale_id: i64, stock: &StockAdjustment) {
    for batch_id in &stock.missing_batches {
        warn!(sale_id, batch_id, "Sale line references a missing batch, stock not adjusted");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
