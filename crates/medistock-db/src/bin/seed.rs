//! # Seed Data Generator
//!
//! Populates a ledger database with demo masters and runs one purchase, one
//! sale and one payment through the ledger service.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database (medistock.toml / MEDISTOCK_DB_PATH)
//! cargo run -p medistock-db --bin seed
//!
//! # Specify database path
//! cargo run -p medistock-db --bin seed -- --db ./data/medistock_dev.db
//!
//! # Use an explicit config file
//! cargo run -p medistock-db --bin seed -- --config ./medistock.toml
//! ```

use chrono::{Datelike, Duration, Local, NaiveDate};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use medistock_core::drafts::{PaymentDraft, PurchaseDraft, PurchaseLineDraft, SaleDraft};
use medistock_core::scheme::{ProductScope, QuantitySlab, Scheme, SchemeKind, SchemeStatus};
use medistock_core::{
    Company, Customer, CustomerType, MarginRule, Money, PaymentMode, PaymentTerms, Percent, Product,
};
use medistock_db::{Collection, Database, LedgerService, LedgerStore, MediStockConfig};

/// (supplier, [(generic, brand, gst %, min stock, cost in paise)])
const CATALOGUE: &[(&str, &[(&str, &str, u32, i64, i64)])] = &[
    (
        "Cipla",
        &[
            ("Paracetamol", "Calpol 500", 12, 200, 9090),
            ("Azithromycin", "Azee 500", 12, 50, 7150),
            ("Montelukast", "Montair LC", 12, 80, 12_400),
        ],
    ),
    (
        "Sun Pharma",
        &[
            ("Pantoprazole", "Pantocid 40", 12, 150, 8800),
            ("Metformin", "Glycomet 500", 5, 300, 2150),
        ],
    ),
    (
        "Mankind",
        &[
            ("Cetirizine", "Cetzine 10", 12, 100, 1875),
            ("ORS", "Electral", 0, 250, 2000),
        ],
    ),
];

/// (name, tier, credit limit in rupees, opening balance in rupees)
const CUSTOMERS: &[(&str, CustomerType, i64, i64)] = &[
    ("City Pharmacy", CustomerType::A, 50_000, 0),
    ("Apollo Medicals", CustomerType::B, 25_000, 1_200),
    ("Lakshmi Drug House", CustomerType::C, 10_000, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,medistock=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("MediStock Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("  -c, --config <PATH>  Config file path (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = MediStockConfig::load_or_default(config_path);
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 MediStock Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let service = LedgerService::new(db.ledger(), config.ledger_settings());

    let existing: Vec<Product> = service.store().load(Collection::Products).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let today = Local::now().date_naive();

    // -------------------------------------------------------------------------
    // Masters
    // -------------------------------------------------------------------------
    println!();
    println!("Adding masters...");

    let mut stock_plan: Vec<(i64, i64, i64)> = Vec::new(); // (supplier, product, cost)
    for (supplier_name, products) in CATALOGUE {
        let supplier = service
            .add_company(Company {
                id: 0,
                name: supplier_name.to_string(),
                contact: None,
                payment_terms: PaymentTerms::Credit { days: 30 },
                is_active: true,
            })
            .await?;

        for (generic, brand, gst_pct, min_stock, cost) in products.iter() {
            let product = service
                .add_product(Product {
                    id: 0,
                    generic_name: generic.to_string(),
                    name: brand.to_string(),
                    hsn_code: "3004".to_string(),
                    gst_rate_bps: gst_pct * 100,
                    packing: "10x10".to_string(),
                    min_stock: *min_stock,
                    is_active: true,
                })
                .await?;
            stock_plan.push((supplier.id, product.id, *cost));
        }
    }
    println!("  {} suppliers, {} products", CATALOGUE.len(), stock_plan.len());

    for (name, tier, limit, opening) in CUSTOMERS {
        service
            .add_customer(Customer {
                id: 0,
                name: name.to_string(),
                customer_type: *tier,
                phone: None,
                credit_limit: Money::from_rupees(*limit),
                outstanding: Money::from_rupees(*opening),
                credit_days: 30,
                is_active: true,
            })
            .await?;
    }
    println!("  {} customers", CUSTOMERS.len());

    // Tighter margin with a floor for the fastest mover at tier A.
    service
        .add_margin_rule(MarginRule {
            id: 0,
            customer_type: CustomerType::A,
            product_id: 1,
            margin: Percent::whole(20),
            min_price: Some(Money::from_paise(11_000)),
        })
        .await?;

    let year_end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today + Duration::days(90));
    let free_goods = service
        .add_scheme(Scheme {
            id: 0,
            supplier_id: 1,
            name: "Cipla 100+10".to_string(),
            valid_from: today - Duration::days(30),
            valid_to: year_end.max(today + Duration::days(30)),
            scope: ProductScope::AllProducts,
            status: SchemeStatus::Active,
            kind: SchemeKind::FreeQuantity {
                buy_qty: 100,
                free_qty: 10,
            },
        })
        .await?;
    service
        .add_scheme(Scheme {
            id: 0,
            supplier_id: 2,
            name: "Sun volume slabs".to_string(),
            valid_from: today - Duration::days(30),
            valid_to: today + Duration::days(60),
            scope: ProductScope::AllProducts,
            status: SchemeStatus::Active,
            kind: SchemeKind::QuantitySlab {
                slabs: vec![
                    QuantitySlab {
                        min: 50,
                        max: Some(199),
                        discount: Percent::whole(3),
                    },
                    QuantitySlab {
                        min: 200,
                        max: None,
                        discount: Percent::whole(5),
                    },
                ],
            },
        })
        .await?;
    println!("  1 margin rule, 2 schemes");

    // -------------------------------------------------------------------------
    // Purchase
    // -------------------------------------------------------------------------
    println!();
    println!("Recording purchase...");

    let mut draft = PurchaseDraft::new(1, today);
    draft.invoice_number = Some("CIP-24001".to_string());
    for (index, (_, product_id, cost)) in stock_plan.iter().filter(|(supplier, _, _)| *supplier == 1).enumerate() {
        draft.lines.push(PurchaseLineDraft::new(
            *product_id,
            "",
            100 + 50 * index as i64,
            format!("CP{}{:02}", today.format("%y"), index + 1),
            today + Duration::days(540 - 120 * index as i64),
            Money::from_paise(*cost),
        ));
    }
    if let Some(Err(reason)) = draft.select_scheme(0, &free_goods) {
        println!("  scheme not applied: {}", reason);
    }
    let purchase = service.record_purchase(&draft).await?;
    println!(
        "  {} total {} ({} batches)",
        purchase.purchase.invoice_number,
        purchase.purchase.total,
        purchase.batches.len()
    );

    // -------------------------------------------------------------------------
    // Sale
    // -------------------------------------------------------------------------
    println!();
    println!("Recording sale...");

    let candidates = service.batch_candidates(1, Some(1), today).await?;
    let Some(first) = candidates.first() else {
        println!("⚠ No stock for product 1, skipping sale");
        return Ok(());
    };
    let rate = first
        .suggested
        .map_or(first.batch.unit_cost, |s| s.quote.price);
    println!(
        "  FEFO batch {} expires in {} days, suggested {}",
        first.batch.batch_code, first.days_to_expiry, rate
    );

    let sale = SaleDraft::new(1, today)
        .line(1, first.batch.id, 20, rate)
        .paid(Money::from_rupees(500));
    let sale = service.record_sale(&sale).await?;
    println!(
        "  {} total {} ({:?}), outstanding {}",
        sale.sale.invoice_number, sale.sale.total, sale.sale.status, sale.outstanding
    );

    // -------------------------------------------------------------------------
    // Payment
    // -------------------------------------------------------------------------
    println!();
    println!("Recording payment...");

    let payment = service
        .record_payment(&PaymentDraft {
            customer_id: 1,
            amount: Money::from_rupees(1_000),
            date: today,
            mode: PaymentMode::Upi,
            reference: Some("UPI-DEMO-1".to_string()),
            sale_id: Some(sale.sale.id),
        })
        .await?;
    println!(
        "  {} received, invoice {:?}, outstanding {}",
        payment.payment.amount, payment.sale_status, payment.outstanding
    );

    // -------------------------------------------------------------------------
    // Summary
    // -------------------------------------------------------------------------
    println!();
    let summary = service.expiry_summary(today).await?;
    println!("Expiry bands: {:?}", summary);
    for low in service.low_stock().await? {
        println!("  Low stock: {} ({} of {})", low.name, low.on_hand, low.min_stock);
    }

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
