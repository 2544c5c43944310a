//! # MediStock Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MEDISTOCK_DB_PATH=/srv/medistock/ledger.db                         │
//! │     MEDISTOCK_MARGIN_A=28.5                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/medistock/medistock.toml (Linux)                         │
//! │     ~/Library/Application Support/com.medistock.medistock/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     medistock.db, margins A 30% / B 40% / C 50%, INV / PUR prefixes    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "medistock.db"
//! max_connections = 5
//!
//! [pricing]
//! tier_a_margin = 30.0
//! tier_b_margin = 40.0
//! tier_c_margin = 50.0
//!
//! [invoicing]
//! sale_prefix = "INV"
//! purchase_prefix = "PUR"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use medistock_core::margin::MarginDefaults;
use medistock_core::validation::validate_margin;
use medistock_core::{LedgerSettings, Percent};

use crate::error::{ConfigError, ConfigResult};
use crate::pool::DbConfig;

// =============================================================================
// Database Section
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Relative paths resolve against the working directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("medistock.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Pricing Section
// =============================================================================

/// Tier default margins in percent, used when no margin rule matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_tier_a")]
    pub tier_a_margin: f64,

    #[serde(default = "default_tier_b")]
    pub tier_b_margin: f64,

    #[serde(default = "default_tier_c")]
    pub tier_c_margin: f64,
}

fn default_tier_a() -> f64 {
    30.0
}

fn default_tier_b() -> f64 {
    40.0
}

fn default_tier_c() -> f64 {
    50.0
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            tier_a_margin: default_tier_a(),
            tier_b_margin: default_tier_b(),
            tier_c_margin: default_tier_c(),
        }
    }
}

impl PricingConfig {
    pub fn margin_defaults(&self) -> MarginDefaults {
        MarginDefaults {
            tier_a: Percent::from_percentage(self.tier_a_margin),
            tier_b: Percent::from_percentage(self.tier_b_margin),
            tier_c: Percent::from_percentage(self.tier_c_margin),
        }
    }
}

// =============================================================================
// Invoicing Section
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicingConfig {
    #[serde(default = "default_sale_prefix")]
    pub sale_prefix: String,

    #[serde(default = "default_purchase_prefix")]
    pub purchase_prefix: String,
}

fn default_sale_prefix() -> String {
    medistock_core::lookup::SALE_INVOICE_PREFIX.to_string()
}

fn default_purchase_prefix() -> String {
    medistock_core::lookup::PURCHASE_INVOICE_PREFIX.to_string()
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        InvoicingConfig {
            sale_prefix: default_sale_prefix(),
            purchase_prefix: default_purchase_prefix(),
        }
    }
}

// =============================================================================
// Root Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediStockConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub invoicing: InvoicingConfig,
}

impl MediStockConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (medistock.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        for (name, margin) in [
            ("pricing.tier_a_margin", self.pricing.tier_a_margin),
            ("pricing.tier_b_margin", self.pricing.tier_b_margin),
            ("pricing.tier_c_margin", self.pricing.tier_c_margin),
        ] {
            if !margin.is_finite() || margin < 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be a non-negative number, got {}", name, margin)));
            }
            validate_margin(Percent::from_percentage(margin))
                .map_err(|e| ConfigError::Invalid(format!("{}: {}", name, e)))?;
        }

        for (name, prefix) in [
            ("invoicing.sale_prefix", &self.invoicing.sale_prefix),
            ("invoicing.purchase_prefix", &self.invoicing.purchase_prefix),
        ] {
            if prefix.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", name)));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MEDISTOCK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        for (var, slot) in [
            ("MEDISTOCK_MARGIN_A", &mut self.pricing.tier_a_margin),
            ("MEDISTOCK_MARGIN_B", &mut self.pricing.tier_b_margin),
            ("MEDISTOCK_MARGIN_C", &mut self.pricing.tier_c_margin),
        ] {
            if let Ok(value) = std::env::var(var) {
                match value.parse::<f64>() {
                    Ok(margin) => {
                        debug!(var, margin, "Overriding tier margin from environment");
                        *slot = margin;
                    }
                    Err(_) => warn!(var, value = %value, "Ignoring non-numeric margin in environment"),
                }
            }
        }

        if let Ok(prefix) = std::env::var("MEDISTOCK_INVOICE_PREFIX") {
            debug!(prefix = %prefix, "Overriding sale invoice prefix from environment");
            self.invoicing.sale_prefix = prefix;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "medistock", "medistock")
            .map(|dirs| dirs.config_dir().join("medistock.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Ledger tunables for [`crate::service::LedgerService`].
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            margins: self.pricing.margin_defaults(),
            sale_prefix: self.invoicing.sale_prefix.trim().to_string(),
            purchase_prefix: self.invoicing.purchase_prefix.trim().to_string(),
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }
}
