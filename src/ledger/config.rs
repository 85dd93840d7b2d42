//! Ledger configuration: defaults, an optional file and `FACTURATION__*`
//! environment overrides, merged by the `config` crate.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::core::FacturationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Currency used when a request names none.
    pub default_currency: String,
    /// Due date offset for recurring invoices without their own terms.
    pub payment_term_days: u32,
    /// Reminder levels, in days after the due date.
    pub relance_days: Vec<u32>,
    pub numbering: NumberingConfig,
    /// Maximum invoices examined per overdue sweep; `None` means all.
    pub overdue_batch: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    pub invoice_prefix: String,
    pub credit_note_prefix: String,
    pub quote_prefix: String,
    pub padding: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_currency: "EUR".to_string(),
            payment_term_days: 30,
            relance_days: vec![7, 15, 30],
            numbering: NumberingConfig::default(),
            overdue_batch: None,
        }
    }
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            invoice_prefix: "FAC-".to_string(),
            credit_note_prefix: "AV-".to_string(),
            quote_prefix: "DEV-".to_string(),
            padding: 4,
        }
    }
}

impl LedgerConfig {
    /// Load from `path` (if given) and the environment.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `FACTURATION__NUMBERING__INVOICE_PREFIX=INV-`.
    pub fn load(path: Option<&Path>) -> Result<Self, FacturationError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("FACTURATION")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("relance_days")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| FacturationError::Config(e.to_string()))?;
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| FacturationError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), FacturationError> {
        if !crate::core::is_known_currency_code(&self.default_currency) {
            return Err(FacturationError::Config(format!(
                "default_currency '{}' is not a known ISO 4217 code",
                self.default_currency
            )));
        }
        if self.relance_days.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FacturationError::Config(
                "relance_days must be strictly increasing".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let c = LedgerConfig::default();
        assert_eq!(c.default_currency, "EUR");
        assert_eq!(c.payment_term_days, 30);
        assert_eq!(c.relance_days, vec![7, 15, 30]);
        assert_eq!(c.numbering.invoice_prefix, "FAC-");
        assert_eq!(c.numbering.padding, 4);
        assert!(c.check().is_ok());
    }

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("facturation-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "payment_term_days = 45\nrelance_days = [10, 20]\n[numbering]\ninvoice_prefix = \"INV-\"").unwrap();
        drop(file);

        let c = LedgerConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(c.payment_term_days, 45);
        assert_eq!(c.relance_days, vec![10, 20]);
        assert_eq!(c.numbering.invoice_prefix, "INV-");
        assert_eq!(c.numbering.credit_note_prefix, "AV-");
        assert_eq!(c.default_currency, "EUR");
    }

    #[test]
    fn unordered_relances_rejected() {
        let c = LedgerConfig {
            relance_days: vec![15, 7],
            ..LedgerConfig::default()
        };
        assert!(matches!(c.check(), Err(FacturationError::Config(_))));
    }

    #[test]
    fn missing_file_is_config_error() {
        let path = std::env::temp_dir().join("facturation-does-not-exist.toml");
        assert!(matches!(
            LedgerConfig::load(Some(&path)),
            Err(FacturationError::Config(_))
        ));
    }
}
