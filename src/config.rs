//! Invoicer configuration loaded from `invoicer.toml`.
//!
//! Every key is optional; missing values fall back to defaults. The
//! `INVOICER_STORE` environment variable overrides the store location.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::InvoicerError;

pub const CONFIG_FILE: &str = "invoicer.toml";
pub const STORE_ENV: &str = "INVOICER_STORE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Spreadsheet template with `{{variable}}` placeholders.
    pub template_path: PathBuf,
    /// Where generated invoices are written.
    pub output_dir: PathBuf,
    pub store_path: PathBuf,
    pub harvest_url: String,
    /// How many years, the current one included, an invoice may be made for.
    pub max_prev_years: u32,
    /// Up to this day of the month the previous month is recommended.
    pub recommend_cutoff_day: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("template.xlsx"),
            output_dir: PathBuf::from("."),
            store_path: PathBuf::from("invoicer-store.json"),
            harvest_url: crate::harvest::client::API_URL.to_string(),
            max_prev_years: 5,
            recommend_cutoff_day: 15,
        }
    }
}

impl AppConfig {
    /// Loads `invoicer.toml` from the working directory, or defaults.
    pub fn load() -> Result<Self, InvoicerError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, InvoicerError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(store) = lookup(STORE_ENV).filter(|s| !s.is_empty()) {
            self.store_path = PathBuf::from(store);
        }
    }

    fn validate(&self) -> Result<(), InvoicerError> {
        if !(1..=28).contains(&self.recommend_cutoff_day) {
            return Err(InvoicerError::Config(format!(
                "recommend_cutoff_day must be between 1 and 28, got {}",
                self.recommend_cutoff_day
            )));
        }
        if self.max_prev_years == 0 {
            return Err(InvoicerError::Config("max_prev_years must be at least 1".into()));
        }
        if self.harvest_url.trim().is_empty() {
            return Err(InvoicerError::Config("harvest_url must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.template_path, PathBuf::from("template.xlsx"));
        assert_eq!(config.store_path, PathBuf::from("invoicer-store.json"));
        assert_eq!(config.max_prev_years, 5);
        assert_eq!(config.recommend_cutoff_day, 15);
        assert_eq!(config.harvest_url, "https://api.harvestapp.com");
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            template_path = "invoices/template.xlsx"
            max_prev_years = 2
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.template_path, PathBuf::from("invoices/template.xlsx"));
        assert_eq!(config.max_prev_years, 2);
        assert_eq!(config.recommend_cutoff_day, 15);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("invoicer.toml")).unwrap();
        assert_eq!(config.max_prev_years, 5);
    }

    #[test]
    fn env_overrides_store_path() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == STORE_ENV).then(|| "/tmp/other.json".to_string()));
        assert_eq!(config.store_path, PathBuf::from("/tmp/other.json"));

        let mut config = AppConfig::default();
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.store_path, PathBuf::from("invoicer-store.json"));
    }

    #[test]
    fn invalid_cutoff_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invoicer.toml");
        std::fs::write(&path, "recommend_cutoff_day = 40").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, InvoicerError::Config(_)));
    }

    #[test]
    fn zero_years_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invoicer.toml");
        std::fs::write(&path, "max_prev_years = 0").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, InvoicerError::Config(m) if m.contains("max_prev_years")));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invoicer.toml");
        std::fs::write(&path, "max_prev_years = \"many\"").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(InvoicerError::Toml(_))
        ));
    }
}
