//! Optional JSON config file.
//!
//! ```json
//! {
//!   "institution": { "org": "Test Bank", "fi_id": "123456789",
//!                    "account_id": "000111222", "account_type": "CHECKING" },
//!   "ofx_version": "220",
//!   "max_invalid_ratio": 0.1,
//!   "encoding": "utf-8"
//! }
//! ```
//!
//! Every key is optional; command-line flags override the file.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use file2ofx_core::ofx::AccountType;
use serde::Deserialize;

/// Contents of a config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Institution defaults.
    pub institution: InstitutionSection,
    /// OFX version string.
    pub ofx_version: Option<String>,
    /// Skipped-row ceiling.
    pub max_invalid_ratio: Option<f64>,
    /// Encoding label.
    pub encoding: Option<String>,
}

/// `institution` table; fields left out fall back to the flags or defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstitutionSection {
    pub org: Option<String>,
    pub fi_id: Option<String>,
    pub account_id: Option<String>,
    pub account_type: Option<AccountType>,
    pub currency: Option<String>,
}

impl FileConfig {
    /// Loads `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config: FileConfig = serde_json::from_str(
            r#"{
                "institution": {
                    "org": "Test Bank",
                    "fi_id": "123",
                    "account_id": "456",
                    "account_type": "savings",
                    "currency": "EUR"
                },
                "ofx_version": "220",
                "max_invalid_ratio": 0.1,
                "encoding": "latin1"
            }"#,
        )
        .unwrap();

        assert_eq!(config.institution.account_type, Some(AccountType::Savings));
        assert_eq!(config.institution.currency.as_deref(), Some("EUR"));
        assert_eq!(config.ofx_version.as_deref(), Some("220"));
        assert_eq!(config.max_invalid_ratio, Some(0.1));
    }

    #[test]
    fn test_empty_config() {
        let config: FileConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(serde_json::from_str::<FileConfig>(r#"{"ofx_versoin": "220"}"#).is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = FileConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"));
    }
}
