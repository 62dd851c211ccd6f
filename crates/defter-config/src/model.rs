use std::{env, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Overrides the application data directory when set.
pub const HOME_ENV_VAR: &str = "DEFTER_HOME";

/// Stores user preferences and where books live on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    /// ISO code of the currency new books start with.
    pub default_currency: String,
    /// Days ahead of today in which a regular payment counts as due soon.
    #[serde(default = "Config::default_due_soon_days")]
    pub due_soon_days: u32,
    /// Automatic backups kept per book.
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_book: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for books. Defaults to `<app home>/books`.
    pub data_root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for backups. Defaults to `<app home>/backups`.
    pub backup_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "tr-TR".into(),
            default_currency: "TRY".into(),
            due_soon_days: Self::default_due_soon_days(),
            backup_retention: Self::default_backup_retention(),
            last_opened_book: None,
            data_root: None,
            backup_root: None,
        }
    }
}

impl Config {
    pub fn default_due_soon_days() -> u32 {
        7
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        self.data_root
            .clone()
            .unwrap_or_else(|| app_home().join("books"))
    }

    pub fn resolve_backup_root(&self) -> PathBuf {
        self.backup_root
            .clone()
            .unwrap_or_else(|| app_home().join("backups"))
    }

    /// Rejects values the rest of the application cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locale.trim().is_empty() {
            return Err(ConfigError::Invalid("locale is empty".into()));
        }
        let code = self.default_currency.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid(format!(
                "`{}` is not a currency code",
                self.default_currency
            )));
        }
        if self.backup_retention == 0 {
            return Err(ConfigError::Invalid(
                "backup_retention must keep at least one backup".into(),
            ));
        }
        Ok(())
    }
}

/// Application data directory: `$DEFTER_HOME`, else the platform data
/// directory joined with `defter`, else `./.defter`.
pub fn app_home() -> PathBuf {
    if let Some(home) = env::var_os(HOME_ENV_VAR).filter(|value| !value.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|base| base.join("defter"))
        .unwrap_or_else(|| PathBuf::from(".defter"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_take_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"locale":"en-US","default_currency":"EUR"}"#).unwrap();
        assert_eq!(cfg.due_soon_days, 7);
        assert_eq!(cfg.backup_retention, 5);
        assert!(cfg.last_opened_book.is_none());
    }

    #[test]
    fn explicit_roots_win() {
        let cfg = Config {
            data_root: Some(PathBuf::from("/srv/defter/books")),
            ..Config::default()
        };
        assert_eq!(cfg.resolve_data_root(), PathBuf::from("/srv/defter/books"));
    }

    #[test]
    fn validate_rejects_bad_currency_and_zero_retention() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_ok());
        cfg.default_currency = "T1".into();
        assert!(cfg.validate().is_err());
        cfg.default_currency = "TRY".into();
        cfg.backup_retention = 0;
        assert!(cfg.validate().is_err());
    }
}
