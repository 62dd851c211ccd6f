use defter_config::{Config, ConfigError, ConfigManager};
use tempfile::tempdir;

#[test]
fn default_config_has_non_empty_fields() {
    let cfg = Config::default();

    assert!(!cfg.default_currency.is_empty());
    assert!(!cfg.locale.is_empty());
    assert_eq!(cfg.due_soon_days, 7);
    assert_eq!(cfg.backup_retention, 5);
}

#[test]
fn missing_file_loads_defaults() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    assert_eq!(manager.load().expect("load config"), Config::default());
    assert!(manager.backups_dir().exists());
}

#[test]
fn config_manager_persists_and_loads_config() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::new(dir.path().join("config.json"), dir.path().join("backups"));

    let mut cfg = Config::default();
    cfg.default_currency = "EUR".to_string();
    cfg.locale = "en-GB".to_string();
    cfg.last_opened_book = Some("atolye".into());

    manager.save(&cfg).expect("save config");
    let loaded = manager.load().expect("load config");

    assert_eq!(loaded.default_currency, "EUR");
    assert_eq!(loaded.locale, "en-GB");
    assert_eq!(loaded.last_opened_book.as_deref(), Some("atolye"));
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn invalid_config_is_not_saved() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::new(dir.path().join("config.json"), dir.path().join("backups"));

    let cfg = Config {
        backup_retention: 0,
        ..Config::default()
    };
    let err = manager.save(&cfg).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "unexpected error: {err:?}");
    assert!(!manager.config_path().exists());
}

#[test]
fn backups_are_listed_newest_first_and_restore() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let first = Config {
        due_soon_days: 3,
        ..Config::default()
    };
    let second = Config {
        due_soon_days: 14,
        ..Config::default()
    };
    let first_name = manager.backup(&first, Some("Before tweak")).expect("backup");
    let second_name = manager.backup(&second, None).expect("backup");
    assert!(first_name.contains("before-tweak"));

    let backups = manager.list_backups().expect("list backups");
    assert_eq!(backups.len(), 2);
    assert!(backups.contains(&first_name));
    assert!(backups.contains(&second_name));

    let restored = manager.restore(&first_name).expect("restore");
    assert_eq!(restored.due_soon_days, 3);
    assert_eq!(manager.load().expect("load").due_soon_days, 3);

    assert!(manager.restore("config_19990101_000000.json").is_err());
}
