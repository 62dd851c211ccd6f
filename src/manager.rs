use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use defter_config::Config;
use defter_core::{
    storage::{book_warnings, BookBackupInfo, BookStorage},
    Clock, CoreError, EntityStore, PaymentOutcome, PaymentReconciler, PaymentRequest,
};
use defter_domain::{Book, CURRENT_SCHEMA_VERSION};
use defter_storage_json::JsonBookStorage;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clock::SystemClock,
    dashboard::Dashboard,
    errors::{DefterError, Result},
};

/// Metadata describing the outcome of a load operation.
#[derive(Debug, Clone)]
pub struct LoadMetadata {
    pub warnings: Vec<String>,
    pub name: Option<String>,
    pub path: Option<PathBuf>,
    pub schema_version: u8,
}

/// Facade that coordinates the open book, persistence, and backups.
///
/// Writes go through [`BookManager::mutate`], which saves the book whenever
/// the closure changed it.
pub struct BookManager {
    current: Option<EntityStore>,
    current_name: Option<String>,
    current_path: Option<PathBuf>,
    saved_version: u64,
    storage: Box<dyn BookStorage>,
    clock: Arc<dyn Clock>,
}

impl BookManager {
    pub fn new(storage: Box<dyn BookStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            current: None,
            current_name: None,
            current_path: None,
            saved_version: 0,
            storage,
            clock,
        }
    }

    /// JSON-backed manager using the directories and retention from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = JsonBookStorage::with_retention(
            config.resolve_data_root(),
            config.resolve_backup_root(),
            config.backup_retention,
        )?;
        Ok(Self::new(Box::new(storage), Arc::new(SystemClock)))
    }

    pub fn storage(&self) -> &dyn BookStorage {
        self.storage.as_ref()
    }

    /// Starts an empty book and saves it under `name`.
    pub fn create(&mut self, name: &str) -> Result<&EntityStore> {
        let store = EntityStore::new(name, Arc::clone(&self.clock));
        self.storage.save_book(name, store.book())?;
        info!(book = name, "created book");
        self.set_current(store, Some(name.to_string()), None);
        self.store()
    }

    pub fn load(&mut self, name: &str) -> Result<LoadMetadata> {
        let book = self.storage.load_book(name)?;
        self.apply_load(book, Some(name.to_string()), None)
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<LoadMetadata> {
        let book = self.storage.load_book_from_path(path)?;
        self.apply_load(book, None, Some(path.to_path_buf()))
    }

    /// Loads `name`, creating it first when it does not exist yet.
    pub fn open_or_create(&mut self, name: &str) -> Result<LoadMetadata> {
        match self.load(name) {
            Err(DefterError::BookNotFound(_)) => {
                self.create(name)?;
                Ok(LoadMetadata {
                    warnings: Vec::new(),
                    name: Some(name.to_string()),
                    path: None,
                    schema_version: CURRENT_SCHEMA_VERSION,
                })
            }
            other => other,
        }
    }

    pub fn save(&mut self) -> Result<()> {
        let store = self.current.as_ref().ok_or(DefterError::BookNotLoaded)?;
        if let Some(name) = self.current_name.as_deref() {
            self.storage.save_book(name, store.book())?;
        } else if let Some(path) = self.current_path.as_deref() {
            self.storage.save_book_to_path(store.book(), path)?;
        } else {
            return Err(DefterError::StorageError(
                "unable to determine save target for current book".into(),
            ));
        }
        self.saved_version = store.version();
        info!(
            book = store.book().name.as_str(),
            version = store.version(),
            "saved book"
        );
        Ok(())
    }

    pub fn save_as(&mut self, name: &str) -> Result<()> {
        let store = self.current.as_ref().ok_or(DefterError::BookNotLoaded)?;
        self.storage.save_book(name, store.book())?;
        self.saved_version = store.version();
        self.current_name = Some(name.to_string());
        self.current_path = None;
        info!(book = name, "saved book under new name");
        Ok(())
    }

    pub fn save_to_path(&mut self, path: &Path) -> Result<()> {
        let store = self.current.as_ref().ok_or(DefterError::BookNotLoaded)?;
        self.storage.save_book_to_path(store.book(), path)?;
        self.saved_version = store.version();
        self.current_path = Some(path.to_path_buf());
        self.current_name = None;
        Ok(())
    }

    pub fn backup(&self, note: Option<&str>) -> Result<BookBackupInfo> {
        let store = self.current.as_ref().ok_or(DefterError::BookNotLoaded)?;
        let name = self
            .current_name
            .as_deref()
            .ok_or_else(|| DefterError::StorageError("current book is unnamed".into()))?;
        let info = self.storage.backup_book(name, store.book(), note)?;
        info!(book = name, backup = info.id.as_str(), "created backup");
        Ok(info)
    }

    pub fn list_backups(&self) -> Result<Vec<BookBackupInfo>> {
        let name = self.current_name.as_deref().ok_or(DefterError::BookNotLoaded)?;
        Ok(self.storage.list_backups(name)?)
    }

    /// Restores `backup` over its book on disk and makes it the open book.
    pub fn restore_backup(&mut self, backup: &BookBackupInfo) -> Result<LoadMetadata> {
        let book = self.storage.restore_backup(backup)?;
        info!(book = backup.book.as_str(), backup = backup.id.as_str(), "restored backup");
        self.apply_load(book, Some(backup.book.clone()), None)
    }

    pub fn list_books(&self) -> Result<Vec<String>> {
        Ok(self.storage.list_books()?)
    }

    pub fn store(&self) -> Result<&EntityStore> {
        self.current.as_ref().ok_or(DefterError::BookNotLoaded)
    }

    pub fn book(&self) -> Result<&Book> {
        Ok(self.store()?.book())
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// True when the open book has changes that were not saved.
    pub fn is_dirty(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|store| store.version() != self.saved_version)
    }

    /// Runs `op` against the open book and saves if it changed anything.
    ///
    /// The save also happens when `op` fails after an earlier step inside it
    /// already changed the book.
    pub fn mutate<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut EntityStore) -> std::result::Result<T, CoreError>,
    {
        let store = self.current.as_mut().ok_or(DefterError::BookNotLoaded)?;
        let before = store.version();
        let outcome = op(store);
        let after = store.version();
        if after != before {
            debug!(from = before, to = after, "book changed; saving");
            self.save()?;
        }
        Ok(outcome?)
    }

    pub fn mark_invoice_as_paid(
        &mut self,
        invoice_id: Uuid,
        request: PaymentRequest,
    ) -> Result<PaymentOutcome> {
        self.mutate(|store| {
            PaymentReconciler::mark_invoice_as_paid_with(store, invoice_id, request)
        })
    }

    pub fn process_payment_from_transaction(
        &mut self,
        transaction_id: Uuid,
    ) -> Result<PaymentOutcome> {
        self.mutate(|store| {
            PaymentReconciler::process_payment_from_transaction(store, transaction_id)
        })
    }

    pub fn dashboard(&self, due_soon_days: u32) -> Result<Dashboard> {
        let store = self.store()?;
        Ok(Dashboard::build(store.book(), store.today(), due_soon_days))
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.current_name = None;
        self.current_path = None;
        self.saved_version = 0;
    }

    fn set_current(&mut self, store: EntityStore, name: Option<String>, path: Option<PathBuf>) {
        self.saved_version = store.version();
        self.current = Some(store);
        self.current_name = name;
        self.current_path = path;
    }

    fn ensure_schema_support(&self, schema_version: u8) -> Result<()> {
        if schema_version > CURRENT_SCHEMA_VERSION {
            return Err(DefterError::StorageError(format!(
                "book schema v{} is newer than supported v{}",
                schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        Ok(())
    }

    fn apply_load(
        &mut self,
        book: Book,
        name: Option<String>,
        path: Option<PathBuf>,
    ) -> Result<LoadMetadata> {
        self.ensure_schema_support(book.schema_version)?;
        let warnings = book_warnings(&book);
        for warning in &warnings {
            warn!(book = book.name.as_str(), "{}", warning);
        }
        let schema_version = book.schema_version;
        info!(
            book = book.name.as_str(),
            version = book.version,
            warnings = warnings.len(),
            "loaded book"
        );
        let store = EntityStore::from_book(book, Arc::clone(&self.clock));
        self.set_current(store, name.clone(), path.clone());
        Ok(LoadMetadata {
            warnings,
            name,
            path,
            schema_version,
        })
    }
}
