use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use defter_core::{
    storage::{BookBackupInfo, BookStorage},
    BalanceCalculator, CoreError,
};
use defter_domain::Book;
use rust_decimal::Decimal;

const BOOK_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Filesystem-backed JSON persistence for books and their backups.
#[derive(Debug, Clone)]
pub struct JsonBookStorage {
    books_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonBookStorage {
    pub fn new(books_dir: PathBuf, backups_dir: PathBuf) -> Result<Self, CoreError> {
        Self::with_retention(books_dir, backups_dir, DEFAULT_RETENTION)
    }

    pub fn with_retention(
        books_dir: PathBuf,
        backups_dir: PathBuf,
        retention: usize,
    ) -> Result<Self, CoreError> {
        fs::create_dir_all(&books_dir)?;
        fs::create_dir_all(&backups_dir)?;
        Ok(Self {
            books_dir,
            backups_dir,
            retention: retention.max(1),
        })
    }

    pub fn book_path(&self, name: &str) -> PathBuf {
        self.books_dir
            .join(format!("{}.{}", canonical_name(name), BOOK_EXTENSION))
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// One row per stored book, sorted by display name.
    pub fn list_book_metadata(&self) -> Result<Vec<BookMetadata>, CoreError> {
        let mut entries = Vec::new();
        for slug in self.list_books()? {
            let book = self.load_book(&slug)?;
            let path = self.book_path(&slug);
            entries.push(BookMetadata {
                slug: slug.clone(),
                name: book.name.clone(),
                path,
                created_at: book.created_at,
                updated_at: book.updated_at,
                version: book.version,
                client_count: book.clients.len(),
                invoice_count: book.invoices.len(),
                transaction_count: book.transactions.len(),
                receivables: BalanceCalculator::receivables_total(&book),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub fn save_to_path(&self, book: &Book, path: &Path) -> Result<(), CoreError> {
        if path.starts_with(&self.books_dir) {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                self.backup_existing_file(stem, path)?;
            }
        }
        save_book_to_path(book, path)
    }

    pub fn load_from_path(&self, path: &Path) -> Result<Book, CoreError> {
        load_book_from_path(path)
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    fn write_backup_file(
        &self,
        book: &Book,
        name: &str,
        note: Option<&str>,
    ) -> Result<BookBackupInfo, CoreError> {
        let dir = self.backup_dir(name);
        fs::create_dir_all(&dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut stem = format!("{}_{}", canonical_name(name), timestamp);
        if let Some(label) = sanitize_backup_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        let path = unique_path(&dir, &stem);
        write_atomic(&path, &serialize_book(book)?)?;
        self.prune_backups(name)?;
        Ok(BookBackupInfo {
            book: canonical_name(name),
            id: file_name_of(&path),
            created_at: timestamp,
            path,
        })
    }

    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<(), CoreError> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(name);
        fs::create_dir_all(&dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let stem = format!("{}_{}", canonical_name(name), timestamp);
        let backup_path = unique_path(&dir, &stem);
        fs::copy(path, &backup_path)?;
        self.prune_backups(name)?;
        Ok(())
    }

    /// Drops automatic backups beyond `retention`. Labelled backups are kept
    /// until removed by hand.
    fn prune_backups(&self, name: &str) -> Result<(), CoreError> {
        let automatic = self
            .list_backups(name)?
            .into_iter()
            .filter(|entry| backup_note(&entry.book, &entry.id).is_none());
        for entry in automatic.skip(self.retention) {
            let _ = fs::remove_file(entry.path);
        }
        Ok(())
    }
}

impl BookStorage for JsonBookStorage {
    fn save_book(&self, name: &str, book: &Book) -> Result<(), CoreError> {
        let path = self.book_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if path.exists() {
            self.backup_existing_file(name, &path)?;
        }
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &serialize_book(book)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load_book(&self, name: &str) -> Result<Book, CoreError> {
        let path = self.book_path(name);
        if !path.exists() {
            return Err(CoreError::BookNotFound(name.to_string()));
        }
        load_book_from_path(&path)
    }

    fn list_books(&self) -> Result<Vec<String>, CoreError> {
        if !self.books_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.books_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(BOOK_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete_book(&self, name: &str) -> Result<(), CoreError> {
        let path = self.book_path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn save_book_to_path(&self, book: &Book, path: &Path) -> Result<(), CoreError> {
        self.save_to_path(book, path)
    }

    fn load_book_from_path(&self, path: &Path) -> Result<Book, CoreError> {
        self.load_from_path(path)
    }

    fn backup_book(
        &self,
        name: &str,
        book: &Book,
        note: Option<&str>,
    ) -> Result<BookBackupInfo, CoreError> {
        self.write_backup_file(book, name, note)
    }

    /// Backups for `name`, newest first.
    fn list_backups(&self, name: &str) -> Result<Vec<BookBackupInfo>, CoreError> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        let book_slug = canonical_name(name);
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BOOK_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                let created_at = parse_backup_timestamp(&book_slug, file_name)
                    .map(|stamp| stamp.format(BACKUP_TIMESTAMP_FORMAT).to_string())
                    .unwrap_or_default();
                entries.push(BookBackupInfo {
                    book: book_slug.clone(),
                    id: file_name.to_string(),
                    created_at,
                    path: path.clone(),
                });
            }
        }
        entries.sort_by_key(|info| {
            (
                Reverse(parse_backup_timestamp(&book_slug, &info.id)),
                Reverse(info.id.clone()),
            )
        });
        Ok(entries)
    }

    fn restore_backup(&self, backup: &BookBackupInfo) -> Result<Book, CoreError> {
        if !backup.path.exists() {
            return Err(CoreError::Storage(format!(
                "backup `{}` not found",
                backup.id
            )));
        }
        let restored = load_book_from_path(&backup.path)?;
        let target = self.book_path(&backup.book);
        if target.exists() {
            self.backup_existing_file(&backup.book, &target)?;
        }
        save_book_to_path(&restored, &target)?;
        Ok(restored)
    }
}

/// Saves a book to an arbitrary path on disk.
pub fn save_book_to_path(book: &Book, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    write_atomic(&tmp, &serialize_book(book)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads a book from the provided filesystem path.
pub fn load_book_from_path(path: &Path) -> Result<Book, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

#[derive(Debug, Clone)]
pub struct BookMetadata {
    pub slug: String,
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub client_count: usize,
    pub invoice_count: usize,
    pub transaction_count: usize,
    pub receivables: Decimal,
}

/// File-system slug for a book name: lowercase ASCII letters and digits,
/// everything else folded to `_`.
pub fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "book".into()
    } else {
        sanitized
    }
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Backup names look like `<slug>_<YYYYmmdd>_<HHMMSS>[-n][_note].json`.
fn parse_backup_timestamp(slug: &str, name: &str) -> Option<DateTime<Utc>> {
    let trimmed = name.strip_suffix(&format!(".{}", BOOK_EXTENSION))?;
    let rest = trimmed.strip_prefix(slug)?.strip_prefix('_')?;
    let mut segments = rest.split('_');
    let date = segments.next()?;
    let time = segments.next()?.split('-').next()?;
    if !is_digits(date, 8) || !is_digits(time, 6) {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// The sanitized note of a labelled backup, `None` for automatic ones.
fn backup_note<'a>(slug: &str, name: &'a str) -> Option<&'a str> {
    let trimmed = name.strip_suffix(&format!(".{}", BOOK_EXTENSION))?;
    let rest = trimmed.strip_prefix(slug)?.strip_prefix('_')?;
    let mut segments = rest.splitn(3, '_');
    segments.next()?;
    segments.next()?;
    segments.next().filter(|note| !note.is_empty())
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

/// `dir/stem.json`, or `dir/stem-N.json` with the first free `N` when taken.
fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let candidate = dir.join(format!("{stem}.{BOOK_EXTENSION}"));
    if !candidate.exists() {
        return candidate;
    }
    let (head, note) = match stem.rsplit_once('_') {
        Some((head, note)) if !note.chars().all(|c| c.is_ascii_digit()) => {
            (head.to_string(), Some(note))
        }
        _ => (stem.to_string(), None),
    };
    (1..)
        .map(|n| match note {
            Some(note) => dir.join(format!("{head}-{n}_{note}.{BOOK_EXTENSION}")),
            None => dir.join(format!("{head}-{n}.{BOOK_EXTENSION}")),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

fn serialize_book(book: &Book) -> Result<String, CoreError> {
    serde_json::to_string_pretty(book).map_err(|err| CoreError::Serde(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_folds_to_slug() {
        assert_eq!(canonical_name(" Defter 2024 "), "defter_2024");
        assert_eq!(canonical_name("***"), "book");
    }

    #[test]
    fn backup_timestamp_survives_counter_and_note() {
        let plain = parse_backup_timestamp("shop", "shop_20240601_101500.json");
        let counted = parse_backup_timestamp("shop", "shop_20240601_101500-2_before-import.json");
        assert!(plain.is_some());
        assert_eq!(plain, counted);
        assert!(parse_backup_timestamp("shop", "other_20240601_101500.json").is_none());
    }

    #[test]
    fn only_labelled_backups_carry_a_note() {
        assert_eq!(backup_note("shop", "shop_20240601_101500.json"), None);
        assert_eq!(backup_note("shop", "shop_20240601_101500-2.json"), None);
        assert_eq!(
            backup_note("shop", "shop_20240601_101500-2_before-import.json"),
            Some("before-import")
        );
    }

    #[test]
    fn notes_are_sanitized() {
        assert_eq!(
            sanitize_backup_note(Some(" Before Q3 close. ")).as_deref(),
            Some("before-q3-close")
        );
        assert_eq!(sanitize_backup_note(Some("!!")), None);
    }
}
