//! JSON-file-based storage backend.
//!
//! Stores each key as a separate JSON file under a configurable directory
//! (default: `$XDG_DATA_HOME/storefront-core/`).

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, StorefrontError};

/// Application name used for the XDG data directory.
const APP_NAME: &str = "storefront-core";
/// Extension of every value file.
const VALUE_EXT: &str = "json";
/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "storage.lock";

/// File-backed key-value storage.
///
/// Every key maps to `<dir>/<stem>.json`. The stem keeps ASCII letters,
/// digits, `-`, `.` and `@`; any other byte (`_` included) is written as
/// `_XX` in uppercase hex, so distinct keys never share a file and
/// [`keys`](super::Storage::keys) returns the keys exactly as stored.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `storage.lock` (using [`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]).
///
/// Read operations acquire a shared lock (allowing concurrent readers),
/// while write operations acquire an exclusive lock. Writes go to a
/// `.tmp` file first and are renamed into place.
///
/// # File layout
///
/// ```text
/// <dir>/
///   storage.lock                      (cross-process lock sentinel)
///   nxtbazaar-cart-guest.json
///   nxtbazaar-cart-a_2Bb@x.com.json     (key "nxtbazaar-cart-a+b@x.com")
///   nxtbazaar-coupons.json
///   ...
/// ```
#[derive(Debug)]
pub struct FileStorage {
    /// Root directory containing all JSON files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileStorage {
    /// Creates a new file storage rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist. Also
    /// opens (or creates) the `storage.lock` sentinel file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/storefront-core/` (typically
    /// `~/.local/share/storefront-core/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                StorefrontError::Storage("could not determine platform data directory".into())
            })
    }

    /// Returns the directory this storage writes to.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Returns the value file path for a key.
    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{VALUE_EXT}", encode_key(key)))
    }

    /// Acquires an in-process mutex guard and a shared (read) file lock,
    /// executes `op`, then releases the file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // The operation's own error wins over an unlock failure.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires an in-process mutex guard and an exclusive (write) file
    /// lock, executes `op`, then releases the file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads a value file; a missing file is `None`.
    fn read_value(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_io_error(err)),
        }
    }

    /// Atomically writes a value file (write-to-tmp then rename).
    fn write_value(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        let tmp_path = self.dir.join(format!("{}.{VALUE_EXT}.tmp", encode_key(key)));
        fs::write(&tmp_path, value).map_err(storage_io_error)?;
        fs::rename(&tmp_path, &path).map_err(storage_io_error)?;
        Ok(())
    }

    /// Deletes a value file; a missing file is not an error.
    fn delete_value(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_io_error(err)),
        }
    }

    /// Lists the keys of all value files, sorted. Files whose names this
    /// storage did not produce are skipped.
    fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(storage_io_error)? {
            let path = entry.map_err(storage_io_error)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(VALUE_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match decode_stem(stem) {
                Some(key) => keys.push(key),
                None => tracing::debug!(file = %path.display(), "skipping foreign file"),
            }
        }
        keys.sort_unstable();
        Ok(keys)
    }
}

// ── Free-standing helpers ───────────────────────────────────────────────

/// Escape byte introducing a two-digit hex code in a file stem.
const ESCAPE: u8 = b'_';

/// Returns `true` for bytes written to file stems verbatim.
const fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'@')
}

/// Maps a key to a file stem, escaping every other byte as `_XX`. A
/// leading `.` is escaped too so no value file is hidden.
fn encode_key(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for (idx, byte) in key.bytes().enumerate() {
        if is_plain(byte) && !(idx == 0 && byte == b'.') {
            stem.push(char::from(byte));
            continue;
        }
        stem.push(char::from(ESCAPE));
        for nibble in [byte >> 4_u8, byte & 0x0F] {
            if let Some(digit) = char::from_digit(u32::from(nibble), 16) {
                stem.push(digit.to_ascii_uppercase());
            }
        }
    }
    stem
}

/// Inverse of [`encode_key`]; `None` for stems it cannot have produced.
fn decode_stem(stem: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(stem.len());
    let mut rest = stem.bytes();
    while let Some(byte) = rest.next() {
        if byte == ESCAPE {
            let high = hex_value(rest.next()?)?;
            let low = hex_value(rest.next()?)?;
            bytes.push((high << 4_u8) | low);
        } else if is_plain(byte) {
            bytes.push(byte);
        } else {
            return None;
        }
    }
    String::from_utf8(bytes).ok()
}

/// Value of one uppercase hex digit.
fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Wraps an I/O error into a [`StorefrontError::Storage`].
fn storage_io_error(err: std::io::Error) -> StorefrontError {
    StorefrontError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`StorefrontError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> StorefrontError {
    StorefrontError::Storage(err.to_string().into())
}

impl super::Storage for FileStorage {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_shared_lock(|| self.read_value(key))
    }

    #[inline]
    fn set(&self, key: &str, value: String) -> Result<()> {
        self.with_exclusive_lock(|| self.write_value(key, &value))
    }

    #[inline]
    fn remove(&self, key: &str) -> Result<()> {
        self.with_exclusive_lock(|| self.delete_value(key))
    }

    #[inline]
    fn keys(&self) -> Result<Vec<String>> {
        self.with_shared_lock(|| self.list_keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    /// Helper to create a [`FileStorage`] in a temporary directory.
    fn temp_storage() -> (FileStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        (storage, dir)
    }

    #[test]
    fn lockfile_created_on_construction() {
        let (storage, _dir) = temp_storage();
        assert!(storage.dir().join(LOCK_FILE).exists());
    }

    #[test]
    fn missing_key_is_none() {
        let (storage, _dir) = temp_storage();
        assert!(storage.get("nxtbazaar-cart-guest").unwrap().is_none());
    }

    #[test]
    fn set_and_get_round_trip_through_disk() {
        let (storage, dir) = temp_storage();
        storage
            .set("nxtbazaar-cart-guest", "[]".to_owned())
            .unwrap();
        assert!(dir.path().join("nxtbazaar-cart-guest.json").exists());

        let reopened = FileStorage::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            reopened.get("nxtbazaar-cart-guest").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn unsafe_bytes_are_escaped() {
        assert_eq!(encode_key("a/b\\c d"), "a_2Fb_5Cc_20d");
        assert_eq!(encode_key("a_b"), "a_5Fb");
        assert_eq!(encode_key(".hidden"), "_2Ehidden");
        assert_eq!(
            encode_key("shop-cart-asha@example.com"),
            "shop-cart-asha@example.com"
        );
    }

    #[test]
    fn similar_emails_get_separate_files() {
        let (storage, _dir) = temp_storage();
        storage
            .set("nxtbazaar-cart-a+b@x.com", "[1]".to_owned())
            .unwrap();
        storage
            .set("nxtbazaar-cart-a_b@x.com", "[2]".to_owned())
            .unwrap();
        assert_eq!(
            storage.get("nxtbazaar-cart-a+b@x.com").unwrap().as_deref(),
            Some("[1]")
        );
        assert_eq!(
            storage.get("nxtbazaar-cart-a_b@x.com").unwrap().as_deref(),
            Some("[2]")
        );
    }

    #[test]
    fn keys_are_returned_as_stored() {
        let (storage, dir) = temp_storage();
        let stored = ["shop cart/ü", "a_b@x.com", ".dot", "plain-key"];
        for key in stored {
            storage.set(key, "1".to_owned()).unwrap();
        }
        fs::write(dir.path().join("not_valid.json"), "x").unwrap();
        let mut expected: Vec<String> = stored.iter().map(|key| (*key).to_owned()).collect();
        expected.sort_unstable();
        assert_eq!(storage.keys().unwrap(), expected);
    }

    #[test]
    fn malformed_escapes_do_not_decode() {
        assert_eq!(decode_stem("a_5Fb").as_deref(), Some("a_b"));
        assert!(decode_stem("a_5").is_none());
        assert!(decode_stem("a_zzb").is_none());
        assert!(decode_stem("a b").is_none());
    }

    #[test]
    fn keys_ignore_lock_and_tmp_files() {
        let (storage, dir) = temp_storage();
        storage.set("b", "1".to_owned()).unwrap();
        storage.set("a", "1".to_owned()).unwrap();
        fs::write(dir.path().join("c.json.tmp"), "x").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn remove_deletes_file() {
        let (storage, _dir) = temp_storage();
        storage.set("k", "1".to_owned()).unwrap();
        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert!(storage.get("k").unwrap().is_none());
        assert!(storage.dir().join(LOCK_FILE).exists());
    }

    #[test]
    fn default_dir_returns_path() {
        let dir = FileStorage::default_dir();
        assert!(dir.is_ok());
    }

    #[test]
    fn concurrent_writes_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let (storage, _dir) = temp_storage();
        let storage = Arc::new(storage);
        let num_threads: usize = 8;

        let handles: Vec<_> = (0..num_threads)
            .map(|thread_idx| {
                let storage = Arc::clone(&storage);
                thread::spawn(move || {
                    for round in 0..20_usize {
                        storage
                            .set(&format!("key-{thread_idx}"), round.to_string())
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.keys().unwrap().len(), num_threads);
        assert_eq!(storage.get("key-0").unwrap().as_deref(), Some("19"));
    }
}
