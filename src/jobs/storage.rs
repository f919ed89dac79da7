//! # Persistencia de Jobs y Artefactos
//! src/jobs/storage.rs
//!
//! Adaptador sobre dos directorios:
//! - pending store: un `<id>.json` por job en cola
//! - output store: un `<clave>.md` por guion generado
//!
//! Ningún dato se cachea en memoria: cada lectura vuelve al disco y puede
//! quedar obsoleta apenas retorna, porque un worker externo escribe en los
//! mismos directorios.
//!
//! `create` publica con `hard_link` desde un temporal, que falla si el
//! destino existe. En filesystems sin hard links (FAT/exFAT, algunos
//! montajes FUSE) cae a `create_new` sobre la ruta final: sigue siendo
//! exclusivo, pero un lector concurrente puede ver el archivo a medio
//! escribir.

use crate::config::Config;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Los dos almacenes que maneja el adaptador
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    /// Registros de jobs en cola (`.json`)
    Pending,

    /// Artefactos generados (`.md`)
    Output,
}

impl Store {
    /// Extensión de los archivos de este almacén
    pub fn extension(&self) -> &'static str {
        match self {
            Store::Pending => "json",
            Store::Output => "md",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Store::Pending => "pending",
            Store::Output => "output",
        }
    }
}

/// Storage respaldado por el filesystem
#[derive(Debug, Clone)]
pub struct FileStore {
    pending_dir: PathBuf,
    output_dir: PathBuf,
}

impl FileStore {
    pub fn new(pending_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            pending_dir: pending_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.queue_dir, &config.output_dir)
    }

    /// Directorio que respalda un almacén
    pub fn dir(&self, store: Store) -> &Path {
        match store {
            Store::Pending => &self.pending_dir,
            Store::Output => &self.output_dir,
        }
    }

    /// Ruta del archivo para `key`, validando la clave
    pub fn path_for(&self, store: Store, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self
            .dir(store)
            .join(format!("{}.{}", key, store.extension())))
    }

    /// Crea el directorio del almacén si no existe (idempotente)
    pub fn ensure_store_exists(&self, store: Store) -> Result<()> {
        let dir = self.dir(store);
        fs::create_dir_all(dir).map_err(|e| Error::storage(dir, e))
    }

    /// Crea ambos almacenes; se llama una vez al arrancar
    pub fn ensure_all(&self) -> Result<()> {
        self.ensure_store_exists(Store::Pending)?;
        self.ensure_store_exists(Store::Output)
    }

    /// Escribe (o reemplaza) el payload de `key`
    ///
    /// Escribe primero a un archivo temporal del mismo directorio y luego
    /// renombra, así un lector nunca ve un archivo a medio escribir.
    pub fn write(&self, store: Store, key: &str, payload: &[u8]) -> Result<()> {
        let path = self.path_for(store, key)?;
        let temp = self.write_temp(store, payload)?;

        fs::rename(&temp, &path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            Error::storage(&path, e)
        })
    }

    /// Crea `key` solo si no existe
    ///
    /// Retorna `Ok(false)` si ya había un archivo con esa clave; en ese
    /// caso el contenido existente no se toca.
    pub fn create(&self, store: Store, key: &str, payload: &[u8]) -> Result<bool> {
        let path = self.path_for(store, key)?;
        let temp = self.write_temp(store, payload)?;

        // hard_link falla si el destino existe: publicación exclusiva y atómica
        let linked = fs::hard_link(&temp, &path);
        let _ = fs::remove_file(&temp);

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) if links_unsupported(&e) => {
                debug!(path = %path.display(), error = %e, "sin hard links, se crea en el lugar");
                create_in_place(&path, payload).map_err(|e| Error::storage(&path, e))
            }
            Err(e) => Err(Error::storage(&path, e)),
        }
    }

    /// Lee el payload de `key`
    ///
    /// # Errores
    /// - `NotFound` si la clave no existe
    /// - `Storage` ante cualquier otra falla de I/O
    pub fn read(&self, store: Store, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(store, key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                key: key.to_string(),
            },
            _ => Error::storage(&path, e),
        })
    }

    /// Como `read`, pero una clave ausente es `None`
    pub fn read_optional(&self, store: Store, key: &str) -> Result<Option<Vec<u8>>> {
        match self.read(store, key) {
            Ok(payload) => Ok(Some(payload)),
            Err(Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Lee el payload de `key` como texto
    ///
    /// Las secuencias que no son UTF-8 se reemplazan por U+FFFD: los
    /// artefactos los escribe un worker externo y un byte raro no debe
    /// tumbar el catálogo.
    pub fn read_to_string(&self, store: Store, key: &str) -> Result<String> {
        let payload = self.read(store, key)?;
        Ok(decode_text(payload))
    }

    /// Verifica si existe `key`
    pub fn exists(&self, store: Store, key: &str) -> Result<bool> {
        let path = self.path_for(store, key)?;
        path.try_exists().map_err(|e| Error::storage(&path, e))
    }

    /// Lista las claves del almacén, ordenadas
    ///
    /// Cada llamada vuelve a leer el directorio. Se ignoran archivos con
    /// otra extensión y los temporales (que empiezan con `.`).
    pub fn list(&self, store: Store) -> Result<Vec<String>> {
        let dir = self.dir(store);
        let entries = fs::read_dir(dir).map_err(|e| Error::storage(dir, e))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::storage(dir, e))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(store.extension()) {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Fecha de última modificación de `key`
    pub fn modified(&self, store: Store, key: &str) -> Result<DateTime<Utc>> {
        let path = self.path_for(store, key)?;
        let modified = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::NotFound {
                    key: key.to_string(),
                },
                _ => Error::storage(&path, e),
            })?;
        Ok(DateTime::<Utc>::from(modified))
    }

    /// Escribe el payload a un temporal oculto y lo retorna
    ///
    /// El nombre no incluye la clave, así su largo no depende del topic.
    fn write_temp(&self, store: Store, payload: &[u8]) -> Result<PathBuf> {
        let temp = self.dir(store).join(format!(
            ".tmp.{}.{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let result = (|| -> io::Result<()> {
            let file = File::create(&temp)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(payload)?;
            writer.flush()?;
            Ok(())
        })();

        match result {
            Ok(()) => Ok(temp),
            Err(e) => {
                let _ = fs::remove_file(&temp);
                Err(Error::storage(&temp, e))
            }
        }
    }
}

/// El filesystem no soporta hard links (EPERM en vfat, EOPNOTSUPP en FUSE)
fn links_unsupported(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied
    )
}

/// Crea `path` con `create_new` y escribe el payload
///
/// `Ok(false)` si ya existía. Si la escritura falla, el archivo se borra.
fn create_in_place(path: &Path, payload: &[u8]) -> io::Result<bool> {
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };

    let mut writer = BufWriter::new(file);
    let written = (|| -> io::Result<()> {
        writer.write_all(payload)?;
        writer.flush()
    })();

    match written {
        Ok(()) => Ok(true),
        Err(e) => {
            let _ = fs::remove_file(path);
            Err(e)
        }
    }
}

/// Texto de un payload, reemplazando bytes que no son UTF-8
pub fn decode_text(payload: Vec<u8>) -> String {
    match String::from_utf8(payload) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Valida que una clave sea un nombre de archivo plano y seguro
///
/// Solo `[A-Za-z0-9._-]`, sin empezar con `.` (descarta `..` y temporales).
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::validation("Key must not be empty"));
    }
    if key.starts_with('.') {
        return Err(Error::validation(format!("Invalid key: {}", key)));
    }
    let valid = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid {
        return Err(Error::validation(format!("Invalid key: {}", key)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("queue"), dir.path().join("output"));
        store.ensure_all().unwrap();
        (dir, store)
    }

    // ==================== Basic Operations ====================

    #[test]
    fn test_write_and_read() {
        let (_dir, store) = temp_store();

        store.write(Store::Pending, "1-job", b"{}").unwrap();
        assert_eq!(store.read(Store::Pending, "1-job").unwrap(), b"{}");
        assert!(store.dir(Store::Pending).join("1-job.json").exists());
    }

    #[test]
    fn test_write_overwrites() {
        let (_dir, store) = temp_store();

        store.write(Store::Output, "topic", b"v1").unwrap();
        store.write(Store::Output, "topic", b"v2").unwrap();

        assert_eq!(store.read_to_string(Store::Output, "topic").unwrap(), "v2");
        assert_eq!(store.list(Store::Output).unwrap(), vec!["topic"]);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, store) = temp_store();

        let err = store.read(Store::Output, "nothing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(store.read_optional(Store::Output, "nothing").unwrap().is_none());
    }

    #[test]
    fn test_write_to_missing_dir_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nope"), dir.path().join("out"));

        let err = store.write(Store::Pending, "k", b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("nope"));
    }

    // ==================== Create ====================

    #[test]
    fn test_create_is_exclusive() {
        let (_dir, store) = temp_store();

        assert!(store.create(Store::Pending, "1-a", b"first").unwrap());
        assert!(!store.create(Store::Pending, "1-a", b"second").unwrap());
        assert_eq!(store.read(Store::Pending, "1-a").unwrap(), b"first");
    }

    #[test]
    fn test_create_leaves_no_temp_files() {
        let (_dir, store) = temp_store();

        store.create(Store::Pending, "1-a", b"x").unwrap();
        store.create(Store::Pending, "1-a", b"y").unwrap();

        let count = fs::read_dir(store.dir(Store::Pending)).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_create_in_place_is_exclusive() {
        let (_dir, store) = temp_store();
        let path = store.dir(Store::Pending).join("1-a.json");

        assert!(create_in_place(&path, b"first").unwrap());
        assert!(!create_in_place(&path, b"second").unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn test_links_unsupported_kinds() {
        let unsupported = io::Error::new(io::ErrorKind::Unsupported, "no links");
        let eperm = io::Error::new(io::ErrorKind::PermissionDenied, "EPERM");
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");

        assert!(links_unsupported(&unsupported));
        assert!(links_unsupported(&eperm));
        assert!(!links_unsupported(&missing));
    }

    #[test]
    fn test_long_key_at_name_limit() {
        let (_dir, store) = temp_store();
        // 250 + ".json" = 255 bytes, el máximo de un nombre de archivo
        let key = format!("1-{}", "a".repeat(248));

        assert!(store.create(Store::Pending, &key, b"{}").unwrap());
        store.write(Store::Output, &key[2..], b"# A").unwrap();

        assert_eq!(store.read(Store::Pending, &key).unwrap(), b"{}");
        assert_eq!(store.list(Store::Pending).unwrap(), vec![key.clone()]);
    }

    // ==================== List ====================

    #[test]
    fn test_list_filters_by_extension_and_sorts() {
        let (_dir, store) = temp_store();

        store.write(Store::Pending, "2-b", b"{}").unwrap();
        store.write(Store::Pending, "1-a", b"{}").unwrap();
        fs::write(store.dir(Store::Pending).join("notes.txt"), "x").unwrap();
        fs::write(store.dir(Store::Pending).join(".hidden.json"), "x").unwrap();

        assert_eq!(store.list(Store::Pending).unwrap(), vec!["1-a", "2-b"]);
    }

    #[test]
    fn test_list_is_restartable() {
        let (_dir, store) = temp_store();

        assert!(store.list(Store::Output).unwrap().is_empty());
        store.write(Store::Output, "x", b"body").unwrap();
        assert_eq!(store.list(Store::Output).unwrap(), vec!["x"]);
    }

    // ==================== Keys ====================

    #[test]
    fn test_invalid_keys_rejected() {
        let (_dir, store) = temp_store();

        for key in ["", "../etc/passwd", "a/b", "a\\b", ".hidden", "a b"] {
            let err = store.read(Store::Pending, key).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "key {:?}", key);
        }
    }

    #[test]
    fn test_ensure_store_exists_idempotent() {
        let (_dir, store) = temp_store();
        store.ensure_all().unwrap();
        store.ensure_store_exists(Store::Output).unwrap();
        assert!(store.dir(Store::Output).is_dir());
    }

    #[test]
    fn test_modified() {
        let (_dir, store) = temp_store();
        let before = Utc::now() - chrono::Duration::seconds(5);

        store.write(Store::Output, "x", b"body").unwrap();
        assert!(store.modified(Store::Output, "x").unwrap() >= before);
        assert_eq!(
            store.modified(Store::Output, "missing").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
