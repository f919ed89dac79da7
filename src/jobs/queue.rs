//! # Cola de Jobs respaldada por archivos
//! src/jobs/queue.rs
//!
//! Acepta envíos, asigna ids y lista los registros pendientes. Cada job
//! es un `<id>.json` en el pending store; no hay estado en memoria.

use crate::error::{Error, Result};
use crate::jobs::storage::{FileStore, Store};
use crate::jobs::types::{JobRecord, JobSubmission};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

/// Gestor de la cola de jobs
#[derive(Debug, Clone)]
pub struct QueueManager {
    store: FileStore,
}

impl QueueManager {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Encola un job nuevo y retorna su registro completo
    ///
    /// # Errores
    /// - `Validation` si falta `topic` o está vacío
    /// - `Storage` si no se pudo escribir el registro
    pub fn submit(&self, submission: &JobSubmission) -> Result<JobRecord> {
        self.submit_at(submission, Utc::now())
    }

    /// Igual que `submit` pero con el instante de envío explícito
    ///
    /// Si ya existe un registro con el mismo id (mismo slug en el mismo
    /// milisegundo) se avanza el timestamp un milisegundo y se reintenta.
    pub fn submit_at(&self, submission: &JobSubmission, now: DateTime<Utc>) -> Result<JobRecord> {
        let topic = match submission.topic.as_deref() {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => return Err(Error::validation("Missing required field: topic")),
        };

        let mut created_at = truncate_to_millis(now);
        loop {
            let record = JobRecord::pending(
                topic.clone(),
                submission.category.clone(),
                submission.notes.clone().unwrap_or_default(),
                created_at,
            );

            let payload = serde_json::to_vec_pretty(&record).map_err(|source| Error::Corrupt {
                path: self.store.path_for(Store::Pending, &record.id).unwrap_or_default(),
                source,
            })?;

            if self.store.create(Store::Pending, &record.id, &payload)? {
                info!(id = %record.id, topic = %record.topic, "job encolado");
                return Ok(record);
            }

            debug!(id = %record.id, "id ocupado, avanzando timestamp");
            created_at += Duration::milliseconds(1);
        }
    }

    /// Lista todos los registros pendientes, ordenados por clave
    ///
    /// Un registro ilegible hace fallar toda la operación con un error de
    /// storage que nombra el archivo.
    pub fn list_pending(&self) -> Result<Vec<JobRecord>> {
        let keys = self.store.list(Store::Pending)?;
        let mut records = Vec::with_capacity(keys.len());

        for key in keys {
            // El worker puede haber borrado el registro entre list y read
            let Some(payload) = self.store.read_optional(Store::Pending, &key)? else {
                continue;
            };
            records.push(self.parse_record(&key, &payload)?);
        }

        Ok(records)
    }

    /// Lee el registro pendiente `id`, si existe
    pub fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        match self.store.read_optional(Store::Pending, id)? {
            Some(payload) => Ok(Some(self.parse_record(id, &payload)?)),
            None => Ok(None),
        }
    }

    /// Número de registros en el pending store
    pub fn len(&self) -> Result<usize> {
        Ok(self.store.list(Store::Pending)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn parse_record(&self, key: &str, payload: &[u8]) -> Result<JobRecord> {
        serde_json::from_slice(payload).map_err(|source| Error::Corrupt {
            path: self.store.dir(Store::Pending).join(format!("{}.json", key)),
            source,
        })
    }
}

fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::jobs::types::JobStatus;
    use chrono::TimeZone;
    use regex::Regex;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn temp_queue() -> (TempDir, FileStore, QueueManager) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("queue"), dir.path().join("output"));
        store.ensure_all().unwrap();
        let queue = QueueManager::new(store.clone());
        (dir, store, queue)
    }

    // ==================== Submit ====================

    #[test]
    fn test_submit_id_format() {
        let (_dir, store, queue) = temp_queue();

        let record = queue.submit(&JobSubmission::new("Roman Aqueducts")).unwrap();

        let pattern = Regex::new(r"^\d+-roman-aqueducts$").unwrap();
        assert!(pattern.is_match(&record.id), "id: {}", record.id);
        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(record.notes, "");
        assert!(store.exists(Store::Pending, &record.id).unwrap());
    }

    #[test]
    fn test_submit_missing_topic() {
        let (_dir, _store, queue) = temp_queue();

        let err = queue.submit(&JobSubmission::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("topic"));
    }

    #[test]
    fn test_submit_blank_topic() {
        let (_dir, _store, queue) = temp_queue();

        let err = queue.submit(&JobSubmission::new("   ")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_submit_same_millisecond_gets_unique_ids() {
        let (_dir, _store, queue) = temp_queue();
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let first = queue.submit_at(&JobSubmission::new("A!!"), at).unwrap();
        let second = queue.submit_at(&JobSubmission::new("A??"), at).unwrap();
        let third = queue.submit_at(&JobSubmission::new("a--"), at).unwrap();

        assert_eq!(first.id, "1700000000000-a--");
        assert_eq!(second.id, "1700000000001-a--");
        assert_eq!(third.id, "1700000000002-a--");
        assert_eq!(second.created_at.timestamp_millis(), 1_700_000_000_001);
        assert_eq!(queue.len().unwrap(), 3);
    }

    #[test]
    fn test_submit_ids_unique_in_store() {
        let (_dir, _store, queue) = temp_queue();

        let ids: Vec<String> = (0..20)
            .map(|_| queue.submit(&JobSubmission::new("Same Topic")).unwrap().id)
            .collect();

        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(queue.list_pending().unwrap().len(), 20);
    }

    #[test]
    fn test_submit_to_missing_store_fails() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("missing"), dir.path().join("out"));
        let queue = QueueManager::new(store);

        let err = queue.submit(&JobSubmission::new("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    // ==================== List ====================

    #[test]
    fn test_round_trip_through_list_pending() {
        let (_dir, _store, queue) = temp_queue();

        let submitted = queue
            .submit(
                &JobSubmission::new("Roman Aqueducts")
                    .with_category("history")
                    .with_notes("keep it short"),
            )
            .unwrap();
        let plain = queue.submit(&JobSubmission::new("Volcanoes")).unwrap();

        let listed = queue.list_pending().unwrap();
        assert_eq!(listed.len(), 2);

        let back = listed.iter().find(|r| r.id == submitted.id).unwrap();
        assert_eq!(back, &submitted);
        assert_eq!(back.category.as_deref(), Some("history"));
        assert_eq!(back.notes, "keep it short");

        let back_plain = listed.iter().find(|r| r.id == plain.id).unwrap();
        assert_eq!(back_plain.notes, "");
        assert_eq!(back_plain.category, None);
        assert_eq!(back_plain.created_at, plain.created_at);
    }

    #[test]
    fn test_list_pending_empty() {
        let (_dir, _store, queue) = temp_queue();
        assert!(queue.list_pending().unwrap().is_empty());
    }

    #[test]
    fn test_list_pending_corrupt_record_names_key() {
        let (_dir, store, queue) = temp_queue();

        queue.submit(&JobSubmission::new("fine")).unwrap();
        fs::write(
            store.dir(Store::Pending).join("123-broken.json"),
            "{ this is not valid json }",
        )
        .unwrap();

        let err = queue.list_pending().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("123-broken.json"));
    }

    #[test]
    fn test_get() {
        let (_dir, _store, queue) = temp_queue();

        let record = queue.submit(&JobSubmission::new("x")).unwrap();
        assert_eq!(queue.get(&record.id).unwrap(), Some(record));
        assert_eq!(queue.get("0-missing").unwrap(), None);
    }
}
