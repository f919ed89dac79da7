//! # Resolución de Estado
//! src/jobs/resolver.rs
//!
//! Calcula el estado de un job en cada consulta a partir de lo que hay
//! en disco. No se guarda ninguna transición: el artefacto manda.
//!
//! ```text
//! artefacto existe        → done (con contenido)
//! registro pendiente existe → estado del registro
//! ninguno                 → not_found
//! ```

use crate::error::Result;
use crate::jobs::storage::{decode_text, validate_key, FileStore, Store};
use crate::jobs::types::{strip_timestamp_prefix, JobRecord, JobStatus};
use crate::jobs::queue::QueueManager;
use clap::ValueEnum;
use std::fmt;

/// Cómo se nombra el artefacto de un job en el output store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ArtifactKeying {
    /// `<slug>.md`: id sin el prefijo de timestamp. Dos topics con el
    /// mismo slug comparten artefacto.
    #[default]
    Slug,

    /// `<id>.md`: un artefacto por job
    Id,
}

impl ArtifactKeying {
    /// Clave del artefacto para un id de job
    pub fn artifact_key<'a>(&self, id: &'a str) -> &'a str {
        match self {
            ArtifactKeying::Slug => strip_timestamp_prefix(id),
            ArtifactKeying::Id => id,
        }
    }

    /// Clave del artefacto para un registro
    pub fn key_for(&self, record: &JobRecord) -> String {
        self.artifact_key(&record.id).to_string()
    }
}

impl fmt::Display for ArtifactKeying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKeying::Slug => write!(f, "slug"),
            ArtifactKeying::Id => write!(f, "id"),
        }
    }
}

/// Resultado de resolver un id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusResult {
    /// Hay artefacto; `content` es su texto completo
    Done { content: String },

    /// Solo existe el registro en cola
    Queued { status: JobStatus },

    /// Ni artefacto ni registro
    NotFound,
}

impl StatusResult {
    /// Nombre del estado tal como se expone en `/status/{id}`
    pub fn status_str(&self) -> &str {
        match self {
            StatusResult::Done { .. } => "done",
            StatusResult::Queued { status } => status.as_str(),
            StatusResult::NotFound => "not_found",
        }
    }
}

/// Resolver de estado
#[derive(Debug, Clone)]
pub struct StatusResolver {
    store: FileStore,
    queue: QueueManager,
    keying: ArtifactKeying,
}

impl StatusResolver {
    pub fn new(store: FileStore, keying: ArtifactKeying) -> Self {
        let queue = QueueManager::new(store.clone());
        Self {
            store,
            queue,
            keying,
        }
    }

    /// Determina si `id` está terminado, pendiente o es desconocido
    ///
    /// # Errores
    /// - `Validation` si `id` no puede ser una clave del store
    /// - `Storage` ante fallas de I/O o un registro ilegible
    pub fn resolve(&self, id: &str) -> Result<StatusResult> {
        validate_key(id)?;

        let artifact_key = self.keying.artifact_key(id);
        // "123-" deja un slug vacío: no puede tener artefacto
        if validate_key(artifact_key).is_ok() {
            if let Some(payload) = self.store.read_optional(Store::Output, artifact_key)? {
                return Ok(StatusResult::Done {
                    content: decode_text(payload),
                });
            }
        }

        match self.queue.get(id)? {
            Some(record) => Ok(StatusResult::Queued {
                status: record.status,
            }),
            None => Ok(StatusResult::NotFound),
        }
    }

    pub fn keying(&self) -> ArtifactKeying {
        self.keying
    }
}
