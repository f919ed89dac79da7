//! # Errores del sistema
//! src/error.rs
//!
//! Taxonomía única de errores para el núcleo (cola, resolver, storage)
//! y los colaboradores externos. Solo la capa HTTP traduce estos errores
//! a códigos de estado.

use std::io;
use std::path::PathBuf;

/// Resultado estándar del crate
pub type Result<T> = std::result::Result<T, Error>;

/// Categoría de un error, usada por la capa HTTP para elegir el status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entrada faltante o malformada (4xx)
    Validation,

    /// La clave buscada no existe (404)
    NotFound,

    /// Falla de I/O o registro ilegible (5xx)
    Storage,

    /// Falla de un servicio externo (LLM, búsqueda)
    Upstream,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("not found: {key}")]
    NotFound { key: String },

    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Un registro existe pero no se puede deserializar
    #[error("malformed record at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("upstream {service} failed: {message}")]
    Upstream { service: String, message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Storage { .. } | Error::Corrupt { .. } => ErrorKind::Storage,
            Error::Upstream { .. } => ErrorKind::Upstream,
        }
    }
}
