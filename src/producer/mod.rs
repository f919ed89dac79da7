//! # Productores de Guiones
//! src/producer/mod.rs
//!
//! El núcleo nunca genera guiones: solo encola y consulta. Este módulo
//! define el contrato del lado que sí los genera y un worker que lo
//! conecta con los almacenes.
//!
//! - `ScriptProducer`: dado un Job Record, produce cero o un cuerpo de guion
//! - `worker`: recorre el pending store y escribe artefactos
//! - `llm`: productor que usa un servicio de completion y búsquedas

pub mod llm;
pub mod worker;

use crate::error::Result;
use crate::jobs::types::JobRecord;

pub use llm::{CompletionService, ImageHit, ImageSearch, LlmProducer, SearchHit, WebSearch};
pub use worker::{Worker, WorkerHandle, WorkerReport};

/// Contrato de un productor de guiones
///
/// `Ok(None)` significa que el productor decidió no generar artefacto
/// para ese job; el job queda pendiente.
pub trait ScriptProducer: Send + Sync {
    fn produce(&self, job: &JobRecord) -> Result<Option<String>>;
}

impl<F> ScriptProducer for F
where
    F: Fn(&JobRecord) -> Result<Option<String>> + Send + Sync,
{
    fn produce(&self, job: &JobRecord) -> Result<Option<String>> {
        self(job)
    }
}
