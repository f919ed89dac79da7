//! # Cola de Guiones
//! src/jobs/mod.rs
//!
//! Cola respaldada por archivos: un `<id>.json` por job pendiente y un
//! `<clave>.md` por guion generado. El núcleo solo encola y consulta;
//! los artefactos los escribe un productor externo (ver `producer`).
//!
//! ## Endpoints
//!
//! - `POST /generate-script` - Encolar un job (`{topic, category?, notes?}`)
//! - `GET /status/<id>` - Estado derivado: `done`, estado del registro o `not_found`
//! - `GET /scripts` - Catálogo de guiones generados
//! - `GET /queue` - Jobs pendientes

pub mod artifacts;
pub mod handlers;
pub mod queue;
pub mod resolver;
pub mod storage;
pub mod types;

pub use artifacts::ScriptArtifact;
pub use handlers::JobContext;
pub use queue::QueueManager;
pub use resolver::{ArtifactKeying, StatusResolver, StatusResult};
pub use storage::{FileStore, Store};
pub use types::{JobRecord, JobStatus, JobSubmission};
