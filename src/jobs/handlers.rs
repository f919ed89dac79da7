//! # Handlers HTTP para Jobs
//! src/jobs/handlers.rs
//!
//! Implementa los endpoints de la cola de guiones:
//! - POST /generate-script
//! - GET /status/{id}
//! - GET /scripts
//! - GET /queue
//! - OPTIONS * (preflight de CORS)

use crate::error::{Error, ErrorKind};
use crate::http::{Request, Response, StatusCode};
use crate::jobs::artifacts::list_scripts;
use crate::jobs::queue::QueueManager;
use crate::jobs::resolver::{ArtifactKeying, StatusResolver, StatusResult};
use crate::jobs::storage::FileStore;
use crate::jobs::types::JobSubmission;
use serde_json::json;
use tracing::{error, warn};

/// Contexto compartido por todos los handlers
#[derive(Debug, Clone)]
pub struct JobContext {
    pub store: FileStore,
    pub queue: QueueManager,
    pub resolver: StatusResolver,
}

impl JobContext {
    pub fn new(store: FileStore, keying: ArtifactKeying) -> Self {
        Self {
            queue: QueueManager::new(store.clone()),
            resolver: StatusResolver::new(store.clone(), keying),
            store,
        }
    }
}

/// Handler para POST /generate-script
///
/// # Body
/// ```json
/// {"topic": "Roman Aqueducts", "category": "history", "notes": ""}
/// ```
///
/// # Ejemplo de response
/// ```json
/// {"success": true, "id": "1700000000000-roman-aqueducts", "message": "..."}
/// ```
pub fn generate_script_handler(req: &Request, ctx: &JobContext) -> Response {
    let submission: JobSubmission = if req.body().iter().all(|b| b.is_ascii_whitespace()) {
        JobSubmission::default()
    } else {
        match serde_json::from_slice(req.body()) {
            Ok(submission) => submission,
            Err(e) => {
                return error_response(&Error::validation(format!("Invalid JSON body: {}", e)))
            }
        }
    };

    match ctx.queue.submit(&submission) {
        Ok(record) => Response::json(
            StatusCode::Ok,
            &json!({
                "success": true,
                "id": record.id,
                "message": "Script queued, the worker will process it.",
            }),
        ),
        Err(e) => error_response(&e),
    }
}

/// Handler para GET /status/{id}
///
/// # Ejemplo de response
/// ```json
/// {"status": "done", "script": "# Roman Aqueducts\n\n..."}
/// {"status": "pending"}
/// {"status": "not_found"}   (404)
/// ```
pub fn status_handler(req: &Request, ctx: &JobContext) -> Response {
    let id = req.path().strip_prefix("/status/").unwrap_or_default();

    match ctx.resolver.resolve(id) {
        Ok(StatusResult::Done { content }) => Response::json(
            StatusCode::Ok,
            &json!({ "status": "done", "script": content }),
        ),
        Ok(StatusResult::Queued { status }) => {
            Response::json(StatusCode::Ok, &json!({ "status": status.as_str() }))
        }
        Ok(StatusResult::NotFound) => {
            Response::json(StatusCode::NotFound, &json!({ "status": "not_found" }))
        }
        Err(e) => error_response(&e),
    }
}

/// Handler para GET /scripts
pub fn scripts_handler(_req: &Request, ctx: &JobContext) -> Response {
    match list_scripts(&ctx.store) {
        Ok(scripts) => Response::json(
            StatusCode::Ok,
            &json!({ "success": true, "scripts": scripts }),
        ),
        Err(e) => error_response(&e),
    }
}

/// Handler para GET /queue
pub fn queue_handler(_req: &Request, ctx: &JobContext) -> Response {
    match ctx.queue.list_pending() {
        Ok(queue) => Response::json(StatusCode::Ok, &json!({ "success": true, "queue": queue })),
        Err(e) => error_response(&e),
    }
}

/// Respuesta a un preflight de CORS: 200 sin body
pub fn preflight_response() -> Response {
    Response::empty(StatusCode::Ok).with_cors()
}

/// Traduce un error del núcleo a `{"success": false, "error": ...}`
pub fn error_response(err: &Error) -> Response {
    let status = StatusCode::from_error_kind(err.kind());
    match err.kind() {
        ErrorKind::Storage | ErrorKind::Upstream => error!(error = %err, "request fallido"),
        _ => warn!(error = %err, "request rechazado"),
    }
    Response::error(status, &err.to_string())
}
