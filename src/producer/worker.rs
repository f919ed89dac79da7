//! # Worker de Generación
//! src/producer/worker.rs
//!
//! Recorre el pending store, y para cada job sin artefacto le pide el
//! cuerpo al productor y escribe `<clave>.md`. No borra registros
//! pendientes: el estado `done` sigue saliendo de la existencia del
//! artefacto.

use crate::error::{Error, Result};
use crate::jobs::artifacts::write_artifact;
use crate::jobs::queue::QueueManager;
use crate::jobs::resolver::ArtifactKeying;
use crate::jobs::storage::{FileStore, Store};
use crate::producer::ScriptProducer;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resumen de una pasada del worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Artefactos escritos en esta pasada
    pub produced: usize,

    /// Jobs que ya tenían artefacto o que el productor decidió no generar
    pub skipped: usize,

    /// Jobs cuyo productor falló; quedan pendientes
    pub failed: usize,
}

/// Worker que convierte jobs pendientes en artefactos
pub struct Worker<P> {
    store: FileStore,
    queue: QueueManager,
    keying: ArtifactKeying,
    producer: P,
}

impl<P: ScriptProducer> Worker<P> {
    pub fn new(store: FileStore, keying: ArtifactKeying, producer: P) -> Self {
        Self {
            queue: QueueManager::new(store.clone()),
            store,
            keying,
            producer,
        }
    }

    /// Una pasada sobre todo el pending store
    ///
    /// Las fallas del productor se registran y no cortan la pasada; solo
    /// un error al listar o al escribir un artefacto se propaga.
    pub fn run_once(&self) -> Result<WorkerReport> {
        let mut report = WorkerReport::default();

        for job in self.queue.list_pending()? {
            let key = self.keying.key_for(&job);

            if self.store.exists(Store::Output, &key)? {
                report.skipped += 1;
                continue;
            }

            match self.producer.produce(&job) {
                Ok(Some(body)) => {
                    write_artifact(&self.store, &key, &job.topic, &body)?;
                    info!(id = %job.id, artifact = %key, "guion generado");
                    report.produced += 1;
                }
                Ok(None) => {
                    debug!(id = %job.id, "el productor no generó artefacto");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(id = %job.id, error = %e, "falló la generación, el job sigue pendiente");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

impl<P: ScriptProducer + 'static> Worker<P> {
    /// Lanza el worker en su propio thread, con una pasada cada `interval`
    pub fn spawn(self, interval: Duration) -> WorkerHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::spawn(move || loop {
            match self.run_once() {
                Ok(report) if report != WorkerReport::default() => {
                    debug!(?report, "pasada del worker");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "pasada del worker fallida"),
            }

            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        WorkerHandle {
            stop: stop_tx,
            thread,
        }
    }
}

/// Handle para detener un worker lanzado con `spawn`
pub struct WorkerHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Pide al worker que termine y espera a que lo haga
    pub fn stop(self) -> Result<()> {
        let _ = self.stop.send(());
        self.thread
            .join()
            .map_err(|_| Error::upstream("worker", "worker thread panicked"))
    }
}
