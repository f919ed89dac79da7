//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración explícita que se pasa al storage y al servidor al
//! construirlos. Todo valor se puede dar por CLI o por variable de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./script_queue --port 8889 \
//!   --queue-dir ./data/queue \
//!   --output-dir ./data/output/scripts \
//!   --artifact-keying slug
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=9000 QUEUE_DIR=/srv/queue RUST_LOG=debug ./script_queue
//! ```

use crate::jobs::resolver::ArtifactKeying;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Configuración del servidor de la cola de guiones
#[derive(Debug, Clone, Parser)]
#[command(name = "script_queue")]
#[command(about = "Cola local de generación de guiones sobre HTTP/1.0")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8889", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Storage ===
    /// Directorio del pending store (un `<id>.json` por job)
    #[arg(long = "queue-dir", default_value = "./data/queue", env = "QUEUE_DIR")]
    pub queue_dir: PathBuf,

    /// Directorio del output store (un `<clave>.md` por guion)
    #[arg(long = "output-dir", default_value = "./data/output/scripts", env = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Cómo se nombra el artefacto de un job
    #[arg(long = "artifact-keying", value_enum, default_value_t = ArtifactKeying::Slug, env = "ARTIFACT_KEYING")]
    pub artifact_keying: ArtifactKeying,

    // === Límites ===
    /// Tamaño máximo del body de un request, en bytes
    #[arg(long = "max-body-bytes", default_value = "1048576", env = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // === Logging ===
    /// Filtro de logs (sintaxis de EnvFilter)
    #[arg(long = "log", default_value = "info", env = "RUST_LOG")]
    pub log_filter: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI y entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use script_queue::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8889");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port must be >= 1".to_string());
        }
        if self.max_body_bytes == 0 {
            return Err("Max body bytes must be >= 1".to_string());
        }
        if self.queue_dir == self.output_dir {
            return Err("Queue dir and output dir must be different".to_string());
        }
        if self.host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }
        Ok(())
    }

    /// Registra un resumen de la configuración en el log
    pub fn log_summary(&self) {
        info!(address = %self.address(), "red");
        info!(
            queue_dir = %self.queue_dir.display(),
            output_dir = %self.output_dir.display(),
            keying = %self.artifact_keying,
            "storage"
        );
        info!(max_body_bytes = self.max_body_bytes, "límites");
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8889,
            host: "127.0.0.1".to_string(),
            queue_dir: PathBuf::from("./data/queue"),
            output_dir: PathBuf::from("./data/output/scripts"),
            artifact_keying: ArtifactKeying::Slug,
            max_body_bytes: 1024 * 1024,
            log_filter: "info".to_string(),
        }
    }
}
