//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Implementación del servidor TCP que maneja múltiples conexiones
//! simultáneas usando threads. Cada conexión se procesa en su propio
//! thread y se cierra después de una respuesta (HTTP/1.0).

use crate::config::Config;
use crate::error::Result;
use crate::http::{read_request, Method, Request, Response, StatusCode};
use crate::jobs::handlers::{self as job_handlers, JobContext};
use crate::jobs::storage::FileStore;
use crate::router::Router;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Tiempo máximo esperando bytes de un cliente
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Servidor HTTP/1.0 de la cola de guiones
pub struct Server {
    config: Config,
    router: Arc<Router<JobContext>>,
    context: Arc<JobContext>,
    listener: Option<TcpListener>,
}

impl Server {
    /// Crea el servidor: asegura ambos almacenes y registra las rutas
    pub fn new(config: Config) -> Result<Self> {
        let store = FileStore::from_config(&config);
        store.ensure_all()?;

        let context = JobContext::new(store, config.artifact_keying);

        Ok(Self {
            config,
            router: Arc::new(Self::build_router()),
            context: Arc::new(context),
            listener: None,
        })
    }

    /// Tabla de rutas de la API
    pub fn build_router() -> Router<JobContext> {
        let mut router = Router::new();
        router.register(Method::POST, "/generate-script", job_handlers::generate_script_handler);
        router.register_prefix(Method::GET, "/status/", job_handlers::status_handler);
        router.register(Method::GET, "/scripts", job_handlers::scripts_handler);
        router.register(Method::GET, "/queue", job_handlers::queue_handler);
        router
    }

    /// Hace bind a la dirección configurada y retorna la dirección real
    ///
    /// Con `port = 0` el sistema elige un puerto libre.
    pub fn bind(&mut self) -> io::Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return listener.local_addr();
        }

        let address = self.config.address();
        info!("Iniciando servidor en {}", address);

        let listener = TcpListener::bind(&address)?;
        let local = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(local)
    }

    /// Acepta conexiones para siempre, un thread por conexión
    pub fn run(&mut self) -> io::Result<()> {
        let local = self.bind()?;
        info!("Servidor escuchando en {}", local);

        let listener = match &self.listener {
            Some(listener) => listener,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "listener not bound")),
        };

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    let context = Arc::clone(&self.context);
                    let max_body = self.config.max_body_bytes;

                    let peer = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_string());
                    debug!(%peer, "nueva conexión");

                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(stream, &router, &context, max_body) {
                            warn!(%peer, error = %e, "error en la conexión");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "error al aceptar conexión");
                }
            }
        }

        Ok(())
    }

    /// Procesa un request completo sobre `stream` y escribe la respuesta
    pub fn handle_connection(
        mut stream: TcpStream,
        router: &Router<JobContext>,
        context: &JobContext,
        max_body: usize,
    ) -> io::Result<()> {
        let start = Instant::now();
        let request_id = Self::request_id(&start);

        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let raw = match read_request(&mut stream, max_body) {
            Ok(raw) if raw.is_empty() => {
                debug!("conexión cerrada sin datos");
                return Ok(());
            }
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(e.to_string()),
            Err(e) => return Err(e),
        };

        let (mut response, label) = match raw {
            Ok(raw) => match Request::parse(&raw) {
                Ok(request) => {
                    let label = format!("{} {}", request.method().as_str(), request.path());
                    let response = if request.method() == Method::OPTIONS {
                        job_handlers::preflight_response()
                    } else {
                        router.route(&request, context)
                    };
                    (response, label)
                }
                Err(e) => {
                    warn!(error = %e, "request inválido");
                    (
                        Response::error(StatusCode::BadRequest, &format!("Invalid: {}", e)),
                        "<invalid>".to_string(),
                    )
                }
            },
            Err(reason) => {
                warn!(%reason, "request demasiado grande");
                (
                    Response::error(StatusCode::PayloadTooLarge, &reason),
                    "<too large>".to_string(),
                )
            }
        };

        response.add_cors_headers();
        response.add_header("X-Request-Id", &request_id);
        response.add_header("Connection", "close");

        stream.write_all(&response.to_bytes())?;
        stream.flush()?;

        info!(
            request_id = %&request_id[..8],
            request = %label,
            status = response.status().as_u16(),
            latency_ms = %format!("{:.2}", start.elapsed().as_secs_f64() * 1000.0),
            "request atendido"
        );

        Ok(())
    }

    /// Id corto por request para correlacionar logs y respuestas
    fn request_id(start: &Instant) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        start.hash(&mut hasher);
        thread::current().id().hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }
}
