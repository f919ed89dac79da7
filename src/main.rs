//! # Script Queue - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor. Lee la configuración de CLI/entorno,
//! instala el subscriber de logs y atiende conexiones hasta que se mata
//! el proceso.

use script_queue::config::Config;
use script_queue::server::Server;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let config = Config::new();

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = config.validate() {
        error!(error = %e, "configuración inválida");
        std::process::exit(2);
    }

    config.log_summary();

    let mut server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "no se pudo preparar el almacenamiento");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        error!(error = %e, "error fatal del servidor");
        std::process::exit(1);
    }
}
