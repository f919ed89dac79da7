//! # Script Queue
//! src/lib.rs
//!
//! Servidor HTTP/1.0 local delante de una cola de generación de guiones
//! respaldada por archivos. Los clientes encolan pedidos, consultan su
//! estado y listan los guiones terminados.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing de requests y armado de respuestas HTTP/1.0
//! - `router`: Enrutamiento de peticiones a handlers
//! - `server`: Servidor TCP, un thread por conexión
//! - `jobs`: Almacenes en disco, cola, resolución de estado y handlers
//! - `producer`: Contrato del generador de guiones y worker de fondo
//! - `config`: Configuración por CLI y entorno
//! - `error`: Errores tipados y su mapeo a status HTTP
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use script_queue::config::Config;
//! use script_queue::server::Server;
//!
//! let config = Config::default();
//! let mut server = Server::new(config).expect("Error al crear servidor");
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod jobs;
pub mod producer;
pub mod router;
pub mod server;

pub use error::{Error, ErrorKind, Result};
