//! # Módulo HTTP
//!
//! Este módulo implementa el protocolo HTTP/1.0 desde cero, sin usar
//! librerías de alto nivel. Incluye:
//!
//! - Parsing de requests HTTP/1.0 (se aceptan request lines HTTP/1.1)
//! - Lectura de requests con body acotado por `Content-Length`
//! - Construcción de responses JSON con CORS
//! - Manejo de status codes
//!
//! ### Formato de Request
//!
//! ```text
//! GET /status/1700000000000-roman-aqueducts HTTP/1.0\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 20\r\n
//! \r\n
//! {"status":"pending"}
//! ```

pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

// Re-exportamos los tipos principales para facilitar su uso
pub use request::{read_request, Method, Request};
pub use response::Response;
pub use status::StatusCode;
