//! # Construcción de Respuestas HTTP
//!
//! Este módulo proporciona una API para construir respuestas HTTP/1.0
//! y convertirlas a bytes para enviar al cliente.
//!
//! ## Formato de una respuesta HTTP/1.0
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 21\r\n
//! Access-Control-Allow-Origin: *\r\n
//! \r\n
//! {"status":"pending"}
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use script_queue::http::{Response, StatusCode};
//! use serde_json::json;
//!
//! let response = Response::json(StatusCode::Ok, &json!({"status": "pending"}))
//!     .with_cors();
//!
//! let bytes = response.to_bytes();
//! // Ahora puedes enviar `bytes` por el socket
//! ```

use super::StatusCode;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

/// Representa una respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP
    status: StatusCode,

    /// Headers HTTP; HashMap para evitar duplicados
    headers: HashMap<String, String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una nueva respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Respuesta sin body con `Content-Length: 0`
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status).with_body("")
    }

    /// Agrega un header a la respuesta; si ya existe, se sobrescribe
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Agrega un header a una respuesta existente (versión mutable)
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el cuerpo de la respuesta desde un string
    ///
    /// Automáticamente calcula y agrega el header `Content-Length`.
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self.headers.insert(
            "Content-Length".to_string(),
            self.body.len().to_string(),
        );
        self
    }

    /// Crea una respuesta JSON serializando `value`
    ///
    /// Automáticamente establece `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body(&body),
            Err(e) => Self::error(
                StatusCode::InternalServerError,
                &format!("Cannot serialize response: {}", e),
            ),
        }
    }

    /// Crea una respuesta de error con mensaje JSON
    ///
    /// Formato: `{"success": false, "error": "mensaje"}`
    ///
    /// # Ejemplo
    /// ```
    /// use script_queue::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::BadRequest, "Missing required field: topic");
    /// assert_eq!(response.status(), StatusCode::BadRequest);
    /// ```
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = json!({ "success": false, "error": message }).to_string();
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(&body)
    }

    /// Agrega los headers de CORS abiertos a cualquier origen
    pub fn with_cors(mut self) -> Self {
        self.add_cors_headers();
        self
    }

    pub fn add_cors_headers(&mut self) {
        self.add_header("Access-Control-Allow-Origin", "*");
        self.add_header("Access-Control-Allow-Methods", "POST, GET, OPTIONS");
        self.add_header("Access-Control-Allow-Headers", "Content-Type");
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    ///
    /// - Status line: `HTTP/1.0 200 OK\r\n`
    /// - Headers: `Header-Name: Value\r\n`
    /// - Línea vacía: `\r\n`
    /// - Body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::new();

        // 1. Status line
        let status_line = format!("HTTP/1.0 {}\r\n", self.status);
        result.extend_from_slice(status_line.as_bytes());

        // 2. Headers
        for (name, value) in &self.headers {
            let header_line = format!("{}: {}\r\n", name, value);
            result.extend_from_slice(header_line.as_bytes());
        }

        // 3. Línea vacía que separa headers del body
        result.extend_from_slice(b"\r\n");

        // 4. Body (si existe)
        result.extend_from_slice(&self.body);

        result
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body parseado como JSON (útil en tests y logs)
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}
