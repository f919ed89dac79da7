//! # Códigos de Estado HTTP
//!
//! Este módulo define los códigos de estado HTTP que usa el servidor:
//!
//! - **2xx**: Éxito (200 OK)
//! - **4xx**: Error del cliente (400, 404, 405, 413)
//! - **5xx**: Error del servidor (500, 502)

use crate::error::ErrorKind;

/// Representa los códigos de estado HTTP que soporta nuestro servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 400 Bad Request - Parámetros inválidos o malformados
    BadRequest = 400,

    /// 404 Not Found - Ruta o recurso no encontrado
    NotFound = 404,

    /// 405 Method Not Allowed - La ruta existe pero no para ese método
    MethodNotAllowed = 405,

    /// 413 Payload Too Large - Body o headers por encima del límite
    PayloadTooLarge = 413,

    /// 500 Internal Server Error - Error interno del servidor
    InternalServerError = 500,

    /// 502 Bad Gateway - Falló un servicio externo
    BadGateway = 502,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use script_queue::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use script_queue::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::BadGateway => "Bad Gateway",
        }
    }

    /// Código que corresponde a cada categoría de error del núcleo
    pub fn from_error_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => StatusCode::BadRequest,
            ErrorKind::NotFound => StatusCode::NotFound,
            ErrorKind::Storage => StatusCode::InternalServerError,
            ErrorKind::Upstream => StatusCode::BadGateway,
        }
    }

    /// Verifica si el código indica éxito (2xx)
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }

    /// Verifica si el código indica error del cliente (4xx)
    pub fn is_client_error(&self) -> bool {
        let code = self.as_u16();
        (400..500).contains(&code)
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        let code = self.as_u16();
        (500..600).contains(&code)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
