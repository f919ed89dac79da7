//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Este módulo implementa un parser HTTP/1.0 desde cero.
//!
//! ## Formato de un Request HTTP/1.0
//!
//! ```text
//! POST /generate-script HTTP/1.0\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 28\r\n
//! \r\n
//! {"topic": "Roman Aqueducts"}
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.0`
//! 2. **Headers**: Pares `Name: Value` (uno por línea)
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: exactamente `Content-Length` bytes

use std::collections::HashMap;
use std::io::{self, Read};

/// Tamaño máximo de la sección de headers
pub const MAX_HEADER_BYTES: usize = 8192;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,

    /// POST - Enviar datos a un recurso
    POST,

    /// OPTIONS - Preflight de CORS
    OPTIONS,
}

impl Method {
    /// Parsea un método HTTP desde un string
    ///
    /// # Errores
    ///
    /// Retorna error si el método no es soportado
    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

/// Representa un request HTTP/1.0 parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP (GET, HEAD, POST, OPTIONS)
    method: Method,

    /// Path de la petición ya decodificado (ej: "/status/123-abc")
    path: String,

    /// Query parameters parseados
    query_params: HashMap<String, String>,

    /// Headers HTTP, con el nombre en minúsculas
    headers: HashMap<String, String>,

    /// Versión HTTP ("HTTP/1.0" o "HTTP/1.1")
    version: String,

    /// Body del request
    body: Vec<u8>,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Request incompleto o truncado
    IncompleteRequest,

    /// Formato inválido de la request line
    InvalidRequestLine,

    /// Método HTTP no soportado
    UnsupportedMethod(String),

    /// Versión HTTP incorrecta
    InvalidHttpVersion(String),

    /// Header malformado
    InvalidHeader(String),

    /// Request vacío
    EmptyRequest,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncompleteRequest => write!(f, "Incomplete HTTP request"),
            ParseError::InvalidRequestLine => write!(f, "Invalid request line format"),
            ParseError::UnsupportedMethod(m) => write!(f, "Unsupported HTTP method: {}", m),
            ParseError::InvalidHttpVersion(v) => write!(f, "Invalid HTTP version: {}", v),
            ParseError::InvalidHeader(h) => write!(f, "Invalid header: {}", h),
            ParseError::EmptyRequest => write!(f, "Empty request"),
        }
    }
}

impl std::error::Error for ParseError {}

impl Request {
    /// Parsea un request HTTP/1.0 desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use script_queue::http::Request;
    ///
    /// let raw = b"GET /status/17-roman?verbose=1 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/status/17-roman");
    /// assert_eq!(request.query_param("verbose"), Some("1"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        // Separar head y body en la primera línea vacía
        let (head, body) = match find_subslice(buffer, b"\r\n\r\n") {
            Some(pos) => (&buffer[..pos], &buffer[pos + 4..]),
            None => (buffer, &[][..]),
        };

        // El head debe ser UTF-8 válido; el body se guarda en bruto
        let head_str = std::str::from_utf8(head).map_err(|_| ParseError::InvalidRequestLine)?;

        if head_str.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = head_str.split("\r\n");
        let request_line = lines.next().ok_or(ParseError::IncompleteRequest)?;

        // 1. Request line
        let (method, path, query_params, version) = Self::parse_request_line(request_line)?;

        // 2. Headers
        let headers = Self::parse_headers(lines)?;

        // 3. Body, recortado a Content-Length; sin el header es el resto del buffer
        let body = match headers.get("content-length") {
            None => body.to_vec(),
            Some(value) => {
                let len = value.parse::<usize>().map_err(|_| {
                    ParseError::InvalidHeader(format!("Content-Length: {}", value))
                })?;
                body[..len.min(body.len())].to_vec()
            }
        };

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
            body,
        })
    }

    /// Parsea la request line (primera línea del request)
    ///
    /// Formato: `GET /path?query HTTP/1.0`
    fn parse_request_line(
        line: &str,
    ) -> Result<(Method, String, HashMap<String, String>, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Debe tener exactamente 3 partes: METHOD PATH VERSION
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::from_str(parts[0])?;
        let (path, query_params) = Self::parse_path_and_query(parts[1]);

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, path, query_params, version))
    }

    /// Parsea el path y extrae los query parameters
    ///
    /// Ejemplo: "/status/17-x?verbose=1"
    /// Retorna: ("/status/17-x", {"verbose": "1"})
    fn parse_path_and_query(path_with_query: &str) -> (String, HashMap<String, String>) {
        match path_with_query.split_once('?') {
            Some((path, query)) => (
                percent_decode(path, false),
                Self::parse_query_string(query),
            ),
            None => (percent_decode(path_with_query, false), HashMap::new()),
        }
    }

    /// Parsea una query string en un HashMap
    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for param in query.split('&') {
            if param.is_empty() {
                continue;
            }

            match param.split_once('=') {
                Some((key, value)) => {
                    params.insert(percent_decode(key, true), percent_decode(value, true));
                }
                // Parámetro sin valor (ej: "?debug")
                None => {
                    params.insert(percent_decode(param, true), String::new());
                }
            }
        }

        params
    }

    /// Parsea los headers HTTP
    ///
    /// Cada header tiene formato "Name: Value". El nombre se guarda en
    /// minúsculas porque HTTP no distingue mayúsculas en los nombres.
    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
                }
                None => return Err(ParseError::InvalidHeader(line.to_string())),
            }
        }

        Ok(headers)
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Obtiene el path del request
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene todos los query parameters
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header específico (sin distinguir mayúsculas)
    ///
    /// # Ejemplo
    /// ```
    /// use script_queue::http::Request;
    ///
    /// let raw = b"GET / HTTP/1.0\r\nContent-Type: application/json\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.header("content-type"), Some("application/json"));
    /// assert_eq!(request.header("Content-Type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Obtiene el body del request como String
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}

/// Lee un request completo desde un stream
///
/// Lee hasta la línea vacía que cierra los headers y luego exactamente
/// `Content-Length` bytes de body. Si el peer cierra antes, retorna lo
/// leído y el parser decide.
///
/// # Errores
/// `InvalidData` si los headers pasan `MAX_HEADER_BYTES` o el body
/// declarado pasa `max_body`.
pub fn read_request<R: Read>(reader: &mut R, max_body: usize) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_subslice(&buffer, b"\r\n\r\n") {
            break pos + 4;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Request headers too large",
            ));
        }

        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Ok(buffer);
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let content_length = declared_content_length(&buffer[..header_end]);
    if content_length > max_body {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Request body too large: {} bytes (max {})",
                content_length, max_body
            ),
        ));
    }

    let total = header_end + content_length;
    while buffer.len() < total {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    buffer.truncate(total.min(buffer.len()));

    Ok(buffer)
}

/// Busca `Content-Length` en el head crudo; 0 si no está o no es número
/// Largo declarado del body; uno ilegible cuenta como 0 acá y lo rechaza
/// `Request::parse`
fn declared_content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decodifica `%XX` (y `+` como espacio en query strings)
///
/// Las secuencias inválidas se dejan tal cual.
fn percent_decode(s: &str, plus_as_space: bool) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                out.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
                i += 3;
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
