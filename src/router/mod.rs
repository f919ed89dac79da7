//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo implementa el router que mapea método + path a handlers.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler(request, contexto) → Response
//! ```
//!
//! Una ruta puede ser exacta (`/scripts`) o de prefijo (`/status/`), en
//! cuyo caso el handler lee el resto del path. Si el path existe pero no
//! para ese método se retorna 405; si no existe, 404.

use crate::http::{Method, Request, Response, StatusCode};

/// Tipo de función handler
///
/// Un handler recibe el Request y el contexto compartido y retorna una Response
pub type Handler<C> = fn(&Request, &C) -> Response;

/// Forma de comparar el path de una ruta
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => p == path,
            PathPattern::Prefix(p) => path.len() > p.len() && path.starts_with(p.as_str()),
        }
    }
}

struct Route<C> {
    method: Method,
    pattern: PathPattern,
    handler: Handler<C>,
}

/// Router que mapea (método, path) a handlers
pub struct Router<C> {
    routes: Vec<Route<C>>,
}

impl<C> Router<C> {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta exacta con su handler
    ///
    /// # Ejemplo
    /// ```
    /// use script_queue::router::Router;
    /// use script_queue::http::{Method, Request, Response, StatusCode};
    ///
    /// fn hello_handler(_req: &Request, _ctx: &()) -> Response {
    ///     Response::json(StatusCode::Ok, &serde_json::json!({"message": "Hello"}))
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello", hello_handler);
    /// ```
    pub fn register(&mut self, method: Method, path: &str, handler: Handler<C>) {
        self.routes.push(Route {
            method,
            pattern: PathPattern::Exact(path.to_string()),
            handler,
        });
    }

    /// Registra una ruta que acepta cualquier path con ese prefijo
    /// (y al menos un caracter más)
    pub fn register_prefix(&mut self, method: Method, prefix: &str, handler: Handler<C>) {
        self.routes.push(Route {
            method,
            pattern: PathPattern::Prefix(prefix.to_string()),
            handler,
        });
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    pub fn route(&self, request: &Request, context: &C) -> Response {
        let path = request.path();
        let mut path_known = false;

        for route in &self.routes {
            if !route.pattern.matches(path) {
                continue;
            }
            path_known = true;

            if route.method == request.method() {
                let mut response = (route.handler)(request, context);
                self.add_common_headers(&mut response);
                return response;
            }
        }

        let mut response = if path_known {
            Response::error(
                StatusCode::MethodNotAllowed,
                &format!("Method {} not allowed for {}", request.method().as_str(), path),
            )
        } else {
            Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
        };
        self.add_common_headers(&mut response);
        response
    }

    /// Agrega headers comunes a todas las respuestas
    fn add_common_headers(&self, response: &mut Response) {
        response.add_header("Server", "script-queue/0.1");
        response.add_header("Connection", "close");
    }
}

impl<C> Default for Router<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_handler(_req: &Request, _ctx: &()) -> Response {
        Response::json(StatusCode::Ok, &json!({"test": "ok"}))
    }

    fn echo_tail_handler(req: &Request, _ctx: &()) -> Response {
        let tail = req.path().strip_prefix("/status/").unwrap_or_default();
        Response::json(StatusCode::Ok, &json!({ "tail": tail }))
    }

    fn request(raw: &[u8]) -> Request {
        Request::parse(raw).unwrap()
    }

    #[test]
    fn test_router_creation() {
        let router: Router<()> = Router::new();
        assert_eq!(router.routes.len(), 0);
    }

    #[test]
    fn test_route_found() {
        let mut router = Router::new();
        router.register(Method::GET, "/test", test_handler);

        let response = router.route(&request(b"GET /test HTTP/1.0\r\n\r\n"), &());

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(
            response.headers().get("Connection"),
            Some(&"close".to_string())
        );
    }

    #[test]
    fn test_route_not_found() {
        let router: Router<()> = Router::new();

        let response = router.route(&request(b"GET /nonexistent HTTP/1.0\r\n\r\n"), &());

        assert_eq!(response.status(), StatusCode::NotFound);
        let body = response.body_json().unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("/nonexistent"));
    }

    #[test]
    fn test_wrong_method_is_405() {
        let mut router = Router::new();
        router.register(Method::POST, "/generate-script", test_handler);

        let response = router.route(&request(b"GET /generate-script HTTP/1.0\r\n\r\n"), &());

        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    #[test]
    fn test_prefix_route() {
        let mut router = Router::new();
        router.register_prefix(Method::GET, "/status/", echo_tail_handler);

        let response = router.route(&request(b"GET /status/17-abc HTTP/1.0\r\n\r\n"), &());
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body_json().unwrap()["tail"], "17-abc");

        // El prefijo solo no alcanza
        let response = router.route(&request(b"GET /status/ HTTP/1.0\r\n\r\n"), &());
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_multiple_routes() {
        let mut router = Router::new();
        router.register(Method::GET, "/test", test_handler);
        router.register_prefix(Method::GET, "/status/", echo_tail_handler);

        let r1 = router.route(&request(b"GET /test HTTP/1.0\r\n\r\n"), &());
        let r2 = router.route(&request(b"GET /status/x HTTP/1.0\r\n\r\n"), &());

        assert_eq!(r1.status(), StatusCode::Ok);
        assert_eq!(r2.status(), StatusCode::Ok);
    }
}
