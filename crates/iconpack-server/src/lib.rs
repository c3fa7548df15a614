//! HTTP trigger for iconpack publish runs.
//!
//! Routes:
//! - `POST /publish` runs the pipeline for the JSON [`PublishRequest`] body
//! - `GET /health` liveness probe
//! - `OPTIONS *` CORS preflight
//!
//! Every response is JSON and carries `Access-Control-Allow-Origin: *`.
//! Requests are served one at a time on the calling thread.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use iconpack_core::{ErrorClass, ErrorInfo, Pipeline, PublishRequest, PublishResult};
use std::io::Read;
use std::sync::Arc;
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

/// Largest accepted request body.
const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },
}

/// HTTP status for a failed run of the given class.
pub fn status_for(class: ErrorClass) -> u16 {
    match class {
        ErrorClass::Config => 400,
        ErrorClass::Fetch | ErrorClass::Publish => 502,
        ErrorClass::Generation | ErrorClass::Assembly | ErrorClass::Cleanup => 500,
    }
}

fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).expect("valid header")
}

fn cors_headers() -> [Header; 3] {
    [
        header("Access-Control-Allow-Origin", "*"),
        header("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
        header("Access-Control-Allow-Headers", "Content-Type"),
    ]
}

fn respond_json(req: Request, code: u16, body: &serde_json::Value) {
    let mut response = Response::from_string(body.to_string())
        .with_status_code(StatusCode(code))
        .with_header(header("Content-Type", "application/json"));
    for h in cors_headers() {
        response.add_header(h);
    }
    if let Err(e) = req.respond(response) {
        warn!("failed to send response: {e}");
    }
}

fn respond_error(req: Request, code: u16, class: ErrorClass, message: &str) {
    let info = ErrorInfo {
        class,
        message: message.to_owned(),
    };
    respond_json(
        req,
        code,
        &serde_json::json!({ "succeeded": false, "error": info }),
    );
}

fn respond_preflight(req: Request) {
    let mut response = Response::empty(StatusCode(204));
    for h in cors_headers() {
        response.add_header(h);
    }
    response.add_header(header("Access-Control-Max-Age", "86400"));
    let _ = req.respond(response);
}

fn read_body(req: &mut Request) -> Result<Vec<u8>, String> {
    let mut body = Vec::new();
    req.as_reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut body)
        .map_err(|e| format!("failed to read request body: {e}"))?;
    if body.len() as u64 > MAX_BODY_BYTES {
        return Err(format!("request body exceeds {MAX_BODY_BYTES} bytes"));
    }
    Ok(body)
}

fn handle_publish(pipeline: &Pipeline, mut req: Request) {
    let body = match read_body(&mut req) {
        Ok(body) => body,
        Err(message) => {
            respond_error(req, 400, ErrorClass::Config, &message);
            return;
        }
    };
    let request: PublishRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            debug!("rejecting publish body: {e}");
            respond_error(
                req,
                400,
                ErrorClass::Config,
                &format!("invalid publish request: {e}"),
            );
            return;
        }
    };

    let result = pipeline.execute(&request);
    let code = match &result {
        PublishResult::Published(report) => {
            info!(
                "POST /publish: {}@{} ({} components)",
                report.package, report.version, report.components
            );
            200
        }
        PublishResult::Failed { error } => {
            let code = status_for(error.class);
            warn!("POST /publish: {code} {}: {}", error.class, error.message);
            code
        }
    };
    let body = serde_json::to_value(&result).unwrap_or_default();
    respond_json(req, code, &body);
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(pipeline: &Pipeline, req: Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    let path = url.split('?').next().unwrap_or_default();
    debug!("{method} {url}");

    if method == Method::Options {
        respond_preflight(req);
        return;
    }
    match (path, &method) {
        ("/publish", Method::Post) => handle_publish(pipeline, req),
        ("/health", Method::Get) => {
            respond_json(req, 200, &serde_json::json!({ "status": "ok" }));
        }
        ("/publish" | "/health", _) => {
            respond_error(req, 405, ErrorClass::Config, "method not allowed");
        }
        _ => respond_error(req, 404, ErrorClass::Config, "not found"),
    }
}

/// Start the server loop, blocking the current thread.
pub fn run_server(pipeline: &Pipeline, addr: &str) -> Result<(), ServerError> {
    let server = Server::http(addr).map_err(|e| ServerError::Bind {
        addr: addr.to_owned(),
        message: e.to_string(),
    })?;
    info!("listening on {addr}");
    for request in server.incoming_requests() {
        handle_request(pipeline, request);
    }
    Ok(())
}

/// A test helper that serves a pipeline on a random port in a background thread.
///
/// The server listens on `127.0.0.1:{port}`. Dropping the `TestServer` stops
/// the loop via `Server::unblock`.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl TestServer {
    pub fn start(pipeline: Pipeline) -> Self {
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let srv = Arc::clone(&server);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&pipeline, request);
            }
        });

        Self {
            url,
            port,
            server,
            _handle: handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}
