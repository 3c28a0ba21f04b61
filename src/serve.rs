//! Development server answering artifact URLs from the engine's memory.
//!
//! | URL                  | Artifact      |
//! |----------------------|---------------|
//! | `/`, `/index.html`   | document      |
//! | `/main.js`           | script        |
//! | `/style.css`         | stylesheet    |
//! | `/sprite.svg`        | sprite        |
//! | `/favicon.svg`       | favicon       |
//!
//! Bodies are minified on request, so a page reload always sees the
//! latest reconciled state even while disk writes are suppressed.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Result, anyhow};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::asset::ArtifactKind;
use crate::dispatch::AssetMin;
use crate::fs::Filesystem;
use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Artifact served at `url`, ignoring any query string.
pub fn route(url: &str) -> Option<ArtifactKind> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path {
        "/" | "/index.html" => Some(ArtifactKind::Document),
        "/main.js" => Some(ArtifactKind::Script),
        "/style.css" => Some(ArtifactKind::Stylesheet),
        "/sprite.svg" => Some(ArtifactKind::Sprite),
        "/favicon.svg" => Some(ArtifactKind::Favicon),
        _ => None,
    }
}

/// Serve requests until the server is unblocked.
pub fn serve<F: Filesystem>(server: &Server, engine: &AssetMin<F>) {
    for request in server.incoming_requests() {
        if let Err(e) = respond(request, engine) {
            debug!("serve"; "response failed: {:#}", e);
        }
    }
}

fn respond<F: Filesystem>(request: Request, engine: &AssetMin<F>) -> Result<()> {
    debug!("serve"; "{} {}", request.method(), request.url());

    if !matches!(request.method(), Method::Get | Method::Head) {
        return send(request, 405, "text/plain", b"405 Method Not Allowed".to_vec());
    }
    let Some(kind) = route(request.url()) else {
        return send(request, 404, "text/plain", b"404 Not Found".to_vec());
    };

    match engine.minified_content(kind) {
        Ok(body) => send(request, 200, kind.media_type(), body),
        Err(e) => {
            log!("error"; "{}: {}", kind, e);
            send(request, 500, "text/plain", e.to_string().into_bytes())
        }
    }
}

fn send(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let body = if request.method() == &Method::Head {
        Vec::new()
    } else {
        body
    };
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-cache, no-store, must-revalidate")?);
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow!("invalid header {key}: {value}"))
}
