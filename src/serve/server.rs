// src/serve/server.rs

//! Static file server over the build root with a live-reload WebSocket.
//!
//! HTML responses get a small client injected that reconnects to
//! [`LIVERELOAD_PATH`] and reloads the page on every message.

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::context::BuildContext;
use crate::serve::ReloadSignal;

pub const LIVERELOAD_PATH: &str = "/__livereload";

const RELOAD_SCRIPT: &str = concat!(
    "<script>(function(){",
    "var p=location.protocol==='https:'?'wss://':'ws://';",
    "var s=new WebSocket(p+location.host+'/__livereload');",
    "s.onmessage=function(){location.reload();};",
    "})();</script>"
);

/// A bound, not yet running, dev server.
pub struct DevServer {
    listener: TcpListener,
    app: Router,
}

impl DevServer {
    /// Bind `127.0.0.1:port`; port 0 picks a free one.
    pub async fn bind(ctx: Arc<BuildContext>, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("binding dev server to port {port}"))?;

        let app = Router::new()
            .route(LIVERELOAD_PATH, get(livereload))
            .fallback(serve_file)
            .with_state(ctx);

        Ok(Self { listener, app })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the future is dropped.
    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(url = %format!("http://{addr}/"), "dev server listening");
        axum::serve(self.listener, self.app)
            .await
            .context("dev server stopped")
    }
}

async fn livereload(ws: WebSocketUpgrade, State(ctx): State<Arc<BuildContext>>) -> Response {
    let rx = ctx.reload().subscribe();
    ws.on_upgrade(move |socket| push_reloads(socket, rx))
}

async fn push_reloads(mut socket: WebSocket, mut rx: broadcast::Receiver<ReloadSignal>) {
    debug!("live-reload client connected");
    loop {
        match rx.recv().await {
            Ok(signal) => debug!(task = %signal.task, "pushing reload"),
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "reload signals coalesced"),
            Err(RecvError::Closed) => break,
        }
        if socket.send(Message::Text("reload".to_string())).await.is_err() {
            break;
        }
    }
    debug!("live-reload client gone");
}

async fn serve_file(State(ctx): State<Arc<BuildContext>>, uri: Uri) -> Response {
    let Some(rel) = request_path(uri.path()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let loaded = tokio::task::spawn_blocking(move || load_file(&ctx, &rel)).await;
    let (path, body) = match loaded {
        Ok(Ok(Some(found))) => found,
        Ok(Ok(None)) => return StatusCode::NOT_FOUND.into_response(),
        Ok(Err(err)) => {
            warn!(error = %format!("{err:#}"), "failed to read served file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(err) => {
            warn!(error = %err, "file read task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let body = if mime.essence_str() == "text/html" {
        inject_reload_script(&String::from_utf8_lossy(&body)).into_bytes()
    } else {
        body
    };

    ([(header::CONTENT_TYPE, mime.to_string())], body).into_response()
}

/// Read the file a request maps to. A directory means its `index.html`.
fn load_file(ctx: &BuildContext, rel: &Path) -> Result<Option<(PathBuf, Vec<u8>)>> {
    let fs = ctx.fs();
    let path = ctx.out_dir().join(rel);
    let path = if fs.is_dir(&path) { path.join("index.html") } else { path };
    if !fs.is_file(&path) {
        return Ok(None);
    }
    let body = fs.read(&path)?;
    Ok(Some((path, body)))
}

/// Map a percent-encoded URL path onto a path below the build root.
///
/// `None` for anything that would climb out of it or is not UTF-8.
fn request_path(url_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(url_path).decode_utf8().ok()?;
    let mut rel = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if rel.as_os_str().is_empty() {
        rel.push("index.html");
    }
    Some(rel)
}

fn inject_reload_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], RELOAD_SCRIPT, &html[pos..]),
        None => format!("{html}{RELOAD_SCRIPT}"),
    }
}
