//! Shared helpers for integration tests.
//!
//! `Upstream` is a stand-in for the file host: a small axum app on an
//! ephemeral loopback port.
//!
//! | Path | Behaviour |
//! |---|---|
//! | `/d/:group/:file` | 302 to `/files/signed123` for `A/A-Dead Center.7z`, else 404 |
//! | `/files/signed123` | 200 with a `ARCHIVE_LEN`-byte body (HEAD reports the length) |
//! | `/loop` | 302 back to itself |
//! | `/slow/*rest` | 200 after two seconds |
//! | `/stalled/*rest` | GET answers 200 at once, HEAD after two seconds |

#![allow(dead_code)]

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const ARCHIVE_LEN: usize = 2048;

pub struct Upstream {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl Upstream {
    /// Starts the stand-in host, or `None` when the sandbox forbids binding.
    pub async fn start() -> Option<Self> {
        let listener = bind_loopback().await?;
        let addr = listener.local_addr().ok()?;
        let app = Router::new()
            .route("/d/:group/:file", get(archive_redirect))
            .route("/files/signed123", get(signed_archive))
            .route("/loop", get(redirect_loop))
            .route("/slow/*rest", get(slow))
            .route("/stalled/*rest", get(listed).head(slow_head));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Some(Self {
            addr,
            _handle: handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn bind_loopback() -> Option<TcpListener> {
    match TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await {
        Ok(listener) => Some(listener),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            eprintln!("skipping: PermissionDenied binding loopback listener");
            None
        }
        Err(err) => panic!("bind failed: {err}"),
    }
}

/// An address nothing is listening on.
pub async fn closed_port() -> Option<SocketAddr> {
    let listener = bind_loopback().await?;
    let addr = listener.local_addr().ok()?;
    drop(listener);
    Some(addr)
}

async fn archive_redirect(Path((group, file)): Path<(String, String)>) -> impl IntoResponse {
    if group == "A" && file == "A-Dead Center.7z" {
        (StatusCode::FOUND, [(header::LOCATION, "/files/signed123")]).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn signed_archive() -> Vec<u8> {
    vec![7u8; ARCHIVE_LEN]
}

async fn redirect_loop() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/loop")])
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "late"
}

async fn listed() -> &'static str {
    "listed"
}

async fn slow_head() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(2)).await;
    StatusCode::OK
}
