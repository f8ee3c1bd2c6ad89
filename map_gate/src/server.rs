// MapGate - server.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use url::form_urlencoded;

use crate::metadata::{ProbeInput, ProbeOutcome};
use crate::probe_manager::FileAvailabilityProbe;
use crate::render::{render_result_page, render_search_page, PageState};

const HTML_CONTENT_TYPE: &str = "text/html;charset=UTF-8";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub probe: Arc<FileAvailabilityProbe>,
    pub missing_params_redirect: Arc<str>,
    pub probe_deadline: Duration,
}

/// Fields accepted from a lookup submission.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Submission {
    map_group: Option<String>,
    mission_display_title: Option<String>,
}

impl Submission {
    fn into_input(self) -> Option<ProbeInput> {
        match (self.map_group, self.mission_display_title) {
            (Some(group), Some(title)) if !group.is_empty() && !title.is_empty() => {
                Some(ProbeInput::new(group, title))
            }
            _ => None,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Every path goes through one handler so the redirect rules apply uniformly.
    Router::new().fallback(dispatch).with_state(state)
}

pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "map gate listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path();
    if path == "/favicon.ico" || path.starts_with("/.well-known") {
        return StatusCode::NO_CONTENT.into_response();
    }
    if path != "/" {
        let location = match uri.query() {
            Some(query) => format!("/?{query}"),
            None => "/".to_string(),
        };
        return redirect(StatusCode::PERMANENT_REDIRECT, &location);
    }

    match method {
        Method::GET | Method::HEAD => html(StatusCode::OK, render_search_page()),
        Method::POST => submit(&state, &headers, &body).await,
        _ => redirect(StatusCode::MOVED_PERMANENTLY, &uri.to_string()),
    }
}

async fn submit(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Response {
    let Some(input) = parse_submission(headers, body) else {
        info!("submission is missing mapGroup or missionDisplayTitle");
        return redirect(StatusCode::FOUND, &state.missing_params_redirect);
    };

    let outcome = run_probe(state, &input).await;
    let status = PageState::of(&outcome).status_code();
    info!(
        map_group = %input.map_group,
        mission = %input.mission_display_title,
        status = status.as_u16(),
        "lookup answered"
    );
    html(status, render_result_page(&input, &outcome))
}

/// Runs the probe under the configured deadline. Overrunning the existence
/// check reads as an unreachable upstream; overrunning the size lookup only
/// loses the size.
pub async fn run_probe(state: &AppState, input: &ProbeInput) -> ProbeOutcome {
    state.probe.probe_within(input, state.probe_deadline).await
}

/// Pulls the two lookup fields out of a JSON or url-encoded form body.
/// Anything unreadable counts as missing.
pub fn parse_submission(headers: &HeaderMap, body: &[u8]) -> Option<ProbeInput> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let submission = if content_type.contains("application/json") {
        serde_json::from_slice::<Submission>(body).unwrap_or_else(|e| {
            warn!(error = %e, "failed to parse JSON submission");
            Submission::default()
        })
    } else if content_type.contains("application/x-www-form-urlencoded") {
        form_submission(body)
    } else {
        debug!(content_type, "unsupported submission content type");
        Submission::default()
    };
    submission.into_input()
}

fn form_submission(body: &[u8]) -> Submission {
    let mut submission = Submission::default();
    for (key, value) in form_urlencoded::parse(body) {
        match &*key {
            "mapGroup" if submission.map_group.is_none() => {
                submission.map_group = Some(value.into_owned());
            }
            "missionDisplayTitle" if submission.mission_display_title.is_none() => {
                submission.mission_display_title = Some(value.into_owned());
            }
            _ => {}
        }
    }
    submission
}

fn html(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE))],
        body,
    )
        .into_response()
}

fn redirect(status: StatusCode, location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (status, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}
