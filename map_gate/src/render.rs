// MapGate - render.rs
//
// Turns a probe outcome into the page a visitor sees.

use axum::http::StatusCode;

use crate::metadata::{ProbeInput, ProbeOutcome};

const UNKNOWN_SIZE: &str = "unknown size";
const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Visual state of the result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Available,
    ServiceUnavailable,
    Unavailable,
}

impl PageState {
    pub fn of(outcome: &ProbeOutcome) -> Self {
        if outcome.file_exists {
            PageState::Available
        } else if outcome.is_service_unavailable() {
            PageState::ServiceUnavailable
        } else {
            PageState::Unavailable
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            PageState::Available => StatusCode::OK,
            PageState::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PageState::Unavailable => StatusCode::NOT_FOUND,
        }
    }

    fn theme(self) -> (&'static str, &'static str, &'static str) {
        // (accent, icon, headline)
        match self {
            PageState::Available => ("#16a34a", "&#10004;", "Map available"),
            PageState::ServiceUnavailable => ("#d97706", "&#9888;", "File server unavailable"),
            PageState::Unavailable => ("#dc2626", "&#10008;", "Map unavailable"),
        }
    }

    fn disabled_text(self) -> &'static str {
        match self {
            PageState::ServiceUnavailable => "Server connection failed, please try again later",
            _ => "Map unavailable, cannot download",
        }
    }
}

/// Human-readable byte count, base 1024, trailing zeros trimmed.
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let mut text = format!("{value:.decimals$}");
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{} {}", text, SIZE_UNITS[unit])
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full result page for one probe.
pub fn render_result_page(input: &ProbeInput, outcome: &ProbeOutcome) -> String {
    let state = PageState::of(outcome);
    let (accent, icon, headline) = state.theme();
    let file_name = escape_html(&input.file_name());
    let size_text = outcome
        .file_size
        .map(|size| format_bytes(size, 2))
        .unwrap_or_else(|| UNKNOWN_SIZE.to_string());
    let download_url = escape_html(&outcome.final_redirect_url);

    let action = if state == PageState::Available {
        format!(r#"<a id="download" class="button" href="{download_url}" download>Download {file_name}</a>"#)
    } else {
        format!(
            r#"<button class="button" disabled>{}</button>"#,
            state.disabled_text()
        )
    };
    let auto_download = if state == PageState::Available {
        r#"<script>window.addEventListener("load",function(){setTimeout(function(){var a=document.getElementById("download");if(a){a.click();}},1500);});</script>"#
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{headline} - {title}</title>
<style>
body{{font-family:system-ui,sans-serif;background:#f3f4f6;color:#111827;margin:0;padding:2rem}}
.card{{max-width:40rem;margin:auto;background:#fff;border-top:6px solid {accent};border-radius:8px;padding:1.5rem}}
.button{{display:inline-block;padding:.6rem 1.2rem;border-radius:6px;border:0;background:{accent};color:#fff;text-decoration:none}}
button[disabled]{{opacity:.6;cursor:not-allowed}}
pre{{white-space:pre-wrap;word-break:break-all}}
</style>
</head>
<body>
<div class="card">
<h1>{icon} {headline}</h1>
<p>Group <strong>{group}</strong>, mission <strong>{title}</strong></p>
<p>{file_name} ({size})</p>
{action}
<details>
<summary>Diagnostics</summary>
<pre>filePath: {file_path}
fullCheckUrl: {full_check_url}
finalRedirectUrl: {final_redirect_url}
externalStatus: {external_status}
details: {details}</pre>
</details>
<p><a href="/">Back to search</a></p>
</div>
{auto_download}
</body>
</html>"#,
        group = escape_html(&input.map_group),
        title = escape_html(&input.mission_display_title),
        size = escape_html(&size_text),
        file_path = escape_html(&outcome.file_path),
        full_check_url = escape_html(&outcome.full_check_url),
        final_redirect_url = download_url,
        external_status = outcome.external_status,
        details = escape_html(&outcome.details),
    )
}

/// Entry page with the lookup form.
pub fn render_search_page() -> String {
    let groups = [("A", "Third-party A"), ("B", "Third-party B")];
    let options = groups
        .iter()
        .enumerate()
        .map(|(i, (value, label))| {
            let selected = if i == 0 { " selected" } else { "" };
            format!(r#"<option value="{value}"{selected}>{label}</option>"#)
        })
        .collect::<String>();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Map download</title>
</head>
<body>
<form method="post" action="/">
<label>Group <select name="mapGroup">{options}</select></label>
<label>Mission <input name="missionDisplayTitle" required></label>
<button type="submit">Check</button>
</form>
</body>
</html>"#
    )
}
