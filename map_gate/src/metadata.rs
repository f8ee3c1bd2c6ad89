// MapGate - metadata.rs

use serde::{Deserialize, Serialize};

use crate::transport::{ExistenceResponse, TransportError};

/// Status recorded when the probe could not reach the upstream at all.
/// A real upstream 503 is recorded with the same code; only `details` tells
/// the two apart.
pub const UNREACHABLE_STATUS: u16 = 503;

/// Upper bound, in characters, on error text copied into `details`.
pub const MAX_ERROR_TEXT: usize = 240;

const INITIAL_DETAILS: &str = "File unavailable or an unknown error occurred.";

/// The two identifiers a probe is asked about.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeInput {
    pub map_group: String,
    pub mission_display_title: String,
}

impl ProbeInput {
    pub fn new(map_group: impl Into<String>, mission_display_title: impl Into<String>) -> Self {
        Self {
            map_group: map_group.into(),
            mission_display_title: mission_display_title.into(),
        }
    }

    /// `{mapGroup}-{missionDisplayTitle}.7z`
    pub fn file_name(&self) -> String {
        format!("{}-{}.7z", self.map_group, self.mission_display_title)
    }

    /// `/{mapGroup}/{mapGroup}-{missionDisplayTitle}.7z`, verbatim.
    pub fn file_path(&self) -> String {
        format!("/{}/{}", self.map_group, self.file_name())
    }
}

/// Result of one probe. Built fresh per call and handed to the renderer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    pub file_exists: bool,
    pub full_check_url: String,
    pub file_path: String,
    pub external_status: u16,
    pub details: String,
    pub file_size: Option<u64>,
    pub final_redirect_url: String,
}

impl ProbeOutcome {
    /// State before any request was made. `final_redirect_url` starts out as the check URL.
    pub fn pending(file_path: String, full_check_url: String) -> Self {
        Self {
            file_exists: false,
            final_redirect_url: full_check_url.clone(),
            full_check_url,
            file_path,
            external_status: 0,
            details: INITIAL_DETAILS.to_string(),
            file_size: None,
        }
    }

    /// Folds the existence GET into the outcome. Replaces `details`; later notes append.
    pub fn apply_existence(&mut self, result: &Result<ExistenceResponse, TransportError>) {
        match result {
            Ok(response) => {
                self.external_status = response.status;
                self.final_redirect_url = response.final_url.clone();
                if (200..400).contains(&response.status) {
                    self.file_exists = true;
                    self.details = format!(
                        "File passed the redirect check with final status {} (success).",
                        response.status
                    );
                } else {
                    self.file_exists = false;
                    self.details = format!(
                        "Redirect service or final resource returned status {}; file check failed.",
                        response.status
                    );
                }
            }
            Err(e) => self.mark_unreachable(format!(
                "Could not reach the file server or the request timed out: {}",
                truncate_error(&e.to_string())
            )),
        }
    }

    /// Phase-1 network failure: sentinel status, no redirect chain observed.
    pub fn mark_unreachable(&mut self, details: String) {
        self.file_exists = false;
        self.external_status = UNREACHABLE_STATUS;
        self.final_redirect_url = self.full_check_url.clone();
        self.file_size = None;
        self.details = details;
    }

    /// Appends one sentence to `details`.
    pub fn note(&mut self, sentence: impl AsRef<str>) {
        if !self.details.is_empty() {
            self.details.push(' ');
        }
        self.details.push_str(sentence.as_ref());
    }

    /// True for both an unreachable upstream and a real upstream 503.
    pub fn is_service_unavailable(&self) -> bool {
        self.external_status == UNREACHABLE_STATUS
    }
}

/// Cuts error text to `MAX_ERROR_TEXT` characters, marking the cut with an ellipsis.
pub fn truncate_error(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_TEXT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pending() -> ProbeOutcome {
        let input = ProbeInput::new("A", "Dead Center");
        ProbeOutcome::pending(input.file_path(), format!("https://maps.example/d{}", input.file_path()))
    }

    #[test]
    fn file_path_follows_template() {
        let input = ProbeInput::new("B", "No Mercy");
        assert_eq!(input.file_name(), "B-No Mercy.7z");
        assert_eq!(input.file_path(), "/B/B-No Mercy.7z");
    }

    #[test]
    fn pending_outcome_has_explanation_and_no_redirect() {
        let outcome = pending();
        assert!(!outcome.file_exists);
        assert_eq!(outcome.final_redirect_url, outcome.full_check_url);
        assert!(!outcome.details.is_empty());
    }

    #[test]
    fn redirect_statuses_count_as_existing() {
        for status in [200u16, 204, 302, 399] {
            let mut outcome = pending();
            outcome.apply_existence(&Ok(ExistenceResponse {
                status,
                final_url: "https://cdn.example/x".into(),
            }));
            assert!(outcome.file_exists, "status {status}");
            assert!(outcome.details.contains(&status.to_string()));
        }
    }

    #[test]
    fn rejected_status_keeps_real_code() {
        let mut outcome = pending();
        outcome.apply_existence(&Ok(ExistenceResponse {
            status: 503,
            final_url: "https://maps.example/d/A/A-Dead Center.7z".into(),
        }));
        assert!(!outcome.file_exists);
        assert_eq!(outcome.external_status, 503);
        assert!(outcome.is_service_unavailable());
        assert!(outcome.details.contains("Redirect service or final resource returned status 503"));
    }

    #[test]
    fn network_failure_uses_sentinel() {
        let mut outcome = pending();
        outcome.apply_existence(&Err(TransportError::Connection("dns lookup failed".into())));
        assert!(!outcome.file_exists);
        assert!(outcome.is_service_unavailable());
        assert_eq!(outcome.final_redirect_url, outcome.full_check_url);
        assert!(outcome.details.contains("dns lookup failed"));
    }

    #[test]
    fn notes_are_appended_as_sentences() {
        let mut outcome = pending();
        outcome.details = "First.".into();
        outcome.note("Second.");
        assert_eq!(outcome.details, "First. Second.");
    }

    #[test]
    fn long_errors_are_truncated_on_char_boundary() {
        let text = "é".repeat(MAX_ERROR_TEXT + 10);
        let cut = truncate_error(&text);
        assert_eq!(cut.chars().count(), MAX_ERROR_TEXT + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_error("short"), "short");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(pending()).unwrap();
        assert!(json.get("fileExists").is_some());
        assert!(json.get("finalRedirectUrl").is_some());
        assert_eq!(json["fileSize"], serde_json::Value::Null);
    }
}
