/// A submission that did not produce a successful JSON response.
///
/// Covers network failures, non-2xx statuses and malformed response bodies.
/// The body is what gets shown to the user, verbatim.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("request failed ({}): {reason}", status_label(.status))]
pub struct RequestFailed {
    /// HTTP status, if a response was received at all.
    pub status: Option<u16>,
    /// Raw response body. Empty if no response was received.
    pub body: String,
    /// Short description for logs. Never rendered.
    pub reason: String,
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no response".to_string(),
    }
}

impl RequestFailed {
    /// The server answered with a non-success status.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
            reason: "non-success status".to_string(),
        }
    }

    /// A success status whose body could not be parsed as JSON.
    pub fn malformed(status: u16, body: impl Into<String>, error: &serde_json::Error) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
            reason: format!("invalid JSON response: {error}"),
        }
    }

    /// No response was received.
    pub fn network(reason: impl std::fmt::Display) -> Self {
        Self {
            status: None,
            body: String::new(),
            reason: reason.to_string(),
        }
    }
}
