use std::{cell::RefCell, collections::HashMap, rc::Rc, sync::LazyLock};

use formbind::{RequestFailed, Submission, Transport, classify_response};
use url::Url;

/// A canned response of the in-memory transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryResponse {
    pub status: u16,
    pub body: String,
}

impl MemoryResponse {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::text(status, value.to_string())
    }

    pub fn ok(value: &serde_json::Value) -> Self {
        Self::json(200, value)
    }

    fn not_found() -> Self {
        Self::text(404, r#"{"message":"Not Found"}"#)
    }
}

type Route = Box<dyn Fn(&Submission) -> MemoryResponse>;

// Parsing a constant absolute URL cannot fail.
static ENDPOINT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("memory://").expect("constant URL is valid"));

/// In-memory [`Transport`] implementation.
///
/// Answers submissions from a route table keyed by action and records every
/// submission it receives. Actions without a route fall back to a `404`, or
/// to echoing the submitted values for [`MemoryTransport::echo`].
#[derive(Clone)]
pub struct MemoryTransport {
    state: Rc<State>,
}

struct State {
    routes: RefCell<HashMap<String, Route>>,
    fallback: Option<Route>,
    requests: RefCell<Vec<Submission>>,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("routes", &self.state.routes.borrow().keys().collect::<Vec<_>>())
            .field("requests", &self.state.requests.borrow().len())
            .finish()
    }
}

impl MemoryTransport {
    /// The kind of this transport (see [`Transport::kind`]).
    pub const KIND: &'static str = "formbind.memory";

    fn with_fallback(fallback: Option<Route>) -> Self {
        Self {
            state: Rc::new(State {
                routes: RefCell::new(HashMap::new()),
                fallback,
                requests: RefCell::new(Vec::new()),
            }),
        }
    }

    /// A transport where unknown actions answer `404`.
    pub fn new() -> Self {
        Self::with_fallback(None)
    }

    /// A transport where unknown actions answer `200` with the submitted
    /// values.
    pub fn echo() -> Self {
        Self::with_fallback(Some(Box::new(|submission: &Submission| {
            MemoryResponse::ok(&submission.values.to_json())
        })))
    }

    /// Answer submissions to `action` with the handler.
    pub fn route(
        &self,
        action: impl Into<String>,
        handler: impl Fn(&Submission) -> MemoryResponse + 'static,
    ) {
        self.state
            .routes
            .borrow_mut()
            .insert(action.into(), Box::new(handler));
    }

    /// Answer submissions to `action` with a fixed response.
    pub fn respond(&self, action: impl Into<String>, response: MemoryResponse) {
        self.route(action, move |_| response.clone());
    }

    /// All submissions received so far, oldest first.
    pub fn requests(&self) -> Vec<Submission> {
        self.state.requests.borrow().clone()
    }

    fn answer(&self, submission: &Submission) -> MemoryResponse {
        if let Some(route) = self.state.routes.borrow().get(&submission.action) {
            return route(submission);
        }
        match &self.state.fallback {
            Some(fallback) => fallback(submission),
            None => MemoryResponse::not_found(),
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait(?Send)]
impl Transport for MemoryTransport {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn endpoint(&self) -> &Url {
        &ENDPOINT
    }

    async fn post_json(
        &self,
        submission: &Submission,
    ) -> Result<serde_json::Value, RequestFailed> {
        self.state.requests.borrow_mut().push(submission.clone());
        let response = self.answer(submission);
        classify_response(response.status, &response.body)
    }
}

#[cfg(test)]
mod tests {
    use formbind::{FieldValue, FormValues, NumberValue};
    use pretty_assertions::assert_eq;

    use super::*;

    fn submission(action: &str) -> Submission {
        Submission::new(
            action,
            FormValues::new().with("transactionId", FieldValue::Number(NumberValue::Int(3))),
        )
    }

    #[tokio::test]
    async fn test_routes_and_not_found() {
        let transport = MemoryTransport::new();
        transport.respond(
            "reset",
            MemoryResponse::ok(&serde_json::json!({"status": "Accepted"})),
        );

        let ok = transport.post_json(&submission("reset")).await.unwrap();
        assert_eq!(ok, serde_json::json!({"status": "Accepted"}));

        let err = transport.post_json(&submission("nope")).await.unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.body, r#"{"message":"Not Found"}"#);

        let actions: Vec<_> = transport
            .requests()
            .into_iter()
            .map(|s| s.action)
            .collect();
        assert_eq!(actions, vec!["reset", "nope"]);
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(MemoryTransport::new().endpoint().as_str(), "memory://");
        assert_eq!(MemoryTransport::echo().endpoint().scheme(), "memory");
    }

    #[tokio::test]
    async fn test_echo_returns_values() {
        let transport = MemoryTransport::echo();
        let value = transport.post_json(&submission("anything")).await.unwrap();
        assert_eq!(value, serde_json::json!({"transactionId": 3}));
    }

    #[tokio::test]
    async fn test_route_sees_submission() {
        let transport = MemoryTransport::new();
        transport.route("remote_stop_transaction", |submission| {
            match submission.values.get("transactionId") {
                Some(FieldValue::Number(NumberValue::Int(id))) => {
                    MemoryResponse::ok(&serde_json::json!({ "stopped": id }))
                }
                _ => MemoryResponse::text(500, "\"missing transactionId\""),
            }
        });

        let value = transport
            .post_json(&submission("remote_stop_transaction"))
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"stopped": 3}));
    }
}
