//! Test helpers for testing form hosts.
//!
//! Allows for unified testing to make sure all host implementations show the
//! same observable behavior: what gets POSTed, how results render and when
//! the submit button is disabled.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use formbind::{
    BinderOptions, BoundForm, FormBinder, FormHost, FormLayout, Palette, RequestFailed, Selectors,
    Spawner, Submission, Transport, classify_response,
};
use futures::future::LocalBoxFuture;
use pretty_assertions::assert_eq;

/// Builds hosts for the conformance suite.
pub trait HostFixture {
    type Driver: FormDriver;

    /// Create a host containing one form per layout, in order.
    ///
    /// Returns the host and one driver per form.
    fn create(
        &self,
        forms: &[FormLayout],
        selectors: &Selectors,
    ) -> Result<(Box<dyn FormHost>, Vec<Self::Driver>), anyhow::Error>;
}

/// Observes and drives a single form inside a host.
pub trait FormDriver {
    /// Click the submit button the way a user would.
    fn click(&self);

    /// Change the current value of the named input.
    fn set_input(&self, name: &str, value: &str);

    fn is_submit_disabled(&self) -> bool;

    fn result_text(&self) -> String;

    /// Text color of the result element.
    fn result_color(&self) -> Option<String>;

    fn is_result_visible(&self) -> bool;
}

/// A spawner that queues tasks until [`QueueSpawner::run_all`] is awaited.
///
/// Keeps the suite independent of any runtime: tasks run inside whatever
/// executor awaits `run_all`.
#[derive(Clone, Default)]
pub struct QueueSpawner {
    tasks: Rc<RefCell<Vec<LocalBoxFuture<'static, ()>>>>,
}

impl QueueSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run queued tasks, including tasks queued while running, to completion.
    pub async fn run_all(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
            if tasks.is_empty() {
                break;
            }
            futures::future::join_all(tasks).await;
        }
    }
}

impl Spawner for QueueSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.tasks.borrow_mut().push(task);
    }
}

/// A transport that answers from a fixed script and records submissions.
///
/// Actions without a scripted response answer `404 Not Found`.
#[derive(Clone, Debug)]
pub struct ScriptedTransport {
    state: Rc<RefCell<Script>>,
    endpoint: url::Url,
}

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, (u16, String)>,
    requests: Vec<Submission>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(Script::default())),
            endpoint: url::Url::parse("scripted://").expect("static URL is valid"),
        }
    }

    pub fn respond(&self, action: &str, status: u16, body: impl Into<String>) {
        self.state
            .borrow_mut()
            .responses
            .insert(action.to_string(), (status, body.into()));
    }

    pub fn requests(&self) -> Vec<Submission> {
        self.state.borrow().requests.clone()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait(?Send)]
impl Transport for ScriptedTransport {
    fn kind(&self) -> &str {
        "formbind.scripted"
    }

    fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    async fn post_json(
        &self,
        submission: &Submission,
    ) -> Result<serde_json::Value, RequestFailed> {
        let (status, body) = {
            let mut state = self.state.borrow_mut();
            state.requests.push(submission.clone());
            state
                .responses
                .get(&submission.action)
                .cloned()
                .unwrap_or_else(|| (404, "Not Found".to_string()))
        };
        classify_response(status, &body)
    }
}

struct Harness<P> {
    drivers: Vec<P>,
    transport: ScriptedTransport,
    spawner: QueueSpawner,
    bound: Vec<BoundForm>,
    // Keeps the host alive for the duration of a test.
    _host: Box<dyn FormHost>,
}

fn setup<F: HostFixture>(
    fixture: &F,
    forms: &[FormLayout],
    options: BinderOptions,
) -> Harness<F::Driver> {
    let (host, drivers) = fixture
        .create(forms, &options.selectors)
        .expect("fixture should create host");
    assert_eq!(drivers.len(), forms.len(), "fixture must return one driver per form");

    let transport = ScriptedTransport::new();
    let spawner = QueueSpawner::new();
    let bound = FormBinder::new(Rc::new(transport.clone()), Rc::new(spawner.clone()))
        .with_options(options)
        .bind(host.as_ref())
        .expect("binding should succeed");

    Harness {
        drivers,
        transport,
        spawner,
        bound,
        _host: host,
    }
}

fn start_transaction_form() -> FormLayout {
    FormLayout::new("remote_start_transaction")
        .with_text("clientId", "cp-1")
        .with_text("idTag", "tag-1")
        .with_number("transactionId", "42")
}

/// Run the full conformance suite against a host implementation.
pub async fn test_host<F: HostFixture>(fixture: &F) {
    test_binds_every_form(fixture);
    test_posts_every_named_field(fixture).await;
    test_number_field_parse_failure_is_forwarded(fixture).await;
    test_success_renders_pretty_json(fixture).await;
    test_success_keeps_response_key_order(fixture).await;
    test_failure_renders_raw_body(fixture).await;
    test_button_disabled_while_in_flight(fixture).await;
    test_click_on_disabled_button_is_ignored(fixture).await;
    test_forms_are_independent(fixture).await;
    test_values_are_read_at_click_time(fixture).await;
    test_duplicate_names_last_wins(fixture).await;
    test_custom_selectors_and_palette(fixture).await;
}

fn test_binds_every_form<F: HostFixture>(fixture: &F) {
    let forms = vec![
        start_transaction_form(),
        FormLayout::new("remote_stop_transaction"),
        FormLayout::new("reset"),
    ];
    let h = setup(fixture, &forms, BinderOptions::default());

    let actions: Vec<_> = h
        .bound
        .iter()
        .map(|form| form.container().action().unwrap_or_default())
        .collect();
    assert_eq!(
        actions,
        vec!["remote_start_transaction", "remote_stop_transaction", "reset"]
    );
}

async fn test_posts_every_named_field<F: HostFixture>(fixture: &F) {
    let h = setup(fixture, &[start_transaction_form()], BinderOptions::default());
    h.transport.respond("remote_start_transaction", 200, "{}");

    h.drivers[0].click();
    h.spawner.run_all().await;

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 1, "exactly one POST per click");
    let submission = &requests[0];
    assert_eq!(submission.path(), "/remote_start_transaction");
    assert_eq!(
        submission.values.names().collect::<Vec<_>>(),
        vec!["clientId", "idTag", "transactionId"]
    );

    let body: serde_json::Value =
        serde_json::from_slice(&submission.body().expect("body should serialize"))
            .expect("body should be valid JSON");
    assert_eq!(
        body,
        serde_json::json!({
            "clientId": "cp-1",
            "idTag": "tag-1",
            "transactionId": 42,
        })
    );
    assert!(body["transactionId"].is_i64(), "numeric field must be an integer");
}

async fn test_number_field_parse_failure_is_forwarded<F: HostFixture>(fixture: &F) {
    let layout = FormLayout::new("remote_stop_transaction")
        .with_text("clientId", "cp-1")
        .with_number("transactionId", "not a number");
    let h = setup(fixture, &[layout], BinderOptions::default());
    h.transport.respond("remote_stop_transaction", 200, "{}");

    h.drivers[0].click();
    h.spawner.run_all().await;

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 1, "parse failures must not block the request");
    assert_eq!(
        requests[0].values.to_json(),
        serde_json::json!({
            "clientId": "cp-1",
            "transactionId": null,
        })
    );
}

async fn test_success_renders_pretty_json<F: HostFixture>(fixture: &F) {
    let h = setup(fixture, &[FormLayout::new("reset")], BinderOptions::default());
    h.transport.respond("reset", 200, r#"{"ok": true}"#);
    let driver = &h.drivers[0];
    assert!(!driver.is_result_visible(), "result starts hidden");

    driver.click();
    h.spawner.run_all().await;

    assert_eq!(driver.result_text(), "{\n  \"ok\": true\n}");
    assert_eq!(driver.result_color().as_deref(), Some("black"));
    assert!(driver.is_result_visible());
}

async fn test_success_keeps_response_key_order<F: HostFixture>(fixture: &F) {
    let h = setup(fixture, &[FormLayout::new("remote_start_transaction")], BinderOptions::default());
    h.transport.respond(
        "remote_start_transaction",
        200,
        r#"{"status":"Accepted","idTag":"x","attempt":1.0}"#,
    );
    let driver = &h.drivers[0];

    driver.click();
    h.spawner.run_all().await;

    assert_eq!(
        driver.result_text(),
        "{\n  \"status\": \"Accepted\",\n  \"idTag\": \"x\",\n  \"attempt\": 1\n}"
    );
}

async fn test_failure_renders_raw_body<F: HostFixture>(fixture: &F) {
    let h = setup(fixture, &[FormLayout::new("reset")], BinderOptions::default());
    h.transport.respond("reset", 500, "server error");
    let driver = &h.drivers[0];

    driver.click();
    h.spawner.run_all().await;

    assert_eq!(driver.result_text(), "server error");
    assert_eq!(driver.result_color().as_deref(), Some("red"));
    assert!(driver.is_result_visible());
}

async fn test_button_disabled_while_in_flight<F: HostFixture>(fixture: &F) {
    for (status, body) in [(200, r#"{"status":"Accepted"}"#), (500, "\"Timeout\"")] {
        let h = setup(fixture, &[FormLayout::new("reset")], BinderOptions::default());
        h.transport.respond("reset", status, body);
        let driver = &h.drivers[0];
        assert!(!driver.is_submit_disabled());

        driver.click();
        assert!(
            driver.is_submit_disabled(),
            "button must be disabled right after the click (status {status})"
        );
        assert_eq!(h.spawner.pending(), 1);

        h.spawner.run_all().await;
        assert!(
            !driver.is_submit_disabled(),
            "button must be enabled after the response (status {status})"
        );
    }
}

async fn test_click_on_disabled_button_is_ignored<F: HostFixture>(fixture: &F) {
    let h = setup(fixture, &[FormLayout::new("reset")], BinderOptions::default());
    h.transport.respond("reset", 200, "{}");
    let driver = &h.drivers[0];

    driver.click();
    driver.click();
    h.spawner.run_all().await;

    assert_eq!(h.transport.requests().len(), 1);

    // Enabled again: the next click goes through.
    driver.click();
    h.spawner.run_all().await;
    assert_eq!(h.transport.requests().len(), 2);
}

async fn test_forms_are_independent<F: HostFixture>(fixture: &F) {
    let forms = [
        FormLayout::new("remote_start_transaction").with_text("clientId", "a"),
        FormLayout::new("remote_stop_transaction").with_text("clientId", "b"),
    ];
    let h = setup(fixture, &forms, BinderOptions::default());
    h.transport
        .respond("remote_start_transaction", 200, r#"{"form":"a"}"#);
    h.transport
        .respond("remote_stop_transaction", 500, "b failed");
    let (a, b) = (&h.drivers[0], &h.drivers[1]);

    a.click();
    assert!(a.is_submit_disabled());
    assert!(!b.is_submit_disabled(), "other forms stay enabled");

    b.click();
    assert!(a.is_submit_disabled());
    assert!(b.is_submit_disabled());

    h.spawner.run_all().await;

    assert!(!a.is_submit_disabled());
    assert!(!b.is_submit_disabled());
    assert_eq!(a.result_text(), "{\n  \"form\": \"a\"\n}");
    assert_eq!(a.result_color().as_deref(), Some("black"));
    assert_eq!(b.result_text(), "b failed");
    assert_eq!(b.result_color().as_deref(), Some("red"));

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].values.to_json(), serde_json::json!({"clientId": "a"}));
    assert_eq!(requests[1].values.to_json(), serde_json::json!({"clientId": "b"}));
}

async fn test_values_are_read_at_click_time<F: HostFixture>(fixture: &F) {
    let h = setup(fixture, &[start_transaction_form()], BinderOptions::default());
    h.transport.respond("remote_start_transaction", 200, "{}");
    let driver = &h.drivers[0];

    driver.set_input("idTag", "tag-2");
    driver.set_input("transactionId", "16");
    driver.click();
    h.spawner.run_all().await;

    let requests = h.transport.requests();
    assert_eq!(
        requests[0].values.to_json(),
        serde_json::json!({
            "clientId": "cp-1",
            "idTag": "tag-2",
            "transactionId": 16,
        })
    );
}

async fn test_duplicate_names_last_wins<F: HostFixture>(fixture: &F) {
    let layout = FormLayout::new("reset")
        .with_text("resetType", "Hard")
        .with_text("resetType", "Soft");
    let h = setup(fixture, &[layout], BinderOptions::default());
    h.transport.respond("reset", 200, "{}");

    h.drivers[0].click();
    h.spawner.run_all().await;

    assert_eq!(
        h.transport.requests()[0].values.to_json(),
        serde_json::json!({"resetType": "Soft"})
    );
}

async fn test_custom_selectors_and_palette<F: HostFixture>(fixture: &F) {
    let options = BinderOptions {
        selectors: Selectors {
            form_class: "cp-form".to_string(),
            submit_class: "cp-submit".to_string(),
            result_class: "cp-result".to_string(),
            input_class: "cp-input".to_string(),
            action_attribute: "data-route".to_string(),
        },
        palette: Palette {
            neutral: "green".to_string(),
            alert: "orange".to_string(),
        },
    };
    let forms = [
        FormLayout::new("reset").with_text("clientId", "cp-1"),
        FormLayout::new("remote_stop_transaction"),
    ];
    let h = setup(fixture, &forms, options);
    assert_eq!(h.bound.len(), 2);
    h.transport.respond("reset", 200, "[]");
    h.transport.respond("remote_stop_transaction", 400, "bad request");

    h.drivers[0].click();
    h.drivers[1].click();
    h.spawner.run_all().await;

    assert_eq!(h.drivers[0].result_text(), "[]");
    assert_eq!(h.drivers[0].result_color().as_deref(), Some("green"));
    assert_eq!(h.drivers[1].result_text(), "bad request");
    assert_eq!(h.drivers[1].result_color().as_deref(), Some("orange"));
    assert_eq!(
        h.transport.requests()[0].values.to_json(),
        serde_json::json!({"clientId": "cp-1"})
    );
}
