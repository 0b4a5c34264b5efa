use std::rc::{Rc, Weak};

use crate::{
    BinderOptions, DynFormContainer, FormHost, FormValues, RequestFailed, ResultView, Spawner,
    Submission, transport::DynTransport,
};

/// Wires the submit buttons of form containers to JSON POST requests.
///
/// ```ignore
/// let binder = FormBinder::new(transport, spawner);
/// let forms = binder.bind(&host)?;
/// ```
///
/// Binding is explicit: containers added to the host after [`Self::bind`]
/// are not picked up.
pub struct FormBinder {
    transport: DynTransport,
    spawner: Rc<dyn Spawner>,
    options: Rc<BinderOptions>,
}

impl std::fmt::Debug for FormBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormBinder")
            .field("transport", &self.transport)
            .field("options", &self.options)
            .finish()
    }
}

impl FormBinder {
    pub fn new(transport: DynTransport, spawner: Rc<dyn Spawner>) -> Self {
        Self {
            transport,
            spawner,
            options: Rc::new(BinderOptions::default()),
        }
    }

    pub fn with_options(mut self, options: BinderOptions) -> Self {
        self.options = Rc::new(options);
        self
    }

    pub fn options(&self) -> &BinderOptions {
        &self.options
    }

    /// Attach one click handler to the submit button of every form container
    /// present in the host.
    ///
    /// A click synchronously collects the values and disables the button
    /// (see [`BoundForm::begin`]), then hands the request to the spawner.
    ///
    /// Handlers only hold a weak reference to their container. The host is
    /// expected to keep its containers alive (a browser page and
    /// `MemoryDocument` do); otherwise the returned forms must be kept, or
    /// clicks are ignored once they are dropped.
    #[must_use = "dropping the bound forms may detach the click handlers"]
    pub fn bind(&self, host: &dyn FormHost) -> Result<Vec<BoundForm>, anyhow::Error> {
        let containers = host.forms(&self.options.selectors)?;

        let mut bound = Vec::with_capacity(containers.len());
        for container in containers {
            let form = BoundForm {
                container,
                transport: self.transport.clone(),
                options: self.options.clone(),
            };
            form.container.on_submit_click(self.click_handler(&form));
            tracing::trace!(action = ?form.container.action(), "bind::form");
            bound.push(form);
        }

        tracing::debug!(
            forms = bound.len(),
            transport = self.transport.kind(),
            endpoint = %self.transport.endpoint(),
            "bind::ok"
        );
        Ok(bound)
    }

    fn click_handler(&self, form: &BoundForm) -> crate::ClickHandler {
        // The container owns the handler, so it only keeps a weak reference back.
        let container: Weak<dyn crate::FormContainer> = Rc::downgrade(&form.container);
        let transport = form.transport.clone();
        let options = form.options.clone();
        let spawner = self.spawner.clone();

        Rc::new(move || {
            let Some(container) = container.upgrade() else {
                return;
            };
            let form = BoundForm {
                container,
                transport: transport.clone(),
                options: options.clone(),
            };
            let pending = form.begin();
            spawner.spawn(Box::pin(async move {
                pending.finish().await;
            }));
        })
    }
}

/// A form container that has been bound by a [`FormBinder`].
#[derive(Clone)]
pub struct BoundForm {
    container: DynFormContainer,
    transport: DynTransport,
    options: Rc<BinderOptions>,
}

impl std::fmt::Debug for BoundForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundForm")
            .field("action", &self.container.action())
            .finish()
    }
}

impl BoundForm {
    pub fn container(&self) -> &DynFormContainer {
        &self.container
    }

    /// Read the action and the current input values.
    ///
    /// A container without an action attribute submits to `/`.
    pub fn collect(&self) -> Submission {
        let action = self.container.action().unwrap_or_default();
        let values: FormValues = self.container.inputs().into_iter().collect();
        Submission::new(action, values)
    }

    /// Collect the values and disable the submit button.
    ///
    /// The button is re-enabled when the returned [`PendingSubmit`] finishes
    /// or is dropped.
    pub fn begin(&self) -> PendingSubmit {
        let submission = self.collect();
        self.container.set_submit_disabled(true);
        tracing::trace!(
            action = %submission.action,
            fields = submission.values.len(),
            "submit::start"
        );

        PendingSubmit {
            guard: ReenableGuard {
                container: self.container.clone(),
            },
            form: self.clone(),
            submission,
        }
    }

    /// Run a full submission: collect, send, render.
    pub async fn submit(&self) -> SubmitOutcome {
        self.begin().finish().await
    }
}

/// A submission whose values have been collected and whose button is
/// disabled, but which has not been sent yet.
pub struct PendingSubmit {
    form: BoundForm,
    submission: Submission,
    guard: ReenableGuard,
}

impl PendingSubmit {
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// Send the request, render the result and re-enable the button.
    ///
    /// The result is rendered before the button is re-enabled.
    pub async fn finish(self) -> SubmitOutcome {
        let Self {
            form,
            submission,
            guard,
        } = self;

        let result = form.transport.post_json(&submission).await;
        let view = match &result {
            Ok(value) => {
                tracing::debug!(action = %submission.action, "submit::ok");
                ResultView::success(value)
            }
            Err(err) => {
                tracing::warn!(
                    action = %submission.action,
                    status = ?err.status,
                    reason = %err.reason,
                    "submit::failed"
                );
                ResultView::failure(err)
            }
        };
        form.container.show_result(&view, &form.options.palette);
        drop(guard);

        SubmitOutcome {
            submission,
            result,
            view,
        }
    }
}

/// Re-enables the submit button when dropped.
struct ReenableGuard {
    container: DynFormContainer,
}

impl Drop for ReenableGuard {
    fn drop(&mut self) {
        self.container.set_submit_disabled(false);
    }
}

/// What happened during one submission.
#[derive(Clone, Debug)]
pub struct SubmitOutcome {
    pub submission: Submission,
    pub result: Result<serde_json::Value, RequestFailed>,
    pub view: ResultView,
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use futures::executor::LocalPool;
    use pretty_assertions::assert_eq;

    use crate::{
        ClickHandler, FieldKind, FormContainer, InputSnapshot, Palette, Selectors, Tone,
        Transport, classify_response,
    };

    use super::*;

    #[derive(Default)]
    struct StubForm {
        action: Option<String>,
        inputs: Vec<InputSnapshot>,
        disabled: Cell<bool>,
        shown: RefCell<Option<(String, String)>>,
        handlers: RefCell<Vec<ClickHandler>>,
        disabled_when_shown: Cell<Option<bool>>,
    }

    impl StubForm {
        fn click(&self) {
            if self.disabled.get() {
                return;
            }
            let handlers = self.handlers.borrow().clone();
            for handler in handlers {
                handler();
            }
        }
    }

    impl FormContainer for StubForm {
        fn action(&self) -> Option<String> {
            self.action.clone()
        }

        fn inputs(&self) -> Vec<InputSnapshot> {
            self.inputs.clone()
        }

        fn is_submit_disabled(&self) -> bool {
            self.disabled.get()
        }

        fn set_submit_disabled(&self, disabled: bool) {
            self.disabled.set(disabled);
        }

        fn show_result(&self, view: &ResultView, palette: &Palette) {
            self.disabled_when_shown.set(Some(self.disabled.get()));
            *self.shown.borrow_mut() = Some((view.text.clone(), palette.color(view.tone).into()));
        }

        fn on_submit_click(&self, handler: ClickHandler) {
            self.handlers.borrow_mut().push(handler);
        }
    }

    struct StubHost {
        forms: Vec<Rc<StubForm>>,
    }

    impl FormHost for StubHost {
        fn forms(&self, _selectors: &Selectors) -> Result<Vec<DynFormContainer>, anyhow::Error> {
            Ok(self
                .forms
                .iter()
                .map(|f| f.clone() as DynFormContainer)
                .collect())
        }
    }

    #[derive(Debug)]
    struct StubTransport {
        endpoint: url::Url,
        status: u16,
        body: String,
        seen: RefCell<Vec<Submission>>,
    }

    impl StubTransport {
        fn new(status: u16, body: &str) -> Rc<Self> {
            Rc::new(Self {
                endpoint: url::Url::parse("stub://").unwrap(),
                status,
                body: body.to_string(),
                seen: RefCell::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait(?Send)]
    impl Transport for StubTransport {
        fn kind(&self) -> &str {
            "stub"
        }

        fn endpoint(&self) -> &url::Url {
            &self.endpoint
        }

        async fn post_json(
            &self,
            submission: &Submission,
        ) -> Result<serde_json::Value, RequestFailed> {
            self.seen.borrow_mut().push(submission.clone());
            classify_response(self.status, &self.body)
        }
    }

    fn stub_form(action: &str) -> Rc<StubForm> {
        Rc::new(StubForm {
            action: Some(action.to_string()),
            inputs: vec![
                InputSnapshot::new("clientId", FieldKind::Text, "cp-1"),
                InputSnapshot::new("transactionId", FieldKind::Number, "7"),
            ],
            ..Default::default()
        })
    }

    #[test_log::test]
    fn test_click_disables_until_response_rendered() {
        let mut pool = LocalPool::new();
        let transport = StubTransport::new(200, r#"{"status":"Accepted"}"#);
        let form = stub_form("remote_stop_transaction");
        let host = StubHost {
            forms: vec![form.clone()],
        };

        let binder = FormBinder::new(transport.clone(), Rc::new(pool.spawner()));
        let bound = binder.bind(&host).unwrap();
        assert_eq!(bound.len(), 1);

        form.click();
        assert!(form.is_submit_disabled());
        assert!(form.shown.borrow().is_none());

        pool.run_until_stalled();

        assert!(!form.is_submit_disabled());
        assert_eq!(form.disabled_when_shown.get(), Some(true));
        assert_eq!(
            form.shown.borrow().clone(),
            Some((
                "{\n  \"status\": \"Accepted\"\n}".to_string(),
                "black".to_string()
            ))
        );

        let seen = transport.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path(), "/remote_stop_transaction");
        assert_eq!(
            seen[0].values.to_json(),
            serde_json::json!({"clientId": "cp-1", "transactionId": 7})
        );
    }

    #[test_log::test]
    fn test_click_while_disabled_is_ignored() {
        let mut pool = LocalPool::new();
        let transport = StubTransport::new(200, "{}");
        let form = stub_form("reset");
        let host = StubHost {
            forms: vec![form.clone()],
        };

        FormBinder::new(transport.clone(), Rc::new(pool.spawner()))
            .bind(&host)
            .unwrap();

        form.click();
        form.click();
        pool.run_until_stalled();

        assert_eq!(transport.seen.borrow().len(), 1);
    }

    #[test_log::test]
    fn test_submit_failure_uses_alert_color() {
        let transport = StubTransport::new(500, "\"Timeout\"");
        let form = stub_form("remote_start_transaction");
        let host = StubHost {
            forms: vec![form.clone()],
        };

        let binder = FormBinder::new(transport, Rc::new(LocalPool::new().spawner()))
            .with_options(BinderOptions {
                palette: Palette {
                    neutral: "inherit".to_string(),
                    alert: "darkred".to_string(),
                },
                ..Default::default()
            });
        let bound = binder.bind(&host).unwrap();

        let outcome = futures::executor::block_on(bound[0].submit());
        assert!(!outcome.is_success());
        assert_eq!(outcome.view.tone, Tone::Alert);
        assert_eq!(
            form.shown.borrow().clone(),
            Some(("\"Timeout\"".to_string(), "darkred".to_string()))
        );
        assert!(!form.is_submit_disabled());
    }

    #[test]
    fn test_dropped_pending_submit_reenables() {
        let transport = StubTransport::new(200, "{}");
        let form = stub_form("reset");
        let host = StubHost {
            forms: vec![form.clone()],
        };
        let bound = FormBinder::new(transport.clone(), Rc::new(LocalPool::new().spawner()))
            .bind(&host)
            .unwrap();

        let pending = bound[0].begin();
        assert!(form.is_submit_disabled());
        assert_eq!(pending.submission().action, "reset");

        drop(pending);
        assert!(!form.is_submit_disabled());
        assert!(transport.seen.borrow().is_empty());
    }

    #[test]
    fn test_missing_action_posts_to_root() {
        let transport = StubTransport::new(200, "{}");
        let form = Rc::new(StubForm::default());
        let host = StubHost {
            forms: vec![form.clone()],
        };
        let bound = FormBinder::new(transport.clone(), Rc::new(LocalPool::new().spawner()))
            .bind(&host)
            .unwrap();

        let outcome = futures::executor::block_on(bound[0].submit());
        assert_eq!(outcome.submission.path(), "/");
        assert_eq!(transport.seen.borrow()[0].values, FormValues::new());
    }

    #[test]
    fn test_bound_forms_are_released_with_host() {
        let transport = StubTransport::new(200, "{}");
        let form = stub_form("reset");
        let weak = Rc::downgrade(&form);
        {
            let host = StubHost { forms: vec![form] };
            let bound = FormBinder::new(transport, Rc::new(LocalPool::new().spawner()))
                .bind(&host)
                .unwrap();
            drop(bound);
        }
        assert!(weak.upgrade().is_none());
    }
}
