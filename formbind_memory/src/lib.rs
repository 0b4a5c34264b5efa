//! In-memory host and transport for formbind.
//!
//! [`MemoryDocument`] is a headless stand-in for a browser document, and
//! [`MemoryTransport`] answers submissions without a network.

mod document;
mod element;
mod provider;
mod transport;

pub use self::{
    document::{MemoryDocument, MemoryForm},
    element::MemoryElement,
    provider::MemoryProvider,
    transport::{MemoryResponse, MemoryTransport},
};

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use formbind::{FormBinder, FormHost, FormLayout, Selectors};
    use formbind_test::{FormDriver, HostFixture};
    use futures::executor::LocalPool;
    use pretty_assertions::assert_eq;

    use super::*;

    struct MemoryFixture;

    impl FormDriver for MemoryForm {
        fn click(&self) {
            self.submit.click();
        }

        fn set_input(&self, name: &str, value: &str) {
            if let Some(input) = self.input(name) {
                input.set_value(value);
            }
        }

        fn is_submit_disabled(&self) -> bool {
            self.submit.is_disabled()
        }

        fn result_text(&self) -> String {
            self.result.text()
        }

        fn result_color(&self) -> Option<String> {
            self.result.color()
        }

        fn is_result_visible(&self) -> bool {
            self.result.is_visible()
        }
    }

    impl HostFixture for MemoryFixture {
        type Driver = MemoryForm;

        fn create(
            &self,
            forms: &[FormLayout],
            selectors: &Selectors,
        ) -> Result<(Box<dyn FormHost>, Vec<MemoryForm>), anyhow::Error> {
            let doc = MemoryDocument::new();
            let drivers = forms
                .iter()
                .map(|layout| doc.add_form(layout, selectors))
                .collect();
            Ok((Box::new(doc), drivers))
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_memory_host() {
        formbind_test::test_host(&MemoryFixture).await;
    }

    #[test_log::test]
    fn test_local_pool_click_flow() {
        let mut pool = LocalPool::new();
        let selectors = Selectors::default();
        let doc = MemoryDocument::new();
        let form = doc.add_form(
            &FormLayout::new("reset")
                .with_text("clientId", "cp-7")
                .with_text("resetType", "Soft"),
            &selectors,
        );

        let transport = MemoryTransport::new();
        transport.respond(
            "reset",
            MemoryResponse::ok(&serde_json::json!({"status": "Accepted"})),
        );

        let bound = FormBinder::new(Rc::new(transport.clone()), Rc::new(pool.spawner()))
            .bind(&doc)
            .unwrap();
        assert_eq!(bound.len(), 1);

        assert!(form.submit.click());
        assert!(form.submit.is_disabled());
        assert!(!form.submit.click());

        pool.run_until_stalled();

        assert!(!form.submit.is_disabled());
        assert!(form.result.is_visible());
        assert_eq!(form.result.text(), "{\n  \"status\": \"Accepted\"\n}");
        assert_eq!(form.result.color().as_deref(), Some("black"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test_log::test]
    fn test_document_keeps_bindings_alive() {
        let mut pool = LocalPool::new();
        let doc = MemoryDocument::new();
        let form = doc.add_form(
            &FormLayout::new("unlock_connector").with_number("connectorId", "2"),
            &Selectors::default(),
        );
        let transport = MemoryTransport::new();

        let _ = FormBinder::new(Rc::new(transport.clone()), Rc::new(pool.spawner()))
            .bind(&doc)
            .unwrap();

        assert!(form.submit.click());
        pool.run_until_stalled();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path(), "/unlock_connector");
        assert!(form.result.is_visible());
        assert!(!form.submit.is_disabled());
    }

    #[test_log::test]
    fn test_unnamed_input_is_not_submitted() {
        let selectors = Selectors::default();
        let doc = MemoryDocument::new();
        let form = doc.add_form(&FormLayout::new("reset").with_text("clientId", "cp"), &selectors);
        form.root.append_child(
            MemoryElement::new("input")
                .with_class(&selectors.input_class)
                .with_value("orphan"),
        );

        let transport = MemoryTransport::echo();
        let bound = FormBinder::new(
            Rc::new(transport.clone()),
            Rc::new(LocalPool::new().spawner()),
        )
        .bind(&doc)
        .unwrap();

        let outcome = futures::executor::block_on(bound[0].submit());
        assert_eq!(
            outcome.result,
            Ok(serde_json::json!({"clientId": "cp"}))
        );
    }
}
