//! Drive the forms of a page config without a browser.
//!
//! The page is rendered into a [`MemoryDocument`], bound like a browser page
//! would be, and a single form is submitted through a real transport.

use std::{path::Path, rc::Rc};

use anyhow::Context as _;
use formbind::{
    DynTransport, FormBinder, SubmitOutcome, TransportBuilder, wrapper::trace::TracedTransport,
};
use formbind_config::{ConfigStore, PageConfig};
use formbind_memory::{MemoryDocument, MemoryProvider};
use futures::executor::LocalPool;

/// Default endpoint when neither the command line nor the page names one.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8777";

/// Builder knowing all transports available to the demos.
pub fn transport_builder() -> TransportBuilder {
    TransportBuilder::new()
        .with_provider(MemoryProvider::new())
        .with_provider(formbind_http::HttpProvider)
}

/// Build the transport for `uri`, with request logging.
pub fn build_transport(uri: &str) -> Result<DynTransport, anyhow::Error> {
    let inner = transport_builder()
        .build(uri)
        .with_context(|| format!("could not build transport for '{uri}'"))?;
    Ok(Rc::new(TracedTransport::new("submit", inner)))
}

/// Resolve a page argument.
///
/// An existing file is read as a single page. Anything else is the name of a
/// page in `store`.
pub async fn resolve_page(
    store: &dyn ConfigStore,
    page: &str,
) -> Result<PageConfig, anyhow::Error> {
    let path = Path::new(page);
    if path.is_file() {
        return Ok(formbind_config::read_page_file(path)?.config);
    }

    let loaded = store.load_pages().await?;
    for failed in &loaded.failed {
        tracing::warn!(error = %failed, "ignoring page that failed to load");
    }
    match loaded.get(page) {
        Some(found) => {
            tracing::debug!(page, source = ?found.source, "resolved stored page");
            Ok(found.config.clone())
        }
        None => {
            let known = loaded.names().collect::<Vec<_>>().join(", ");
            anyhow::bail!("'{page}' is neither a page file nor a stored page (stored: [{known}])")
        }
    }
}

/// Parse a `name=value` command line assignment.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{raw}'")),
    }
}

/// Human readable listing of the forms of a page.
pub fn describe_page(page: &PageConfig) -> String {
    let mut out = page.name.clone();
    if let Some(description) = &page.description {
        out.push_str(&format!(" - {description}"));
    }
    out.push('\n');
    for form in &page.forms {
        out.push_str(&format!("  {}\n", form.action));
        for input in &form.inputs {
            out.push_str(&format!("    {} ({})", input.name, input.kind.type_attr()));
            if !input.value.is_empty() {
                out.push_str(&format!(" = {:?}", input.value));
            }
            out.push('\n');
        }
    }
    out
}

/// Submit one form of the page.
///
/// `overrides` replace the initial values of named inputs. Naming an input
/// the form does not have is an error.
///
/// Must be called within a tokio runtime context if the transport needs one
/// (eg: HTTP).
pub fn submit_form(
    page: &PageConfig,
    transport: DynTransport,
    action: &str,
    overrides: &[(String, String)],
) -> Result<SubmitOutcome, anyhow::Error> {
    let selectors = &page.options.selectors;
    let doc = MemoryDocument::new();
    let forms: Vec<_> = page
        .forms
        .iter()
        .map(|layout| doc.add_form(layout, selectors))
        .collect();

    let index = page
        .forms
        .iter()
        .position(|f| f.action == action)
        .with_context(|| format!("page '{}' has no form '{}'", page.name, action))?;
    let form = &forms[index];

    for (name, value) in overrides {
        let input = form
            .input(name)
            .with_context(|| format!("form '{action}' has no input '{name}'"))?;
        input.set_value(value);
    }

    let mut pool = LocalPool::new();
    let bound = FormBinder::new(transport, Rc::new(pool.spawner()))
        .with_options(page.options.clone())
        .bind(&doc)?;
    let bound = bound
        .into_iter()
        .find(|b| b.container().action().as_deref() == Some(action))
        .with_context(|| format!("form '{action}' was not bound"))?;

    let outcome = pool.run_until(bound.submit());
    tracing::debug!(
        action,
        success = outcome.is_success(),
        result = %form.result.text(),
        "demo::submitted"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use formbind::{FieldKind, FormLayout, Tone};
    use pretty_assertions::assert_eq;

    use super::*;

    fn page() -> PageConfig {
        PageConfig {
            name: "charge_point".to_string(),
            endpoint: None,
            description: None,
            options: Default::default(),
            forms: vec![
                FormLayout::new("remote_stop_transaction")
                    .with_text("clientId", "cp-1")
                    .with_number("transactionId", ""),
                FormLayout::new("reset")
                    .with_text("clientId", "cp-1")
                    .with_text("resetType", "Soft"),
            ],
        }
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("idTag=a=b"),
            Ok(("idTag".to_string(), "a=b".to_string()))
        );
        assert_eq!(
            parse_assignment("clientId="),
            Ok(("clientId".to_string(), String::new()))
        );
        assert!(parse_assignment("clientId").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test_log::test]
    fn test_submit_with_overrides() {
        let transport = build_transport("memory://").unwrap();
        let outcome = submit_form(
            &page(),
            transport,
            "remote_stop_transaction",
            &[("transactionId".to_string(), "12".to_string())],
        )
        .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.submission.path(), "/remote_stop_transaction");
        assert_eq!(
            outcome.view.text,
            "{\n  \"clientId\": \"cp-1\",\n  \"transactionId\": 12\n}"
        );
        assert_eq!(outcome.view.tone, Tone::Neutral);
    }

    #[test_log::test]
    fn test_submit_failure() {
        let transport = build_transport("memory://?mode=strict").unwrap();
        let outcome = submit_form(&page(), transport, "reset", &[]).unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.view.text, r#"{"message":"Not Found"}"#);
        assert_eq!(outcome.view.tone, Tone::Alert);
    }

    #[test]
    fn test_submit_unknown_form_or_input() {
        let transport = build_transport("memory://").unwrap();
        assert!(submit_form(&page(), transport.clone(), "unlock", &[]).is_err());
        assert!(
            submit_form(
                &page(),
                transport,
                "reset",
                &[("connectorId".to_string(), "1".to_string())]
            )
            .is_err()
        );
    }

    #[test]
    fn test_describe_page() {
        assert_eq!(
            describe_page(&page()),
            "charge_point\n  remote_stop_transaction\n    clientId (text) = \"cp-1\"\n    transactionId (number)\n  reset\n    clientId (text) = \"cp-1\"\n    resetType (text) = \"Soft\"\n"
        );
    }

    #[tokio::test]
    async fn test_resolve_page_from_file_or_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = formbind_config::FsConfigStore::new(dir.path().to_owned());

        let shipped = Path::new(env!("CARGO_MANIFEST_DIR")).join("pages/charge_point.yaml");
        let from_file = resolve_page(&store, shipped.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(from_file.name, "charge_point");

        assert!(resolve_page(&store, "charge_point").await.is_err());

        store.save_page(from_file.clone()).await.unwrap();
        let from_store = resolve_page(&store, "charge_point").await.unwrap();
        assert_eq!(from_store, from_file);

        let err = resolve_page(&store, "unknown").await.unwrap_err();
        assert!(err.to_string().contains("[charge_point]"), "{err}");
    }

    #[test]
    fn test_shipped_page_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("pages/charge_point.yaml");
        let page = formbind_config::read_page_file(&path).unwrap().config;
        assert_eq!(page.endpoint.as_deref(), Some(DEFAULT_ENDPOINT));

        let actions: Vec<_> = page.forms.iter().map(|f| f.action.as_str()).collect();
        assert_eq!(
            actions,
            vec!["remote_start_transaction", "remote_stop_transaction", "reset"]
        );
        assert_eq!(
            page.form("remote_start_transaction").unwrap().inputs[2].kind,
            FieldKind::Number
        );
    }
}
