use std::rc::Rc;

use formbind::TransportProvider;

/// Builds [`crate::MemoryTransport`]s for `memory://` URIs.
///
/// * `memory://` echoes every submission back
/// * `memory://?mode=strict` answers `404` for every action
pub struct MemoryProvider;

impl MemoryProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportProvider for MemoryProvider {
    fn schemes(&self) -> &[&str] {
        &["memory"]
    }

    fn build(&self, url: &url::Url) -> Result<formbind::DynTransport, anyhow::Error> {
        if url.scheme() != "memory" {
            return Err(anyhow::anyhow!(
                "Invalid scheme: expected 'memory', got '{}'",
                url.scheme()
            ));
        }

        let mode = url
            .query_pairs()
            .find(|(k, _)| k == "mode")
            .map(|(_, v)| v.into_owned());
        let transport = match mode.as_deref() {
            None | Some("echo") => crate::MemoryTransport::echo(),
            Some("strict") => crate::MemoryTransport::new(),
            Some(other) => anyhow::bail!(
                "invalid mode: expected 'echo' or 'strict', got '{}'",
                other
            ),
        };
        Ok(Rc::new(transport) as formbind::DynTransport)
    }
}
