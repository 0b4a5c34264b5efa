use std::rc::Rc;

use anyhow::Context;

/// Builds [`crate::HttpTransport`]s for `http://` and `https://` URIs.
pub struct HttpProvider;

impl formbind::TransportProvider for HttpProvider {
    fn schemes(&self) -> &[&str] {
        crate::HttpTransportConfig::URI_SCHEMES
    }

    fn build(&self, url: &url::Url) -> Result<formbind::DynTransport, anyhow::Error> {
        let config = crate::HttpTransportConfig::from_uri(url.as_str())
            .context("Failed to parse HTTP transport configuration from URI")?;
        let transport = crate::HttpTransport::new(config)?;
        Ok(Rc::new(transport) as formbind::DynTransport)
    }
}
