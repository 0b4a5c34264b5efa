use std::time::Duration;

use anyhow::Context as _;
use url::Url;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Submissions go to `<base_url>/<action>`.
    pub base_url: Url,
    /// Connect timeout in seconds.
    ///
    /// Ignored on wasm, where the browser owns the connection.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

impl HttpTransportConfig {
    pub(crate) const URI_SCHEMES: &'static [&'static str] = &["http", "https"];
    pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            connect_timeout_secs: None,
        }
    }

    /// Parse a config from a URI.
    ///
    /// The URI is the base URL. A `connect_timeout=<secs>` query parameter is
    /// consumed and stripped, everything else is kept as is.
    pub fn from_uri(uri: &str) -> Result<Self, anyhow::Error> {
        let mut url = uri
            .parse::<Url>()
            .map_err(|e| anyhow::anyhow!("Invalid URL '{}': {}", uri, e))?;
        if !Self::URI_SCHEMES.contains(&url.scheme()) {
            return Err(anyhow::anyhow!(
                "Invalid scheme: expected 'http' or 'https', got '{}'",
                url.scheme()
            ));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            anyhow::bail!("Invalid URL '{}': missing host", uri);
        }

        let mut connect_timeout_secs = None;
        let mut rest = Vec::new();
        for (key, value) in url.query_pairs() {
            if key == "connect_timeout" {
                let secs = value
                    .parse::<u64>()
                    .with_context(|| format!("invalid connect_timeout '{value}'"))?;
                connect_timeout_secs = Some(secs);
            } else {
                rest.push((key.into_owned(), value.into_owned()));
            }
        }
        if rest.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(rest);
        }

        Ok(Self {
            base_url: url,
            connect_timeout_secs,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(Self::DEFAULT_CONNECT_TIMEOUT)
    }

    /// The URL a submission for `action` is sent to.
    ///
    /// Path segments of the action are appended to the base path, so a base
    /// of `http://host/api` and action `reset` yields `http://host/api/reset`.
    /// Query and fragment of the base are kept.
    pub fn action_url(&self, action: &str) -> Result<Url, anyhow::Error> {
        let mut url = self.base_url.clone();
        url.set_fragment(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("base URL '{}' cannot be a base", self.base_url))?;
            segments.pop_if_empty();
            let action = action.trim_start_matches('/');
            if !action.is_empty() {
                segments.extend(action.split('/'));
            } else {
                // Keep the trailing slash: an empty action posts to the root.
                segments.push("");
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_from_uri() {
        let config = HttpTransportConfig::from_uri("http://localhost:8777").unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8777/");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));

        let config =
            HttpTransportConfig::from_uri("https://example.com/api?connect_timeout=3&key=a")
                .unwrap();
        assert_eq!(config.base_url.as_str(), "https://example.com/api?key=a");
        assert_eq!(config.connect_timeout_secs, Some(3));

        assert!(HttpTransportConfig::from_uri("memory://").is_err());
        assert!(HttpTransportConfig::from_uri("http://localhost?connect_timeout=x").is_err());
        assert!(HttpTransportConfig::from_uri("not a url").is_err());
    }

    #[test]
    fn test_action_url() {
        let config = HttpTransportConfig::from_uri("http://localhost:8777").unwrap();
        assert_eq!(
            config.action_url("reset").unwrap().as_str(),
            "http://localhost:8777/reset"
        );
        assert_eq!(
            config.action_url("").unwrap().as_str(),
            "http://localhost:8777/"
        );

        let config = HttpTransportConfig::from_uri("http://localhost/api/").unwrap();
        assert_eq!(
            config.action_url("/charge/remote_stop_transaction").unwrap().as_str(),
            "http://localhost/api/charge/remote_stop_transaction"
        );
    }
}
