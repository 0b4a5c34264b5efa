use std::sync::Arc;

use http::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;

use formbind::{RequestFailed, Submission, Transport, classify_response};

use crate::HttpTransportConfig;

/// Posts submissions to an HTTP server.
///
/// Works natively and on `wasm32`, where reqwest goes through `fetch`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    state: Arc<State>,
}

#[derive(Debug)]
struct State {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpTransport {
    /// The kind of this transport (see [`Transport::kind`]).
    pub const KIND: &'static str = "formbind.http";

    fn default_client(config: &HttpTransportConfig) -> Result<Client, anyhow::Error> {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.connect_timeout(config.connect_timeout());
        #[cfg(target_arch = "wasm32")]
        let _ = config;

        builder
            .build()
            .map_err(|err| anyhow::anyhow!("failed to build reqwest client: {err}"))
    }

    pub fn new(config: HttpTransportConfig) -> Result<Self, anyhow::Error> {
        let client = Self::default_client(&config)?;
        Ok(Self::new_with_client(config, client))
    }

    pub fn new_with_client(config: HttpTransportConfig, client: Client) -> Self {
        Self {
            state: Arc::new(State { config, client }),
        }
    }

    pub fn from_uri(uri: &str) -> Result<Self, anyhow::Error> {
        Self::new(HttpTransportConfig::from_uri(uri)?)
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.state.config
    }
}

#[async_trait::async_trait(?Send)]
impl Transport for HttpTransport {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn endpoint(&self) -> &url::Url {
        &self.state.config.base_url
    }

    async fn post_json(
        &self,
        submission: &Submission,
    ) -> Result<serde_json::Value, RequestFailed> {
        let url = self
            .state
            .config
            .action_url(&submission.action)
            .map_err(RequestFailed::network)?;
        let body = submission
            .body()
            .map_err(|err| RequestFailed::network(format!("could not encode body: {err}")))?;
        tracing::trace!(%url, body_len = body.len(), "sending submission");

        let res = self
            .state
            .client
            .post(url)
            .header(CONTENT_TYPE, Submission::CONTENT_TYPE)
            .header(ACCEPT, Submission::CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(RequestFailed::network)?;
        tracing::trace!(?res, "response for submission");

        let status = res.status();
        let text = res.text().await.map_err(|err| RequestFailed {
            status: Some(status.as_u16()),
            body: String::new(),
            reason: format!("failed to read response body: {err}"),
        })?;

        classify_response(status.as_u16(), &text)
    }
}
