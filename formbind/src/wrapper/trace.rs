use crate::{RequestFailed, Submission, Transport};

/// Wrapper for a transport that logs requests with the `tracing` crate.
///
/// * Every request is logged at the `TRACE` level when it starts
/// * Successful responses are logged at the `DEBUG` level
/// * Failures are logged at the `WARN` level if the server answered, and at
///   the `ERROR` level if no response was received
#[derive(Debug)]
pub struct TracedTransport<T> {
    name: String,
    inner: T,
}

impl<T> TracedTransport<T> {
    /// Creates a new `TracedTransport` with the given name and inner transport.
    ///
    /// All logs will contain the name of the transport.
    pub fn new(name: impl Into<String>, inner: T) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait::async_trait(?Send)]
impl<T> Transport for TracedTransport<T>
where
    T: Transport,
{
    fn kind(&self) -> &str {
        self.inner.kind()
    }

    fn endpoint(&self) -> &url::Url {
        self.inner.endpoint()
    }

    async fn post_json(
        &self,
        submission: &Submission,
    ) -> Result<serde_json::Value, RequestFailed> {
        let path = submission.path();
        tracing::trace!(
            transport = &self.name,
            %path,
            fields = submission.values.len(),
            "post::start"
        );
        match self.inner.post_json(submission).await {
            Ok(value) => {
                tracing::debug!(transport = &self.name, %path, "post::ok");
                Ok(value)
            }
            Err(err) if err.status.is_some() => {
                tracing::warn!(
                    transport = &self.name,
                    %path,
                    status = ?err.status,
                    reason = %err.reason,
                    "post::rejected"
                );
                Err(err)
            }
            Err(err) => {
                tracing::error!(transport = &self.name, %path, error = %err, "post::failed");
                Err(err)
            }
        }
    }
}
