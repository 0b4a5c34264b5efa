use std::rc::Rc;

use crate::{RequestFailed, Submission};

/// Carries a [`Submission`] to the server.
///
/// Futures are not required to be `Send`, so implementations can run on a
/// browser event loop.
#[async_trait::async_trait(?Send)]
pub trait Transport: std::fmt::Debug {
    /// Get a descriptive name for the transport implementation.
    ///
    /// eg: "formbind.http", "formbind.memory", ...
    fn kind(&self) -> &str;

    /// The base URL requests are sent to.
    fn endpoint(&self) -> &url::Url;

    /// POST the submission values as JSON to `/<action>`.
    ///
    /// Returns the parsed JSON response body on success.
    async fn post_json(&self, submission: &Submission)
    -> Result<serde_json::Value, RequestFailed>;
}

#[async_trait::async_trait(?Send)]
impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn kind(&self) -> &str {
        self.as_ref().kind()
    }

    fn endpoint(&self) -> &url::Url {
        self.as_ref().endpoint()
    }

    async fn post_json(
        &self,
        submission: &Submission,
    ) -> Result<serde_json::Value, RequestFailed> {
        self.as_ref().post_json(submission).await
    }
}

pub type DynTransport = Rc<dyn Transport>;

/// Turn a received response into the submission result.
///
/// 2xx with a JSON body is a success. `204 No Content` is a success whose
/// value is JSON `null`; any other 2xx must carry valid JSON, an empty body
/// included. Everything else is a [`RequestFailed`] carrying the raw body.
pub fn classify_response(status: u16, body: &str) -> Result<serde_json::Value, RequestFailed> {
    const NO_CONTENT: u16 = 204;

    if !(200..300).contains(&status) {
        return Err(RequestFailed::status(status, body));
    }
    if status == NO_CONTENT {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(body).map_err(|err| RequestFailed::malformed(status, body, &err))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_classify_success() {
        assert_eq!(
            classify_response(200, r#"{"status":"Accepted"}"#),
            Ok(serde_json::json!({"status": "Accepted"}))
        );
        assert_eq!(classify_response(204, ""), Ok(serde_json::Value::Null));
    }

    #[test]
    fn test_classify_empty_body_needs_no_content() {
        let err = classify_response(200, "").unwrap_err();
        assert_eq!(err.status, Some(200));
        assert_eq!(err.body, "");
        assert!(err.reason.starts_with("invalid JSON response"));

        assert!(classify_response(201, "  ").is_err());
    }

    #[test]
    fn test_classify_error_status_keeps_raw_body() {
        let err = classify_response(500, "\"Timeout\"").unwrap_err();
        assert_eq!(err.status, Some(500));
        assert_eq!(err.body, "\"Timeout\"");
    }

    #[test]
    fn test_classify_malformed_json() {
        let err = classify_response(200, "<html>oops</html>").unwrap_err();
        assert_eq!(err.status, Some(200));
        assert_eq!(err.body, "<html>oops</html>");
        assert!(err.reason.starts_with("invalid JSON response"));
    }
}
