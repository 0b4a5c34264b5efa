use crate::transport::DynTransport;

/// A provider/builder for a transport implementation.
///
/// Can construct a transport from a generic URI.
/// See [`crate::TransportBuilder`] for usage.
pub trait TransportProvider {
    /// URI schemes handled by this provider.
    ///
    /// eg: `["memory"]`, `["http", "https"]`
    fn schemes(&self) -> &[&str];

    /// Build a new [`crate::Transport`] from a generic URI.
    ///
    /// The scheme of the URL is one of [`Self::schemes`].
    ///
    /// eg:
    /// * `memory://`
    /// * `http://localhost:8777`
    /// * `https://example.com/api`
    fn build(&self, url: &url::Url) -> Result<DynTransport, anyhow::Error>;
}
