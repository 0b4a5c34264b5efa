mod config;
mod provider;
mod transport;

pub use self::{config::HttpTransportConfig, provider::HttpProvider, transport::HttpTransport};
