//! Client-side form submission helpers.
//!
//! A [`FormBinder`] scans a [`FormHost`] for form containers and wires each
//! container's submit button to a handler that collects the named inputs,
//! POSTs them as JSON through a [`Transport`] and renders the response into
//! the container's result element.
//!
//! Hosts (browser DOM, in-memory document) and transports (HTTP, in-memory)
//! live in their own crates.

mod binder;
mod builder;
mod error;
mod host;
mod provider;
mod transport;
mod types;
pub mod wrapper;

pub use self::{
    binder::{BoundForm, FormBinder, PendingSubmit, SubmitOutcome},
    builder::TransportBuilder,
    error::RequestFailed,
    host::{ClickHandler, DynFormContainer, FormContainer, FormHost, Spawner},
    provider::TransportProvider,
    transport::{DynTransport, Transport, classify_response},
    types::*,
};
