//! API client module for the fileshare service.
//!
//! Requests are described as envelopes, executed by a `Transport`, and
//! wrapped by the `SessionClient`, which attaches the access credential and
//! recovers once from credential expiry.
//!
//! The API uses bearer token authentication; the long-lived refresh
//! credential is an HTTP-only cookie managed by the server.

pub mod client;
pub mod envelope;
pub mod error;
pub mod operations;
pub mod transport;

pub use client::SessionClient;
pub use envelope::{EnvelopeError, Operation, RequestEnvelope, ResponseEnvelope, RestMethod};
pub use error::{ApiError, ErrorClass};
pub use transport::{HttpTransport, Transport};
