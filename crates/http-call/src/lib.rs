//! Declarative outbound HTTP calls.
//!
//! A [`call::HttpCallSpec`] describes one outbound request — URL, method,
//! headers, query parameters, body encoding, and how to decode the response.
//! [`runtime::HttpCaller`] executes specs against a shared `reqwest` client.
//!
//! This crate intentionally contains **no** retry policy and **no**
//! deadline handling; callers own both.

pub mod call;
pub mod runtime;

pub use call::{HttpCallSpec, RequestBody, ResponseKind};
pub use runtime::{DecodedBody, FileBody, HttpCallError, HttpCaller, Result};
