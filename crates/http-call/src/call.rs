//! The call description types: what to send and how to read the answer.

use reqwest::Method;
use serde_json::Value;

/// Request body, selected by content type. Exactly one encoding path runs
/// per call.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Serialized as JSON; `Content-Type: application/json` is set unless
    /// the caller supplied a content type of their own.
    Json(Value),
    /// Encoded as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Encoded as multipart form fields. No explicit `Content-Type` header
    /// is set; the transport generates the boundary.
    Multipart(Vec<(String, String)>),
    /// Passed through unmodified (binary / already-encoded payloads).
    Raw(Vec<u8>),
}

/// How to decode a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    /// Parse the body as JSON.
    Json,
    /// Return the body as text.
    #[default]
    Text,
    /// Return the body as opaque bytes.
    Bytes,
    /// Pair the bytes with the filename from `Content-Disposition` and the
    /// declared media type.
    File,
    /// Hand back the undecoded response (headers + status + body stream).
    Raw,
}

/// Description of one outbound HTTP call.
///
/// Built with the fluent methods below; executed by
/// [`crate::runtime::HttpCaller::execute`].
#[derive(Debug, Clone)]
pub struct HttpCallSpec {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    /// Query parameters (string or number values). Always URL-encoded and
    /// appended to the URL, regardless of method.
    pub query: Vec<(String, Value)>,
    pub body: RequestBody,
    pub response: ResponseKind,
    /// Added as `Authorization: Bearer <token>` when no caller-supplied
    /// `Authorization` header is present.
    pub bearer_token: Option<String>,
    /// Added as `x-api-key: <key>` when no caller-supplied `x-api-key`
    /// header is present.
    pub api_key: Option<String>,
}

impl HttpCallSpec {
    /// New spec with the default method (`POST`).
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            headers: Vec::new(),
            query: Vec::new(),
            body: RequestBody::None,
            response: ResponseKind::default(),
            bearer_token: None,
            api_key: None,
        }
    }

    /// New `GET` spec.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::GET)
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn json_body(self, value: Value) -> Self {
        self.body(RequestBody::Json(value))
    }

    #[must_use]
    pub fn response(mut self, kind: ResponseKind) -> Self {
        self.response = kind;
        self
    }

    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}
