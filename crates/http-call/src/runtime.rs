//! Execution of [`HttpCallSpec`]s against a shared `reqwest` client.

use crate::call::{HttpCallSpec, RequestBody, ResponseKind};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::form_urlencoded;

#[derive(Debug, Error)]
pub enum HttpCallError {
    /// The spec itself is unusable (bad URL, unserializable body).
    #[error("invalid call spec: {0}")]
    Spec(String),
    /// The request never produced a response (DNS, connect, TLS, ...).
    #[error("http transport error: {0}")]
    Transport(String),
    /// The upstream answered with a non-2xx status.
    #[error("API returned {status} {status_text}: {body}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },
    /// The body could not be decoded as the declared response kind.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, HttpCallError>;

impl From<reqwest::Error> for HttpCallError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

/// A file payload decoded from a response ([`ResponseKind::File`]).
#[derive(Debug, Clone)]
pub struct FileBody {
    /// Filename from `Content-Disposition`; empty when the header is absent.
    pub filename: String,
    /// Declared media type, if any.
    pub media_type: Option<String>,
    pub bytes: Bytes,
}

/// A decoded response body, one variant per [`ResponseKind`].
#[derive(Debug)]
pub enum DecodedBody {
    Json(Value),
    Text(String),
    Bytes(Bytes),
    File(FileBody),
    Raw(reqwest::Response),
}

impl DecodedBody {
    /// Unwrap the JSON variant.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the call was not executed with
    /// [`ResponseKind::Json`].
    pub fn into_json(self) -> Result<Value> {
        match self {
            Self::Json(v) => Ok(v),
            other => Err(HttpCallError::Decode(format!(
                "expected a JSON body, got {}",
                other.kind_name()
            ))),
        }
    }

    /// Unwrap the text variant.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the call was not executed with
    /// [`ResponseKind::Text`].
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(HttpCallError::Decode(format!(
                "expected a text body, got {}",
                other.kind_name()
            ))),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::File(_) => "file",
            Self::Raw(_) => "raw",
        }
    }
}

/// Executes [`HttpCallSpec`]s. Cheap to clone; all clones share one client.
#[derive(Clone)]
pub struct HttpCaller {
    client: Client,
}

impl Default for HttpCaller {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCaller {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Use a pre-built client (custom TLS, proxies, ...).
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Execute one call: append query params, encode the body per its
    /// content type, apply auth headers, send, and decode the response per
    /// the declared response kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the request fails at the
    /// transport level, the upstream answers non-2xx, or the body cannot be
    /// decoded as the declared kind.
    pub async fn execute(&self, spec: HttpCallSpec) -> Result<DecodedBody> {
        let url = Url::parse(&append_query(&spec.url, &spec.query))
            .map_err(|e| HttpCallError::Spec(format!("invalid URL '{}': {e}", spec.url)))?;

        debug!(method = %spec.method, url = %redact_url(&url), "outbound http call");

        let mut request = self.client.request(spec.method, url);
        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }

        let has_content_type = has_header(&spec.headers, "content-type");
        request = match spec.body {
            RequestBody::None => request,
            RequestBody::Json(value) => {
                let payload = serde_json::to_vec(&value)
                    .map_err(|e| HttpCallError::Spec(format!("unserializable JSON body: {e}")))?;
                if !has_content_type {
                    request = request.header(CONTENT_TYPE, "application/json");
                }
                request.body(payload)
            }
            RequestBody::Form(params) => request.form(&params),
            RequestBody::Multipart(params) => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in params {
                    form = form.text(name, value);
                }
                request.multipart(form)
            }
            RequestBody::Raw(payload) => request.body(payload),
        };

        if let Some(token) = &spec.bearer_token
            && !has_header(&spec.headers, AUTHORIZATION.as_str())
        {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(key) = &spec.api_key
            && !has_header(&spec.headers, "x-api-key")
        {
            request = request.header("x-api-key", key);
        }
        if !has_header(&spec.headers, CACHE_CONTROL.as_str()) {
            request = request.header(CACHE_CONTROL, "no-store");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpCallError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        match spec.response {
            ResponseKind::Json => {
                let bytes = response.bytes().await?;
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| HttpCallError::Decode(format!("invalid JSON body: {e}")))?;
                Ok(DecodedBody::Json(value))
            }
            ResponseKind::Text => Ok(DecodedBody::Text(response.text().await?)),
            ResponseKind::Bytes => Ok(DecodedBody::Bytes(response.bytes().await?)),
            ResponseKind::File => {
                let filename = response
                    .headers()
                    .get(CONTENT_DISPOSITION)
                    .and_then(|v| v.to_str().ok())
                    .map(filename_from_disposition)
                    .unwrap_or_default();
                let media_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let bytes = response.bytes().await?;
                Ok(DecodedBody::File(FileBody {
                    filename,
                    media_type,
                    bytes,
                }))
            }
            ResponseKind::Raw => Ok(DecodedBody::Raw(response)),
        }
    }
}

fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

/// Append URL-encoded query parameters. A URL already carrying a query
/// string gets `&` before the new parameters, otherwise `?`; an empty map
/// appends nothing.
fn append_query(url: &str, query: &[(String, Value)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in query {
        serializer.append_pair(name, &value_to_string(value));
    }
    let encoded = serializer.finish();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{encoded}")
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// Extract a filename from a `Content-Disposition` header value.
///
/// Prefers the RFC 5987 `filename*=UTF-8''...` form (percent-decoded),
/// falling back to the plain `filename=` parameter with surrounding quotes
/// stripped. Unparseable headers yield an empty string.
fn filename_from_disposition(header: &str) -> String {
    let mut plain: Option<&str> = None;
    for part in header.split(';') {
        let Some((name, value)) = part.trim().split_once('=') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                if let Some(encoded) = strip_ext_value_prefix(value.trim()) {
                    return percent_decode_str(encoded).decode_utf8_lossy().into_owned();
                }
            }
            "filename" => plain = Some(value.trim()),
            _ => {}
        }
    }
    plain
        .map(|v| v.trim_matches(['"', '\'']).to_string())
        .unwrap_or_default()
}

fn strip_ext_value_prefix(value: &str) -> Option<&str> {
    const PREFIX: &str = "utf-8''";
    if value.len() >= PREFIX.len() && value[..PREFIX.len()].eq_ignore_ascii_case(PREFIX) {
        Some(&value[PREFIX.len()..])
    } else {
        None
    }
}

#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}
