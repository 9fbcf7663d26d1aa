//! Request handlers for the stub server.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, MethodRouter};
use tracing::{info, warn};

use crate::config::StubReply;
use crate::server::StubError;

/// Body returned for unregistered paths.
pub const NOT_FOUND_BODY: &str = "Test Error";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A [`StubReply`] with a validated status code.
#[derive(Debug)]
pub(crate) struct FixedReply {
    status: StatusCode,
    body: String,
}

impl TryFrom<&StubReply> for FixedReply {
    type Error = StubError;

    fn try_from(reply: &StubReply) -> Result<Self, Self::Error> {
        let status =
            StatusCode::from_u16(reply.code).map_err(|_| StubError::InvalidStatus(reply.code))?;
        Ok(Self {
            status,
            body: reply.body.clone(),
        })
    }
}

/// Route answering every method with `reply`.
pub(crate) fn fixed(reply: FixedReply) -> MethodRouter {
    let reply = Arc::new(reply);
    any(
        move |method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes| {
            let reply = Arc::clone(&reply);
            async move { respond(&reply, method, uri, version, headers, body) }
        },
    )
}

fn respond(
    reply: &FixedReply,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!("{} {} {:?}", method, uri, version);
    for (name, value) in &headers {
        info!("Header[{:?}] = {:?}", name.as_str(), value);
    }
    for (key, value) in form_fields(&uri, &headers, &body) {
        info!("Form[{:?}]={:?}", key, value);
    }
    info!("Body value: {}", String::from_utf8_lossy(&body));

    info!("responding with value {}: {}", reply.status.as_u16(), reply.body);
    (reply.status, reply.body.clone()).into_response()
}

/// Fallback for every unregistered path.
pub(crate) async fn not_found(method: Method, uri: Uri, version: Version) -> impl IntoResponse {
    warn!("Error- {} {} {:?}", method, uri, version);
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// Query parameters followed by urlencoded body fields.
pub(crate) fn form_fields(uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = uri
        .query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE));
    if is_form {
        fields.extend(url::form_urlencoded::parse(body).into_owned());
    }

    fields
}
