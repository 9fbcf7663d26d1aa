//! Request descriptions and the header/body shaping rules applied to them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use crate::client::HttpError;
use crate::response::to_json;

/// Timeout applied when a request does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Parameter key holding the raw payload of a [`Method::JsonPost`] request.
pub const JSON_PARAM: &str = "json";

/// Common HTTP headers.
pub mod headers {
    /// `Content-Type` forced on JSON POST requests.
    pub const CONTENT_TYPE_JSON: &str = "application/json";
    /// Default `Content-Type` of POST/PUT requests without custom headers.
    pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
}

/// Request method.
///
/// `JsonPost` is a POST whose body is the raw JSON string stored under
/// [`JSON_PARAM`] instead of form-encoded parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    JsonPost,
}

impl Method {
    /// Name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::JsonPost => "JSONPOST",
        }
    }

    /// Method sent on the wire.
    pub fn wire_method(&self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post | Self::JsonPost => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request method: {0}")]
pub struct ParseMethodError(pub String);

impl FromStr for Method {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "JSONPOST" => Ok(Self::JsonPost),
            _ => Err(ParseMethodError(s.to_string())),
        }
    }
}

/// Declarative description of a single HTTP call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestParams {
    /// Request method.
    pub method: Method,
    /// Full endpoint, e.g. `http://localhost:8000/test`.
    pub endpoint: String,
    /// Query parameters (GET/DELETE) or form fields (POST/PUT).
    pub params: BTreeMap<String, String>,
    /// Extra headers. For POST/PUT a non-empty map replaces the default
    /// form `Content-Type`.
    pub headers: BTreeMap<String, String>,
    /// Sent verbatim as the `Authorization` header.
    pub api_key: Option<String>,
    /// Sent as `Authorization: username:password`, unencoded.
    pub username: Option<String>,
    /// Paired with `username`. Missing means an empty password.
    pub password: Option<String>,
    /// Per-call timeout. `None` or zero falls back to [`DEFAULT_TIMEOUT`].
    pub timeout: Option<Duration>,
}

impl RequestParams {
    /// Create a request description for `method` against `endpoint`.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// A GET request; parameters go in the query string.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    /// A POST request with form-encoded parameters.
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    /// A PUT request with form-encoded parameters.
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    /// A DELETE request; parameters go in the query string.
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    /// A JSON POST carrying `payload` verbatim.
    pub fn json_post(endpoint: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::new(Method::JsonPost, endpoint).param(JSON_PARAM, payload)
    }

    /// Add a parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set username and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Serialize `value` with [`to_json`] and store it as the JSON payload.
    pub fn json_value<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, serde_json::Error> {
        let payload = to_json(value)?;
        Ok(self.param(JSON_PARAM, String::from_utf8_lossy(&payload)))
    }

    /// Timeout actually applied to the call.
    pub fn effective_timeout(&self) -> Duration {
        match self.timeout {
            Some(timeout) if !timeout.is_zero() => timeout,
            _ => DEFAULT_TIMEOUT,
        }
    }

    /// Payload of a JSON POST, empty when the `json` parameter is missing.
    pub fn json_payload(&self) -> &str {
        self.params.get(JSON_PARAM).map(String::as_str).unwrap_or_default()
    }

    /// Add the authorization and custom headers to `headers`.
    ///
    /// The username form is applied after the API key and replaces it.
    /// Custom headers are appended, so they may add a second
    /// `Authorization` value rather than override the first.
    pub(crate) fn populate_headers(&self, headers: &mut HeaderMap) -> Result<(), HttpError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            headers.insert(AUTHORIZATION, header_value(AUTHORIZATION.as_str(), key)?);
        }

        // Plain `username:password`, not Base64 Basic auth.
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            let credentials = format!("{}:{}", username, self.password.as_deref().unwrap_or_default());
            headers.insert(
                AUTHORIZATION,
                header_value(AUTHORIZATION.as_str(), &credentials)?,
            );
        }

        for (name, value) in &self.headers {
            let header_name =
                HeaderName::try_from(name.as_str()).map_err(|e| HttpError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.append(header_name, header_value(name, value)?);
        }

        Ok(())
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::try_from(value).map_err(|e| HttpError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Form-encode `params`, keys in sorted order.
pub fn encode_form(params: &BTreeMap<String, String>) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

/// Endpoint with `params` appended as a query string. Nothing is appended
/// when there are no parameters.
pub fn query_url(endpoint: &str, params: &BTreeMap<String, String>) -> String {
    if params.is_empty() {
        endpoint.to_string()
    } else {
        format!("{}?{}", endpoint, encode_form(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("GET", Method::Get)]
    #[test_case("post", Method::Post)]
    #[test_case("Put", Method::Put)]
    #[test_case("DELETE", Method::Delete)]
    #[test_case("JSONPOST", Method::JsonPost)]
    fn test_method_parse(input: &str, expected: Method) {
        assert_eq!(input.parse::<Method>().unwrap(), expected);
    }

    #[test]
    fn test_method_parse_unknown() {
        let err = "PATCH".parse::<Method>().unwrap_err();
        assert_eq!(err.to_string(), "unknown request method: PATCH");
    }

    #[test]
    fn test_method_wire() {
        assert_eq!(Method::JsonPost.wire_method(), reqwest::Method::POST);
        assert_eq!(Method::Delete.wire_method(), reqwest::Method::DELETE);
        assert_eq!(Method::JsonPost.to_string(), "JSONPOST");
    }

    #[test]
    fn test_method_serde_names() {
        let json = serde_json::to_string(&Method::JsonPost).unwrap();
        assert_eq!(json, "\"JSONPOST\"");
        let method: Method = serde_json::from_str("\"PUT\"").unwrap();
        assert_eq!(method, Method::Put);
    }

    #[test]
    fn test_params_from_json() {
        let params: RequestParams = serde_json::from_str(
            r#"{"method":"DELETE","endpoint":"http://localhost/x","params":{"id":"7"}}"#,
        )
        .unwrap();
        assert_eq!(params.method, Method::Delete);
        assert_eq!(params.params.get("id").map(String::as_str), Some("7"));
        assert!(params.headers.is_empty());
        assert!(params.timeout.is_none());
    }

    #[test]
    fn test_effective_timeout() {
        let params = RequestParams::get("http://localhost/");
        assert_eq!(params.effective_timeout(), DEFAULT_TIMEOUT);

        let params = params.timeout(Duration::ZERO);
        assert_eq!(params.effective_timeout(), DEFAULT_TIMEOUT);

        let params = params.timeout(Duration::from_millis(250));
        assert_eq!(params.effective_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_query_url_without_params() {
        let url = query_url("http://localhost:8000/test", &BTreeMap::new());
        assert_eq!(url, "http://localhost:8000/test");
    }

    #[test]
    fn test_query_url_sorted_and_escaped() {
        let params = RequestParams::get("http://h/")
            .param("q", "hello world")
            .param("a", "x&y")
            .params;
        assert_eq!(query_url("http://h/", &params), "http://h/?a=x%26y&q=hello+world");
    }

    #[test]
    fn test_json_post_payload() {
        let params = RequestParams::json_post("http://h/", "{\"Test\":\"test\"}");
        assert_eq!(params.method, Method::JsonPost);
        assert_eq!(params.json_payload(), "{\"Test\":\"test\"}");
        assert_eq!(RequestParams::new(Method::JsonPost, "http://h/").json_payload(), "");
    }

    #[test]
    fn test_json_value_is_indented() {
        let params = RequestParams::new(Method::JsonPost, "http://h/")
            .json_value(&serde_json::json!({"Test": "test"}))
            .unwrap();
        assert_eq!(params.json_payload(), "{\n \"Test\": \"test\"\n}");
    }

    #[test]
    fn test_api_key_header() {
        let mut headers = HeaderMap::new();
        RequestParams::get("http://h/")
            .api_key("token123")
            .populate_headers(&mut headers)
            .unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "token123");
    }

    #[test]
    fn test_username_is_plain_text_and_wins() {
        let mut headers = HeaderMap::new();
        RequestParams::get("http://h/")
            .api_key("token123")
            .credentials("test", "1234")
            .populate_headers(&mut headers)
            .unwrap();
        let values: Vec<_> = headers.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values, vec!["test:1234"]);
    }

    #[test]
    fn test_empty_credentials_are_ignored() {
        let mut headers = HeaderMap::new();
        RequestParams::get("http://h/")
            .api_key("")
            .credentials("", "secret")
            .populate_headers(&mut headers)
            .unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_custom_authorization_is_appended() {
        let mut headers = HeaderMap::new();
        RequestParams::get("http://h/")
            .api_key("token123")
            .header("Authorization", "extra")
            .populate_headers(&mut headers)
            .unwrap();
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 2);
    }

    #[test]
    fn test_invalid_header_name() {
        let mut headers = HeaderMap::new();
        let err = RequestParams::get("http://h/")
            .header("bad header", "x")
            .populate_headers(&mut headers)
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidHeader { ref name, .. } if name == "bad header"));
    }

    proptest! {
        #[test]
        fn test_encoded_form_decodes_back(
            params in prop::collection::btree_map("[a-z]{1,8}", "\\PC{0,16}", 0..6)
        ) {
            let encoded = encode_form(&params);
            let decoded: BTreeMap<String, String> =
                url::form_urlencoded::parse(encoded.as_bytes()).into_owned().collect();
            prop_assert_eq!(decoded, params);
        }
    }
}
