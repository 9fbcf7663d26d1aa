//! Declarative HTTP request helpers for REST endpoints.
//!
//! A [`RequestParams`] describes one call (method, endpoint, parameters,
//! headers, credentials, timeout). A [`Dispatcher`] turns it into a single
//! HTTP request, and the helpers in [`response`] interpret what comes back.
//!
//! Credentials given as username/password are sent as a plain
//! `Authorization: username:password` header. This is not standard HTTP
//! Basic authentication and is kept for compatibility with existing
//! endpoints.

pub mod client;
pub mod request;
pub mod response;

pub use client::{build_client, curl, Dispatcher, DispatcherConfig, HttpError};
pub use request::{
    encode_form, headers, query_url, Method, ParseMethodError, RequestParams, DEFAULT_TIMEOUT,
    JSON_PARAM,
};
pub use response::{body_text, check_status, decode_json, to_json, ResponseError};
