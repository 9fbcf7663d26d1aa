//! Stub server configuration.

use serde::{Deserialize, Serialize};

/// Fixed reply returned by the registered endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubReply {
    /// HTTP status code.
    pub code: u16,
    /// Response body.
    pub body: String,
}

impl StubReply {
    pub fn new(code: u16, body: impl Into<String>) -> Self {
        Self {
            code,
            body: body.into(),
        }
    }

    /// A 200 reply.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }
}

impl Default for StubReply {
    fn default() -> Self {
        Self::ok("Test Ok")
    }
}

/// Stub server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubConfig {
    /// Port on localhost. 0 picks a free port.
    pub port: u16,
    /// Registered path, e.g. `/test`. Empty registers nothing.
    pub endpoint: String,
    /// Reply sent when no custom handler is set.
    pub reply: StubReply,
}

impl StubConfig {
    pub fn new(port: u16, endpoint: impl Into<String>, reply: StubReply) -> Self {
        Self {
            port,
            endpoint: endpoint.into(),
            reply,
        }
    }
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            port: 0,
            endpoint: "/test".to_string(),
            reply: StubReply::default(),
        }
    }
}
