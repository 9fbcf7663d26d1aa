//! Response helpers.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::HttpError;

/// Classify a response by status code.
///
/// Codes of 400 and above are errors; everything below, redirects
/// included, is returned as `Ok`. The response itself stays usable.
pub fn check_status(response: &reqwest::Response) -> Result<u16, HttpError> {
    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(HttpError::Status {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        });
    }
    Ok(status.as_u16())
}

/// Parse a JSON response body. The body is consumed.
pub async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ResponseError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(ResponseError::Read)?;

    serde_json::from_slice(&bytes).map_err(|e| ResponseError::Parse {
        status: status.as_u16(),
        body: String::from_utf8_lossy(&bytes).to_string(),
        source: e,
    })
}

/// Read the whole body as a string. The body is consumed.
pub async fn body_text(response: reqwest::Response) -> Result<String, ResponseError> {
    response.text().await.map_err(ResponseError::Read)
}

/// Serialize `value` as indented JSON, suitable as a JSON POST payload.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Response reading errors.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("failed to read response body: {0}")]
    Read(#[source] reqwest::Error),

    #[error("failed to parse JSON (status {status}): {source}")]
    Parse {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}
