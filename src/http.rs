//! JSON over HTTP helpers shared by the providers.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Sends the request and decodes a successful JSON body.
///
/// Non-success statuses map to [`Error::Http`] so the retry policy can tell
/// throttling and server errors from client errors.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Http(status.as_u16()));
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| {
        let preview = String::from_utf8_lossy(&body[..body.len().min(256)]).into_owned();
        Error::Decode(format!("{e}, body: {preview}"))
    })
}
