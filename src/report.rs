//! Turns failed requests into a single diagnostic.

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::{compression::ResponseTransform, ClickHouseError, Result};

/// Drains a failed response's body and logs it as one message.
///
/// The body is always read to its end, or until the read itself fails, in
/// which case whatever arrived is reported.
pub(crate) async fn server_failure(
    client: &str,
    response: reqwest::Response,
    transform: ResponseTransform,
) -> ClickHouseError {
    let status = response.status().as_u16();
    let message = match drain(transform.apply(response)).await {
        Ok(message) => {
            tracing::error!(client, status, "{message}");
            message
        }
        Err((partial, err)) => {
            tracing::error!(client, status, read_error = %err, "{partial}");
            partial
        }
    };

    ClickHouseError::Server { status, message }
}

/// Logs a failure that carries no response body.
///
/// Transport errors are reported by their reason code.
pub(crate) fn failure(client: &str, err: ClickHouseError) -> ClickHouseError {
    match &err {
        ClickHouseError::Transport(inner) => {
            tracing::error!(client, reason = reason_code(inner), "{inner}");
        }
        other => tracing::error!(client, "{other}"),
    }
    err
}

/// Symbolic code for a transport error.
pub(crate) fn reason_code(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_body() {
        "body"
    } else if err.is_decode() {
        "decode"
    } else if err.is_redirect() {
        "redirect"
    } else if err.is_request() {
        "request"
    } else if err.is_builder() {
        "builder"
    } else {
        "unknown"
    }
}

/// Reads `body` to the end and returns it as trimmed text.
///
/// On a read error the text collected so far is returned with the error.
pub(crate) async fn drain<S>(
    mut body: S,
) -> std::result::Result<String, (String, ClickHouseError)>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut collected = Vec::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => collected.extend_from_slice(&chunk),
            Err(err) => return Err((to_message(&collected), err)),
        }
    }
    Ok(to_message(&collected))
}

fn to_message(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_owned()
}
