//! Loopback listener for the authorization redirect.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time;
use tracing::debug;

use super::IdentityError;

/// Path the provider redirects to on the loopback listener.
pub const CALLBACK_PATH: &str = "/callback";

/// How long a connection may stay silent before it is dropped.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// What the provider sent back to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Authorization code to exchange.
    Code(String),
    /// The provider refused, e.g. `login_required` for a silent check.
    Denied {
        error: String,
        description: Option<String>,
    },
    /// The `state` parameter did not match the one we sent.
    StateMismatch,
}

/// Builds the redirect URI for a bound loopback port.
pub fn redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{port}{CALLBACK_PATH}")
}

/// Accepts connections until one hits `callback_path`, or `timeout` elapses.
///
/// Requests to other paths (such as a browser favicon request) get a 404 and are ignored.
pub async fn wait_for_callback(
    listener: TcpListener,
    callback_path: &str,
    expected_state: &str,
    timeout: Duration,
) -> Result<CallbackOutcome, IdentityError> {
    time::timeout(timeout, accept_loop(listener, callback_path, expected_state))
        .await
        .map_err(|_elapsed| IdentityError::Timeout)?
}

/// Each connection is served on its own task so an idle socket (a browser
/// preconnect, say) cannot hold up the real redirect.
async fn accept_loop(
    listener: TcpListener,
    callback_path: &str,
    expected_state: &str,
) -> Result<CallbackOutcome, IdentityError> {
    let (outcome_tx, mut outcome_rx) = mpsc::channel(1);
    let callback_path: Arc<str> = Arc::from(callback_path);
    let expected_state: Arc<str> = Arc::from(expected_state);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted.map_err(IdentityError::Callback)?;
                debug!(%peer, "callback connection");
                tokio::spawn(serve_connection(
                    stream,
                    Arc::clone(&callback_path),
                    Arc::clone(&expected_state),
                    outcome_tx.clone(),
                ));
            }
            Some(outcome) = outcome_rx.recv() => return Ok(outcome),
        }
    }
}

/// Answers one connection. Errors stay with the connection.
async fn serve_connection(
    mut stream: TcpStream,
    callback_path: Arc<str>,
    expected_state: Arc<str>,
    outcome_tx: mpsc::Sender<CallbackOutcome>,
) {
    let mut buffer = [0u8; 4096];
    let read = match time::timeout(READ_TIMEOUT, stream.read(&mut buffer)).await {
        Ok(Ok(read)) => read,
        Ok(Err(err)) => {
            debug!(error = %err, "callback connection read failed");
            return;
        }
        Err(_elapsed) => {
            debug!("callback connection sent nothing");
            return;
        }
    };
    let request = String::from_utf8_lossy(&buffer[..read]);

    let Some(outcome) = parse_callback_request(&request, &callback_path, &expected_state) else {
        let _ = stream.write_all(not_found_response().as_bytes()).await;
        return;
    };

    let response = match outcome {
        CallbackOutcome::Code(_) => success_response(),
        CallbackOutcome::Denied { .. } | CallbackOutcome::StateMismatch => failure_response(),
    };
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
    // The receiver is gone once another connection already delivered an outcome.
    let _ = outcome_tx.send(outcome).await;
}

/// Parses the request line of a redirect hit.
///
/// Returns `None` when the request is not for `callback_path` or carries
/// neither `code` nor `error`.
pub fn parse_callback_request(
    request: &str,
    callback_path: &str,
    expected_state: &str,
) -> Option<CallbackOutcome> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    let target = parts.next()?;

    let url = url::Url::parse(&format!("http://127.0.0.1{target}")).ok()?;
    if url.path() != callback_path {
        return None;
    }

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    let code = param("code");
    let error = param("error");
    if code.is_none() && error.is_none() {
        return None;
    }
    if param("state").as_deref() != Some(expected_state) {
        return Some(CallbackOutcome::StateMismatch);
    }

    match (code, error) {
        (_, Some(error)) => Some(CallbackOutcome::Denied {
            error,
            description: param("error_description"),
        }),
        (Some(code), None) => Some(CallbackOutcome::Code(code)),
        (None, None) => None,
    }
}

fn html_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\n\
         Content-Type: text/html\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    )
}

fn success_response() -> String {
    html_response(
        "200 OK",
        "<html><body><h3>kcview</h3><p>You can close this window.</p></body></html>",
    )
}

fn failure_response() -> String {
    html_response(
        "400 Bad Request",
        "<html><body><h3>kcview</h3>\
         <p>Sign-in did not complete. Return to the terminal.</p></body></html>",
    )
}

fn not_found_response() -> String {
    html_response("404 Not Found", "")
}
