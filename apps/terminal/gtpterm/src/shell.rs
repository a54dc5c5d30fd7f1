//! The relay loop: terminal stdin in, engine responses out.

use crate::error::GtptermError;

use common::ErrorLocation;

use gtp_core::engine::format_response;
use gtp_core::error::{CoreError, GtpError};
use gtp_core::protocol::{GtpClient, IoObserver};
use gtp_core::transport::Transport;

use std::io::{Write as IoWrite, stdout};
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader, stdin};

const EXIT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Passes engine diagnostics through to the relay's stderr.
struct RelayObserver;

impl IoObserver for RelayObserver {
    fn invalid_line(&self, line: &str) {
        eprintln!("[invalid] {line}");
    }

    fn stderr(&self, text: &str) {
        eprint!("{text}");
    }
}

/// Attach the engine and relay GTP until stdin closes or quit is answered.
///
/// Responses are re-framed through the engine-side formatter so the relay
/// emits well-formed GTP itself.
pub async fn run(command_line: &str) -> Result<(), GtptermError> {
    let transport = Transport::start(command_line, None).map_err(CoreError::from)?;
    let mut client = GtpClient::new(transport, false);
    client.set_observer(Arc::new(RelayObserver));

    info!("Relaying GTP to: {command_line}");

    let mut input = BufReader::new(stdin()).lines();

    loop {
        let line = match input.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                return Err(GtptermError::Gtpterm {
                    message: format!("Failed to read terminal input: {error}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('#') {
            // forwarded unanswered; also how a comment-line interrupt is
            // typed by hand
            if client.send_comment(trimmed).await.is_err() {
                break;
            }
            continue;
        }

        let quit = trimmed.split_whitespace().next() == Some("quit");

        match client.send(trimmed).await {
            Ok(payload) => emit(&format_response(&Ok(payload), None)),
            Err(GtpError::Failure { message, .. }) => {
                emit(&format_response(&Err(message), None));
            }
            Err(error) => {
                warn!("Session ended: {error}");
                emit(&format_response(&Err(error.to_string()), None));
                return Ok(());
            }
        }

        if quit {
            break;
        }
    }

    client.close_input().await;
    if !client.wait_exit(EXIT_WAIT_TIMEOUT).await {
        warn!("Engine did not exit, killing");
        client.kill().await;
    }

    Ok(())
}

fn emit(text: &str) {
    let mut out = stdout();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}
