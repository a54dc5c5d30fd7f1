//! Background stream readers feeding the transport's ordered event queue.
//!
//! One task per standard stream. Both send into the same channel, so the
//! consumer observes stdout frames and stderr text in system-wide arrival
//! order and can attribute diagnostics to the command that produced them.

use super::StreamEvent;

use log::{trace, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

const STDERR_CHUNK_CAPACITY: usize = 4096;

/// Read stdout, classifying lines into response frames and invalid lines.
///
/// A frame starts at the first line beginning with `=` or `?` and
/// accumulates every following line, whitespace-only lines included, until
/// a single truly empty line terminates it. Lines seen outside a frame are
/// delivered as [`StreamEvent::InvalidLine`] so engines that print debug
/// text to stdout do not abort the read.
pub(crate) async fn read_responses<R>(stream: R, events: UnboundedSender<StreamEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut frame: Option<Vec<String>> = None;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                trace!("Engine stdout: {line}");

                if frame.is_none() {
                    if line.starts_with('=') || line.starts_with('?') {
                        frame = Some(vec![line]);
                    } else if line.trim().is_empty() {
                        // separator between frames
                    } else if events.send(StreamEvent::InvalidLine(line)).is_err() {
                        return;
                    }
                } else if line.is_empty() {
                    let finished = frame.take().unwrap_or_default();
                    if events.send(StreamEvent::Frame(finished)).is_err() {
                        return;
                    }
                } else if let Some(accumulated) = frame.as_mut() {
                    accumulated.push(line);
                }
            }
            Ok(None) => break,
            Err(error) => {
                warn!("Reading from Go program failed: {error}");
                break;
            }
        }
    }

    if let Some(partial) = frame {
        warn!(
            "Engine stdout ended inside a response ({} lines dropped)",
            partial.len()
        );
    }

    let _ = events.send(StreamEvent::Eof);
}

/// Drain stderr in chunks on its own task.
///
/// Must never block stdout reading or apply backpressure to the engine;
/// chunks go into the shared queue as they arrive.
pub(crate) async fn read_stderr<R>(stream: R, events: UnboundedSender<StreamEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = stream;
    let mut buffer = vec![0u8; STDERR_CHUNK_CAPACITY];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(count) => {
                let chunk = String::from_utf8_lossy(&buffer[..count]).into_owned();
                if events.send(StreamEvent::Stderr(chunk)).is_err() {
                    return;
                }
            }
            Err(error) => {
                warn!("Reading Go program stderr failed: {error}");
                break;
            }
        }
    }
}
