//! Server-Sent Events (SSE) utilities
//!
//! Turns the producer side of an import (a bounded channel of
//! `ProgressEvent`s) into an axum SSE response. Each event becomes one
//! `data: <json>\n\n` frame, in the order it was produced. The stream ends
//! when the producer drops its sender.

use crate::events::ProgressEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Interval between keep-alive comments while the producer is sleeping
const KEEP_ALIVE_SECS: u64 = 15;

/// Sent in place of a frame that could not be serialized
const ENCODE_FAILURE_FRAME: &str = r#"{"error":"Could not encode progress event"}"#;

/// Encode one progress event as an SSE frame
///
/// Every event yields a frame: one that fails to serialize is replaced by an
/// error frame, so a stream never loses its terminal frame.
pub fn encode_event(event: &ProgressEvent) -> Event {
    Event::default().data(frame_payload(event, event.kind()))
}

fn frame_payload<T: Serialize>(value: &T, kind: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!("SSE: Failed to serialize {} event: {}", kind, e);
        ENCODE_FAILURE_FRAME.to_string()
    })
}

/// Create an SSE stream that forwards progress events from a producer task
///
/// # Arguments
/// * `service_name` - Name of the service for logging (e.g., "skyport-importer")
/// * `rx` - Receiving half of the producer's bounded channel
///
/// # Example
/// ```rust,ignore
/// let (tx, rx) = tokio::sync::mpsc::channel(32);
/// tokio::spawn(async move { orchestrator.run(tx).await });
/// skyport_common::sse::progress_sse_stream("skyport-importer", rx)
/// ```
pub fn progress_sse_stream(
    service_name: &'static str,
    mut rx: mpsc::Receiver<ProgressEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} import progress", service_name);

    let stream = async_stream::stream! {
        let mut frames = 0usize;

        while let Some(event) = rx.recv().await {
            debug!("SSE: Sending {} event", event.kind());
            frames += 1;
            yield Ok(encode_event(&event));
        }

        info!("SSE: {} import stream finished after {} frames", service_name, frames);
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("heartbeat"),
    )
}
