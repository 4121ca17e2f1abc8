//! Client-visible event stream for long-running scan jobs.
//!
//! Each request gets one producer handle writing into a bounded channel
//! whose receiving side is the HTTP response body. Terminal operations take
//! the handle by value, so a stream cannot be written after close or closed
//! twice.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

/// First message of every scan stream.
pub const STARTING_MESSAGE: &str = "🚀 Starting the scan. It might take a minute.";
/// Periodic reassurance while a scan is still running.
pub const WORKING_MESSAGE: &str = "⏳ Still working on it, please hold on...";
/// Emitted when the tool returned usable output.
pub const PROCESSING_MESSAGE: &str = "✅ Scan done! Now processing the results...";

/// One unit flowing to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Status line, framed as a server-sent event.
    Progress(String),
    /// Result content, passed through raw.
    Chunk(Bytes),
    /// Clean end of stream.
    Done,
    /// Terminal failure, framed like progress.
    Error(String),
}

impl StreamEvent {
    /// Wire encoding. `Done` carries no bytes; closing the channel is the
    /// end-of-stream signal.
    pub fn encode(&self) -> Option<Bytes> {
        match self {
            StreamEvent::Progress(text) | StreamEvent::Error(text) => {
                Some(Bytes::from(format!("data: {text}\n\n")))
            }
            StreamEvent::Chunk(bytes) => Some(bytes.clone()),
            StreamEvent::Done => None,
        }
    }
}

/// Producer handle for one scan stream.
#[derive(Debug)]
pub struct ScanStream {
    tx: mpsc::Sender<Bytes>,
}

impl ScanStream {
    /// Create a stream together with the response body it feeds.
    pub fn channel() -> (Self, Body) {
        let (tx, rx) = mpsc::channel::<Bytes>(32);
        let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
        (Self { tx }, body)
    }

    async fn send(&self, event: StreamEvent) {
        if let Some(bytes) = event.encode() {
            // A send error means the client went away; the result is dropped.
            let _ = self.tx.send(bytes).await;
        }
    }

    /// Emit a status line.
    pub async fn progress(&self, text: impl Into<String>) {
        self.send(StreamEvent::Progress(text.into())).await;
    }

    /// Emit result content.
    pub async fn chunk(&self, content: impl Into<Bytes>) {
        self.send(StreamEvent::Chunk(content.into())).await;
    }

    /// Terminal failure. Consumes the handle, closing the stream.
    pub async fn fail(self, text: impl Into<String>) {
        self.send(StreamEvent::Error(text.into())).await;
    }

    /// Terminal success. Consumes the handle, closing the stream.
    pub async fn finish(self) {
        self.send(StreamEvent::Done).await;
    }
}

/// Await `job` while emitting [`WORKING_MESSAGE`] on `stream` every `every`.
/// The ticker starts one full interval after the call and is dropped the
/// moment the job settles, so no heartbeat can trail the result.
pub async fn await_with_heartbeat<F>(stream: &ScanStream, every: Duration, job: F) -> F::Output
where
    F: Future,
{
    tokio::pin!(job);
    let mut ticker = time::interval_at(time::Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            output = &mut job => return output,
            _ = ticker.tick() => stream.progress(WORKING_MESSAGE).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_progress_frames_as_sse() {
        let event = StreamEvent::Progress("scanning".to_string());
        assert_eq!(event.encode().unwrap(), Bytes::from("data: scanning\n\n"));
    }

    #[test]
    fn test_error_frames_like_progress() {
        let event = StreamEvent::Error("🚨 broke".to_string());
        assert_eq!(event.encode().unwrap(), Bytes::from("data: 🚨 broke\n\n"));
    }

    #[test]
    fn test_chunk_passes_through_raw() {
        let event = StreamEvent::Chunk(Bytes::from("## Results\n"));
        assert_eq!(event.encode().unwrap(), Bytes::from("## Results\n"));
    }

    #[test]
    fn test_done_encodes_to_nothing() {
        assert_eq!(StreamEvent::Done.encode(), None);
    }

    #[tokio::test]
    async fn test_finish_closes_the_body() {
        let (stream, body) = ScanStream::channel();
        stream.progress("one").await;
        stream.finish().await;

        let collected = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(collected, Bytes::from("data: one\n\n"));
    }

    #[tokio::test]
    async fn test_fail_emits_exactly_one_frame_then_closes() {
        let (stream, body) = ScanStream::channel();
        stream.fail("🚨 Error: boom").await;

        let collected = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(collected, Bytes::from("data: 🚨 Error: boom\n\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_fires_while_job_runs() {
        let (stream, body) = ScanStream::channel();
        let output = await_with_heartbeat(&stream, Duration::from_secs(10), async {
            time::sleep(Duration::from_secs(35)).await;
            "done"
        })
        .await;
        assert_eq!(output, "done");
        stream.finish().await;

        let collected = to_bytes(body, usize::MAX).await.unwrap();
        let text = String::from_utf8(collected.to_vec()).unwrap();
        assert_eq!(text.matches(WORKING_MESSAGE).count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_heartbeat_for_fast_jobs() {
        let (stream, body) = ScanStream::channel();
        await_with_heartbeat(&stream, Duration::from_secs(10), async {
            time::sleep(Duration::from_secs(1)).await;
        })
        .await;
        stream.finish().await;

        let collected = to_bytes(body, usize::MAX).await.unwrap();
        assert!(collected.is_empty());
    }
}
