//! Destinations for streamed answers.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::sse::encode_frame;
use crate::error::ModelError;

/// Where answer fragments go. Every fragment must reach the reader before the
/// next one is produced, so sinks flush on each write.
#[async_trait]
pub trait EventSink: Send {
    /// Whether writes can be pushed out one at a time. Streaming into a sink
    /// that cannot is refused before any request is made.
    fn supports_flush(&self) -> bool {
        true
    }

    async fn send(&mut self, fragment: &str) -> Result<(), ModelError>;
}

/// Writes server-sent event frames (`event: message`).
pub struct SseWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin + Send> SseWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EventSink for SseWriter<W> {
    async fn send(&mut self, fragment: &str) -> Result<(), ModelError> {
        self.inner.write_all(encode_frame(fragment).as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }
}

/// Writes fragments as plain text, for terminals.
pub struct PlainWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin + Send> PlainWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EventSink for PlainWriter<W> {
    async fn send(&mut self, fragment: &str) -> Result<(), ModelError> {
        self.inner.write_all(fragment.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }
}

/// Passes fragments through while keeping the full answer text.
pub struct RecordingSink<'a> {
    inner: &'a mut dyn EventSink,
    text: String,
}

impl<'a> RecordingSink<'a> {
    pub fn new(inner: &'a mut dyn EventSink) -> Self {
        Self {
            inner,
            text: String::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[async_trait]
impl EventSink for RecordingSink<'_> {
    fn supports_flush(&self) -> bool {
        self.inner.supports_flush()
    }

    async fn send(&mut self, fragment: &str) -> Result<(), ModelError> {
        self.inner.send(fragment).await?;
        self.text.push_str(fragment);
        Ok(())
    }
}

/// Keeps every fragment in memory. Can pretend to be unable to flush.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub fragments: Vec<String>,
    buffered: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that reports it cannot flush per fragment.
    pub fn buffered() -> Self {
        Self {
            fragments: Vec::new(),
            buffered: true,
        }
    }

    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    fn supports_flush(&self) -> bool {
        !self.buffered
    }

    async fn send(&mut self, fragment: &str) -> Result<(), ModelError> {
        self.fragments.push(fragment.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sse_writer_frames() {
        let mut sink = SseWriter::new(Vec::new());
        sink.send("Hel").await.unwrap();
        sink.send("lo").await.unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "event: message\ndata: Hel\n\nevent: message\ndata: lo\n\n");
    }

    #[tokio::test]
    async fn test_recording_sink_tees() {
        let mut memory = MemorySink::new();
        {
            let mut recording = RecordingSink::new(&mut memory);
            recording.send("a").await.unwrap();
            recording.send("b").await.unwrap();
            assert_eq!(recording.text(), "ab");
        }
        assert_eq!(memory.fragments, vec!["a", "b"]);
    }

    #[test]
    fn test_buffered_sink_reports_no_flush() {
        assert!(!MemorySink::buffered().supports_flush());
        assert!(MemorySink::new().supports_flush());
    }
}
