//! Server-sent event framing: encoding answer frames and decoding upstream
//! streams.

use std::collections::VecDeque;

use futures_util::{Stream, StreamExt};

use crate::error::ModelError;

/// One `event: message` frame. Multi-line fragments become several `data:`
/// lines, which readers join back with `\n`.
pub fn encode_frame(fragment: &str) -> String {
    let mut frame = String::with_capacity(fragment.len() + 24);
    frame.push_str("event: message\n");
    for line in fragment.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseData {
    Payload(String),
    Done,
}

/// Incremental decoder for upstream event streams. Bytes may split lines and
/// multi-byte characters anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseData> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.strip_prefix(' ').unwrap_or(data);
            if data == "[DONE]" {
                out.push(SseData::Done);
            } else if !data.is_empty() {
                out.push(SseData::Payload(data.to_string()));
            }
        }

        out
    }
}

/// Turn a byte stream of server-sent events into a stream of text deltas.
/// `extract` pulls the delta out of each JSON payload; payloads without one are
/// skipped. The stream ends at `[DONE]` or when the connection closes.
pub fn delta_stream<S, B>(
    bytes: S,
    extract: fn(&serde_json::Value) -> Option<String>,
) -> impl Stream<Item = Result<String, ModelError>> + Send + Unpin
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    struct State<S> {
        bytes: S,
        decoder: SseDecoder,
        pending: VecDeque<String>,
        finished: bool,
    }

    let state = State {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures_util::stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(delta) = state.pending.pop_front() {
                return Some((Ok(delta), state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for data in state.decoder.push(chunk.as_ref()) {
                        match data {
                            SseData::Done => {
                                state.finished = true;
                                break;
                            }
                            SseData::Payload(json) => {
                                let value: serde_json::Value = match serde_json::from_str(&json) {
                                    Ok(v) => v,
                                    Err(e) => {
                                        state.finished = true;
                                        return Some((
                                            Err(ModelError::InvalidResponse(e.to_string())),
                                            state,
                                        ));
                                    }
                                };
                                if let Some(message) = value["error"]["message"].as_str() {
                                    state.finished = true;
                                    return Some((
                                        Err(ModelError::Stream(message.to_string())),
                                        state,
                                    ));
                                }
                                if let Some(delta) = extract(&value) {
                                    state.pending.push_back(delta);
                                }
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(ModelError::RequestError(e)), state));
                }
                None => state.finished = true,
            }
        }
    }))
}
