//! Minimal Server-Sent Events decoding.
//!
//! Only `data:` fields matter for the completion stream; `event:`, `id:`,
//! `retry:` and comment lines are ignored. An incomplete event at end of
//! stream is discarded.

use std::collections::VecDeque;

use futures::{Stream, StreamExt};

/// Incremental decoder turning byte chunks into event data strings.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed a chunk; returns the data of every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&raw[..end]);
            if let Some(data) = event_data(&text) {
                events.push(data);
            }
        }
        events
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn event_data(block: &str) -> Option<String> {
    let lines: Vec<&str> = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Adapt a byte-chunk stream into a stream of event data strings.
///
/// A transport error is yielded once and ends the stream.
pub fn data_events<S, B, E>(source: S) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Send,
{
    let state = (Box::pin(source), SseDecoder::default(), VecDeque::new(), false);
    futures::stream::unfold(state, |(mut source, mut decoder, mut pending, mut done)| async move {
        loop {
            if let Some(data) = pending.pop_front() {
                return Some((Ok(data), (source, decoder, pending, done)));
            }
            if done {
                return None;
            }
            match source.next().await {
                Some(Ok(chunk)) => pending.extend(decoder.push(chunk.as_ref())),
                Some(Err(e)) => {
                    done = true;
                    return Some((Err(e), (source, decoder, pending, done)));
                }
                None => done = true,
            }
        }
    })
}
