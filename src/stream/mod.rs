//! Incremental decoder for server-sent-event generation streams.
//!
//! The generation endpoint answers with lines of the form `data: <json>`, each
//! JSON object carrying zero or more candidate text fragments. Chunks arrive with
//! boundaries that have nothing to do with line boundaries, so the decoder keeps
//! the unfinished tail of the last line until the rest of it shows up.
//!
//! After every frame that contributes text, the display value is rebuilt from the
//! full raw text: angle brackets escaped, then `**emphasis**` turned into
//! `<strong>` markup. Re-rendering from scratch keeps escaping and emphasis from
//! ever being applied twice.

use std::collections::VecDeque;
use std::sync::LazyLock;

use futures::{Stream, StreamExt};
use regex::Regex;
use serde::Deserialize;
use tracing::trace;

use crate::errors::InferenceError;

/// Prefix of every SSE data line.
pub const FRAME_PREFIX: &str = "data: ";

static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("emphasis pattern is valid"));

/// One decoded SSE payload from the generation endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateChunk {
    /// Concatenated text of the first candidate, if it carries any parts.
    pub fn first_candidate_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        if content.parts.is_empty() {
            return None;
        }
        Some(
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect(),
        )
    }
}

/// Escape the two characters that could open markup.
pub fn escape_markup(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

/// Turn `**text**` into `<strong>text</strong>`, shortest match first.
pub fn apply_emphasis(text: &str) -> String {
    EMPHASIS.replace_all(text, "<strong>$1</strong>").into_owned()
}

/// Display form of raw model text: escaped, then emphasized.
pub fn render_display(raw: &str) -> String {
    apply_emphasis(&escape_markup(raw))
}

/// Accumulates one streamed response.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    raw: String,
    frames: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return a display snapshot for every frame that added text.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
        let text = String::from_utf8_lossy(&complete);
        let mut snapshots = Vec::new();
        for line in text.split('\n') {
            if self.apply_line(line) {
                snapshots.push(self.display());
            }
        }
        snapshots
    }

    /// Raw text accumulated so far.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Current display value, rebuilt from the full raw text.
    pub fn display(&self) -> String {
        render_display(&self.raw)
    }

    /// Number of frames that contributed text.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// End of input: flush a final unterminated line and return the raw text.
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&tail).into_owned();
            self.apply_line(&line);
        }
        self.raw
    }

    fn apply_line(&mut self, line: &str) -> bool {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(payload) = line.strip_prefix(FRAME_PREFIX) else {
            return false;
        };
        let chunk: GenerateChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(err) => {
                trace!(error = %err, "Skipping unparseable frame");
                return false;
            }
        };
        match chunk.first_candidate_text() {
            Some(text) => {
                self.raw.push_str(&text);
                self.frames += 1;
                true
            }
            None => false,
        }
    }
}

/// Events produced while decoding a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Replacement display value after a frame.
    Display(String),
    /// The stream ended; carries the raw, unescaped text.
    Finished(String),
}

struct DecodeState<S> {
    source: S,
    decoder: Option<StreamDecoder>,
    ready: VecDeque<String>,
}

/// Decode a byte stream into display snapshots followed by one `Finished` event.
///
/// A transport error mid-stream is yielded once and ends the stream.
pub fn decode_stream<S, B, E>(
    source: S,
) -> impl Stream<Item = Result<StreamEvent, InferenceError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let state = DecodeState {
        source: Box::pin(source),
        decoder: Some(StreamDecoder::new()),
        ready: VecDeque::new(),
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(display) = state.ready.pop_front() {
                return Some((Ok(StreamEvent::Display(display)), state));
            }
            let mut decoder = state.decoder.take()?;
            match state.source.next().await {
                Some(Ok(chunk)) => {
                    state.ready.extend(decoder.feed(chunk.as_ref()));
                    state.decoder = Some(decoder);
                }
                Some(Err(err)) => {
                    return Some((Err(InferenceError::Transport(err.to_string())), state));
                }
                None => {
                    trace!(frames = decoder.frames(), "Stream finished");
                    let raw = decoder.finish();
                    return Some((Ok(StreamEvent::Finished(raw)), state));
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(text: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
        )
    }

    fn decode_all(chunks: &[&[u8]]) -> (Vec<String>, String) {
        let mut decoder = StreamDecoder::new();
        let mut snapshots = Vec::new();
        for chunk in chunks {
            snapshots.extend(decoder.feed(chunk));
        }
        let raw = decoder.finish();
        (snapshots, raw)
    }

    #[test]
    fn test_parse_chunk_joins_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"존경하는 "},{"text":"재판장님"}]}}]}"#;
        let chunk: GenerateChunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.first_candidate_text().unwrap(), "존경하는 재판장님");
    }

    #[test]
    fn test_chunk_without_parts_has_no_text() {
        let chunk: GenerateChunk =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"STOP"}]}"#).unwrap();
        assert!(chunk.first_candidate_text().is_none());
        let empty: GenerateChunk = serde_json::from_str(r#"{"usageMetadata":{}}"#).unwrap();
        assert!(empty.first_candidate_text().is_none());
    }

    #[test]
    fn test_escape_script_tag() {
        assert_eq!(
            render_display("<script>alert(1)</script>"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_emphasis_is_non_greedy_and_repeated() {
        assert_eq!(
            render_display("**징역 5년**을 구형합니다. **엄벌**"),
            "<strong>징역 5년</strong>을 구형합니다. <strong>엄벌</strong>"
        );
    }

    #[test]
    fn test_unclosed_emphasis_left_as_is() {
        assert_eq!(render_display("**미완성"), "**미완성");
    }

    #[test]
    fn test_emphasized_markup_is_still_escaped() {
        assert_eq!(render_display("**<b>**"), "<strong>&lt;b&gt;</strong>");
    }

    #[test]
    fn test_snapshot_per_frame_replaces_previous() {
        let body = format!("{}{}", frame("재판장님, "), frame("**무죄**입니다"));
        let (snapshots, raw) = decode_all(&[body.as_bytes()]);
        assert_eq!(
            snapshots,
            vec![
                "재판장님, ".to_string(),
                "재판장님, <strong>무죄</strong>입니다".to_string()
            ]
        );
        assert_eq!(raw, "재판장님, **무죄**입니다");
    }

    #[test]
    fn test_non_frame_and_malformed_lines_are_skipped() {
        let body = format!(": keepalive\n\ndata: {{\"candidates\": [\n{}", frame("ok"));
        let (snapshots, raw) = decode_all(&[body.as_bytes()]);
        assert_eq!(snapshots, vec!["ok".to_string()]);
        assert_eq!(raw, "ok");
    }

    #[test]
    fn test_crlf_lines() {
        let body = frame("hello").replace('\n', "\r\n");
        let (_, raw) = decode_all(&[body.as_bytes()]);
        assert_eq!(raw, "hello");
    }

    #[test]
    fn test_unterminated_last_line_is_flushed_on_finish() {
        let body = frame("끝");
        let trimmed = body.trim_end_matches('\n');
        let (snapshots, raw) = decode_all(&[trimmed.as_bytes()]);
        assert!(snapshots.is_empty());
        assert_eq!(raw, "끝");
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_output() {
        let body = [
            frame("피고인은 <반성>하지 않았습니다. "),
            frame("따라서 **징역 "),
            frame("10년**을 구형합니다."),
        ]
        .concat();
        let bytes = body.as_bytes();

        let mut whole = StreamDecoder::new();
        whole.feed(bytes);
        let expected_display = whole.display();
        let expected_raw = whole.finish();

        // Every split point, including ones inside multi-byte characters.
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            let mut decoder = StreamDecoder::new();
            decoder.feed(a);
            decoder.feed(b);
            assert_eq!(decoder.display(), expected_display, "split at {split}");
            assert_eq!(decoder.finish(), expected_raw, "split at {split}");
        }

        // One byte at a time.
        let mut decoder = StreamDecoder::new();
        for byte in bytes {
            decoder.feed(std::slice::from_ref(byte));
        }
        assert_eq!(decoder.display(), expected_display);
        assert_eq!(
            expected_display,
            "피고인은 &lt;반성&gt;하지 않았습니다. 따라서 <strong>징역 10년</strong>을 구형합니다."
        );
    }

    #[tokio::test]
    async fn test_decode_stream_yields_snapshots_then_finished() {
        let body = format!("{}{}", frame("a"), frame("b"));
        let (first, second) = body.split_at(10);
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(first.as_bytes().to_vec()),
            Ok(second.as_bytes().to_vec()),
        ];
        let events: Vec<_> = decode_stream(futures::stream::iter(chunks))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Display("a".into()),
                StreamEvent::Display("ab".into()),
                StreamEvent::Finished("ab".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_surfaces_transport_error_once() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(frame("partial").into_bytes()),
            Err("connection reset".to_string()),
            Ok(frame("never").into_bytes()),
        ];
        let events: Vec<_> = decode_stream(futures::stream::iter(chunks))
            .collect::<Vec<_>>()
            .await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Ok(StreamEvent::Display(_))));
        assert!(matches!(events[1], Err(InferenceError::Transport(_))));
    }
}
