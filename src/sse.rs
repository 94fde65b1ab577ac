//! Streaming delta decoding for provider responses.
//!
//! This module turns the raw byte stream of a completion response into a
//! lazy sequence of text deltas, keyed by the provider's wire format. Chunks
//! may arrive in arbitrary sizes, splitting logical lines; a carry-over
//! buffer recombines them. A single malformed record is logged and skipped,
//! never fatal to the stream.

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::observability::{STREAM_CHUNKS, STREAM_DELTAS, STREAM_ERRORS, STREAM_PARSE_ERRORS};
use crate::types::RequestFormat;

/// End-of-stream sentinel line sent by SSE-style endpoints.
const DONE_SENTINEL: &str = "data: [DONE]";

/// A boxed stream of text deltas, one per decoded record.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Decode a provider byte stream into a stream of text deltas.
///
/// The sequence ends when the byte stream does. The source stream is owned
/// by the decoder state, so dropping the returned stream (early consumer
/// cancellation included) releases the underlying read handle.
pub fn decode_deltas<S>(
    byte_stream: S,
    format: RequestFormat,
) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    // Convert reqwest errors to our error type
    let byte_stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer = String::new();

    stream::unfold(
        (byte_stream, buffer, false),
        move |(mut byte_stream, mut buffer, mut ended)| async move {
            loop {
                // Drain complete lines already buffered.
                while let Some(pos) = buffer.find('\n') {
                    let line: String = buffer.drain(..=pos).collect();
                    if let Some(delta) = decode_line(&line, format) {
                        STREAM_DELTAS.click();
                        return Some((Ok(delta), (byte_stream, buffer, ended)));
                    }
                }

                if ended {
                    // A trailing line without a newline still counts once the
                    // stream is over.
                    if !buffer.is_empty() {
                        let line = std::mem::take(&mut buffer);
                        if let Some(delta) = decode_line(&line, format) {
                            STREAM_DELTAS.click();
                            return Some((Ok(delta), (byte_stream, buffer, ended)));
                        }
                    }
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_CHUNKS.click();
                        match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => buffer.push_str(&text),
                            Err(e) => {
                                STREAM_ERRORS.click();
                                return Some((
                                    Err(Error::encoding(
                                        format!("Invalid UTF-8 in stream: {e}"),
                                        Some(Box::new(e)),
                                    )),
                                    (byte_stream, buffer, ended),
                                ));
                            }
                        }
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (byte_stream, buffer, ended)));
                    }
                    None => {
                        ended = true;
                    }
                }
            }
        },
    )
}

/// Decode one complete line into a delta, if it carries one.
///
/// Blank lines, the `[DONE]` sentinel, non-data lines, records that fail to
/// parse, and records without incremental text all decode to `None`.
fn decode_line(line: &str, format: RequestFormat) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line == DONE_SENTINEL {
        return None;
    }
    let payload = line.strip_prefix("data: ")?;
    match serde_json::from_str::<Value>(payload) {
        Ok(record) => extract_delta(&record, format).filter(|text| !text.is_empty()),
        Err(e) => {
            STREAM_PARSE_ERRORS.click();
            log::warn!("skipping malformed stream record: {e}: {line}");
            None
        }
    }
}

/// Pull the incremental text out of one parsed record, per format.
fn extract_delta(record: &Value, format: RequestFormat) -> Option<String> {
    match format {
        RequestFormat::Anthropic => {
            if record.get("type").and_then(Value::as_str) == Some("content_block_delta") {
                record
                    .get("delta")
                    .and_then(|delta| delta.get("text"))
                    .and_then(Value::as_str)
                    .map(String::from)
            } else {
                None
            }
        }
        RequestFormat::Google => record
            .get("candidates")
            .and_then(|candidates| candidates.get(0))
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.get(0))
            .and_then(|part| part.get("text"))
            .and_then(Value::as_str)
            .map(String::from),
        RequestFormat::Openai | RequestFormat::Custom => record
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("delta"))
            .and_then(|delta| delta.get("content"))
            .and_then(Value::as_str)
            .map(String::from),
    }
}
