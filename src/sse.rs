//! Server-sent-event frame decoding for streaming replies.
//!
//! The chat backend answers with a chunked body of newline-separated lines.  Lines that start
//! with `data: ` carry a JSON [`StreamFrame`]; every other line (blank separators, comments,
//! `event:` fields) is skipped.  A `data: ` line whose payload is not a valid frame is dropped
//! and counted; it never ends the stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_DROPPED_FRAMES, STREAM_FRAMES};
use crate::{Result, StreamFrame};

/// Literal prefix of a framed line.
pub const DATA_PREFIX: &str = "data: ";

/// Process a stream of bytes into a stream of decoded frames.
///
/// Bytes are decoded as UTF-8 incrementally, so a multi-byte character split across two
/// chunks decodes correctly.  Invalid sequences become U+FFFD.  Errors from the byte stream
/// pass through unchanged; the caller decides whether they end the reply.
pub fn decode_frames<S>(byte_stream: S) -> impl Stream<Item = Result<StreamFrame>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let state = DecodeState {
        stream: byte_stream,
        pending: Vec::new(),
        buffer: String::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            // First drain complete lines already buffered.
            if let Some(line) = take_line(&mut state.buffer) {
                if let Some(frame) = decode_line(&line) {
                    return Some((Ok(frame), state));
                }
                continue;
            }

            if state.finished {
                // The final line may lack its newline.
                let rest = std::mem::take(&mut state.buffer);
                return decode_line(&rest).map(|frame| (Ok(frame), state));
            }

            // Read more data
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.pending.extend_from_slice(&bytes);
                    decode_utf8(&mut state.pending, &mut state.buffer);
                }
                Some(Err(e)) => {
                    return Some((Err(e), state));
                }
                None => {
                    if !state.pending.is_empty() {
                        let tail = std::mem::take(&mut state.pending);
                        state.buffer.push_str(&String::from_utf8_lossy(&tail));
                    }
                    state.finished = true;
                }
            }
        }
    })
}

/// Decode one line of the stream.
///
/// Returns `None` for lines that are not framed and for frames that fail to parse.
pub fn decode_line(line: &str) -> Option<StreamFrame> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let payload = line.strip_prefix(DATA_PREFIX)?;
    match serde_json::from_str::<StreamFrame>(payload) {
        Ok(frame) => {
            STREAM_FRAMES.click();
            Some(frame)
        }
        Err(err) => {
            STREAM_DROPPED_FRAMES.click();
            tracing::debug!(error = %err, payload, "dropping undecodable frame");
            None
        }
    }
}

struct DecodeState<S> {
    stream: S,
    pending: Vec<u8>,
    buffer: String,
    finished: bool,
}

fn take_line(buffer: &mut String) -> Option<String> {
    let newline = buffer.find('\n')?;
    let mut line: String = buffer.drain(..=newline).collect();
    line.pop();
    Some(line)
}

fn decode_utf8(pending: &mut Vec<u8>, buffer: &mut String) {
    loop {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                buffer.push_str(text);
                pending.clear();
                return;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                buffer.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match err.error_len() {
                    // Incomplete sequence at the end; wait for the next chunk.
                    None => {
                        pending.drain(..valid);
                        return;
                    }
                    Some(len) => {
                        buffer.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + len);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(*p)))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(parts: &[&'static [u8]]) -> Vec<Result<StreamFrame>> {
        decode_frames(chunks(parts)).collect().await
    }

    #[tokio::test]
    async fn parse_chunk_frames() {
        let frames =
            collect(&[b"data: {\"chunk\":\"He\"}\n\ndata: {\"chunk\":\"llo\"}\n\ndata: {\"done\":true}\n\n"])
                .await;
        let frames: Vec<StreamFrame> = frames.into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(
            frames,
            vec![
                StreamFrame::chunk("He"),
                StreamFrame::chunk("llo"),
                StreamFrame::done()
            ]
        );
    }

    #[tokio::test]
    async fn handle_split_frame() {
        let frames = collect(&[b"data: {\"chu", b"nk\":\"hi\"}\n", b"\n"]).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::chunk("hi"));
    }

    #[tokio::test]
    async fn handle_split_utf8_sequence() {
        // "é" is 0xC3 0xA9.
        let frames = collect(&[b"data: {\"chunk\":\"caf\xC3", b"\xA9\"}\n"]).await;
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::chunk("café"));
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let frames = collect(&[
            b"data: {not json}\n",
            b"data: [DONE]\n",
            b"event: message\n: comment\n\n",
            b"data: {\"chunk\":\"ok\"}\n",
        ])
        .await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::chunk("ok"));
    }

    #[tokio::test]
    async fn final_line_without_newline() {
        let frames = collect(&[b"data: {\"chunk\":\"a\"}\ndata: {\"done\":true}"]).await;
        assert_eq!(frames.len(), 2);
        assert!(frames[1].as_ref().unwrap().is_done());
    }

    #[tokio::test]
    async fn crlf_lines() {
        let frames = collect(&[b"data: {\"chunk\":\"x\"}\r\n\r\n"]).await;
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::chunk("x"));
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let parts: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: {\"chunk\":\"a\"}\n")),
            Err(Error::streaming("connection reset", None)),
        ];
        let frames: Vec<_> = decode_frames(stream::iter(parts)).collect().await;
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_ok());
        assert!(matches!(frames[1], Err(Error::Streaming { .. })));
    }

    #[test]
    fn decode_line_requires_prefix_with_space() {
        assert!(decode_line("data:{\"chunk\":\"a\"}").is_none());
        assert!(decode_line("").is_none());
        assert_eq!(
            decode_line("data: {\"search_used\":true}"),
            Some(StreamFrame {
                search_used: Some(true),
                ..StreamFrame::default()
            })
        );
    }
}
