//! Incremental server-sent events parser.
//!
//! The chat-completions endpoint streams SSE frames over a chunked HTTP
//! response. Chunk boundaries fall anywhere — including inside a
//! multi-byte UTF-8 character — so the parser buffers raw bytes and only
//! decodes text once a blank line completes a frame.

/// One complete SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if the frame carried one.
    pub event: Option<String>,
    /// Joined `data:` lines.
    pub data: String,
}

/// Buffering SSE parser. Feed it response chunks, get back complete frames.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk of the response body and return any frames it
    /// completed. Frames end at a blank line; both `\n\n` and `\r\n\r\n`
    /// delimiters occur in the wild.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some((frame_end, delim_len)) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..frame_end + delim_len).collect();
            let text = String::from_utf8_lossy(&frame[..frame_end]);
            if let Some(event) = parse_frame(&text) {
                events.push(event);
            }
        }

        events
    }

    /// True if a partial frame is still buffered.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// Locate the first blank-line delimiter. Returns (frame length, delimiter
/// length).
fn find_frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = find_subslice(buffer, b"\n\n").map(|i| (i, 2));
    let crlf = find_subslice(buffer, b"\r\n\r\n").map(|i| (i, 4));

    match (lf, crlf) {
        (Some((a, al)), Some((b, bl))) => {
            if a < b {
                Some((a, al))
            } else {
                Some((b, bl))
            }
        }
        (Some(hit), None) | (None, Some(hit)) => Some(hit),
        (None, None) => None,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_frame(frame: &str) -> Option<SseEvent> {
    let mut event_type = None;
    let mut data_lines = Vec::new();

    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event_type = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // Comment lines (leading ':') and unknown fields are skipped.
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event: event_type,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
        assert!(events[0].event.is_none());
        assert!(!parser.has_pending());
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: {\"choices\":[{\"del").is_empty());
        assert!(parser.has_pending());

        let events = parser.feed(b"ta\":{\"content\":\"Hi\"}}]}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, r#"{"choices":[{"delta":{"content":"Hi"}}]}"#);
    }

    #[test]
    fn multibyte_char_split_across_chunks_survives() {
        let mut parser = SseParser::new();
        let payload = "data: {\"content\":\"héllo 日本\"}\n\n".as_bytes();
        // Split inside the two-byte 'é'.
        let split = payload.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let (head, tail) = payload.split_at(split);

        assert!(parser.feed(head).is_empty());
        let events = parser.feed(tail);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"content\":\"héllo 日本\"}");
        assert!(!events[0].data.contains('\u{FFFD}'));
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: one\n\ndata: two\n\ndata: [DONE]\n\n");
        let data: Vec<&str> = events.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(data, ["one", "two", "[DONE]"]);
    }

    #[test]
    fn crlf_delimiters() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: first\r\n\r\ndata: second\r\n\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "first");
        assert_eq!(events[1].data, "second");
    }

    #[test]
    fn event_field() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"event: delta\ndata: x\n\n");
        assert_eq!(events[0].event.as_deref(), Some("delta"));
    }

    #[test]
    fn multiline_data_joined() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: a\ndata: b\n\n");
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn comments_and_bare_events_skipped() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b": keep-alive\n\n").is_empty());
        assert!(parser.feed(b"event: ping\n\n").is_empty());
    }

    #[test]
    fn empty_data_line() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data:\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "");
    }

    #[test]
    fn only_first_space_stripped() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data:  two spaces\n\n");
        assert_eq!(events[0].data, " two spaces");
    }
}
