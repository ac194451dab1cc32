const FRAME_DELIMITER: &[u8] = b"\n\n";

/// Splits an arbitrarily chunked SSE byte stream into raw frames.
///
/// Bytes are buffered until a blank line closes a frame, so chunk boundaries
/// may fall anywhere, including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct EventFramer {
    buffer: Vec<u8>,
}

impl EventFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // A delimiter may straddle the previous chunk and this one.
        let search_from = self.buffer.len().saturating_sub(FRAME_DELIMITER.len() - 1);
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        let mut cursor = search_from;

        while let Some(offset) = find_delimiter(&self.buffer[cursor..]) {
            let end = cursor + offset;
            frames.push(String::from_utf8_lossy(&self.buffer[start..end]).into_owned());
            start = end + FRAME_DELIMITER.len();
            cursor = start;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        frames
    }

    /// Ends the stream, returning any non-blank trailing data as a last frame.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let frame = String::from_utf8_lossy(&rest).into_owned();
        if frame.trim().is_empty() {
            None
        } else {
            Some(frame)
        }
    }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(FRAME_DELIMITER.len())
        .position(|window| window == FRAME_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_frames_are_split_on_blank_line() {
        let mut framer = EventFramer::new();
        let frames = framer.push(b"event: reasoning\ndata: a\n\ndata: b\n\n");
        assert_eq!(frames, vec!["event: reasoning\ndata: a", "data: b"]);
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_partial_frame_is_retained_until_delimiter() {
        let mut framer = EventFramer::new();
        assert!(framer.push(b"data: hel").is_empty());
        assert!(framer.push(b"lo\n").is_empty());
        assert_eq!(framer.push(b"\ndata: x"), vec!["data: hello"]);
        assert_eq!(framer.finish().as_deref(), Some("data: x"));
    }

    #[test]
    fn test_finish_ignores_blank_remainder() {
        let mut framer = EventFramer::new();
        framer.push(b"data: a\n\n\n");
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let payload = "data: café ✓\n\n".as_bytes();
        let mut framer = EventFramer::new();
        let mut frames = Vec::new();
        for byte in payload {
            frames.extend(framer.push(std::slice::from_ref(byte)));
        }
        assert_eq!(frames, vec!["data: café ✓"]);
    }
}
