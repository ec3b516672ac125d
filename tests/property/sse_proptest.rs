//! Property-based tests for SSE frame decoding

use proptest::prelude::*;
use xfchat::client::connection::sse::{SseFrame, SseParser};

const STREAM: &str = concat!(
    ": keep-alive\n\n",
    "event: newMessage\r\n",
    "data: {\"content\":\"héllo ✓\"}\r\n\r\n",
    "event: messagesRead\n",
    "data: {\"a\":1}\n",
    "data: {\"b\":2}\n\n",
);

fn decode(chunks: &[&[u8]]) -> Vec<SseFrame> {
    let mut parser = SseParser::default();
    chunks.iter().flat_map(|chunk| parser.feed(chunk)).collect()
}

proptest! {
    #[test]
    fn test_chunk_boundaries_do_not_matter(mut cuts in prop::collection::vec(0..STREAM.len(), 0..12)) {
        let bytes = STREAM.as_bytes();
        cuts.sort_unstable();
        cuts.dedup();

        let mut chunks = Vec::new();
        let mut start = 0;
        for cut in cuts {
            chunks.push(&bytes[start..cut]);
            start = cut;
        }
        chunks.push(&bytes[start..]);

        prop_assert_eq!(decode(&chunks), decode(&[bytes]));
    }
}

#[test]
fn test_reference_stream() {
    let frames = decode(&[STREAM.as_bytes()]);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].event.as_deref(), Some("newMessage"));
    assert_eq!(frames[0].data, "{\"content\":\"héllo ✓\"}");
    assert_eq!(frames[1].data, "{\"a\":1}\n{\"b\":2}");
}
