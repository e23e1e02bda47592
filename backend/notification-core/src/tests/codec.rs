// Unit tests for chunk splitting and fragment reassembly

use crate::DEFAULT_CHUNK_SIZE;
use crate::codec::{FrameAssembler, InboundFragment, Reassembly, split_message};
use crate::error::NotificationError;

/// **VALUE**: Splitting then concatenating reproduces the original bytes for
/// a spread of sizes around the chunk boundary.
///
/// **WHY THIS MATTERS**: The backend only sees the concatenation. Any dropped,
/// duplicated or reordered byte corrupts the JSON it receives.
///
/// **BUG THIS CATCHES**: Off-by-one errors at exact multiples of the chunk size,
/// and the final flag landing on the wrong chunk.
#[test]
fn given_messages_of_various_sizes_when_split_and_joined_then_round_trip() {
    for (len, max_chunk) in [
        (1usize, 1usize),
        (7, 3),
        (9, 3),
        (2047, 2048),
        (2048, 2048),
        (2049, 2048),
        (10_000, 2048),
        (5, 64),
    ] {
        // GIVEN: A message of `len` bytes
        let message: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();

        // WHEN: Splitting it
        let chunks = split_message(&message, max_chunk);

        // THEN: ceil(len / max_chunk) chunks, each bounded, only the last final
        assert_eq!(chunks.len(), len.div_ceil(max_chunk), "len={len} B={max_chunk}");
        assert!(chunks.iter().all(|c| c.data.len() <= max_chunk));
        assert!(chunks.last().unwrap().is_final);
        assert_eq!(chunks.iter().filter(|c| c.is_final).count(), 1);
        assert!(chunks.iter().enumerate().all(|(i, c)| c.index == i));

        // AND: Concatenation equals the original
        let joined: Vec<u8> = chunks.into_iter().flat_map(|c| c.data).collect();
        assert_eq!(joined, message);
    }
}

/// **VALUE**: Multi-byte UTF-8 text survives being cut mid-character.
///
/// **WHY THIS MATTERS**: Chunking is byte-based; player names and console lines
/// regularly contain non-ASCII characters.
///
/// **BUG THIS CATCHES**: Would catch decoding each chunk as UTF-8 on its own
/// instead of decoding the reassembled buffer.
#[test]
fn given_multibyte_text_when_split_across_chars_then_reassembles_exactly() {
    // GIVEN: Text whose characters are 2-4 bytes wide, cut every 3 bytes
    let text = "Grüße ✓ 🎮 joined";
    let chunks = split_message(text.as_bytes(), 3);

    // WHEN: Feeding the chunks back through the assembler
    let mut assembler = FrameAssembler::new();
    let mut result = None;
    for chunk in chunks {
        match assembler
            .push(InboundFragment::text(chunk.data, chunk.is_final))
            .unwrap()
        {
            Reassembly::Incomplete => {}
            Reassembly::Complete(message) => result = Some(message),
            Reassembly::Closed => panic!("unexpected close"),
        }
    }

    // THEN: The exact original string comes out
    assert_eq!(result.as_deref(), Some(text));
    assert_eq!(assembler.buffered(), 0);
}

#[test]
fn given_empty_message_when_split_then_single_empty_final_chunk() {
    let chunks = split_message(b"", DEFAULT_CHUNK_SIZE);

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].data.is_empty());
    assert!(chunks[0].is_final);
}

#[test]
fn given_zero_chunk_size_when_split_then_clamps_to_one_byte() {
    let chunks = split_message(b"abc", 0);

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[2].data, b"c");
}

/// **VALUE**: A close mid-message drops the partial buffer.
///
/// **WHY THIS MATTERS**: After a reconnect the next message must start clean;
/// leftover bytes would be glued onto it and break decoding.
///
/// **BUG THIS CATCHES**: Would catch the assembler keeping its buffer on close.
#[test]
fn given_partial_message_when_close_arrives_then_buffer_discarded() {
    // GIVEN: Half a message buffered
    let mut assembler = FrameAssembler::new();
    assert_eq!(
        assembler.push(InboundFragment::text("{\"type\":", false)).unwrap(),
        Reassembly::Incomplete
    );
    assert!(assembler.buffered() > 0);

    // WHEN: The peer closes
    let outcome = assembler.push(InboundFragment::close()).unwrap();

    // THEN: Stream ends and nothing is retained
    assert_eq!(outcome, Reassembly::Closed);
    assert_eq!(assembler.buffered(), 0);
}

/// **VALUE**: Invalid UTF-8 is reported as a decode error and the assembler
/// recovers for the next message.
///
/// **WHY THIS MATTERS**: One bad message must not poison the stream.
///
/// **BUG THIS CATCHES**: Would catch the buffer not being reset on error.
#[test]
fn given_invalid_utf8_when_completed_then_decode_error_and_recovers() {
    let mut assembler = FrameAssembler::new();

    let result = assembler.push(InboundFragment::binary(vec![0xff, 0xfe], true));
    assert!(matches!(result, Err(NotificationError::Decode { .. })));

    let next = assembler.push(InboundFragment::text("ok", true)).unwrap();
    assert_eq!(next, Reassembly::Complete(String::from("ok")));
}

/// **VALUE**: Oversized messages are dropped without unbounded buffering.
///
/// **WHY THIS MATTERS**: A peer streaming continuation frames forever would
/// otherwise grow the buffer until the process runs out of memory.
///
/// **BUG THIS CATCHES**: Would catch the limit being checked only on the final
/// fragment, or the tail of the oversized message being treated as a new one.
#[test]
fn given_message_over_limit_when_pushed_then_discarded_until_end_of_message() {
    // GIVEN: A 8-byte limit
    let mut assembler = FrameAssembler::with_limit(8);

    // WHEN: Fragments exceed the limit
    assert_eq!(
        assembler.push(InboundFragment::text("12345", false)).unwrap(),
        Reassembly::Incomplete
    );
    let overflow = assembler.push(InboundFragment::text("67890", false));

    // THEN: Error once, then the remainder of that message is skipped
    assert!(matches!(overflow, Err(NotificationError::Decode { .. })));
    assert_eq!(assembler.buffered(), 0);
    assert_eq!(
        assembler.push(InboundFragment::text("tail", true)).unwrap(),
        Reassembly::Incomplete
    );

    // AND: The following message is delivered normally
    assert_eq!(
        assembler.push(InboundFragment::text("next", true)).unwrap(),
        Reassembly::Complete(String::from("next"))
    );
}
