//! Reformats a batch of wire-level reassembler segments into the layout the
//! in-core reassembler engine expects, splicing out a 4-byte field each
//! wire segment carries that the engine has no use for (§4.2).

/// Reformat a concatenation of wire segments.
///
/// Each wire segment is laid out as:
/// `conv_id(4) || extra(4, discarded) || remaining_header(20) || content_len(4, LE) || content(N)`.
///
/// The output is the concatenation of, per segment, `conv_id(4) || remaining_header(20) || content(N)`.
/// Exhaustive over the input; any trailing bytes that don't form a full
/// segment are dropped (malformed tail from the wire, not ours to repair).
pub fn reformat_segments(data: &[u8]) -> Vec<u8> {
    const FIXED_PREFIX: usize = 28; // conv(4) + extra(4) + remaining_header(20) + content_len(4)

    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i + FIXED_PREFIX <= data.len() {
        let conv_id = &data[i..i + 4];
        let remaining_header = &data[i + 8..i + 28];
        let content_len = u32::from_le_bytes(data[i + 24..i + 28].try_into().unwrap()) as usize;

        let content_start = i + FIXED_PREFIX;
        let content_end = content_start + content_len;
        if content_end > data.len() {
            break;
        }
        let content = &data[content_start..content_end];

        out.extend_from_slice(conv_id);
        out.extend_from_slice(remaining_header);
        out.extend_from_slice(content);

        i = content_end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_single_segment_reformat() {
        let mut input = Vec::new();
        input.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]); // conv id
        input.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]); // extra, discarded
        let mut header20 = vec![0u8; 20];
        header20[20 - 4..].copy_from_slice(&3u32.to_le_bytes());
        input.extend_from_slice(&header20);
        input.extend_from_slice(&[0x11, 0x22, 0x33]); // content

        let out = reformat_segments(&input);

        let mut expected = Vec::new();
        expected.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        expected.extend_from_slice(&header20);
        expected.extend_from_slice(&[0x11, 0x22, 0x33]);

        assert_eq!(out, expected);
        assert_eq!(out.len(), 27);
    }

    #[test]
    fn reformats_multiple_segments_back_to_back() {
        let make_segment = |conv: u32, content: &[u8]| {
            let mut seg = Vec::new();
            seg.extend_from_slice(&conv.to_le_bytes());
            seg.extend_from_slice(&[0u8; 4]);
            let mut header20 = vec![0u8; 20];
            header20[16..].copy_from_slice(&(content.len() as u32).to_le_bytes());
            seg.extend_from_slice(&header20);
            seg.extend_from_slice(content);
            seg
        };

        let mut input = make_segment(7, b"ab");
        input.extend(make_segment(7, b"cde"));

        let out = reformat_segments(&input);
        // Each reformatted segment is 24 + content bytes.
        assert_eq!(out.len(), (24 + 2) + (24 + 3));
    }

    #[test]
    fn incomplete_trailing_segment_is_dropped() {
        let input = vec![0u8; 10];
        assert!(reformat_segments(&input).is_empty());
    }
}
