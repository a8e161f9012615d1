//! Byte to UTF-16 offset conversion.
//!
//! Spans are byte offsets; editors exchange UTF-16 offsets.

/// Convert a byte offset to a UTF-16 offset, clamping past the end.
pub fn byte_to_utf16(source: &str, byte_offset: usize) -> usize {
    let byte_offset = floor_char_boundary(source, byte_offset);
    source[..byte_offset].encode_utf16().count()
}

fn floor_char_boundary(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
