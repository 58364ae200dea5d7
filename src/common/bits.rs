/// encode a sequence of u16 values as big-endian bytes
pub(crate) fn words_to_be_bytes(values: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 2);
    for value in values {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    bytes
}

/// decode big-endian bytes into u16 values, ignoring a trailing odd byte
pub(crate) fn be_bytes_to_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

pub(crate) fn bit_at(value: u8, pos: usize) -> u8 {
    (value >> pos) & 0x01
}
