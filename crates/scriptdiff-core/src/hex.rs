//! Lowercase hex rendering.

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Encode bytes as canonical lowercase hex.
#[must_use]
pub fn encode_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Value of a single ASCII hex digit.
#[must_use]
pub(crate) fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_lowercase_pairs() {
        assert_eq!(encode_hex(&[]), "");
        assert_eq!(encode_hex(&[0x00, 0x0f, 0xa0, 0xff]), "000fa0ff");
    }

    #[test]
    fn nibble_accepts_both_cases() {
        assert_eq!(nibble(b'7'), Some(7));
        assert_eq!(nibble(b'c'), Some(12));
        assert_eq!(nibble(b'C'), Some(12));
        assert_eq!(nibble(b'g'), None);
        assert_eq!(nibble(b' '), None);
    }
}
