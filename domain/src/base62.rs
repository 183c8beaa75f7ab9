//! Base62 encoding used by the in-memory backend to assign short codes.

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode an unsigned 64-bit integer using the alphabet 0-9, A-Z, a-z.
/// Zero encodes to "0".
pub fn encode_u64(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(11);
    while n > 0 {
        digits.push(ALPHABET[(n % 62) as usize] as char);
        n /= 62;
    }
    digits.iter().rev().collect()
}

/// Like [`encode_u64`], left-padded with '0' to at least `min_width` chars.
pub fn encode_padded(n: u64, min_width: usize) -> String {
    format!("{:0>min_width$}", encode_u64(n))
}
