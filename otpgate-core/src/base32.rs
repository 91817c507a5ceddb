//! RFC 4648 base32 codec (no padding)
//!
//! Decoding is lenient the way authenticator apps are: case is ignored,
//! unknown symbols (spaces, dashes, `=`) are skipped, and a trailing group of
//! fewer than 8 bits is dropped. It never fails.

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Encode bytes as unpadded base32 text
pub fn encode(data: &[u8]) -> String {
    let mut output = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &byte in data {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;

        while bits >= 5 {
            bits -= 5;
            let index = ((buffer >> bits) & 0x1f) as usize;
            output.push(ALPHABET[index] as char);
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        let index = ((buffer << (5 - bits)) & 0x1f) as usize;
        output.push(ALPHABET[index] as char);
    }

    output
}

/// Decode base32 text, skipping anything outside the alphabet
pub fn decode(text: &str) -> Vec<u8> {
    let mut output = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for c in text.chars() {
        let Some(value) = symbol_value(c) else {
            continue;
        };

        buffer = (buffer << 5) | value as u32;
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            output.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    output
}

fn symbol_value(c: char) -> Option<u8> {
    match c.to_ascii_uppercase() {
        c @ 'A'..='Z' => Some(c as u8 - b'A'),
        c @ '2'..='7' => Some(c as u8 - b'2' + 26),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc4648_vectors() {
        // RFC 4648 section 10, padding stripped
        assert_eq!(encode(b""), "");
        assert_eq!(encode(b"f"), "MY");
        assert_eq!(encode(b"fo"), "MZXQ");
        assert_eq!(encode(b"foo"), "MZXW6");
        assert_eq!(encode(b"foob"), "MZXW6YQ");
        assert_eq!(encode(b"fooba"), "MZXW6YTB");
        assert_eq!(encode(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn test_encoded_length() {
        for len in 0..40usize {
            let data = vec![0xA5u8; len];
            assert_eq!(encode(&data).len(), (len * 8 + 4) / 5);
        }
    }

    #[test]
    fn test_round_trip() {
        let samples: Vec<Vec<u8>> = vec![
            vec![],
            vec![0],
            vec![0xff; 7],
            b"12345678901234567890".to_vec(),
            (0..=255u8).collect(),
        ];

        for bytes in samples {
            assert_eq!(decode(&encode(&bytes)), bytes);
        }
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        assert_eq!(decode("mzxw6ytboi"), b"foobar");
        assert_eq!(decode("MzXw6YtBoI"), b"foobar");
    }

    #[test]
    fn test_decode_skips_unknown_symbols() {
        assert_eq!(decode("MZXW 6YTB-OI======"), b"foobar");
        assert_eq!(decode("MZ1XW0"), decode("MZXW"));
    }

    #[test]
    fn test_decode_drops_partial_group() {
        // 3 symbols = 15 bits -> one full byte, 7 bits discarded
        assert_eq!(decode("MZX"), b"f");
    }

    #[test]
    fn test_decode_empty_and_invalid() {
        assert!(decode("").is_empty());
        assert!(decode("0189!@#").is_empty());
    }
}
