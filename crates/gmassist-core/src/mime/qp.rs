//! Quoted-printable decoding (RFC 2045 section 6.7)

use crate::error::{Error, Result};

/// Decode quoted-printable bytes.
///
/// Soft line breaks (`=` at end of line) are removed and `=XX` escapes are
/// replaced by the byte they encode. An `=` followed by anything else is an
/// error, so text that is not actually quoted-printable is rejected.
pub fn quoted_printable_decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let byte = input[i];
        if byte != b'=' {
            out.push(byte);
            i += 1;
            continue;
        }

        match (input.get(i + 1), input.get(i + 2)) {
            // soft line breaks
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            (None, _) => i += 1,
            (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    return Err(Error::Decode(format!(
                        "invalid quoted-printable escape at byte {}",
                        i
                    )))
                }
            },
            (Some(_), None) => {
                return Err(Error::Decode(
                    "truncated quoted-printable escape".to_string(),
                ))
            }
        }
    }

    Ok(out)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_escapes() {
        let decoded = quoted_printable_decode(b"Caf=C3=A9 au lait").unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "Café au lait");
    }

    #[test]
    fn test_soft_line_breaks() {
        let decoded = quoted_printable_decode(b"This line is wr=\r\napped and so=\nft").unwrap();
        assert_eq!(decoded, b"This line is wrapped and soft");
    }

    #[test]
    fn test_rejects_invalid_escape() {
        assert!(quoted_printable_decode(b"total =ZZ").is_err());
        assert!(quoted_printable_decode(b"dangling =A").is_err());
    }

    #[test]
    fn test_lowercase_hex_and_plain_text() {
        assert_eq!(quoted_printable_decode(b"a=3db").unwrap(), b"a=b");
        assert_eq!(quoted_printable_decode(b"plain text").unwrap(), b"plain text");
    }
}
