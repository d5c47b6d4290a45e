//! Descriptor input decoding
//!
//! The document encoding is taken from a byte order mark, then from the
//! UTF-16 shape of an unmarked `<?` prefix, then from the XML declaration,
//! and is UTF-8 otherwise. Both parser backends work on the decoded text.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::errors::{ParseError, ParseResult};

/// How far into the input the XML declaration is searched for
const DECLARATION_SCAN_LEN: usize = 256;

/// Encoding detected for one descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detected {
    pub encoding: &'static Encoding,
    /// Length of the byte order mark to skip
    pub bom_len: usize,
}

impl Detected {
    pub fn utf8() -> Self {
        Self {
            encoding: UTF_8,
            bom_len: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decodes the input, failing on any malformed sequence
    pub fn decode_strict<'a>(&self, bytes: &'a [u8]) -> ParseResult<Cow<'a, str>> {
        self.encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[self.bom_len..])
            .ok_or(ParseError::Encoding {
                encoding: self.name(),
            })
    }

    /// Decodes the input, replacing malformed sequences with U+FFFD
    pub fn decode_lossy<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (text, had_errors) = self
            .encoding
            .decode_without_bom_handling(&bytes[self.bom_len..]);
        if had_errors {
            tracing::warn!(
                "Descriptor has byte sequences that are not valid {}, replaced them",
                self.name()
            );
        }
        text
    }
}

/// Works out the encoding of raw descriptor bytes
///
/// # Errors
///
/// Returns `ParseError::UnknownEncoding` if the XML declaration names an
/// encoding label that is not recognised.
pub fn detect(bytes: &[u8]) -> ParseResult<Detected> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return Ok(Detected { encoding, bom_len });
    }
    if bytes.starts_with(&[b'<', 0, b'?', 0]) {
        return Ok(Detected {
            encoding: UTF_16LE,
            bom_len: 0,
        });
    }
    if bytes.starts_with(&[0, b'<', 0, b'?']) {
        return Ok(Detected {
            encoding: UTF_16BE,
            bom_len: 0,
        });
    }

    let Some(label) = declared_label(bytes) else {
        return Ok(Detected::utf8());
    };
    let encoding = match Encoding::for_label(label.as_bytes()) {
        // an ASCII-readable declaration cannot be UTF-16 encoded
        Some(encoding) if encoding == UTF_16LE || encoding == UTF_16BE => UTF_8,
        Some(encoding) => encoding,
        None => return Err(ParseError::UnknownEncoding(label)),
    };
    Ok(Detected {
        encoding,
        bom_len: 0,
    })
}

/// `encoding` pseudo-attribute of a leading `<?xml ...?>` declaration
fn declared_label(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(DECLARATION_SCAN_LEN)];
    let head = skip_whitespace(head).strip_prefix(b"<?xml")?;
    let end = head.windows(2).position(|pair| pair == b"?>")?;
    let declaration = &head[..end];

    let at = declaration
        .windows(b"encoding".len())
        .position(|window| window == b"encoding")?;
    let rest = skip_whitespace(&declaration[at + b"encoding".len()..]).strip_prefix(b"=")?;
    let (&quote, rest) = skip_whitespace(rest).split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let close = rest.iter().position(|&b| b == quote)?;
    Some(String::from_utf8_lossy(&rest[..close]).trim().to_string())
}

fn skip_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn test_defaults_to_utf8() {
        assert_eq!(detect(b"<jnlp/>").unwrap(), Detected::utf8());
        assert_eq!(
            detect(br#"<?xml version="1.0"?><jnlp/>"#).unwrap(),
            Detected::utf8()
        );
    }

    #[test]
    fn test_declared_label() {
        let detected = detect(br#"<?xml version="1.0" encoding='ISO-8859-1' ?><jnlp/>"#).unwrap();
        assert_eq!(detected.name(), "windows-1252");

        let detected = detect(b"  <?xml version=\"1.0\" encoding = \"Shift_JIS\"?><a/>").unwrap();
        assert_eq!(detected.name(), "Shift_JIS");
    }

    #[test]
    fn test_unknown_label() {
        assert!(matches!(
            detect(br#"<?xml version="1.0" encoding="klingon"?><a/>"#),
            Err(ParseError::UnknownEncoding(label)) if label == "klingon"
        ));
    }

    #[test]
    fn test_utf16_detection() {
        let mut marked = vec![0xff, 0xfe];
        marked.extend(utf16le("<a/>"));
        assert_eq!(
            detect(&marked).unwrap(),
            Detected {
                encoding: UTF_16LE,
                bom_len: 2
            }
        );

        let unmarked = utf16le(r#"<?xml version="1.0"?><a/>"#);
        assert_eq!(detect(&unmarked).unwrap().encoding, UTF_16LE);

        let big_endian: Vec<u8> = "<?xml?>".encode_utf16().flat_map(u16::to_be_bytes).collect();
        assert_eq!(detect(&big_endian).unwrap().encoding, UTF_16BE);
    }

    #[test]
    fn test_utf16_label_on_ascii_input_means_utf8() {
        let detected = detect(br#"<?xml version="1.0" encoding="UTF-16"?><a/>"#).unwrap();
        assert_eq!(detected, Detected::utf8());
    }

    #[test]
    fn test_decode_skips_bom() {
        let bytes = b"\xef\xbb\xbf<a/>";
        let detected = detect(bytes).unwrap();
        assert_eq!(detected.decode_strict(bytes).unwrap(), "<a/>");
        assert_eq!(detected.decode_lossy(bytes), "<a/>");
    }

    #[test]
    fn test_strict_decode_rejects_malformed_bytes() {
        let detected = Detected::utf8();
        assert!(matches!(
            detected.decode_strict(b"<a b=\"\xff\"/>"),
            Err(ParseError::Encoding { encoding: "UTF-8" })
        ));
        assert_eq!(detected.decode_lossy(b"<a b=\"\xff\"/>"), "<a b=\"\u{fffd}\"/>");
    }
}
