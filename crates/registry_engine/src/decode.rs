use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use serde_json::Value;

/// Start positions tried per scan when searching text for embedded JSON.
const MAX_EMBEDDED_CANDIDATES: usize = 64;

/// Lenient JSON decoding of a response body. Never fails loudly.
///
/// Tries, in order: strict JSON over the raw bytes; JSON over the body decoded
/// as text (BOM, then Content-Type charset, then detection); the first
/// balanced `{…}` or `[…]` substring of that text that parses. Empty and
/// whitespace-only bodies give `None`.
///
/// The substring search looks after the last `>` first, so markup ahead of
/// the payload is skipped, then over the whole text. Each of the two scans
/// tries at most the first 64 opening brackets; JSON preceded by more
/// brackets than that inside the scanned region is not found.
pub fn safe_parse_json(body: &[u8], content_type: Option<&str>) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    if let Ok(value) = serde_json::from_slice(body) {
        return Some(value);
    }

    let text = decode_text(body, content_type);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    embedded_json(trimmed)
}

/// Decode raw bytes into UTF-8 using: BOM -> Content-Type charset -> chardetng fallback.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> String {
    // 1) BOM aware decode using encoding_rs helper
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    // 2) Content-Type header charset
    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    // 3) Valid UTF-8 needs no guessing
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    // 4) chardetng detection
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim_matches(&[' ', '"', '\''][..]).to_string())
        })
        .next()
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> String {
    let (text, _) = enc.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// First balanced JSON object or array inside `text` that parses.
fn embedded_json(text: &str) -> Option<Value> {
    if let Some(markup_end) = text.rfind('>') {
        if let Some(value) = scan_brackets(&text[markup_end + 1..]) {
            return Some(value);
        }
    }
    scan_brackets(text)
}

fn scan_brackets(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{' || *ch == '[')
        .take(MAX_EMBEDDED_CANDIDATES)
        .find_map(|(start, _)| {
            let candidate = &text[start..];
            let end = balanced_end(candidate)?;
            serde_json::from_str(&candidate[..end]).ok()
        })
}

/// Byte length of the bracketed value opening `text`, honouring JSON strings.
fn balanced_end(text: &str) -> Option<usize> {
    let mut expected = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (index, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => expected.push(b'}'),
            b'[' => expected.push(b']'),
            b'}' | b']' => {
                if expected.pop() != Some(byte) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn balanced_end_skips_brackets_in_strings() {
        let text = r#"{"a":"}]","b":[1,{"c":2}]} trailing"#;
        assert_eq!(balanced_end(text), Some(text.len() - " trailing".len()));
    }

    #[test]
    fn balanced_end_rejects_mismatched() {
        assert_eq!(balanced_end("{]"), None);
        assert_eq!(balanced_end("{\"open\": 1"), None);
    }

    #[test]
    fn charset_is_read_case_insensitively() {
        assert_eq!(
            extract_charset("application/json; Charset=\"ISO-8859-1\""),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(extract_charset("application/json"), None);
    }

    #[test]
    fn latin1_body_decodes_via_charset() {
        let body = b"{\"name\":\"Caf\xe9\"}";
        assert_eq!(
            safe_parse_json(body, Some("application/json; charset=iso-8859-1")),
            Some(json!({"name": "Café"}))
        );
    }

    #[test]
    fn log_prefix_with_brackets_is_skipped() {
        let body = b"[INFO] payload follows: {\"items\": [1]}";
        assert_eq!(safe_parse_json(body, None), Some(json!({"items": [1]})));
    }
}
