use pretty_assertions::assert_eq;
use registry_engine::{decode_text, safe_parse_json};
use serde_json::json;

#[test]
fn empty_and_blank_bodies_are_absent() {
    assert_eq!(safe_parse_json(b"", None), None);
    assert_eq!(safe_parse_json(b"  \r\n\t ", Some("application/json")), None);
}

#[test]
fn plain_json_parses_strictly() {
    assert_eq!(
        safe_parse_json(br#"{"items":[{"id":1}]}"#, Some("application/json")),
        Some(json!({"items": [{"id": 1}]}))
    );
    assert_eq!(safe_parse_json(b"[]", None), Some(json!([])));
}

#[test]
fn text_without_json_is_absent() {
    assert_eq!(safe_parse_json(b"Internal Server Error", Some("text/plain")), None);
    assert_eq!(safe_parse_json(b"<html><body>502</body></html>", None), None);
}

#[test]
fn truncated_json_is_absent() {
    assert_eq!(safe_parse_json(br#"{"items": [{"id": 1}, {"id""#, None), None);
}

#[test]
fn json_embedded_in_text_is_recovered() {
    assert_eq!(
        safe_parse_json(br#"some prefix {"a":1} suffix"#, Some("text/html")),
        Some(json!({"a": 1}))
    );
}

#[test]
fn json_after_markup_heavy_error_page_is_recovered() {
    let mut body = String::from("<html><head><style>");
    for n in 0..100 {
        body.push_str(&format!(".c{n}{{color:red}}"));
    }
    body.push_str("</style></head><body>Gateway</body></html>\n{\"items\":[{\"id\":7}]}");
    assert_eq!(
        safe_parse_json(body.as_bytes(), Some("text/html")),
        Some(json!({"items": [{"id": 7}]}))
    );
}

#[test]
fn embedded_array_is_recovered() {
    assert_eq!(
        safe_parse_json(br#"while(1); [{"id":"x"}] // trailer"#, None),
        Some(json!([{"id": "x"}]))
    );
}

#[test]
fn utf8_bom_is_stripped() {
    let mut body = vec![0xEF, 0xBB, 0xBF];
    body.extend_from_slice(br#"{"name":"Lager"}"#);
    assert_eq!(safe_parse_json(&body, None), Some(json!({"name": "Lager"})));
}

#[test]
fn utf16_body_decodes_via_bom() {
    let mut body = vec![0xFF, 0xFE];
    for unit in r#"{"ok":true}"#.encode_utf16() {
        body.extend_from_slice(&unit.to_le_bytes());
    }
    assert_eq!(decode_text(&body, None), r#"{"ok":true}"#);
    assert_eq!(safe_parse_json(&body, None), Some(json!({"ok": true})));
}
