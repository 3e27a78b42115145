//! Newline-delimited bulk-index payload encoding.
//!
//! ```text
//! {"index":{"_index":"<dest>"}}\n
//! <doc-json>\n
//! ```
//! A trailing newline terminates the payload. Documents are appended without an
//! explicit `_id`, letting the destination assign one.

use serde_json::Value;

/// Bytes for one `index` action line plus its source line, including both trailing
/// newlines. Importers use this to measure exactly how many bytes a document would add
/// to a payload before committing it to a batch.
#[must_use]
pub fn encode_action_and_source(index: &str, doc: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_action_and_source_into(index, doc, &mut buf);
    buf
}

pub(crate) fn encode_action_and_source_into(index: &str, doc: &Value, buf: &mut Vec<u8>) {
    let action = serde_json::json!({ "index": { "_index": index } });
    serde_json::to_writer(&mut *buf, &action).expect("action line serializes");
    buf.push(b'\n');
    serde_json::to_writer(&mut *buf, doc).expect("document serializes");
    buf.push(b'\n');
}

/// Encode a full batch of documents into one bulk-request payload.
#[must_use]
pub fn encode_batch(index: &str, docs: &[Value]) -> Vec<u8> {
    let mut buf = Vec::new();
    for doc in docs {
        encode_action_and_source_into(index, doc, &mut buf);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_alternating_action_and_source_lines() {
        let docs = vec![serde_json::json!({"a": 1}), serde_json::json!({"b": 2})];
        let payload = encode_batch("dest-idx", &docs);
        let text = String::from_utf8(payload).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], r#"{"index":{"_index":"dest-idx"}}"#);
        assert_eq!(lines[1], r#"{"a":1}"#);
        assert_eq!(lines[2], r#"{"index":{"_index":"dest-idx"}}"#);
        assert_eq!(lines[3], r#"{"b":2}"#);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn single_document_byte_length_matches_full_batch() {
        let doc = serde_json::json!({"a": 1});
        let one = encode_action_and_source("dest-idx", &doc);
        let batch = encode_batch("dest-idx", std::slice::from_ref(&doc));
        assert_eq!(one, batch);
    }
}
