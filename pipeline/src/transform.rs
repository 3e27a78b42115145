//! Per-document transform hook.

use serde_json::Value;

/// A pure per-document transform.
///
/// Implementations must not emit more than one output per input; returning `None`
/// drops the document. Field renaming, removal, and coercion are all expressible
/// here; transforming the document *schema* beyond this hook is out of scope.
pub trait DocTransform: Send + Sync {
    /// Transform one document, or drop it by returning `None`.
    fn transform(&self, doc: Value) -> Option<Value>;
}

/// Reference transform: passes every document through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransform;

impl DocTransform for IdentityTransform {
    fn transform(&self, doc: Value) -> Option<Value> {
        Some(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_never_decodes_or_drops() {
        let doc = serde_json::json!({"a": 1, "b": "x"});
        let out = IdentityTransform.transform(doc.clone());
        assert_eq!(out, Some(doc));
    }

    struct DropOdd;
    impl DocTransform for DropOdd {
        fn transform(&self, doc: Value) -> Option<Value> {
            match doc.get("n").and_then(Value::as_i64) {
                Some(n) if n % 2 != 0 => None,
                _ => Some(doc),
            }
        }
    }

    #[test]
    fn transform_can_drop_documents() {
        let t = DropOdd;
        assert!(t.transform(serde_json::json!({"n": 3})).is_none());
        assert!(t.transform(serde_json::json!({"n": 4})).is_some());
    }
}
