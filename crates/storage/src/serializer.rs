use crate::{StorageError, StorageResult};
use marginalia_model::Annotation;
use serde::Serialize;
use serde_json::Value;

pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Turns an annotation collection into stored text and back.
pub trait AnnotationSerializer: Send + Sync {
    fn version(&self) -> u32;

    fn serialize(&self, annotations: &[Annotation]) -> StorageResult<String>;

    fn deserialize(&self, raw: &str) -> StorageResult<Vec<Annotation>>;
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    highlights: &'a [Annotation],
}

/// JSON format wrapped in a `{version, highlights}` envelope.
///
/// Reading accepts the envelope, a bare array written by older releases, or
/// any other well-formed JSON value, which yields an empty collection. Text
/// that is not JSON at all is reported as [`StorageError::Deserialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonSerializer {
    version: u32,
}

impl JsonSerializer {
    pub fn new(version: u32) -> Self {
        Self { version }
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new(CURRENT_FORMAT_VERSION)
    }
}

impl AnnotationSerializer for JsonSerializer {
    fn version(&self) -> u32 {
        self.version
    }

    fn serialize(&self, annotations: &[Annotation]) -> StorageResult<String> {
        let envelope = Envelope { version: self.version, highlights: annotations };
        serde_json::to_string(&envelope).map_err(StorageError::Serialize)
    }

    fn deserialize(&self, raw: &str) -> StorageResult<Vec<Annotation>> {
        let value: Value = serde_json::from_str(raw).map_err(StorageError::Deserialize)?;

        match value {
            Value::Array(_) => serde_json::from_value(value).map_err(StorageError::Deserialize),
            Value::Object(mut envelope) => {
                let stored_version = envelope.get("version").and_then(Value::as_u64);
                match envelope.remove("highlights") {
                    Some(highlights @ Value::Array(_)) => {
                        if stored_version.is_some_and(|v| v > u64::from(self.version)) {
                            tracing::warn!(
                                stored_version,
                                supported_version = self.version,
                                "annotations were written by a newer format; reading best-effort"
                            );
                        }
                        serde_json::from_value(highlights).map_err(StorageError::Deserialize)
                    }
                    _ => Ok(Vec::new()),
                }
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_model::{AnnotationId, Comment, Content, Position, ScaledRect};
    use proptest::prelude::*;

    fn annotation(id: &str, note: &str) -> Annotation {
        let rect = ScaledRect::new(1.0, 2.0, 3.0, 4.0, 800.0, 1000.0);
        Annotation {
            id: AnnotationId::new(id),
            position: Position::new(1, rect, vec![rect]),
            content: Content::text("quoted"),
            comment: Comment::new(note, ""),
        }
    }

    #[test]
    fn writes_versioned_envelope() {
        let raw = JsonSerializer::new(3).serialize(&[annotation("a", "x")]).expect("serialize");
        let value: Value = serde_json::from_str(&raw).expect("json");

        assert_eq!(value["version"], 3);
        assert_eq!(value["highlights"][0]["id"], "a");
    }

    #[test]
    fn reads_legacy_bare_array() {
        let legacy = serde_json::to_string(&vec![annotation("a", "x"), annotation("b", "y")])
            .expect("serialize legacy");

        let loaded = JsonSerializer::default().deserialize(&legacy).expect("deserialize");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].id.as_str(), "b");
    }

    #[test]
    fn unknown_shapes_yield_empty_collection() {
        let serializer = JsonSerializer::default();
        assert!(serializer.deserialize(r#"{"version":1}"#).expect("object").is_empty());
        assert!(serializer.deserialize(r#"{"highlights":"nope"}"#).expect("object").is_empty());
        assert!(serializer.deserialize("42").expect("number").is_empty());
        assert!(serializer.deserialize("null").expect("null").is_empty());
    }

    #[test]
    fn malformed_text_is_a_deserialize_error() {
        let err = JsonSerializer::default().deserialize("{not json").unwrap_err();
        assert!(matches!(err, StorageError::Deserialize(_)));
    }

    #[test]
    fn newer_envelope_is_still_read() {
        let raw = JsonSerializer::new(7).serialize(&[annotation("a", "x")]).expect("serialize");
        let loaded = JsonSerializer::new(1).deserialize(&raw).expect("deserialize");
        assert_eq!(loaded, vec![annotation("a", "x")]);
    }

    #[test]
    fn coordinates_survive_exactly() {
        let x1 = -208_585.141_167_851_86_f64;
        let rect = ScaledRect::new(x1, 0.1 + 0.2, 1.0 / 3.0, 4.0, 800.0, 1000.0);
        let mut precise = annotation("p", "x");
        precise.position = Position::new(1, rect, vec![rect]);

        let serializer = JsonSerializer::default();
        let raw = serializer.serialize(std::slice::from_ref(&precise)).expect("serialize");
        let loaded = serializer.deserialize(&raw).expect("deserialize");

        assert_eq!(loaded[0].position.bounding_rect.x1.to_bits(), x1.to_bits());
        assert_eq!(loaded, vec![precise]);
    }

    prop_compose! {
        fn arb_rect()(
            x1 in -1.0e6f64..1.0e6,
            y1 in -1.0e6f64..1.0e6,
            x2 in -1.0e6f64..1.0e6,
            y2 in -1.0e6f64..1.0e6,
            width in 0.0f64..1.0e5,
            height in 0.0f64..1.0e5,
            page_number in proptest::option::of(1u32..500),
        ) -> ScaledRect {
            ScaledRect { x1, y1, x2, y2, width, height, page_number }
        }
    }

    prop_compose! {
        fn arb_annotation()(
            id in "[a-z0-9-]{1,24}",
            bounding_rect in arb_rect(),
            rects in proptest::collection::vec(arb_rect(), 0..4),
            page_number in 1u32..500,
            use_pdf_coordinates in any::<bool>(),
            text in proptest::option::of(".{0,40}"),
            image in proptest::option::of("data:image/png;base64,[A-Za-z0-9+/]{0,16}"),
            note in ".{0,40}",
            emoji in ".{0,2}",
            color in proptest::option::of("#[0-9a-f]{6}"),
        ) -> Annotation {
            Annotation {
                id: AnnotationId::new(id),
                position: Position { bounding_rect, rects, page_number, use_pdf_coordinates },
                content: Content { text, image },
                comment: Comment { text: note, emoji, color },
            }
        }
    }

    proptest! {
        #[test]
        fn serialize_then_deserialize_preserves_collection(
            annotations in proptest::collection::vec(arb_annotation(), 0..8)
        ) {
            let serializer = JsonSerializer::default();
            let raw = serializer.serialize(&annotations).expect("serialize");
            let loaded = serializer.deserialize(&raw).expect("deserialize");
            prop_assert_eq!(loaded, annotations);
        }
    }
}
