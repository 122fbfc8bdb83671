//! Point construction and payload conversion for the vector store.
//!
//! String ids are hashed to a stable 32-bit nonnegative integer; the original
//! id always travels in the payload under `_id` and is the canonical
//! reference. Hash collisions are tolerated because the payload carries the
//! canonical id.

use crate::models::BackendKind;
use qdrant_client::qdrant::{
    ListValue, PointId, PointStruct, Value as QValue, Vector, Vectors, point_id, value, vectors,
};
use serde_json::Value as J;
use std::collections::HashMap;

/// One chunk headed for a collection.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    /// Canonical string id (e.g. `"src/a.ts:3-9"`).
    pub id: String,
    pub vector: Vec<f32>,
    /// Flat JSON object; must include `file` and `language`.
    pub payload: J,
}

/// Stable 32-bit nonnegative sum-hash of a string id.
pub fn sum_hash(id: &str) -> u32 {
    let mut hash: u32 = 0;
    for b in id.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(b as u32);
    }
    hash & 0x7fff_ffff
}

/// Provider-appropriate partition size for one embedding request.
pub fn embed_partition_size(backend: BackendKind) -> usize {
    backend.batch_size().max(1)
}

/// Build the protobuf `PointStruct`, injecting `_id` into the payload.
pub fn to_point_struct(point: VectorPoint) -> PointStruct {
    let mut payload: HashMap<String, QValue> = HashMap::new();
    if let J::Object(map) = point.payload {
        for (k, v) in map {
            payload.insert(k, json_to_qvalue(v));
        }
    }
    payload.insert("_id".into(), json_to_qvalue(J::String(point.id.clone())));

    let vectors = Vectors {
        vectors_options: Some(vectors::VectorsOptions::Vector(Vector {
            data: point.vector,
            ..Default::default()
        })),
    };

    PointStruct {
        id: Some(PointId {
            point_id_options: Some(point_id::PointIdOptions::Num(sum_hash(&point.id) as u64)),
        }),
        payload,
        vectors: Some(vectors),
        ..Default::default()
    }
}

/// Converts `serde_json::Value` into `qdrant::Value`.
///
/// Scalars map directly; arrays of scalars become lists; nested objects are
/// stringified for safety.
pub fn json_to_qvalue(v: J) -> QValue {
    use value::Kind as K;

    match v {
        J::String(s) => QValue {
            kind: Some(K::StringValue(s)),
        },
        J::Number(n) => {
            if let Some(i) = n.as_i64() {
                QValue {
                    kind: Some(K::IntegerValue(i)),
                }
            } else if let Some(f) = n.as_f64() {
                QValue {
                    kind: Some(K::DoubleValue(f)),
                }
            } else {
                QValue {
                    kind: Some(K::StringValue(n.to_string())),
                }
            }
        }
        J::Bool(b) => QValue {
            kind: Some(K::BoolValue(b)),
        },
        J::Array(items) => QValue {
            kind: Some(K::ListValue(ListValue {
                values: items.into_iter().map(json_to_qvalue).collect(),
            })),
        },
        other => QValue {
            kind: Some(K::StringValue(other.to_string())),
        },
    }
}

/// Converts a Qdrant payload map into JSON.
pub fn qpayload_to_json(mut p: HashMap<String, QValue>) -> J {
    let mut m = serde_json::Map::new();
    for (k, v) in p.drain() {
        m.insert(k, qvalue_to_json(v));
    }
    J::Object(m)
}

fn qvalue_to_json(v: QValue) -> J {
    use value::Kind as K;
    match v.kind {
        Some(K::StringValue(s)) => J::String(s),
        Some(K::IntegerValue(i)) => J::Number(i.into()),
        Some(K::DoubleValue(f)) => serde_json::json!(f),
        Some(K::BoolValue(b)) => J::Bool(b),
        Some(K::ListValue(list)) => J::Array(list.values.into_iter().map(qvalue_to_json).collect()),
        _ => J::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_hash_is_stable_and_nonnegative() {
        let a = sum_hash("src/a.ts:1-10");
        let b = sum_hash("src/a.ts:1-10");
        assert_eq!(a, b);
        assert!(a <= i32::MAX as u32);
        assert_ne!(sum_hash("x"), sum_hash("y"));
    }

    #[test]
    fn point_payload_carries_canonical_id() {
        let point = VectorPoint {
            id: "src/a.ts:1-2".into(),
            vector: vec![0.1, 0.2],
            payload: serde_json::json!({"file": "src/a.ts", "language": "typescript"}),
        };
        let ps = to_point_struct(point);
        let id_value = ps.payload.get("_id").unwrap();
        assert!(matches!(
            &id_value.kind,
            Some(value::Kind::StringValue(s)) if s == "src/a.ts:1-2"
        ));
    }

    #[test]
    fn payload_round_trips_scalars_and_lists() {
        let original = serde_json::json!({
            "file": "a.ts",
            "line": 3,
            "score": 0.5,
            "flagged": true,
            "symbols": ["a", "b"],
        });
        let point = VectorPoint {
            id: "id".into(),
            vector: vec![],
            payload: original.clone(),
        };
        let ps = to_point_struct(point);
        let back = qpayload_to_json(ps.payload);
        for key in ["file", "line", "score", "flagged", "symbols"] {
            assert_eq!(back[key], original[key], "key {key}");
        }
    }
}
