//! Builders converting high-level payload filters into Qdrant filters.
//!
//! qdrant-client 1.15 specifics:
//! - `Condition` is a wrapper with `condition_one_of: Option<condition::ConditionOneOf>`.
//! - `FieldCondition.r#match` expects a `Match` wrapping `r#match::MatchValue`.
//! - Floats are not supported by `MatchValue`; use `Range { gte, lte }`.

use qdrant_client::qdrant::{
    Condition, FieldCondition, Filter, Match, Range, condition, r#match::MatchValue,
};
use serde_json::Value as J;

/// High-level payload filter passed through search and delete operations.
#[derive(Debug, Clone)]
pub enum PayloadFilter {
    /// Exact match on the `file` payload field.
    ByFile(String),
    FieldEq { key: String, value: J },
    And(Vec<PayloadFilter>),
    Or(Vec<PayloadFilter>),
}

pub fn to_qdrant_filter(f: &PayloadFilter) -> Filter {
    match f {
        PayloadFilter::ByFile(path) => Filter {
            must: vec![condition_field_eq("file", &J::String(path.clone()))],
            ..Default::default()
        },

        PayloadFilter::FieldEq { key, value } => Filter {
            must: vec![condition_field_eq(key, value)],
            ..Default::default()
        },

        PayloadFilter::And(list) => {
            let mut out = Filter::default();
            for sub in list {
                let sf = to_qdrant_filter(sub);
                out.must.extend(sf.must);
                out.should.extend(sf.should);
                out.must_not.extend(sf.must_not);
            }
            out
        }

        PayloadFilter::Or(list) => {
            let mut out = Filter::default();
            for sub in list {
                let sf = to_qdrant_filter(sub);
                out.should.push(Condition {
                    condition_one_of: Some(condition::ConditionOneOf::Filter(sf)),
                });
            }
            out
        }
    }
}

/// Single equality-like condition; float equality becomes a narrow range.
fn condition_field_eq(key: impl Into<String>, value: &J) -> Condition {
    let key = key.into();

    let field = match value {
        J::String(s) => FieldCondition {
            key,
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(s.clone())),
            }),
            ..Default::default()
        },

        J::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldCondition {
                    key,
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Integer(i)),
                    }),
                    ..Default::default()
                }
            } else if let Some(f) = n.as_f64() {
                FieldCondition {
                    key,
                    range: Some(Range {
                        gte: Some(f),
                        lte: Some(f),
                        ..Default::default()
                    }),
                    ..Default::default()
                }
            } else {
                FieldCondition {
                    key,
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(n.to_string())),
                    }),
                    ..Default::default()
                }
            }
        }

        J::Bool(b) => FieldCondition {
            key,
            r#match: Some(Match {
                match_value: Some(MatchValue::Boolean(*b)),
            }),
            ..Default::default()
        },

        other => FieldCondition {
            key,
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(other.to_string())),
            }),
            ..Default::default()
        },
    };

    Condition {
        condition_one_of: Some(condition::ConditionOneOf::Field(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_file_builds_one_must_condition() {
        let filter = to_qdrant_filter(&PayloadFilter::ByFile("src/a.ts".into()));
        assert_eq!(filter.must.len(), 1);
        assert!(filter.should.is_empty());
    }

    #[test]
    fn and_flattens_or_nests() {
        let f = PayloadFilter::And(vec![
            PayloadFilter::ByFile("a.ts".into()),
            PayloadFilter::FieldEq {
                key: "language".into(),
                value: J::String("typescript".into()),
            },
        ]);
        assert_eq!(to_qdrant_filter(&f).must.len(), 2);

        let f = PayloadFilter::Or(vec![
            PayloadFilter::ByFile("a.ts".into()),
            PayloadFilter::ByFile("b.ts".into()),
        ]);
        assert_eq!(to_qdrant_filter(&f).should.len(), 2);
    }
}
