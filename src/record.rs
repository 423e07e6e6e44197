use std::collections::BTreeMap;

use serde::{ser::Error as _, Serialize, Serializer};

use crate::Time;

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub namespace: Namespace,
    pub tags: Tags,
    pub value: MetricValue,
    /// Nanoseconds since the Unix epoch
    pub timestamp: Time,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceSegment {
    Literal(String),
    /// A placeholder filled in per instance, e.g. a device id embedded in the path
    Dynamic { name: String, value: String },
}
impl NamespaceSegment {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }
    pub fn dynamic(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Dynamic {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Text of the segment at its position in the path
    pub fn text(&self) -> &str {
        match self {
            Self::Literal(text) => text,
            Self::Dynamic { value, .. } => value,
        }
    }
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }
}

/// Immutable ordered sequence of segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    segments: Vec<NamespaceSegment>,
}
impl Namespace {
    pub const SEPARATOR: &'static str = "/";

    pub fn new(segments: Vec<NamespaceSegment>) -> Self {
        Self { segments }
    }
    pub fn from_literals<S: Into<String>>(literals: impl IntoIterator<Item = S>) -> Self {
        let segments = literals
            .into_iter()
            .map(NamespaceSegment::literal)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[NamespaceSegment] {
        &self.segments
    }
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// `(original index, name, value)` of every dynamic segment, in emission order
    pub fn dynamic_segments(&self) -> impl Iterator<Item = (usize, &str, &str)> + '_ {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, segment)| match segment {
                NamespaceSegment::Literal(_) => None,
                NamespaceSegment::Dynamic { name, value } => Some((i, name.as_str(), value.as_str())),
            })
    }

    /// Every segment rendered as text, e.g. `/intel/disk/sda/reads`
    pub fn path(&self) -> String {
        join_path(self.segments.iter().map(NamespaceSegment::text))
    }
    /// Only the literal segments, dynamic ones skipped
    pub fn literal_path(&self) -> String {
        join_path(
            self.segments
                .iter()
                .filter(|segment| !segment.is_dynamic())
                .map(NamespaceSegment::text),
        )
    }
}
impl FromIterator<NamespaceSegment> for Namespace {
    fn from_iter<T: IntoIterator<Item = NamespaceSegment>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn join_path<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    let mut path = String::new();
    for text in texts {
        path.push_str(Namespace::SEPARATOR);
        path.push_str(text);
    }
    path
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Str(String),
}
impl Serialize for MetricValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Uint(v) => serializer.serialize_u64(*v),
            Self::Float(v) => {
                // serde_json would quietly write `null` for these
                if !v.is_finite() {
                    return Err(S::Error::custom(format!("non-finite value {v}")));
                }
                serializer.serialize_f64(*v)
            }
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Str(v) => serializer.serialize_str(v),
        }
    }
}
impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}
impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}
impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let namespace: Namespace = [
            NamespaceSegment::literal("intel"),
            NamespaceSegment::dynamic("device", "sda"),
            NamespaceSegment::literal("reads"),
        ]
        .into_iter()
        .collect();
        assert_eq!(namespace.path(), "/intel/sda/reads");
        assert_eq!(namespace.literal_path(), "/intel/reads");
        let dynamic: Vec<_> = namespace.dynamic_segments().collect();
        assert_eq!(dynamic, vec![(1, "device", "sda")]);
    }

    #[test]
    fn test_empty_namespace() {
        let namespace = Namespace::default();
        assert!(namespace.is_empty());
        assert_eq!(namespace.path(), "");
    }

    #[test]
    fn test_non_finite_value_does_not_serialize() {
        assert!(serde_json::to_string(&MetricValue::Float(f64::NAN)).is_err());
        assert!(serde_json::to_string(&MetricValue::Float(f64::INFINITY)).is_err());
        assert_eq!(serde_json::to_string(&MetricValue::Float(1.5)).unwrap(), "1.5");
        assert_eq!(serde_json::to_string(&MetricValue::Int(-3)).unwrap(), "-3");
    }
}
