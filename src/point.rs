use serde::Serialize;

use crate::{
    error::PublishError,
    record::{MetricValue, Tags},
};

/// KairosDB's unit of storage. Field names are the ones `/api/v1/datapoints` expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub name: String,
    pub value: MetricValue,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub tags: Tags,
}

/// Renders the batch as a JSON array into `buf`, replacing its contents.
pub fn serialize_points(buf: &mut Vec<u8>, points: &[DataPoint]) -> Result<(), PublishError> {
    buf.clear();
    serde_json::to_writer(&mut *buf, points).map_err(PublishError::Serialization)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(name: &str, value: MetricValue) -> DataPoint {
        DataPoint {
            name: name.into(),
            value,
            timestamp: 1_700_000_000_123,
            tags: Tags::from([("hostname".to_owned(), "node-1".to_owned())]),
        }
    }

    #[test]
    fn test_batch_layout() {
        let points = [
            point("/cpu/user", MetricValue::Int(42)),
            point("/cpu/idle", MetricValue::Float(0.5)),
        ];
        let mut buf = vec![];
        serialize_points(&mut buf, &points).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {
                    "name": "/cpu/user",
                    "value": 42,
                    "timestamp": 1_700_000_000_123u64,
                    "tags": { "hostname": "node-1" },
                },
                {
                    "name": "/cpu/idle",
                    "value": 0.5,
                    "timestamp": 1_700_000_000_123u64,
                    "tags": { "hostname": "node-1" },
                },
            ])
        );
    }

    #[test]
    fn test_empty_batch() {
        let mut buf = b"stale".to_vec();
        serialize_points(&mut buf, &[]).unwrap();
        assert_eq!(buf, b"[]");
    }

    #[test]
    fn test_nan_is_an_error() {
        let points = [
            point("/ok", MetricValue::Int(1)),
            point("/bad", MetricValue::Float(f64::NAN)),
        ];
        let mut buf = vec![];
        let err = serialize_points(&mut buf, &points).unwrap_err();
        assert!(matches!(err, PublishError::Serialization(_)));
    }
}
