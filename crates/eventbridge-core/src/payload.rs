//! Payload records published over the bridge.
//!
//! Only the fields the client can rely on are typed. Anything else the
//! server sends is kept in `extra` so a record can be forwarded without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A source artifact, published on config and status updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceArtifact {
    #[serde(alias = "appUuid")]
    pub app_uuid: String,
    #[serde(alias = "artifactQualifiedName")]
    pub artifact_qualified_name: String,
    #[serde(default, alias = "createDate", skip_serializing_if = "Option::is_none")]
    pub create_date: Option<Value>,
    #[serde(default, alias = "lastUpdated", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metric values computed for one artifact over a time frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetricResult {
    #[serde(alias = "appUuid")]
    pub app_uuid: String,
    #[serde(alias = "artifactQualifiedName")]
    pub artifact_qualified_name: String,
    #[serde(default, alias = "timeFrame", skip_serializing_if = "Option::is_none")]
    pub time_frame: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(alias = "artifactMetrics")]
    pub artifact_metrics: Vec<ArtifactMetrics>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One metric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetrics {
    #[serde(alias = "metricType")]
    pub metric_type: String,
    #[serde(default)]
    pub values: Vec<f64>,
}

/// Traces recorded for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactTraceResult {
    #[serde(alias = "appUuid")]
    pub app_uuid: String,
    #[serde(alias = "artifactQualifiedName")]
    pub artifact_qualified_name: String,
    #[serde(default, alias = "orderType", skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub traces: Vec<Trace>,
    #[serde(default)]
    pub total: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Absent when the trace is partial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(alias = "operationNames")]
    pub operation_names: Vec<String>,
    pub duration: i64,
    pub start: i64,
    #[serde(default, alias = "isError", alias = "error")]
    pub is_error: bool,
    #[serde(alias = "traceIds")]
    pub trace_ids: Vec<String>,
    #[serde(default, alias = "prettyDuration", skip_serializing_if = "Option::is_none")]
    pub pretty_duration: Option<String>,
    #[serde(default, alias = "isPartial", alias = "partial", skip_serializing_if = "Option::is_none")]
    pub is_partial: Option<bool>,
}

/// State of an APM integration on the server side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationInfo {
    pub id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tag selecting the decoder for a publish body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    IntegrationInfo,
    ArtifactConfig,
    ArtifactStatus,
    ArtifactMetric,
    ArtifactTrace,
}

impl PayloadKind {
    /// Decode a publish body into the record this kind carries.
    pub fn decode(self, body: Value) -> Result<Payload, serde_json::Error> {
        Ok(match self {
            PayloadKind::IntegrationInfo => Payload::IntegrationInfo(serde_json::from_value(body)?),
            PayloadKind::ArtifactConfig => Payload::ArtifactConfig(serde_json::from_value(body)?),
            PayloadKind::ArtifactStatus => Payload::ArtifactStatus(serde_json::from_value(body)?),
            PayloadKind::ArtifactMetric => Payload::ArtifactMetric(serde_json::from_value(body)?),
            PayloadKind::ArtifactTrace => Payload::ArtifactTrace(serde_json::from_value(body)?),
        })
    }
}

/// A decoded publish body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    IntegrationInfo(IntegrationInfo),
    ArtifactConfig(SourceArtifact),
    ArtifactStatus(SourceArtifact),
    ArtifactMetric(ArtifactMetricResult),
    ArtifactTrace(ArtifactTraceResult),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::IntegrationInfo(_) => PayloadKind::IntegrationInfo,
            Payload::ArtifactConfig(_) => PayloadKind::ArtifactConfig,
            Payload::ArtifactStatus(_) => PayloadKind::ArtifactStatus,
            Payload::ArtifactMetric(_) => PayloadKind::ArtifactMetric,
            Payload::ArtifactTrace(_) => PayloadKind::ArtifactTrace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_metric_result() {
        let body = json!({
            "app_uuid": "app-1",
            "artifactQualifiedName": "com.example.Foo.bar()",
            "time_frame": "LAST_5_MINUTES",
            "artifact_metrics": [
                {"metric_type": "Throughput_Average", "values": [1.0, 2.5]}
            ],
            "server_only": 42
        });
        let payload = PayloadKind::ArtifactMetric.decode(body).unwrap();
        let Payload::ArtifactMetric(result) = payload else {
            panic!("wrong payload kind");
        };
        assert_eq!(result.artifact_qualified_name, "com.example.Foo.bar()");
        assert_eq!(result.artifact_metrics[0].values, vec![1.0, 2.5]);
        assert_eq!(result.extra.get("server_only"), Some(&json!(42)));
    }

    #[test]
    fn decode_trace_aliases() {
        let body = json!({
            "app_uuid": "app-1",
            "artifact_qualified_name": "a",
            "traces": [{
                "operationNames": ["GET /"],
                "duration": 12,
                "start": 1000,
                "isError": true,
                "traceIds": ["t1"]
            }],
            "total": 1
        });
        let Payload::ArtifactTrace(result) = PayloadKind::ArtifactTrace.decode(body).unwrap()
        else {
            panic!("wrong payload kind");
        };
        assert!(result.traces[0].is_error);
        assert_eq!(result.traces[0].key, None);
    }

    #[test]
    fn config_and_status_share_record() {
        let body = json!({"app_uuid": "a", "artifact_qualified_name": "b"});
        let config = PayloadKind::ArtifactConfig.decode(body.clone()).unwrap();
        let status = PayloadKind::ArtifactStatus.decode(body).unwrap();
        assert_eq!(config.kind(), PayloadKind::ArtifactConfig);
        assert_eq!(status.kind(), PayloadKind::ArtifactStatus);
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        assert!(PayloadKind::ArtifactMetric.decode(json!({"app_uuid": 1})).is_err());
        assert!(PayloadKind::IntegrationInfo.decode(json!("nope")).is_err());
    }
}
