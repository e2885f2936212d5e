//! Initial payload read from stdin when a task starts

use ivis_ipc::LineReader;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use tokio::io::AsyncRead;

use crate::error::{TaskError, TaskResult};

/// Top-level keys the host must always send
const REQUIRED_KEYS: [&str; 4] = ["es", "params", "entities", "owned"];

/// Where the search engine listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEndpoint {
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
}

/// Everything the host hands a task at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapPayload {
    pub es: SearchEndpoint,
    pub params: JsonValue,
    pub entities: JsonValue,
    pub owned: JsonValue,
    /// State stored by an earlier run; `null` is treated as absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<JsonValue>,
}

impl BootstrapPayload {
    /// Parse and validate a bootstrap line
    pub fn parse(line: &str) -> TaskResult<Self> {
        let document: JsonValue = serde_json::from_str(line.trim_end())
            .map_err(|e| TaskError::malformed(format!("invalid JSON: {}", e)))?;

        let object = document
            .as_object()
            .ok_or_else(|| TaskError::malformed("expected a JSON object"))?;

        for key in REQUIRED_KEYS {
            if !object.contains_key(key) {
                return Err(TaskError::malformed(format!("missing required key `{}`", key)));
            }
        }

        for key in ["host", "port"] {
            if object["es"].get(key).is_none() {
                return Err(TaskError::malformed(format!("missing required key `es.{}`", key)));
            }
        }

        serde_json::from_value(document).map_err(|e| TaskError::malformed(e.to_string()))
    }
}

/// Read the bootstrap line through the reader that will later carry responses
pub async fn read_bootstrap<R>(reader: &mut LineReader<R>) -> TaskResult<BootstrapPayload>
where
    R: AsyncRead + Unpin + Send,
{
    let line = reader
        .next_line()
        .await
        .map_err(|e| TaskError::malformed(format!("unreadable bootstrap line: {}", e)))?;

    match line {
        Some(line) => BootstrapPayload::parse(&line),
        None => Err(TaskError::malformed("input closed before the bootstrap line")),
    }
}

/// Hosts send the port either as a number or as a numeric string
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port `{}`", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_line(value: JsonValue) -> String {
        format!("{}\n", value)
    }

    #[test]
    fn test_parse_full_payload() {
        let line = payload_line(json!({
            "es": {"host": "localhost", "port": 9200},
            "params": {"window": 10},
            "entities": {"signalSets": {"temp": {"index": "signal_set_1"}}},
            "owned": {"signalSets": {"derived": {}}},
            "state": {"lastTs": "2020-01-01T00:00:00Z"}
        }));

        let payload = BootstrapPayload::parse(&line).unwrap();
        assert_eq!(payload.es.host, "localhost");
        assert_eq!(payload.es.port, 9200);
        assert_eq!(payload.params, json!({"window": 10}));
        assert_eq!(payload.owned, json!({"signalSets": {"derived": {}}}));
        assert_eq!(payload.state, Some(json!({"lastTs": "2020-01-01T00:00:00Z"})));
    }

    #[test]
    fn test_state_absent_or_null() {
        let base = json!({
            "es": {"host": "es", "port": "9200"},
            "params": {}, "entities": {}, "owned": {}
        });
        let payload = BootstrapPayload::parse(&base.to_string()).unwrap();
        assert!(payload.state.is_none());
        assert_eq!(payload.es.port, 9200);

        let mut with_null = base.clone();
        with_null["state"] = JsonValue::Null;
        assert!(BootstrapPayload::parse(&with_null.to_string()).unwrap().state.is_none());
    }

    #[test]
    fn test_missing_params() {
        let line = json!({"es": {"host": "es", "port": 9200}, "entities": {}, "owned": {}});
        match BootstrapPayload::parse(&line.to_string()) {
            Err(TaskError::MalformedBootstrap { reason }) => {
                assert!(reason.contains("`params`"), "unexpected reason: {}", reason)
            }
            other => panic!("expected malformed bootstrap, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_es_port() {
        let line = json!({"es": {"host": "es"}, "params": {}, "entities": {}, "owned": {}});
        let err = BootstrapPayload::parse(&line.to_string()).unwrap_err();
        assert!(err.to_string().contains("es.port"));
    }

    #[test]
    fn test_invalid_port_and_json() {
        let line = json!({"es": {"host": "es", "port": "http"}, "params": {}, "entities": {}, "owned": {}});
        assert!(matches!(
            BootstrapPayload::parse(&line.to_string()),
            Err(TaskError::MalformedBootstrap { .. })
        ));
        assert!(matches!(
            BootstrapPayload::parse("{\"es\":"),
            Err(TaskError::MalformedBootstrap { .. })
        ));
        assert!(matches!(
            BootstrapPayload::parse("[1, 2]"),
            Err(TaskError::MalformedBootstrap { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_bootstrap_on_empty_input() {
        let mut reader = LineReader::new(&b""[..]);
        let err = read_bootstrap(&mut reader).await.unwrap_err();
        assert!(matches!(err, TaskError::MalformedBootstrap { .. }));
    }

    #[tokio::test]
    async fn test_read_bootstrap_rejects_invalid_utf8() {
        let mut reader = LineReader::new(&b"{\"es\":\xff}\n"[..]);
        let err = read_bootstrap(&mut reader).await.unwrap_err();
        assert!(matches!(err, TaskError::MalformedBootstrap { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_read_bootstrap_rejects_overlong_line() {
        let input = b"{\"es\":{\"host\":\"es\",\"port\":9200}}\n";
        let mut reader = LineReader::with_max_line_bytes(&input[..], 8);
        match read_bootstrap(&mut reader).await {
            Err(TaskError::MalformedBootstrap { reason }) => assert!(reason.contains('8'), "{}", reason),
            other => panic!("expected MalformedBootstrap, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_bootstrap_leaves_responses_buffered() {
        let input = b"{\"es\":{\"host\":\"es\",\"port\":9200},\"params\":1,\"entities\":2,\"owned\":3}\n{\"ok\":true}\n";
        let mut reader = LineReader::new(&input[..]);

        let payload = read_bootstrap(&mut reader).await.unwrap();
        assert_eq!(payload.params, json!(1));
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("{\"ok\":true}"));
    }
}
