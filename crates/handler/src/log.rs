use std::sync::{Arc, Mutex};

use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogAction {
    Start,
    End,
    Error,
    /// One field resolved by a registered resolver.
    Resolve,
}

/// One structured log record. Every record of a request carries the same `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub id: String,
    pub action: LogAction,
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_user: Option<String>,
    #[serde(rename = "r-uuid", skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_service_user: Option<String>,
}

/// What the transport knows about the caller, copied into every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMeta {
    pub remote_addr: Option<String>,
    pub auth_user: Option<String>,
    pub correlation_id: Option<String>,
    pub foreign_service_user: Option<String>,
}

pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord);
}

#[derive(Serialize)]
struct LogEnvelope<'a> {
    message: &'a LogRecord,
    level: u16,
    level_name: &'static str,
    channel: &'a str,
    datetime: String,
}

/// Writes each record as one JSON line through `tracing`.
#[derive(Debug, Clone)]
pub struct TracingSink {
    channel: String,
}

impl TracingSink {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        let (level, level_name) = match record.action {
            LogAction::Error => (400, "ERROR"),
            _ => (200, "INFO"),
        };
        let envelope = LogEnvelope {
            message: record,
            level,
            level_name,
            channel: &self.channel,
            datetime: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let line = match serde_json::to_string(&envelope) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize log record.");
                return;
            },
        };
        match record.action {
            LogAction::Error => tracing::error!(target: "rolegate::request", channel = %self.channel, "{line}"),
            _ => tracing::info!(target: "rolegate::request", channel = %self.channel, "{line}"),
        }
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

/// Logging state of one request: its id, the transport metadata and the sink.
pub struct RequestScope {
    id: String,
    meta: TransportMeta,
    sink: Arc<dyn LogSink>,
}

impl RequestScope {
    pub fn new(meta: TransportMeta, sink: Arc<dyn LogSink>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            meta,
            sink,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// An empty record of `action`, decorated with the id and transport metadata.
    pub fn record(&self, action: LogAction) -> LogRecord {
        LogRecord {
            id: self.id.clone(),
            action,
            query: None,
            variables: None,
            execute_time: None,
            result: None,
            error: None,
            trace: None,
            remote_addr: self.meta.remote_addr.clone(),
            auth_user: self.meta.auth_user.clone(),
            correlation_id: self.meta.correlation_id.clone(),
            foreign_service_user: self.meta.foreign_service_user.clone(),
        }
    }

    #[inline]
    pub fn emit(&self, record: LogRecord) {
        self.sink.emit(&record);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn record_uses_wire_names() {
        let scope = RequestScope::new(
            TransportMeta {
                remote_addr: Some("10.0.0.1:5000".to_string()),
                auth_user: None,
                correlation_id: Some("abc".to_string()),
                foreign_service_user: Some("billing".to_string()),
            },
            Arc::new(MemorySink::default()),
        );
        let mut record = scope.record(LogAction::Resolve);
        record.execute_time = Some(0.5);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "id": scope.id(),
                "action": "resolve",
                "query": null,
                "execute_time": 0.5,
                "remote_addr": "10.0.0.1:5000",
                "r-uuid": "abc",
                "foreign_service_user": "billing",
            })
        );
    }

    #[test]
    fn every_scope_has_its_own_id() {
        let sink: Arc<dyn LogSink> = Arc::new(MemorySink::default());
        let a = RequestScope::new(TransportMeta::default(), sink.clone());
        let b = RequestScope::new(TransportMeta::default(), sink);
        assert_ne!(a.id(), b.id());
    }
}
