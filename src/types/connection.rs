//! Connection record data structures received from callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;

/// Network protocol of the analyzed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Other,
}

impl Protocol {
    /// Numeric code used in the feature vector
    pub fn code(self) -> u8 {
        match self {
            Protocol::Tcp => 0,
            Protocol::Udp => 1,
            Protocol::Icmp => 2,
            Protocol::Other => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Other => "other",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a single network connection to be classified
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Caller-supplied request identifier (filled in by the API layer when empty)
    #[serde(default)]
    pub request_id: String,

    /// Source IP address
    pub source_ip: String,

    /// Source port
    #[serde(default)]
    pub source_port: Option<i64>,

    /// Destination IP address
    pub destination_ip: String,

    /// Destination port
    pub destination_port: i64,

    /// Transport protocol
    pub protocol: Protocol,

    /// Connection timestamp, defaults to the time of receipt
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Payload size in bytes
    #[serde(default)]
    pub payload_size: Option<i64>,

    /// Protocol flags (SYN, ACK, FIN, RST, PSH, URG)
    #[serde(default)]
    pub flags: Option<HashMap<String, bool>>,

    /// Opaque caller metadata, never interpreted
    #[serde(default)]
    pub additional_metadata: Option<HashMap<String, serde_json::Value>>,
}

impl ConnectionRecord {
    /// Create a record with the required fields and no optional data
    pub fn new(
        request_id: impl Into<String>,
        source_ip: impl Into<String>,
        destination_ip: impl Into<String>,
        destination_port: i64,
        protocol: Protocol,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            source_ip: source_ip.into(),
            source_port: None,
            destination_ip: destination_ip.into(),
            destination_port,
            protocol,
            timestamp: Utc::now(),
            payload_size: None,
            flags: None,
            additional_metadata: None,
        }
    }

    pub fn with_source_port(mut self, port: i64) -> Self {
        self.source_port = Some(port);
        self
    }

    pub fn with_payload_size(mut self, size: i64) -> Self {
        self.payload_size = Some(size);
        self
    }

    /// Attach protocol flags given as `(name, value)` pairs
    pub fn with_flags<'a, I>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        self.flags = Some(
            flags
                .into_iter()
                .map(|(name, set)| (name.to_string(), set))
                .collect(),
        );
        self
    }

    /// JSON schema of the accepted wire format
    pub fn schema() -> serde_json::Value {
        json!({
            "title": "ConnectionRecord",
            "type": "object",
            "properties": {
                "request_id": {"type": "string"},
                "source_ip": {"type": "string"},
                "source_port": {"type": ["integer", "null"]},
                "destination_ip": {"type": "string"},
                "destination_port": {"type": "integer"},
                "protocol": {"type": "string", "enum": ["tcp", "udp", "icmp", "other"]},
                "timestamp": {"type": "string", "format": "date-time"},
                "payload_size": {"type": ["integer", "null"]},
                "flags": {
                    "type": ["object", "null"],
                    "additionalProperties": {"type": "boolean"}
                },
                "additional_metadata": {"type": ["object", "null"]}
            },
            "required": ["source_ip", "destination_ip", "destination_port", "protocol"]
        })
    }

    /// Look up a flag, treating an absent flags map or key as unset
    pub fn flag(&self, name: &str) -> bool {
        self.flags
            .as_ref()
            .and_then(|flags| flags.get(name).copied())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserialization_defaults() {
        let json = r#"{
            "request_id": "req_123456789",
            "source_ip": "192.168.1.100",
            "destination_ip": "10.0.0.1",
            "destination_port": 22,
            "protocol": "tcp"
        }"#;

        let record: ConnectionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.request_id, "req_123456789");
        assert_eq!(record.protocol, Protocol::Tcp);
        assert!(record.source_port.is_none());
        assert!(record.payload_size.is_none());
        assert!(record.flags.is_none());
    }

    #[test]
    fn test_full_record_deserialization() {
        let json = r#"{
            "request_id": "req_1",
            "source_ip": "192.168.1.100",
            "source_port": 54321,
            "destination_ip": "10.0.0.1",
            "destination_port": 22,
            "protocol": "tcp",
            "timestamp": "2025-08-10T11:05:00Z",
            "payload_size": 128,
            "flags": {"SYN": true, "ACK": false},
            "additional_metadata": {"service": "ssh", "ttl": 64}
        }"#;

        let record: ConnectionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.source_port, Some(54321));
        assert_eq!(record.payload_size, Some(128));
        assert!(record.flag("SYN"));
        assert!(!record.flag("ACK"));
        assert!(!record.flag("FIN"));
        assert_eq!(record.timestamp.to_rfc3339(), "2025-08-10T11:05:00+00:00");
        assert_eq!(
            record.additional_metadata.unwrap().get("ttl"),
            Some(&serde_json::json!(64))
        );
    }

    #[test]
    fn test_unknown_protocol_rejected() {
        let json = r#"{
            "source_ip": "1.1.1.1",
            "destination_ip": "2.2.2.2",
            "destination_port": 80,
            "protocol": "sctp"
        }"#;

        assert!(serde_json::from_str::<ConnectionRecord>(json).is_err());
    }

    #[test]
    fn test_missing_destination_port_rejected() {
        let json = r#"{
            "source_ip": "1.1.1.1",
            "destination_ip": "2.2.2.2",
            "protocol": "udp"
        }"#;

        assert!(serde_json::from_str::<ConnectionRecord>(json).is_err());
    }

    #[test]
    fn test_protocol_codes() {
        assert_eq!(Protocol::Tcp.code(), 0);
        assert_eq!(Protocol::Udp.code(), 1);
        assert_eq!(Protocol::Icmp.code(), 2);
        assert_eq!(Protocol::Other.code(), 3);
    }
}
