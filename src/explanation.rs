//! Human-readable explanations and threat indicators

use crate::types::analysis::{PredictionResult, RiskLevel};
use crate::types::connection::ConnectionRecord;

/// Explanation returned for benign predictions
pub const NO_THREAT_EXPLANATION: &str = "No threats were detected in the request.";

/// Indicator used when a threat matched none of the specific rules
pub const GENERIC_INDICATOR: &str = "Unusual traffic pattern detected by the model";

/// Destination ports of remote administration services
pub const REMOTE_ADMIN_PORTS: [i64; 3] = [22, 23, 3389];

/// Payload size above which a packet is reported as oversized
pub const LARGE_PAYLOAD_BYTES: i64 = 1000;

/// Build the explanation text and ordered indicator list for a prediction.
///
/// Threat predictions always carry at least one indicator.
pub fn explain(
    record: &ConnectionRecord,
    prediction: &PredictionResult,
    risk_level: RiskLevel,
) -> (String, Vec<String>) {
    if !prediction.is_threat() {
        return (NO_THREAT_EXPLANATION.to_string(), Vec::new());
    }

    let explanation = format!(
        "Possible {} threat detected. Model confidence: {:.1}%.",
        risk_level.as_str().to_uppercase(),
        prediction.confidence * 100.0
    );

    let mut indicators = Vec::new();

    if REMOTE_ADMIN_PORTS.contains(&record.destination_port) {
        indicators.push(format!(
            "Connection to remote administration service (port {})",
            record.destination_port
        ));
    }

    if record.flags.is_some() && record.flag("SYN") && !record.flag("ACK") {
        indicators.push("SYN packet without ACK (possible port scan)".to_string());
    }

    if let Some(size) = record.payload_size.filter(|&size| size > LARGE_PAYLOAD_BYTES) {
        indicators.push(format!("Unusually large packet size: {} bytes", size));
    }

    if indicators.is_empty() {
        indicators.push(GENERIC_INDICATOR.to_string());
    }

    (explanation, indicators)
}
