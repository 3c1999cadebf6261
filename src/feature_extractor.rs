//! Feature extraction for connection threat classification.
//!
//! This module turns connection records into the numeric layout the
//! classifier was fit on.

use crate::types::connection::ConnectionRecord;

/// Ordered numeric input for the classifier
pub type FeatureVector = Vec<f32>;

/// Protocol flags encoded in the feature vector, in slot order
pub const FLAG_NAMES: [&str; 6] = ["SYN", "ACK", "FIN", "RST", "PSH", "URG"];

/// Number of features extracted when no flags are supplied
pub const BASE_FEATURE_COUNT: usize = 4;

/// Number of features extracted when a flags map is supplied
pub const FULL_FEATURE_COUNT: usize = BASE_FEATURE_COUNT + FLAG_NAMES.len();

/// Feature extractor that transforms connection records into model input features.
///
/// Missing source port and payload size are encoded as 0, matching the
/// convention the model was trained on.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a connection record.
    ///
    /// Returns 4 features, or 10 when the record carries a flags map. Flag
    /// names outside [`FLAG_NAMES`] are ignored.
    pub fn extract(&self, record: &ConnectionRecord) -> FeatureVector {
        let mut features = Vec::with_capacity(FULL_FEATURE_COUNT);

        features.push(record.source_port.unwrap_or(0) as f32);
        features.push(record.destination_port as f32);
        features.push(record.protocol.code() as f32);
        features.push(record.payload_size.unwrap_or(0) as f32);

        if record.flags.is_some() {
            for name in FLAG_NAMES {
                features.push(if record.flag(name) { 1.0 } else { 0.0 });
            }
        }

        features
    }

    /// Get the number of features produced for a record.
    pub fn feature_count(&self, record: &ConnectionRecord) -> usize {
        if record.flags.is_some() {
            FULL_FEATURE_COUNT
        } else {
            BASE_FEATURE_COUNT
        }
    }

    /// Get feature names in slot order (full layout).
    pub fn feature_names(&self) -> Vec<&'static str> {
        let mut names = vec![
            "source_port",
            "destination_port",
            "protocol",
            "payload_size",
        ];
        names.extend(FLAG_NAMES);
        names
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::connection::Protocol;

    fn record(protocol: Protocol) -> ConnectionRecord {
        ConnectionRecord::new("req_1", "192.168.1.100", "10.0.0.1", 443, protocol)
    }

    #[test]
    fn test_extraction_without_flags() {
        let extractor = FeatureExtractor::new();
        let rec = record(Protocol::Udp).with_source_port(5353);

        let features = extractor.extract(&rec);

        assert_eq!(features, vec![5353.0, 443.0, 1.0, 0.0]);
        assert_eq!(features.len(), extractor.feature_count(&rec));
    }

    #[test]
    fn test_extraction_with_flags() {
        let extractor = FeatureExtractor::new();
        let rec = record(Protocol::Tcp)
            .with_payload_size(128)
            .with_flags([("SYN", true), ("ACK", false), ("PSH", true)]);

        let features = extractor.extract(&rec);

        assert_eq!(features.len(), FULL_FEATURE_COUNT);
        assert_eq!(
            features,
            vec![0.0, 443.0, 0.0, 128.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_empty_flags_map_still_adds_slots() {
        let extractor = FeatureExtractor::new();
        let rec = record(Protocol::Icmp).with_flags(Vec::<(&str, bool)>::new());

        let features = extractor.extract(&rec);

        assert_eq!(features.len(), 10);
        assert!(features[4..].iter().all(|&f| f == 0.0));
        assert_eq!(features[2], 2.0);
    }

    #[test]
    fn test_unknown_flags_are_dropped() {
        let extractor = FeatureExtractor::new();
        let rec = record(Protocol::Other).with_flags([("ECE", true), ("syn", true)]);

        let features = extractor.extract(&rec);

        assert_eq!(features.len(), 10);
        assert_eq!(features[2], 3.0);
        assert!(features[4..].iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_negative_values_pass_through() {
        let extractor = FeatureExtractor::new();
        let rec = ConnectionRecord::new("req_1", "a", "b", -1, Protocol::Tcp)
            .with_source_port(-5)
            .with_payload_size(-10);

        assert_eq!(extractor.extract(&rec), vec![-5.0, -1.0, 0.0, -10.0]);
    }

    #[test]
    fn test_length_is_four_or_ten() {
        let extractor = FeatureExtractor::new();
        for protocol in [Protocol::Tcp, Protocol::Udp, Protocol::Icmp, Protocol::Other] {
            let plain = record(protocol);
            let flagged = record(protocol).with_flags([("RST", true)]);
            assert_eq!(extractor.extract(&plain).len(), BASE_FEATURE_COUNT);
            assert_eq!(extractor.extract(&flagged).len(), FULL_FEATURE_COUNT);
        }
    }

    #[test]
    fn test_feature_names() {
        let extractor = FeatureExtractor::new();
        let names = extractor.feature_names();
        assert_eq!(names.len(), FULL_FEATURE_COUNT);
        assert_eq!(names[4], "SYN");
        assert_eq!(names[9], "URG");
    }
}
