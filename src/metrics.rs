//! Performance metrics and statistics tracking for the threat detection service.

use crate::models::inference::InferenceEngine;
use crate::types::analysis::{AnalysisResult, RiskLevel, THREAT};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept for percentile statistics
const LATENCY_WINDOW: usize = 10_000;

/// Metrics collector for analyzed requests
pub struct ServiceMetrics {
    /// Total requests analyzed
    pub requests_analyzed: AtomicU64,
    /// Requests predicted as threats
    pub threats_detected: AtomicU64,
    /// Requests that failed before producing a result
    pub requests_failed: AtomicU64,
    /// Analyses by risk level
    by_risk_level: RwLock<HashMap<RiskLevel, u64>>,
    /// Analysis times (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_analyzed: AtomicU64::new(0),
            threats_detected: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            by_risk_level: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a completed analysis
    pub fn record_analysis(&self, result: &AnalysisResult, elapsed: Duration) {
        self.requests_analyzed.fetch_add(1, Ordering::Relaxed);
        if result.prediction == THREAT {
            self.threats_detected.fetch_add(1, Ordering::Relaxed);
        }

        *self.by_risk_level.write().entry(result.risk_level).or_insert(0) += 1;

        let mut latencies = self.latencies.write();
        latencies.push(elapsed.as_micros() as u64);
        // Keep only the most recent window
        if latencies.len() > LATENCY_WINDOW {
            latencies.drain(0..LATENCY_WINDOW / 2);
        }
    }

    /// Record a request that produced no analysis
    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get analysis time statistics
    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted = self.latencies.read().clone();
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (requests per second)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_analyzed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get analyses by risk level
    pub fn by_risk_level(&self) -> HashMap<RiskLevel, u64> {
        self.by_risk_level.read().clone()
    }

    /// Log summary statistics
    pub fn log_summary(&self, classifier_fallbacks: u64) {
        let analyzed = self.requests_analyzed.load(Ordering::Relaxed);
        let threats = self.threats_detected.load(Ordering::Relaxed);
        let failed = self.requests_failed.load(Ordering::Relaxed);
        let threat_rate = if analyzed > 0 {
            (threats as f64 / analyzed as f64) * 100.0
        } else {
            0.0
        };
        let latency = self.latency_stats();

        info!(
            analyzed,
            threats,
            failed,
            classifier_fallbacks,
            threat_rate = format!("{:.1}%", threat_rate),
            throughput = format!("{:.1} req/s", self.throughput()),
            "Service metrics summary"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Analysis latency"
        );

        let mut levels: Vec<_> = self.by_risk_level().into_iter().collect();
        levels.sort_by_key(|(level, _)| *level);
        for (level, count) in levels {
            info!(risk_level = %level, count, "Analyses by risk level");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Analysis time statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    engine: Arc<InferenceEngine>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, engine: Arc<InferenceEngine>, interval_secs: u64) -> Self {
        Self {
            metrics,
            engine,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.log_summary(self.engine.classifier_fallbacks());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(prediction: u8, risk_level: RiskLevel) -> AnalysisResult {
        AnalysisResult {
            request_id: "req".to_string(),
            timestamp: Utc::now(),
            prediction,
            confidence: 0.9,
            risk_level,
            explanation: String::new(),
            indicators: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_analysis(&result(1, RiskLevel::Critical), Duration::from_micros(100));
        metrics.record_analysis(&result(0, RiskLevel::Low), Duration::from_micros(200));
        metrics.record_failure();

        assert_eq!(metrics.requests_analyzed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.threats_detected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_failed.load(Ordering::Relaxed), 1);

        let levels = metrics.by_risk_level();
        assert_eq!(levels.get(&RiskLevel::Critical), Some(&1));
        assert_eq!(levels.get(&RiskLevel::Low), Some(&1));
    }

    #[test]
    fn test_latency_stats() {
        let metrics = ServiceMetrics::new();
        for us in 1..=100 {
            metrics.record_analysis(&result(0, RiskLevel::Low), Duration::from_micros(us));
        }

        let stats = metrics.latency_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.max_us, 100);
        assert_eq!(stats.p50_us, 51);
        assert_eq!(stats.p99_us, 100);
    }

    #[test]
    fn test_empty_latency_stats() {
        let stats = ServiceMetrics::new().latency_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.max_us, 0);
    }
}
