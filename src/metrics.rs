//! Scoring metrics and statistics tracking.

use crate::types::verdict::Verdict;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept for percentile calculation
const LATENCY_WINDOW: usize = 10_000;

/// Metrics collector for scoring calls
pub struct ScoringMetrics {
    /// Verdicts returned (including unavailable ones)
    verdicts: AtomicU64,
    /// Verdicts labelled fraud
    fraud_labels: AtomicU64,
    /// Verdicts whose anomaly flag was set
    anomalies: AtomicU64,
    /// Error-only verdicts
    unavailable: AtomicU64,
    /// Malformed inputs and model failures
    rejected: AtomicU64,
    /// Verdicts where both models ran
    dual_scored: AtomicU64,
    /// Dual-scored verdicts where label and anomaly flag agreed
    agreements: AtomicU64,
    /// Scoring times (in microseconds)
    latencies: RwLock<VecDeque<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            verdicts: AtomicU64::new(0),
            fraud_labels: AtomicU64::new(0),
            anomalies: AtomicU64::new(0),
            unavailable: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            dual_scored: AtomicU64::new(0),
            agreements: AtomicU64::new(0),
            latencies: RwLock::new(VecDeque::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a returned verdict
    pub fn record_verdict(&self, verdict: &Verdict, elapsed: Duration) {
        self.verdicts.fetch_add(1, Ordering::Relaxed);

        if verdict.error.is_some() {
            self.unavailable.fetch_add(1, Ordering::Relaxed);
        }
        if verdict.is_fraud() {
            self.fraud_labels.fetch_add(1, Ordering::Relaxed);
        }
        if verdict.anomaly == Some(true) {
            self.anomalies.fetch_add(1, Ordering::Relaxed);
        }
        if let (Some(label), Some(anomaly)) = (verdict.label, verdict.anomaly) {
            self.dual_scored.fetch_add(1, Ordering::Relaxed);
            if (label == 1) == anomaly {
                self.agreements.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Ok(mut times) = self.latencies.write() {
            times.push_back(elapsed.as_micros() as u64);
            if times.len() > LATENCY_WINDOW {
                times.pop_front();
            }
        }

        if let Some(p) = verdict.probability {
            let bucket = (p * 10.0).clamp(0.0, 9.0) as usize;
            if let Ok(mut buckets) = self.probability_buckets.write() {
                buckets[bucket] += 1;
            }
        }
    }

    /// Record a request that never produced a verdict
    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.iter().copied().collect();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Share of dual-scored verdicts where the classifier and detector agreed
    pub fn agreement_rate(&self) -> Option<f64> {
        let dual = self.dual_scored.load(Ordering::Relaxed);
        (dual > 0).then(|| self.agreements.load(Ordering::Relaxed) as f64 / dual as f64)
    }

    /// Verdicts per second since start
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.verdicts.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            verdicts: self.verdicts.load(Ordering::Relaxed),
            fraud_labels: self.fraud_labels.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            agreement_rate: self.agreement_rate(),
            throughput: self.throughput(),
            latency: self.latency_stats(),
            probability_distribution: self
                .probability_buckets
                .read()
                .map(|b| *b)
                .unwrap_or_default(),
        }
    }

    /// Log summary statistics
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!(
            verdicts = snapshot.verdicts,
            fraud_labels = snapshot.fraud_labels,
            anomalies = snapshot.anomalies,
            unavailable = snapshot.unavailable,
            rejected = snapshot.rejected,
            throughput = format!("{:.1} req/s", snapshot.throughput),
            mean_us = snapshot.latency.mean_us,
            p99_us = snapshot.latency.p99_us,
            agreement = ?snapshot.agreement_rate,
            "Scoring metrics summary"
        );
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoring time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Point-in-time view served by the metrics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub verdicts: u64,
    pub fraud_labels: u64,
    pub anomalies: u64,
    pub unavailable: u64,
    pub rejected: u64,
    pub agreement_rate: Option<f64>,
    pub throughput: f64,
    pub latency: LatencyStats,
    /// Counts per probability decile
    pub probability_distribution: [u64; 10],
}

/// Logs a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<ScoringMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ScoringMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.log_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::verdict::DEFAULT_FRAUD_THRESHOLD;

    #[test]
    fn test_metrics_recording() {
        let metrics = ScoringMetrics::new();

        metrics.record_verdict(
            &Verdict::classified(0.9, DEFAULT_FRAUD_THRESHOLD),
            Duration::from_micros(100),
        );
        metrics.record_verdict(
            &Verdict::classified(0.1, DEFAULT_FRAUD_THRESHOLD),
            Duration::from_micros(200),
        );
        metrics.record_verdict(&Verdict::unavailable("missing"), Duration::from_micros(5));
        metrics.record_rejection();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.verdicts, 3);
        assert_eq!(snapshot.fraud_labels, 1);
        assert_eq!(snapshot.unavailable, 1);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.probability_distribution[9], 1);
        assert_eq!(snapshot.probability_distribution[1], 1);
        assert_eq!(snapshot.latency.count, 3);
        assert_eq!(snapshot.latency.max_us, 200);
    }

    #[test]
    fn test_model_agreement() {
        let metrics = ScoringMetrics::new();
        assert_eq!(metrics.agreement_rate(), None);

        let agree = Verdict::classified(0.9, DEFAULT_FRAUD_THRESHOLD).with_anomaly(true);
        let disagree = Verdict::classified(0.2, DEFAULT_FRAUD_THRESHOLD).with_anomaly(true);
        metrics.record_verdict(&agree, Duration::from_micros(10));
        metrics.record_verdict(&disagree, Duration::from_micros(10));

        assert_eq!(metrics.agreement_rate(), Some(0.5));
        assert_eq!(metrics.snapshot().anomalies, 2);
    }

    #[test]
    fn test_probability_one_lands_in_top_bucket() {
        let metrics = ScoringMetrics::new();
        metrics.record_verdict(
            &Verdict::classified(1.0, DEFAULT_FRAUD_THRESHOLD),
            Duration::from_micros(1),
        );
        assert_eq!(metrics.snapshot().probability_distribution[9], 1);
    }
}
