use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::domain::model::{CheckSummary, IterationOutcome, LatencySummary, RunSummary};

// 1µs 到 1h,三位有效數字
const HISTOGRAM_LOW_US: u64 = 1;
const HISTOGRAM_HIGH_US: u64 = 3_600_000_000;
const HISTOGRAM_SIGFIG: u8 = 3;

#[derive(Debug, Default)]
struct CheckCounter {
    passes: AtomicU64,
    fails: AtomicU64,
}

impl CheckCounter {
    fn bump(&self, passed: bool) {
        if passed {
            self.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fails.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// 跨所有虛擬使用者共用的彙總計數。工作者只做原子遞增,不持鎖做 IO
pub struct RunMetrics {
    iterations: AtomicU64,
    http_reqs: AtomicU64,
    http_req_failed: AtomicU64,
    latency_us: RwLock<Histogram<u64>>,
    checks: RwLock<HashMap<String, CheckCounter>>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            iterations: AtomicU64::new(0),
            http_reqs: AtomicU64::new(0),
            http_req_failed: AtomicU64::new(0),
            latency_us: RwLock::new(
                Histogram::new_with_bounds(HISTOGRAM_LOW_US, HISTOGRAM_HIGH_US, HISTOGRAM_SIGFIG)
                    .expect("static histogram bounds"),
            ),
            checks: RwLock::new(HashMap::new()),
        }
    }

    pub fn record(&self, outcome: &IterationOutcome) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        self.http_reqs.fetch_add(1, Ordering::Relaxed);
        if outcome.failed {
            self.http_req_failed.fetch_add(1, Ordering::Relaxed);
        }

        let latency_us = u64::try_from(outcome.duration.as_micros())
            .unwrap_or(HISTOGRAM_HIGH_US)
            .clamp(HISTOGRAM_LOW_US, HISTOGRAM_HIGH_US);
        if let Err(e) = self.latency_us.write().record(latency_us) {
            tracing::warn!("Failed to record latency sample: {}", e);
        }

        for check in &outcome.checks {
            // 檢查名稱集合很小且幾乎不變,先走讀鎖
            let seen = {
                let map = self.checks.read();
                if let Some(counter) = map.get(check.name.as_str()) {
                    counter.bump(check.passed);
                    true
                } else {
                    false
                }
            };

            if !seen {
                let mut map = self.checks.write();
                map.entry(check.name.clone())
                    .or_default()
                    .bump(check.passed);
            }
        }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn http_reqs(&self) -> u64 {
        self.http_reqs.load(Ordering::Relaxed)
    }

    pub fn http_req_failed(&self) -> u64 {
        self.http_req_failed.load(Ordering::Relaxed)
    }

    pub fn failed_rate(&self) -> f64 {
        let total = self.http_reqs();
        if total > 0 {
            self.http_req_failed() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// 所有具名檢查合併後的通過率
    pub fn check_rate(&self) -> f64 {
        let map = self.checks.read();
        let mut passes = 0u64;
        let mut total = 0u64;
        for counter in map.values() {
            let p = counter.passes.load(Ordering::Relaxed);
            let f = counter.fails.load(Ordering::Relaxed);
            passes += p;
            total += p + f;
        }
        if total > 0 {
            passes as f64 / total as f64
        } else {
            0.0
        }
    }

    /// 延遲分位數,單位毫秒。quantile 介於 0.0 與 1.0
    pub fn latency_quantile_ms(&self, quantile: f64) -> f64 {
        self.latency_us.read().value_at_quantile(quantile) as f64 / 1000.0
    }

    pub fn latency_mean_ms(&self) -> f64 {
        self.latency_us.read().mean() / 1000.0
    }

    pub fn latency_min_ms(&self) -> f64 {
        self.latency_us.read().min() as f64 / 1000.0
    }

    pub fn latency_max_ms(&self) -> f64 {
        self.latency_us.read().max() as f64 / 1000.0
    }

    pub fn summary(
        &self,
        started_at: chrono::DateTime<chrono::Utc>,
        elapsed: Duration,
    ) -> RunSummary {
        let duration_secs = elapsed.as_secs_f64();
        let total = self.http_reqs();

        let latency = {
            let hist = self.latency_us.read();
            let to_ms = |us: u64| us as f64 / 1000.0;
            LatencySummary {
                min_ms: to_ms(hist.min()),
                avg_ms: hist.mean() / 1000.0,
                med_ms: to_ms(hist.value_at_quantile(0.50)),
                p90_ms: to_ms(hist.value_at_quantile(0.90)),
                p95_ms: to_ms(hist.value_at_quantile(0.95)),
                p99_ms: to_ms(hist.value_at_quantile(0.99)),
                max_ms: to_ms(hist.max()),
            }
        };

        let mut checks: Vec<CheckSummary> = {
            let map = self.checks.read();
            map.iter()
                .map(|(name, counter)| {
                    let passes = counter.passes.load(Ordering::Relaxed);
                    let fails = counter.fails.load(Ordering::Relaxed);
                    let total = passes + fails;
                    CheckSummary {
                        name: name.clone(),
                        passes,
                        fails,
                        rate: if total > 0 {
                            passes as f64 / total as f64
                        } else {
                            0.0
                        },
                    }
                })
                .collect()
        };
        checks.sort_by(|a, b| a.name.cmp(&b.name));

        RunSummary {
            started_at,
            finished_at: chrono::Utc::now(),
            duration_secs,
            iterations: self.iterations(),
            http_reqs: total,
            http_req_failed: self.http_req_failed(),
            avg_rps: if duration_secs > 0.0 {
                total as f64 / duration_secs
            } else {
                0.0
            },
            latency,
            checks,
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CheckResult;

    fn outcome(ms: u64, failed: bool, check_passed: bool) -> IterationOutcome {
        IterationOutcome {
            duration: Duration::from_millis(ms),
            failed,
            checks: vec![CheckResult::new("status is 200", check_passed)],
        }
    }

    #[test]
    fn test_record_counts_requests_and_failures() {
        let metrics = RunMetrics::new();
        metrics.record(&outcome(10, false, true));
        metrics.record(&outcome(20, false, true));
        metrics.record(&outcome(30, true, false));

        assert_eq!(metrics.iterations(), 3);
        assert_eq!(metrics.http_reqs(), 3);
        assert_eq!(metrics.http_req_failed(), 1);
        assert!((metrics.failed_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_check_aggregation() {
        let metrics = RunMetrics::new();
        for _ in 0..8 {
            metrics.record(&outcome(5, false, true));
        }
        for _ in 0..2 {
            metrics.record(&outcome(5, false, false));
        }

        assert!((metrics.check_rate() - 0.8).abs() < 1e-9);

        let summary = metrics.summary(chrono::Utc::now(), Duration::from_secs(1));
        assert_eq!(summary.checks.len(), 1);
        assert_eq!(summary.checks[0].name, "status is 200");
        assert_eq!(summary.checks[0].passes, 8);
        assert_eq!(summary.checks[0].fails, 2);
        assert!((summary.checks[0].rate - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_latency_quantiles_in_ms() {
        let metrics = RunMetrics::new();
        for _ in 0..100 {
            metrics.record(&outcome(10, false, true));
        }

        // 所有樣本都是 10ms,任何分位數都應該落在附近 (histogram 有 0.1% 精度)
        let p99 = metrics.latency_quantile_ms(0.99);
        assert!((9.0..11.0).contains(&p99), "p99 was {}", p99);
        assert!((9.0..11.0).contains(&metrics.latency_mean_ms()));
    }

    #[test]
    fn test_empty_metrics_summary_is_sane() {
        let metrics = RunMetrics::new();
        let summary = metrics.summary(chrono::Utc::now(), Duration::ZERO);

        assert_eq!(summary.http_reqs, 0);
        assert_eq!(summary.avg_rps, 0.0);
        assert_eq!(summary.latency.p99_ms, 0.0);
        assert!(summary.checks.is_empty());
        assert_eq!(metrics.check_rate(), 0.0);
        assert_eq!(metrics.failed_rate(), 0.0);
    }

    #[test]
    fn test_sub_microsecond_latency_is_clamped() {
        let metrics = RunMetrics::new();
        metrics.record(&IterationOutcome {
            duration: Duration::ZERO,
            failed: true,
            checks: vec![],
        });

        assert_eq!(metrics.http_reqs(), 1);
        assert!(metrics.latency_min_ms() > 0.0);
    }
}
