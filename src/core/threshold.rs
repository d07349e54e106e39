use regex::Regex;

use crate::core::metrics::RunMetrics;
use crate::domain::model::{ThresholdResult, ThresholdSpec};
use crate::utils::error::{LoadError, Result};
use crate::utils::validation::validate_range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricKey {
    HttpReqDuration,
    HttpReqFailed,
    HttpReqs,
    Iterations,
    Checks,
}

impl MetricKey {
    fn parse(metric: &str) -> Result<Self> {
        match metric {
            "http_req_duration" => Ok(MetricKey::HttpReqDuration),
            "http_req_failed" => Ok(MetricKey::HttpReqFailed),
            "http_reqs" => Ok(MetricKey::HttpReqs),
            "iterations" => Ok(MetricKey::Iterations),
            "checks" => Ok(MetricKey::Checks),
            other => Err(LoadError::InvalidConfigValueError {
                field: "thresholds".to_string(),
                value: other.to_string(),
                reason: "Unknown metric; expected one of http_req_duration, http_req_failed, \
                         http_reqs, iterations, checks"
                    .to_string(),
            }),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            MetricKey::HttpReqDuration => "http_req_duration",
            MetricKey::HttpReqFailed => "http_req_failed",
            MetricKey::HttpReqs => "http_reqs",
            MetricKey::Iterations => "iterations",
            MetricKey::Checks => "checks",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Aggregator {
    Percentile(f64),
    Avg,
    Min,
    Max,
    Med,
    Rate,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    fn holds(self, actual: f64, bound: f64) -> bool {
        match self {
            Comparator::Lt => actual < bound,
            Comparator::Le => actual <= bound,
            Comparator::Gt => actual > bound,
            Comparator::Ge => actual >= bound,
        }
    }
}

/// 跑完之後對彙總指標做的宣告式判斷,例如 http_req_duration 的 "p(99)<1500"。
/// 時間門檻的單位是毫秒,rate 門檻是 0.0 到 1.0 的比例
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    metric: MetricKey,
    expression: String,
    aggregator: Aggregator,
    comparator: Comparator,
    bound: f64,
}

impl Threshold {
    pub fn parse(metric: &str, expression: &str) -> Result<Self> {
        let metric = MetricKey::parse(metric)?;

        let re = Regex::new(
            r"^\s*(?:p\((\d+(?:\.\d+)?)\)|(avg|min|max|med|rate|count))\s*(<=|>=|<|>)\s*(\d+(?:\.\d+)?)\s*$",
        )
        .unwrap();

        let invalid = |reason: &str| LoadError::InvalidConfigValueError {
            field: format!("thresholds.{}", metric.as_str()),
            value: expression.to_string(),
            reason: reason.to_string(),
        };

        let captures = re.captures(expression).ok_or_else(|| {
            invalid("Expected '<aggregator><comparator><number>', e.g. 'p(99)<1500'")
        })?;

        let aggregator = if let Some(percentile) = captures.get(1) {
            let p: f64 = percentile
                .as_str()
                .parse()
                .map_err(|_| invalid("Invalid percentile"))?;
            validate_range("thresholds percentile", p, 0.0, 100.0)?;
            Aggregator::Percentile(p)
        } else {
            match captures.get(2).map(|m| m.as_str()) {
                Some("avg") => Aggregator::Avg,
                Some("min") => Aggregator::Min,
                Some("max") => Aggregator::Max,
                Some("med") => Aggregator::Med,
                Some("rate") => Aggregator::Rate,
                Some("count") => Aggregator::Count,
                _ => return Err(invalid("Unknown aggregator")),
            }
        };

        let comparator = match captures.get(3).map(|m| m.as_str()) {
            Some("<") => Comparator::Lt,
            Some("<=") => Comparator::Le,
            Some(">") => Comparator::Gt,
            Some(">=") => Comparator::Ge,
            _ => return Err(invalid("Unknown comparator")),
        };

        let bound: f64 = captures
            .get(4)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .parse()
            .map_err(|_| invalid("Invalid bound"))?;

        let compatible = match metric {
            MetricKey::HttpReqDuration => !matches!(aggregator, Aggregator::Rate | Aggregator::Count),
            MetricKey::HttpReqFailed | MetricKey::Checks => matches!(aggregator, Aggregator::Rate),
            MetricKey::HttpReqs | MetricKey::Iterations => matches!(aggregator, Aggregator::Count),
        };
        if !compatible {
            return Err(invalid(&format!(
                "Aggregator not supported for metric '{}'",
                metric.as_str()
            )));
        }

        Ok(Self {
            metric,
            expression: expression.trim().to_string(),
            aggregator,
            comparator,
            bound,
        })
    }

    pub fn from_spec(spec: &ThresholdSpec) -> Result<Self> {
        Self::parse(&spec.metric, &spec.expression)
    }

    pub fn metric_name(&self) -> &'static str {
        self.metric.as_str()
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn evaluate(&self, metrics: &RunMetrics) -> ThresholdResult {
        let actual = match (self.metric, self.aggregator) {
            (MetricKey::HttpReqDuration, Aggregator::Percentile(p)) => {
                metrics.latency_quantile_ms(p / 100.0)
            }
            (MetricKey::HttpReqDuration, Aggregator::Med) => metrics.latency_quantile_ms(0.50),
            (MetricKey::HttpReqDuration, Aggregator::Avg) => metrics.latency_mean_ms(),
            (MetricKey::HttpReqDuration, Aggregator::Min) => metrics.latency_min_ms(),
            (MetricKey::HttpReqDuration, Aggregator::Max) => metrics.latency_max_ms(),
            (MetricKey::HttpReqFailed, Aggregator::Rate) => metrics.failed_rate(),
            (MetricKey::Checks, Aggregator::Rate) => metrics.check_rate(),
            (MetricKey::HttpReqs, Aggregator::Count) => metrics.http_reqs() as f64,
            (MetricKey::Iterations, Aggregator::Count) => metrics.iterations() as f64,
            // parse 已擋下不合法的組合
            _ => 0.0,
        };

        ThresholdResult {
            metric: self.metric.as_str().to_string(),
            expression: self.expression.clone(),
            actual,
            passed: self.comparator.holds(actual, self.bound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CheckResult, IterationOutcome};
    use std::time::Duration;

    fn metrics_with(durations_ms: &[u64], failed_every: usize) -> RunMetrics {
        let metrics = RunMetrics::new();
        for (i, ms) in durations_ms.iter().enumerate() {
            let failed = failed_every > 0 && i % failed_every == 0;
            metrics.record(&IterationOutcome {
                duration: Duration::from_millis(*ms),
                failed,
                checks: vec![CheckResult::new("status is 200", !failed)],
            });
        }
        metrics
    }

    #[test]
    fn test_parse_percentile_expression() {
        let threshold = Threshold::parse("http_req_duration", "p(99)<1500").unwrap();
        assert_eq!(threshold.metric_name(), "http_req_duration");
        assert_eq!(threshold.expression(), "p(99)<1500");
    }

    #[test]
    fn test_parse_named_aggregators() {
        assert!(Threshold::parse("http_req_duration", "avg<=300").is_ok());
        assert!(Threshold::parse("http_req_duration", "max<2000").is_ok());
        assert!(Threshold::parse("http_req_duration", "med<500").is_ok());
        assert!(Threshold::parse("checks", "rate>0.99").is_ok());
        assert!(Threshold::parse("http_req_failed", "rate<0.01").is_ok());
        assert!(Threshold::parse("http_reqs", "count>=100").is_ok());
        assert!(Threshold::parse("iterations", "count>10").is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed_expressions() {
        assert!(Threshold::parse("http_req_duration", "p(99)").is_err());
        assert!(Threshold::parse("http_req_duration", "p99<1500").is_err());
        assert!(Threshold::parse("http_req_duration", "p(101)<1500").is_err());
        assert!(Threshold::parse("http_req_duration", "avg=300").is_err());
        assert!(Threshold::parse("http_req_duration", "<1500").is_err());
        assert!(Threshold::parse("http_req_duration", "").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_metric() {
        assert!(Threshold::parse("memory_usage", "avg<100").is_err());
    }

    #[test]
    fn test_parse_rejects_incompatible_aggregator() {
        assert!(Threshold::parse("http_req_duration", "rate<0.5").is_err());
        assert!(Threshold::parse("checks", "p(99)<1500").is_err());
        assert!(Threshold::parse("http_reqs", "avg<10").is_err());
    }

    #[test]
    fn test_evaluate_duration_percentile() {
        let metrics = metrics_with(&[10; 100], 0);

        let passing = Threshold::parse("http_req_duration", "p(99)<1500").unwrap();
        let result = passing.evaluate(&metrics);
        assert!(result.passed);
        assert!((9.0..11.0).contains(&result.actual), "actual {}", result.actual);

        let failing = Threshold::parse("http_req_duration", "p(99)<5").unwrap();
        assert!(!failing.evaluate(&metrics).passed);
    }

    #[test]
    fn test_evaluate_rates_and_counts() {
        // 每四筆失敗一筆 → failed rate 0.25,check rate 0.75
        let metrics = metrics_with(&[10; 100], 4);

        let failed = Threshold::parse("http_req_failed", "rate<0.5").unwrap();
        let result = failed.evaluate(&metrics);
        assert!(result.passed);
        assert!((result.actual - 0.25).abs() < 1e-9);

        let checks = Threshold::parse("checks", "rate>0.99").unwrap();
        let result = checks.evaluate(&metrics);
        assert!(!result.passed);
        assert!((result.actual - 0.75).abs() < 1e-9);

        let count = Threshold::parse("http_reqs", "count>=100").unwrap();
        assert!(count.evaluate(&metrics).passed);
    }

    #[test]
    fn test_from_spec_roundtrip() {
        let spec = ThresholdSpec::new("http_req_duration", "p(99)<1500");
        let threshold = Threshold::from_spec(&spec).unwrap();
        assert_eq!(threshold.expression(), spec.expression);
    }
}
