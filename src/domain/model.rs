use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::utils::error::{LoadError, Result};

/// 一個負載階段:在 duration 內把虛擬使用者數線性調整到 target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

impl FromStr for Stage {
    type Err = LoadError;

    // 格式 "20s:20" (duration:target)
    fn from_str(s: &str) -> Result<Self> {
        let (duration_part, target_part) =
            s.split_once(':')
                .ok_or_else(|| LoadError::InvalidConfigValueError {
                    field: "stage".to_string(),
                    value: s.to_string(),
                    reason: "Expected '<duration>:<target>' format, e.g. '20s:20'".to_string(),
                })?;

        let duration = parse_duration(duration_part)?;
        let target =
            target_part
                .trim()
                .parse::<usize>()
                .map_err(|_| LoadError::InvalidConfigValueError {
                    field: "stage".to_string(),
                    value: s.to_string(),
                    reason: format!("Invalid target VU count: '{}'", target_part),
                })?;

        Ok(Stage::new(duration, target))
    }
}

/// 解析 "200ms"、"20s"、"5m"、"1h" 這類時間長度字串
pub fn parse_duration(s: &str) -> Result<Duration> {
    let trimmed = s.trim();

    let invalid = |reason: String| LoadError::InvalidConfigValueError {
        field: "duration".to_string(),
        value: s.to_string(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(invalid("Duration cannot be empty".to_string()));
    }

    // "ms" 要在 "s" 之前檢查
    let (value_str, multiplier_ms) = if let Some(v) = trimmed.strip_suffix("ms") {
        (v, 1u64)
    } else if let Some(v) = trimmed.strip_suffix('s') {
        (v, 1_000)
    } else if let Some(v) = trimmed.strip_suffix('m') {
        (v, 60_000)
    } else if let Some(v) = trimmed.strip_suffix('h') {
        (v, 3_600_000)
    } else {
        return Err(invalid(
            "Missing duration unit; use 'ms', 's', 'm' or 'h'".to_string(),
        ));
    };

    let value = value_str
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid(format!("Invalid numeric value: '{}'", value_str)))?;

    Ok(Duration::from_millis(value * multiplier_ms))
}

/// 未解析的門檻宣告,例如 metric = "http_req_duration"、expression = "p(99)<1500"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub metric: String,
    pub expression: String,
}

impl ThresholdSpec {
    pub fn new(metric: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            expression: expression.into(),
        }
    }
}

/// 單次迭代裡一個具名檢查的結果
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
        }
    }
}

/// 一次迭代的觀測結果。失敗記錄在資料裡,不往上拋
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    pub duration: Duration,
    pub failed: bool,
    pub checks: Vec<CheckResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub med_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
    pub rate: f64,
}

/// 跑完一輪後的彙總數據
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub duration_secs: f64,
    pub iterations: u64,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    pub avg_rps: f64,
    pub latency: LatencySummary,
    pub checks: Vec<CheckSummary>,
}

impl RunSummary {
    /// 所有具名檢查合併後的通過率
    pub fn check_rate(&self) -> f64 {
        let passes: u64 = self.checks.iter().map(|c| c.passes).sum();
        let total: u64 = self.checks.iter().map(|c| c.passes + c.fails).sum();
        if total > 0 {
            passes as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// 單一門檻運算後的結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub actual: f64,
    pub passed: bool,
}
