use serde::{Deserialize, Serialize};

use crate::domain::model::{RunSummary, ThresholdResult};
use crate::domain::ports::Storage;
use crate::utils::error::{LoadError, Result};

/// 一輪負載測試的完整結果:彙總數據加上門檻判定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub thresholds: Vec<ThresholdResult>,
    pub interrupted: bool,
}

impl RunReport {
    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn log_report(&self) {
        let s = &self.summary;

        tracing::info!("📈 Run finished in {:.1}s", s.duration_secs);
        tracing::info!(
            "   requests: {} total, {} failed, {:.1} req/s",
            s.http_reqs,
            s.http_req_failed,
            s.avg_rps
        );
        tracing::info!(
            "   http_req_duration: avg={:.2}ms med={:.2}ms p90={:.2}ms p95={:.2}ms p99={:.2}ms max={:.2}ms",
            s.latency.avg_ms,
            s.latency.med_ms,
            s.latency.p90_ms,
            s.latency.p95_ms,
            s.latency.p99_ms,
            s.latency.max_ms
        );

        for check in &s.checks {
            let icon = if check.fails == 0 { "✅" } else { "❌" };
            tracing::info!(
                "   {} check '{}': {}/{} passed ({:.1}%)",
                icon,
                check.name,
                check.passes,
                check.passes + check.fails,
                check.rate * 100.0
            );
        }

        for threshold in &self.thresholds {
            let icon = if threshold.passed { "✅" } else { "❌" };
            tracing::info!(
                "   {} threshold {} {} (actual {:.2})",
                icon,
                threshold.metric,
                threshold.expression,
                threshold.actual
            );
        }

        if self.interrupted {
            tracing::warn!("⚠️ Run was interrupted before the profile completed");
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 檢查結果表,給試算表或後續 pipeline 用
    pub fn checks_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for check in &self.summary.checks {
            writer.serialize(check)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| LoadError::ProcessingError {
                message: format!("Failed to finish CSV output: {}", e),
            })?;
        String::from_utf8(bytes).map_err(|e| LoadError::ProcessingError {
            message: format!("CSV output was not valid UTF-8: {}", e),
        })
    }

    /// 把摘要寫進 Storage,回傳實際寫出的檔名
    pub async fn export<S: Storage>(
        &self,
        storage: &S,
        summary_path: Option<&str>,
        checks_path: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut written = Vec::new();

        if let Some(path) = summary_path {
            let json = self.to_json()?;
            storage.write_file(path, json.as_bytes()).await?;
            written.push(path.to_string());
        }

        if let Some(path) = checks_path {
            let csv = self.checks_csv()?;
            storage.write_file(path, csv.as_bytes()).await?;
            written.push(path.to_string());
        }

        Ok(written)
    }
}
