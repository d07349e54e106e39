pub mod cli;
pub mod toml_config;

use crate::domain::model::ThresholdSpec;
use crate::utils::error::{LoadError, Result};

/// 把 "http_req_duration=p(99)<1500" 拆成 metric 和 expression
pub(crate) fn parse_threshold_arg(raw: &str) -> Result<ThresholdSpec> {
    let (metric, expression) =
        raw.split_once('=')
            .ok_or_else(|| LoadError::InvalidConfigValueError {
                field: "threshold".to_string(),
                value: raw.to_string(),
                reason: "Expected '<metric>=<expression>', e.g. 'http_req_duration=p(99)<1500'"
                    .to_string(),
            })?;
    Ok(ThresholdSpec::new(metric.trim(), expression.trim()))
}

#[cfg(feature = "cli")]
mod cli_config {
    use super::parse_threshold_arg;
    use crate::core::threshold::Threshold;
    use crate::domain::model::{Stage, ThresholdSpec};
    use crate::domain::ports::ConfigProvider;
    use crate::utils::error::{LoadError, Result};
    use crate::utils::validation::{validate_path, validate_positive_number, validate_url, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "small-load")]
    #[command(about = "A small load testing tool for HTTP services")]
    pub struct CliConfig {
        /// 目標端點
        #[arg(long, default_value = "http://localhost:8099/hello-resty")]
        pub target_url: String,

        /// 負載階段,格式 "<duration>:<target>",例如 "20s:20"
        #[arg(
            long,
            value_delimiter = ',',
            default_values_t = [
                "20s:20".to_string(),
                "30s:100".to_string(),
                "10s:0".to_string(),
            ]
        )]
        pub stages: Vec<String>,

        /// 門檻,格式 "<metric>=<expression>"
        #[arg(
            long = "threshold",
            value_delimiter = ',',
            default_values_t = ["http_req_duration=p(99)<1500".to_string()]
        )]
        pub thresholds: Vec<String>,

        /// 單一請求的逾時秒數
        #[arg(long, default_value = "30")]
        pub timeout_seconds: u64,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        /// JSON 摘要檔名 (相對於 output-path)
        #[arg(long)]
        pub summary_export: Option<String>,

        /// 檢查結果 CSV 檔名 (相對於 output-path)
        #[arg(long)]
        pub checks_export: Option<String>,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log in JSON format")]
        pub log_json: bool,

        #[arg(long, help = "Enable system monitoring")]
        pub monitor: bool,
    }

    impl ConfigProvider for CliConfig {
        fn target_url(&self) -> &str {
            &self.target_url
        }

        fn stages(&self) -> Result<Vec<Stage>> {
            self.stages.iter().map(|s| s.parse()).collect()
        }

        fn thresholds(&self) -> Result<Vec<ThresholdSpec>> {
            self.thresholds
                .iter()
                .map(|t| parse_threshold_arg(t))
                .collect()
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(self.timeout_seconds)
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn summary_export(&self) -> Option<&str> {
            self.summary_export.as_deref()
        }

        fn checks_export(&self) -> Option<&str> {
            self.checks_export.as_deref()
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_url("target_url", &self.target_url)?;
            validate_path("output_path", &self.output_path)?;
            validate_positive_number("timeout_seconds", self.timeout_seconds as usize, 1)?;

            if self.stages.is_empty() {
                return Err(LoadError::MissingConfigError {
                    field: "stages".to_string(),
                });
            }
            for stage in &self.stages {
                stage.parse::<Stage>()?;
            }

            // 門檻表達式要在開跑前就確定能解析
            for raw in &self.thresholds {
                let spec = parse_threshold_arg(raw)?;
                Threshold::from_spec(&spec)?;
            }

            Ok(())
        }
    }

}

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;
