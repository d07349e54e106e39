use crate::core::threshold::Threshold;
use crate::domain::model::{parse_duration, Stage, ThresholdSpec};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{LoadError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_OUTPUT_PATH: &str = "./output";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub scenario: ScenarioConfig,
    pub target: TargetConfig,
    pub load: LoadConfig,
    pub thresholds: Option<BTreeMap<String, Vec<String>>>,
    pub report: Option<ReportConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    pub method: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub duration: String,
    pub target: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_path: String,
    pub summary_filename: Option<String>,
    pub checks_filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入情境
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LoadError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析情境
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| LoadError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TARGET_URL})
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    /// 驗證情境設定的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("scenario.name", &self.scenario.name)?;
        validate_url("target.url", &self.target.url)?;

        // 目前只支援 GET
        if let Some(method) = &self.target.method {
            if !method.eq_ignore_ascii_case("get") {
                return Err(LoadError::InvalidConfigValueError {
                    field: "target.method".to_string(),
                    value: method.clone(),
                    reason: "Only GET is supported".to_string(),
                });
            }
        }

        if let Some(timeout) = self.target.timeout_seconds {
            validate_positive_number("target.timeout_seconds", timeout as usize, 1)?;
        }

        if self.load.stages.is_empty() {
            return Err(LoadError::MissingConfigError {
                field: "load.stages".to_string(),
            });
        }
        for (i, stage) in self.load.stages.iter().enumerate() {
            let duration = parse_duration(&stage.duration)?;
            if duration.is_zero() {
                return Err(LoadError::InvalidConfigValueError {
                    field: format!("load.stages[{}].duration", i),
                    value: stage.duration.clone(),
                    reason: "Stage duration must be greater than zero".to_string(),
                });
            }
        }

        if let Some(thresholds) = &self.thresholds {
            for (metric, expressions) in thresholds {
                for expression in expressions {
                    Threshold::parse(metric, expression)?;
                }
            }
        }

        if let Some(report) = &self.report {
            validate_path("report.output_path", &report.output_path)?;
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn target_url(&self) -> &str {
        &self.target.url
    }

    fn stages(&self) -> Result<Vec<Stage>> {
        self.load
            .stages
            .iter()
            .map(|s| Ok(Stage::new(parse_duration(&s.duration)?, s.target)))
            .collect()
    }

    fn thresholds(&self) -> Result<Vec<ThresholdSpec>> {
        let mut specs = Vec::new();
        if let Some(thresholds) = &self.thresholds {
            for (metric, expressions) in thresholds {
                for expression in expressions {
                    specs.push(ThresholdSpec::new(metric.clone(), expression.clone()));
                }
            }
        }
        Ok(specs)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.target
                .timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        )
    }

    fn output_path(&self) -> &str {
        self.report
            .as_ref()
            .map(|r| r.output_path.as_str())
            .unwrap_or(DEFAULT_OUTPUT_PATH)
    }

    fn summary_export(&self) -> Option<&str> {
        self.report.as_ref()?.summary_filename.as_deref()
    }

    fn checks_export(&self) -> Option<&str> {
        self.report.as_ref()?.checks_filename.as_deref()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
