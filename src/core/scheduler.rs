use std::time::Duration;

use crate::domain::model::Stage;
use crate::utils::error::{LoadError, Result};

/// 依階段設定計算任一時間點應有的虛擬使用者數。
/// 每個階段內從上一階段的 target 線性內插到自己的 target,起點是 0
#[derive(Debug, Clone)]
pub struct StagedScheduler {
    stages: Vec<Stage>,
}

impl StagedScheduler {
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(LoadError::MissingConfigError {
                field: "stages".to_string(),
            });
        }
        for (i, stage) in stages.iter().enumerate() {
            if stage.duration.is_zero() {
                return Err(LoadError::InvalidConfigValueError {
                    field: format!("stages[{}].duration", i),
                    value: "0".to_string(),
                    reason: "Stage duration must be greater than zero".to_string(),
                });
            }
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// 整輪測試中同時存在的最大虛擬使用者數
    pub fn peak_target(&self) -> usize {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    pub fn target_at(&self, elapsed: Duration) -> usize {
        let mut from = 0usize;
        let mut offset = Duration::ZERO;

        for stage in &self.stages {
            let end = offset + stage.duration;
            if elapsed < end {
                let progress = (elapsed - offset).as_secs_f64() / stage.duration.as_secs_f64();
                let interpolated =
                    from as f64 + (stage.target as f64 - from as f64) * progress;
                return interpolated.round() as usize;
            }
            from = stage.target;
            offset = end;
        }

        // 計畫結束後回到 0
        0
    }
}
