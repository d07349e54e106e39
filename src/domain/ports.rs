use crate::domain::model::{IterationOutcome, Stage, ThresholdSpec};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn target_url(&self) -> &str;
    fn stages(&self) -> Result<Vec<Stage>>;
    fn thresholds(&self) -> Result<Vec<ThresholdSpec>>;
    fn request_timeout(&self) -> Duration;
    fn output_path(&self) -> &str;
    fn summary_export(&self) -> Option<&str>;
    fn checks_export(&self) -> Option<&str>;
}

#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    /// 執行一次迭代。任何失敗都記在回傳值裡,迭代之間互不影響
    async fn iteration(&self) -> IterationOutcome;
}
