use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;

use crate::domain::model::{CheckResult, IterationOutcome};
use crate::domain::ports::{ConfigProvider, Scenario};
use crate::utils::error::Result;

pub const STATUS_CHECK: &str = "status is 200";

/// 預設情境:每次迭代對固定 URL 發一個 GET,檢查回應是不是 200。
/// 不重試、不退避,失敗只記一筆 check 失敗,下一次迭代照常進行
pub struct HttpGetScenario {
    client: Client,
    url: String,
}

impl HttpGetScenario {
    pub fn new(config: &impl ConfigProvider) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            client,
            url: config.target_url().to_string(),
        })
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn target_url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Scenario for HttpGetScenario {
    fn name(&self) -> &str {
        "http-get"
    }

    async fn iteration(&self) -> IterationOutcome {
        let start = Instant::now();

        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    // 計時涵蓋整個回應主體
                    Ok(_) => IterationOutcome {
                        duration: start.elapsed(),
                        failed: status.is_client_error() || status.is_server_error(),
                        checks: vec![CheckResult::new(
                            STATUS_CHECK,
                            status == reqwest::StatusCode::OK,
                        )],
                    },
                    Err(e) => {
                        tracing::debug!("Response body read failed: {}", e);
                        IterationOutcome {
                            duration: start.elapsed(),
                            failed: true,
                            checks: vec![CheckResult::new(STATUS_CHECK, false)],
                        }
                    }
                }
            }
            Err(e) => {
                tracing::debug!("Request to {} failed: {}", self.url, e);
                IterationOutcome {
                    duration: start.elapsed(),
                    failed: true,
                    checks: vec![CheckResult::new(STATUS_CHECK, false)],
                }
            }
        }
    }
}
