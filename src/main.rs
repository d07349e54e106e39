use clap::Parser;
use small_load::utils::{logger, validation::Validate};
use small_load::{CliConfig, HttpGetScenario, LoadEngine, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting small-load CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    tracing::info!("🎯 Target: {}", config.target_url);

    // 建立情境和引擎
    let scenario = match HttpGetScenario::new(&config) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!("❌ Failed to build HTTP client: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let engine = match LoadEngine::new_with_monitoring(scenario, &config, monitor_enabled) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("❌ Failed to build load engine: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    match engine.run().await {
        Ok(report) => {
            report.log_report();

            // 輸出報表檔案
            if config.summary_export.is_some() || config.checks_export.is_some() {
                let storage = LocalStorage::new(config.output_path.clone());
                match report
                    .export(
                        &storage,
                        config.summary_export.as_deref(),
                        config.checks_export.as_deref(),
                    )
                    .await
                {
                    Ok(written) => {
                        for file in written {
                            tracing::info!("📁 Report written to {}/{}", config.output_path, file);
                        }
                    }
                    Err(e) => {
                        tracing::error!("❌ Report export failed: {}", e);
                        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                    }
                }
            }

            if report.thresholds_passed() {
                tracing::info!("✅ Load run completed, all thresholds passed");
                println!("✅ Load run completed, all thresholds passed");
            } else {
                eprintln!("❌ Load run completed with threshold failures");
                // 門檻沒過用固定的退出碼,方便 CI 判斷
                std::process::exit(99);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Load run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                small_load::utils::error::ErrorSeverity::Low => 0,
                small_load::utils::error::ErrorSeverity::Medium => 2,
                small_load::utils::error::ErrorSeverity::High => 1,
                small_load::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
