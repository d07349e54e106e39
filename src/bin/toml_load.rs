use anyhow::Context;
use clap::Parser;
use small_load::config::toml_config::TomlConfig;
use small_load::domain::ports::ConfigProvider;
use small_load::utils::{logger, validation::Validate};
use small_load::{HttpGetScenario, LoadEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-load")]
#[command(about = "Load testing tool driven by a TOML scenario file")]
struct Args {
    /// Path to TOML scenario file
    #[arg(short, long, default_value = "load-scenario.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show the resolved plan without sending any traffic
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based load tool");
    tracing::info!("📁 Loading scenario from: {}", args.config);

    // 載入 TOML 情境
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load scenario file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Scenario validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Scenario loaded and validated successfully");

    display_plan(&config)?;

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no traffic will be sent");
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());

    let scenario = HttpGetScenario::new(&config).context("building HTTP client")?;
    let engine = LoadEngine::new_with_monitoring(scenario, &config, monitor_enabled)
        .context("building load engine")?;

    let report = engine.run().await.context("running load scenario")?;
    report.log_report();

    let written = report
        .export(
            &LocalStorage::new(ConfigProvider::output_path(&config).to_string()),
            config.summary_export(),
            config.checks_export(),
        )
        .await
        .context("exporting report")?;
    for file in written {
        tracing::info!(
            "📁 Report written to {}/{}",
            ConfigProvider::output_path(&config),
            file
        );
    }

    if report.thresholds_passed() {
        println!("✅ Scenario '{}' completed, all thresholds passed", config.scenario.name);
        Ok(())
    } else {
        eprintln!(
            "❌ Scenario '{}' completed with threshold failures",
            config.scenario.name
        );
        std::process::exit(99);
    }
}

// 顯示解析後的執行計畫
fn display_plan(config: &TomlConfig) -> anyhow::Result<()> {
    let stages = config.stages().context("resolving stages")?;
    let total: std::time::Duration = stages.iter().map(|s| s.duration).sum();
    let peak = stages.iter().map(|s| s.target).max().unwrap_or(0);

    println!("📋 Scenario: {}", config.scenario.name);
    if let Some(description) = &config.scenario.description {
        println!("   {}", description);
    }
    println!("🎯 Target: {}", ConfigProvider::target_url(config));
    for (i, stage) in stages.iter().enumerate() {
        println!(
            "   Stage {}: {:?} → {} VUs",
            i + 1,
            stage.duration,
            stage.target
        );
    }
    println!("   Total: {:?}, peak {} VUs", total, peak);

    let thresholds = config.thresholds().context("resolving thresholds")?;
    for spec in &thresholds {
        println!("   Threshold: {} {}", spec.metric, spec.expression);
    }
    if thresholds.is_empty() {
        println!("   Threshold: none");
    }

    Ok(())
}
