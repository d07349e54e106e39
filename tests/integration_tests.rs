use httpmock::prelude::*;
use small_load::core::Storage;
use small_load::{CliConfig, HttpGetScenario, LoadEngine, LocalStorage, RunReport};
use std::time::{Duration, Instant};
use tempfile::TempDir;

// 短小的測試剖面:0→2 再降回 0,總共 700ms
fn short_profile_config(target_url: String) -> CliConfig {
    CliConfig {
        target_url,
        stages: vec!["400ms:2".to_string(), "300ms:0".to_string()],
        thresholds: vec!["http_req_duration=p(99)<1500".to_string()],
        timeout_seconds: 5,
        output_path: "./output".to_string(),
        summary_export: None,
        checks_export: None,
        verbose: false,
        log_json: false,
        monitor: false,
    }
}

#[tokio::test]
async fn test_end_to_end_against_healthy_server() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/hello-resty");
        then.status(200).body("hello");
    });

    let config = short_profile_config(server.url("/hello-resty"));
    let scenario = HttpGetScenario::new(&config).unwrap();
    let engine = LoadEngine::new(scenario, &config).unwrap();

    let report = engine.run().await.unwrap();

    assert!(api_mock.hits() > 0);
    assert!(report.summary.http_reqs > 0);
    assert_eq!(report.summary.http_reqs, report.summary.iterations);
    assert_eq!(report.summary.http_req_failed, 0);

    // 全部 200 → 檢查全數通過
    assert_eq!(report.summary.checks.len(), 1);
    assert_eq!(report.summary.checks[0].name, "status is 200");
    assert_eq!(report.summary.checks[0].fails, 0);
    assert!((report.summary.checks[0].rate - 1.0).abs() < f64::EPSILON);

    // 本機 mock 的延遲遠低於 1500ms
    assert!(report.thresholds_passed());
    assert!(!report.interrupted);
}

#[tokio::test]
async fn test_failing_server_fails_checks_but_not_duration_threshold() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/hello-resty");
        then.status(500);
    });

    let config = short_profile_config(server.url("/hello-resty"));
    let scenario = HttpGetScenario::new(&config).unwrap();
    let engine = LoadEngine::new(scenario, &config).unwrap();

    let report = engine.run().await.unwrap();

    assert!(api_mock.hits() > 0);
    assert!(report.summary.http_reqs > 0);
    assert_eq!(report.summary.http_req_failed, report.summary.http_reqs);

    // 檢查全掛
    assert_eq!(report.summary.checks[0].passes, 0);
    assert_eq!(report.summary.checks[0].rate, 0.0);

    // 延遲門檻跟檢查結果是兩回事,這裡仍然會過
    assert_eq!(report.thresholds.len(), 1);
    assert!(report.thresholds[0].passed);
}

#[tokio::test]
async fn test_unreachable_server_still_completes_full_profile() {
    // 綁一個 port 再放掉,確保連線會被拒絕
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = short_profile_config(format!("http://127.0.0.1:{}/hello-resty", port));
    let scenario = HttpGetScenario::new(&config).unwrap();
    let engine = LoadEngine::new(scenario, &config).unwrap();

    let start = Instant::now();
    let report = engine.run().await.unwrap();
    let elapsed = start.elapsed();

    // 跑不到目標也要把整個剖面跑完 (含 ramp-down)
    assert!(elapsed >= Duration::from_millis(700), "elapsed {:?}", elapsed);
    assert!(report.summary.http_reqs > 0);
    assert_eq!(report.summary.http_req_failed, report.summary.http_reqs);
    assert_eq!(report.summary.checks[0].passes, 0);
    assert!(!report.interrupted);
}

#[tokio::test]
async fn test_impossible_threshold_fails_the_run() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/hello-resty");
        then.status(200);
    });

    let mut config = short_profile_config(server.url("/hello-resty"));
    config.thresholds = vec!["http_req_duration=max<0".to_string()];

    let scenario = HttpGetScenario::new(&config).unwrap();
    let engine = LoadEngine::new(scenario, &config).unwrap();

    let report = engine.run().await.unwrap();

    assert!(!report.thresholds_passed());
    assert_eq!(report.thresholds[0].metric, "http_req_duration");
    assert!(report.thresholds[0].actual > 0.0);
}

#[tokio::test]
async fn test_report_export_roundtrip_through_storage() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/hello-resty");
        then.status(200);
    });

    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let mut config = short_profile_config(server.url("/hello-resty"));
    config.output_path = output_path.clone();
    config.summary_export = Some("summary.json".to_string());
    config.checks_export = Some("checks.csv".to_string());

    let scenario = HttpGetScenario::new(&config).unwrap();
    let engine = LoadEngine::new(scenario, &config).unwrap();
    let report = engine.run().await.unwrap();

    let storage = LocalStorage::new(output_path.clone());
    let written = report
        .export(
            &storage,
            config.summary_export.as_deref(),
            config.checks_export.as_deref(),
        )
        .await
        .unwrap();
    assert_eq!(
        written,
        vec!["summary.json".to_string(), "checks.csv".to_string()]
    );

    // 從 storage 讀回來驗證內容
    let json = storage.read_file("summary.json").await.unwrap();
    let parsed: RunReport = serde_json::from_slice(&json).unwrap();
    assert_eq!(parsed.summary.http_reqs, report.summary.http_reqs);
    assert_eq!(parsed.thresholds.len(), 1);

    let csv = String::from_utf8(storage.read_file("checks.csv").await.unwrap()).unwrap();
    assert!(csv.starts_with("name,passes,fails,rate"));
    assert!(csv.contains("status is 200"));
}

#[tokio::test]
async fn test_zero_target_profile_sends_no_traffic() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/hello-resty");
        then.status(200);
    });

    let mut config = short_profile_config(server.url("/hello-resty"));
    config.stages = vec!["200ms:0".to_string()];

    let scenario = HttpGetScenario::new(&config).unwrap();
    let engine = LoadEngine::new(scenario, &config).unwrap();
    let report = engine.run().await.unwrap();

    assert_eq!(api_mock.hits(), 0);
    assert_eq!(report.summary.http_reqs, 0);
    assert!(report.summary.checks.is_empty());
}
