use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::metrics::RunMetrics;
use crate::core::report::RunReport;
use crate::core::scheduler::StagedScheduler;
use crate::core::threshold::Threshold;
use crate::domain::ports::{ConfigProvider, Scenario};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

// 排程器多久重算一次目標 VU 數
const SCHEDULER_TICK: Duration = Duration::from_millis(100);
// 還輪不到上場的工作者多久看一次水位
const IDLE_POLL: Duration = Duration::from_millis(50);
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// 負載引擎:把工作者一次開到峰值數量,再用排程器調整「允許上場」的水位。
/// 編號小於水位的工作者跑迭代,其他的閒置等待
pub struct LoadEngine<S: Scenario + 'static> {
    scenario: Arc<S>,
    scheduler: StagedScheduler,
    thresholds: Vec<Threshold>,
    metrics: Arc<RunMetrics>,
    monitor: SystemMonitor,
}

impl<S: Scenario + 'static> LoadEngine<S> {
    pub fn new(scenario: S, config: &impl ConfigProvider) -> Result<Self> {
        Self::new_with_monitoring(scenario, config, false)
    }

    pub fn new_with_monitoring(
        scenario: S,
        config: &impl ConfigProvider,
        monitor_enabled: bool,
    ) -> Result<Self> {
        let scheduler = StagedScheduler::new(config.stages()?)?;
        let thresholds = config
            .thresholds()?
            .iter()
            .map(Threshold::from_spec)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            scenario: Arc::new(scenario),
            scheduler,
            thresholds,
            metrics: Arc::new(RunMetrics::new()),
            monitor: SystemMonitor::new(monitor_enabled),
        })
    }

    pub fn scheduler(&self) -> &StagedScheduler {
        &self.scheduler
    }

    pub async fn run(&self) -> Result<RunReport> {
        let total = self.scheduler.total_duration();
        let peak = self.scheduler.peak_target();

        tracing::info!(
            "🚀 Starting scenario '{}': {} stage(s), peak {} VUs, {:?} total",
            self.scenario.name(),
            self.scheduler.stages().len(),
            peak,
            total
        );
        if peak == 0 {
            tracing::warn!("⚠️ All stage targets are zero - no iterations will run");
        }

        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let active = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(peak);
        for vu_id in 0..peak {
            workers.push(tokio::spawn(Self::worker_loop(
                vu_id,
                Arc::clone(&self.scenario),
                Arc::clone(&self.metrics),
                Arc::clone(&active),
                Arc::clone(&shutdown),
            )));
        }

        let mut interrupted = false;
        let mut last_progress = Instant::now();
        let mut ticker = tokio::time::interval(SCHEDULER_TICK);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let elapsed = start.elapsed();
                    if elapsed >= total {
                        break;
                    }
                    active.store(self.scheduler.target_at(elapsed), Ordering::Relaxed);

                    if last_progress.elapsed() >= PROGRESS_INTERVAL {
                        last_progress = Instant::now();
                        tracing::info!(
                            "🚦 {:.0}s elapsed: {} VUs active, {} requests so far",
                            elapsed.as_secs_f64(),
                            active.load(Ordering::Relaxed),
                            self.metrics.http_reqs()
                        );
                        self.monitor.log_stats("load");
                    }
                }
                _ = &mut ctrl_c => {
                    tracing::warn!("🛑 Interrupt received - stopping workers early");
                    interrupted = true;
                    break;
                }
            }
        }

        // 收工:水位歸零,等正在跑的迭代自然結束
        shutdown.store(true, Ordering::Relaxed);
        active.store(0, Ordering::Relaxed);
        for handle in workers {
            let _ = handle.await;
        }

        let summary = self.metrics.summary(started_at, start.elapsed());
        let thresholds = self
            .thresholds
            .iter()
            .map(|t| t.evaluate(&self.metrics))
            .collect();

        self.monitor.log_final_stats();

        Ok(RunReport {
            summary,
            thresholds,
            interrupted,
        })
    }

    async fn worker_loop(
        vu_id: usize,
        scenario: Arc<S>,
        metrics: Arc<RunMetrics>,
        active: Arc<AtomicUsize>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            if vu_id < active.load(Ordering::Relaxed) {
                let outcome = scenario.iteration().await;
                metrics.record(&outcome);
            } else {
                tokio::time::sleep(IDLE_POLL).await;
            }
        }
    }
}
