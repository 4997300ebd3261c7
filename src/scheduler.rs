//! # Scheduler モジュール
//!
//! 固定周期タイマーでシミュレーションを駆動します。
//!
//! 1周期ごとに [`SimulationEngine::tick`] を1回だけ同期的に実行し、完了してから
//! 次の周期を待ちます。処理が周期に間に合わなかった場合も取りこぼした周期を
//! まとめて実行することはありません（`MissedTickBehavior::Skip`）。
//! 停止は次の周期を待たないことで行い、途中状態の巻き戻しは不要です。
//!
//! 時間圧縮倍率と一時停止は `watch` チャネル、停止要求は `Notify` で受け取ります。

use std::sync::Arc;
use tokio::sync::{Notify, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::{IRenderer, SimulationStats};
use crate::simulation::SimulationEngine;

/// 外部から操作される実行パラメーター
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub speed_multiplier: f64,
    pub paused: bool,
}

/// 実行中のスケジューラーを操作するハンドル
#[derive(Debug, Clone)]
pub struct SchedulerControl {
    control_tx: Arc<watch::Sender<ControlState>>,
    shutdown: Arc<Notify>,
}

impl SchedulerControl {
    /// ハンドルとスケジューラー側の受信口を作成
    pub fn new(speed_multiplier: f64) -> (Self, watch::Receiver<ControlState>) {
        let (tx, rx) = watch::channel(ControlState {
            speed_multiplier,
            paused: false,
        });
        let control = Self {
            control_tx: Arc::new(tx),
            shutdown: Arc::new(Notify::new()),
        };
        (control, rx)
    }

    pub fn set_speed_multiplier(&self, value: f64) {
        self.control_tx.send_modify(|c| c.speed_multiplier = value);
    }

    pub fn pause(&self) {
        self.control_tx.send_modify(|c| c.paused = true);
    }

    pub fn resume(&self) {
        self.control_tx.send_modify(|c| c.paused = false);
    }

    /// 次の周期を待たずに停止させる
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }
}

/// 停止理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 指定ティック数を実行した
    Completed,
    /// 停止要求を受けた
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub reason: StopReason,
    pub stats: SimulationStats,
}

/// 固定周期でシミュレーションを実行
///
/// `max_ticks` が `None` の場合は停止要求まで実行します。一時停止中は
/// 周期だけ進み、ティック数には数えません。
pub async fn run_realtime(
    engine: &mut SimulationEngine,
    renderer: &mut dyn IRenderer,
    mut control_rx: watch::Receiver<ControlState>,
    shutdown: Arc<Notify>,
    max_ticks: Option<u64>,
) -> RunSummary {
    let mut interval = time::interval(engine.tick_period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut paused = control_rx.borrow_and_update().paused;
    let mut ticks = 0u64;

    info!(
        tick_period_ms = engine.tick_period().as_secs_f64() * 1000.0,
        max_ticks = ?max_ticks,
        "=== リアルタイム実行開始 ==="
    );

    let reason = loop {
        if max_ticks.is_some_and(|max| ticks >= max) {
            break StopReason::Completed;
        }

        tokio::select! {
            biased;
            _ = shutdown.notified() => {
                info!(ticks, "SCHEDULER_STOPPED: 停止要求を受けました");
                break StopReason::Shutdown;
            }
            _ = interval.tick() => {}
        }

        if control_rx.has_changed().unwrap_or(false) {
            let control = *control_rx.borrow_and_update();
            if control.speed_multiplier != engine.speed_multiplier() {
                if let Err(e) = engine.set_speed_multiplier(control.speed_multiplier, renderer) {
                    warn!(
                        tick = engine.current_tick(),
                        error = %e,
                        "SCHEDULER_SPEED_CHANGE_IGNORED: 現在の倍率で実行を継続します"
                    );
                }
            }
            if control.paused != paused {
                debug!(paused = control.paused, "SCHEDULER_PAUSE_CHANGED");
                paused = control.paused;
            }
        }

        if paused {
            continue;
        }

        engine.tick(renderer);
        ticks += 1;
    };

    engine.log_summary();

    RunSummary {
        ticks,
        reason,
        stats: engine.stats(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingRenderer;
    use crate::scenario::ScenarioConfig;
    use std::time::Duration;
    use tokio::time::Instant;

    fn initialized_engine() -> (SimulationEngine, RecordingRenderer) {
        let mut engine = SimulationEngine::new(ScenarioConfig::default(), 0).unwrap();
        let mut renderer = RecordingRenderer::default();
        engine.initialize(&mut renderer);
        (engine, renderer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_requested_ticks_at_fixed_period() {
        let (mut engine, mut renderer) = initialized_engine();
        let (control, rx) = SchedulerControl::new(1.0);
        let start = Instant::now();

        let summary = run_realtime(&mut engine, &mut renderer, rx, control.shutdown_handle(), Some(20)).await;

        assert_eq!(summary.reason, StopReason::Completed);
        assert_eq!(summary.ticks, 20);
        assert_eq!(engine.current_tick(), 20);
        // 初回は即時、以降は30ms間隔
        assert!(start.elapsed() >= Duration::from_millis(30 * 19));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick() {
        let (mut engine, mut renderer) = initialized_engine();
        let (control, rx) = SchedulerControl::new(1.0);
        control.stop();

        let summary = run_realtime(&mut engine, &mut renderer, rx, control.shutdown_handle(), None).await;

        assert_eq!(summary.reason, StopReason::Shutdown);
        assert_eq!(summary.ticks, 0);
        assert_eq!(engine.current_tick(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_and_speed_change() {
        let (mut engine, mut renderer) = initialized_engine();
        let (control, rx) = SchedulerControl::new(1.0);
        control.pause();
        let start = Instant::now();

        let driver = {
            let control = control.clone();
            async move {
                time::sleep(Duration::from_millis(300)).await;
                control.set_speed_multiplier(-4.0);
                time::sleep(Duration::from_millis(60)).await;
                control.set_speed_multiplier(3.0);
                control.resume();
            }
        };
        let run = run_realtime(&mut engine, &mut renderer, rx, control.shutdown_handle(), Some(10));
        let (summary, ()) = tokio::join!(run, driver);

        assert_eq!(summary.ticks, 10);
        assert!(start.elapsed() >= Duration::from_millis(360));
        assert_eq!(engine.speed_multiplier(), 3.0);
        assert_eq!(renderer.speed_multiplier, Some(3.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_speed_change_keeps_running() {
        let (mut engine, mut renderer) = initialized_engine();
        let (control, rx) = SchedulerControl::new(1.0);
        control.set_speed_multiplier(f64::NAN);

        let summary = run_realtime(&mut engine, &mut renderer, rx, control.shutdown_handle(), Some(5)).await;

        assert_eq!(summary.reason, StopReason::Completed);
        assert_eq!(summary.ticks, 5);
        assert_eq!(engine.speed_multiplier(), 1.0);
    }
}
