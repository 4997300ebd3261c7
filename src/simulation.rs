//! # Simulation モジュール
//!
//! 空中戦シミュレーションの中核となるシミュレーションエンジンを提供します。
//!
//! このモジュールは1ティック分の掃引（スイープ）を管理し、ロスター内の
//! すべてのエンティティ（機体・ミサイル）の判断・運動更新・衝突判定を
//! インデックス順に実行します。壁時計に合わせた周期実行は
//! [`crate::scheduler`] が担当し、ここでは1ティックの処理のみを扱います。
//!
//! ## シミュレーション処理順序
//!
//! 各ティックにおいて、生存しているエンティティごとに以下の順序で処理されます：
//!
//! 1. **判断**: 機体は回避・中心復帰の旋回判断、ミサイルは再照準と加速
//! 2. **確定ステップ**: 位置と旋回補間の更新
//! 3. **衝突判定**: ミサイルのみ。全滅時はロスター全体を再生成
//!
//! 掃引後に生存エンティティの姿勢を描画側へ送り、再描画を1回要求します。
//! ミサイルは常に相方の機体より後ろのインデックスにあるため、同じティック内で
//! 更新済みの機体位置を追尾します。
//!
//! ## 使用例
//!
//! ```rust
//! use aircombat::render::NullRenderer;
//! use aircombat::scenario::ScenarioConfig;
//! use aircombat::simulation::SimulationEngine;
//!
//! let mut renderer = NullRenderer;
//! let mut engine = SimulationEngine::new(ScenarioConfig::default(), 0).unwrap();
//! engine.initialize(&mut renderer);
//! engine.run_ticks(100, &mut renderer);
//! ```

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::models::*;
use crate::scenario::{ScenarioConfig, ScenarioError};

/// タイマー周期の下限
const MIN_TICK_PERIOD: Duration = Duration::from_micros(1);

/// シミュレーション実行時のエラー
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("タイマー周期が不正です: {0}ms")]
    InvalidTickPeriod(f64),
    #[error("時間圧縮倍率が不正です: {0}")]
    InvalidSpeedMultiplier(f64),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// 1ティック分の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// このティックで撃墜されたペア数
    pub pairs_destroyed: u32,
    /// 全滅によりロスターが再生成されたか
    pub respawned: bool,
    /// 掃引後の生存エンティティ数
    pub alive: usize,
}

pub struct SimulationEngine {
    state: SimulationState,
    tick_period: Duration,
    pub verbose_level: u8,
}

impl SimulationEngine {
    /// 設定を検証してエンジンを作成
    ///
    /// タイマー周期が0以下など不正な設定の場合は開始できません。
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Result<Self, SimulationError> {
        let period_ms = scenario.sim.tick_period_ms;
        if !period_ms.is_finite() || period_ms <= 0.0 {
            error!(tick_period_ms = period_ms, "CONFIG_ERROR: タイマー周期が不正なため開始できません");
            return Err(SimulationError::InvalidTickPeriod(period_ms));
        }
        let tick_period = Duration::try_from_secs_f64(period_ms / 1000.0).map_err(|_| {
            error!(tick_period_ms = period_ms, "CONFIG_ERROR: タイマー周期が表現できる範囲を超えています");
            SimulationError::InvalidTickPeriod(period_ms)
        })?;
        scenario.validate()?;

        Ok(Self {
            tick_period: tick_period.max(MIN_TICK_PERIOD),
            state: SimulationState::new(scenario),
            verbose_level,
        })
    }

    /// ロスターを生成し、現在の時間圧縮倍率を描画側へ通知
    pub fn initialize(&mut self, renderer: &mut dyn IRenderer) {
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }

        self.state.spawn_roster(renderer);
        renderer.set_simulation_speed_multiplier(self.state.speed_multiplier);
        self.push_poses(renderer);
        renderer.request_redraw();

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  機体: {}機", self.state.roster.pair_count());
            info!("  ミサイル: {}発", self.state.roster.pair_count());
            info!("  シード値: {}", self.state.config.sim.seed);
        }
    }

    /// 1ティック分の掃引を実行
    pub fn tick(&mut self, renderer: &mut dyn IRenderer) -> TickReport {
        if self.state.roster.is_empty() {
            warn!("TICK_SKIPPED: ロスターが未初期化のためティックをスキップしました");
            return TickReport {
                tick: self.state.tick,
                pairs_destroyed: 0,
                respawned: false,
                alive: 0,
            };
        }

        let mut pairs_destroyed = 0;
        let mut respawned = false;

        for index in 0..self.state.roster.len() {
            let Some(entity) = self.state.roster.get(index) else {
                break;
            };
            if !entity.alive {
                continue;
            }

            if entity.is_plane() {
                plane::decide(&mut self.state, index);
            } else {
                missile::decide(&mut self.state, index);
            }

            match self.state.advance_real(index, 1, renderer) {
                CollisionOutcome::None => {}
                CollisionOutcome::Destroyed { .. } => pairs_destroyed += 1,
                CollisionOutcome::DestroyedAndRespawned { .. } => {
                    // 新しいロスターは次のティックから動かす
                    pairs_destroyed += 1;
                    respawned = true;
                    break;
                }
            }
        }

        self.push_poses(renderer);
        renderer.request_redraw();

        self.state.tick += 1;
        self.state.stats.ticks += 1;

        let alive = self.state.roster.alive_count();
        if self.verbose_level > 2 {
            trace!(tick = self.state.tick, alive, "ティック完了");
        }

        TickReport {
            tick: self.state.tick,
            pairs_destroyed,
            respawned,
            alive,
        }
    }

    /// 待ち時間なしで `ticks` ティック実行
    pub fn run_ticks(&mut self, ticks: u64, renderer: &mut dyn IRenderer) -> SimulationStats {
        for _ in 0..ticks {
            self.tick(renderer);

            if self.state.tick % 100 == 0 && self.verbose_level > 0 {
                let progress = (self.state.tick as f64 / ticks.max(1) as f64) * 100.0;
                info!(
                    "進行状況: {:.1}% (ティック: {}, 生存: {})",
                    progress.min(100.0),
                    self.state.tick,
                    self.state.roster.alive_count()
                );
            }
        }
        self.state.stats
    }

    /// 設定の最大ティック数までバッチ実行
    pub fn run(&mut self, renderer: &mut dyn IRenderer) -> SimulationStats {
        info!("=== シミュレーション実行開始 ===");

        let remaining = self.state.config.sim.max_ticks.saturating_sub(self.state.tick);
        let stats = self.run_ticks(remaining, renderer);

        self.log_summary();
        stats
    }

    /// 時間圧縮倍率の変更
    ///
    /// 有限かつ正の値のみ受け付けます。不正な値は報告して無視し、
    /// 現在の倍率を維持します。
    pub fn set_speed_multiplier(
        &mut self,
        value: f64,
        renderer: &mut dyn IRenderer,
    ) -> Result<(), SimulationError> {
        if !value.is_finite() || value <= 0.0 {
            error!(
                requested = value,
                current = self.state.speed_multiplier,
                "SPEED_MULTIPLIER_REJECTED: 不正な時間圧縮倍率を無視しました"
            );
            return Err(SimulationError::InvalidSpeedMultiplier(value));
        }

        self.state.speed_multiplier = value;
        renderer.set_simulation_speed_multiplier(value);
        debug!(speed_multiplier = value, "SPEED_MULTIPLIER_CHANGED: 時間圧縮倍率を変更しました");
        Ok(())
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.state.speed_multiplier
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    pub fn current_tick(&self) -> u64 {
        self.state.tick
    }

    pub fn max_ticks(&self) -> u64 {
        self.state.config.sim.max_ticks
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    pub fn stats(&self) -> SimulationStats {
        self.state.stats
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        self.state.roster.snapshot(self.state.tick)
    }

    pub fn log_summary(&self) {
        let stats = &self.state.stats;
        info!("=== シミュレーション完了 ===");
        info!("総ティック数: {}", stats.ticks);
        info!("撃墜ペア数: {}", stats.pairs_destroyed);
        info!("ロスター再生成: {}回", stats.respawns);
        info!(
            "中心復帰旋回: {}回 (上限到達: {}回)",
            stats.forced_corrections, stats.correction_fallbacks
        );
        info!("任意旋回: {}回", stats.random_turns);
        info!("再照準: {}回 (加速: {}回)", stats.retargets, stats.missile_accelerations);
    }

    fn push_poses(&self, renderer: &mut dyn IRenderer) {
        for entity in self.state.roster.iter().filter(|e| e.alive) {
            if let Some(handle) = entity.render_handle {
                renderer.set_entity_pose(handle, entity.position, entity.heading);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{NullRenderer, RecordingRenderer};

    fn engine_with_seed(seed: u64) -> SimulationEngine {
        let mut config = ScenarioConfig::default();
        config.sim.seed = seed;
        SimulationEngine::new(config, 0).unwrap()
    }

    #[test]
    fn test_zero_tick_period_is_fatal() {
        let mut config = ScenarioConfig::default();
        config.sim.tick_period_ms = 0.0;
        assert!(matches!(
            SimulationEngine::new(config, 0),
            Err(SimulationError::InvalidTickPeriod(_))
        ));

        let mut config = ScenarioConfig::default();
        config.sim.tick_period_ms = -5.0;
        assert!(SimulationEngine::new(config, 0).is_err());
    }

    #[test]
    fn test_unrepresentable_tick_period_is_fatal() {
        let mut config = ScenarioConfig::default();
        config.sim.tick_period_ms = f64::MAX;
        assert!(matches!(
            SimulationEngine::new(config, 0),
            Err(SimulationError::InvalidTickPeriod(_))
        ));
    }

    #[test]
    fn test_tick_period_has_lower_bound() {
        let mut config = ScenarioConfig::default();
        config.sim.tick_period_ms = 1e-9;
        let engine = SimulationEngine::new(config, 0).unwrap();
        assert_eq!(engine.tick_period(), Duration::from_micros(1));

        let engine = engine_with_seed(1);
        assert_eq!(engine.tick_period(), Duration::from_millis(30));
    }

    #[test]
    fn test_invalid_scenario_is_fatal() {
        let mut config = ScenarioConfig::default();
        config.sim.pair_count = 0;
        assert!(matches!(SimulationEngine::new(config, 0), Err(SimulationError::Scenario(_))));
    }

    #[test]
    fn test_headings_stay_normalized() {
        let mut engine = engine_with_seed(11);
        let mut renderer = NullRenderer;
        engine.initialize(&mut renderer);

        for _ in 0..1500 {
            engine.tick(&mut renderer);
            for entity in engine.state().roster.iter() {
                assert!(entity.heading.is_normalized(), "{:?}", entity.heading);
            }
        }
    }

    #[test]
    fn test_missile_targets_are_fixed() {
        let mut engine = engine_with_seed(5);
        let mut renderer = NullRenderer;
        engine.initialize(&mut renderer);

        for _ in 0..500 {
            engine.tick(&mut renderer);
            let roster = &engine.state().roster;
            for i in (1..roster.len()).step_by(2) {
                assert_eq!(roster.target_of(i), Some(i - 1));
                assert_eq!(roster.target_of(i - 1), None);
            }
        }
    }

    #[test]
    fn test_same_seed_runs_are_identical() {
        let mut a = engine_with_seed(99);
        let mut b = engine_with_seed(99);
        let mut renderer = NullRenderer;
        a.initialize(&mut renderer);
        b.initialize(&mut renderer);

        for _ in 0..800 {
            a.tick(&mut renderer);
            b.tick(&mut renderer);
            let pairs = a.state().roster.iter().zip(b.state().roster.iter());
            for (ea, eb) in pairs {
                assert_eq!(ea.position.x.to_bits(), eb.position.x.to_bits());
                assert_eq!(ea.position.y.to_bits(), eb.position.y.to_bits());
                assert_eq!(ea.position.z.to_bits(), eb.position.z.to_bits());
                assert_eq!(ea.heading, eb.heading);
                assert_eq!(ea.alive, eb.alive);
            }
        }
        assert_eq!(a.stats(), b.stats());
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = engine_with_seed(1);
        let mut b = engine_with_seed(2);
        let mut renderer = NullRenderer;
        a.initialize(&mut renderer);
        b.initialize(&mut renderer);
        a.run_ticks(10, &mut renderer);
        b.run_ticks(10, &mut renderer);
        assert_ne!(a.state().roster, b.state().roster);
    }

    #[test]
    fn test_respawn_after_wipe() {
        let mut engine = engine_with_seed(3);
        let mut renderer = RecordingRenderer::default();
        engine.initialize(&mut renderer);

        // 最後の1ペアだけ生存させ、ミサイルを機体に重ねる
        let state = engine.state_mut();
        let pairs = state.roster.pair_count();
        for i in 2..pairs * 2 {
            state.roster.get_mut(i).unwrap().alive = false;
        }
        let plane = *state.roster.get(0).unwrap();
        let missile = state.roster.get_mut(1).unwrap();
        missile.position = plane.position;
        missile.heading = plane.heading;
        missile.speed = plane.speed;
        missile.missile_retarget_counter = 0;

        let report = engine.tick(&mut renderer);

        assert!(report.respawned);
        assert_eq!(report.pairs_destroyed, 1);
        let roster = &engine.state().roster;
        assert_eq!(roster.len(), pairs * 2);
        assert!(roster.iter().all(|e| e.alive));
        assert_eq!(report.alive, pairs * 2);

        let report = engine.tick(&mut renderer);
        assert!(!report.respawned);
    }

    #[test]
    fn test_tick_pushes_poses_and_one_redraw() {
        let mut engine = engine_with_seed(8);
        let mut renderer = RecordingRenderer::default();
        engine.initialize(&mut renderer);
        let redraws = renderer.redraws;
        let poses = renderer.poses;

        let report = engine.tick(&mut renderer);

        assert_eq!(renderer.redraws, redraws + 1);
        assert_eq!(renderer.poses, poses + report.alive);
        assert_eq!(renderer.speed_multiplier, Some(1.0));
    }

    #[test]
    fn test_speed_multiplier_validation() {
        let mut engine = engine_with_seed(4);
        let mut renderer = RecordingRenderer::default();

        assert!(engine.set_speed_multiplier(2.0, &mut renderer).is_ok());
        assert_eq!(engine.speed_multiplier(), 2.0);
        assert_eq!(renderer.speed_multiplier, Some(2.0));

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(engine.set_speed_multiplier(bad, &mut renderer).is_err());
            assert_eq!(engine.speed_multiplier(), 2.0);
        }
    }

    #[test]
    fn test_tick_before_initialize_is_skipped() {
        let mut engine = engine_with_seed(4);
        let mut renderer = RecordingRenderer::default();
        let report = engine.tick(&mut renderer);
        assert_eq!(report.tick, 0);
        assert_eq!(renderer.redraws, 0);
    }

    #[test]
    fn test_run_stops_at_max_ticks() {
        let mut config = ScenarioConfig::default();
        config.sim.max_ticks = 250;
        let mut engine = SimulationEngine::new(config, 0).unwrap();
        let mut renderer = NullRenderer;
        engine.initialize(&mut renderer);

        let stats = engine.run(&mut renderer);
        assert_eq!(stats.ticks, 250);
        assert_eq!(engine.current_tick(), 250);
    }
}
