use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::models::collision::{self, CollisionOutcome};
use crate::models::common::*;
use crate::models::kinematics::{self, StepMode};
use crate::models::roster::Roster;
use crate::models::traits::IRenderer;
use crate::scenario::ScenarioConfig;

/// 実行統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulationStats {
    pub ticks: u64,
    pub pairs_destroyed: u64,
    pub respawns: u64,
    pub forced_corrections: u64,
    /// 試行上限に達して最後の候補を採用した回数
    pub correction_fallbacks: u64,
    pub random_turns: u64,
    pub retargets: u64,
    pub missile_accelerations: u64,
}

/// シミュレーションの全可変状態
///
/// コントローラー・ステッパー・衝突判定はいずれもこの構造体を参照で受け取り、
/// グローバル状態は持ちません。
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub config: ScenarioConfig,
    pub roster: Roster,
    pub rng: ChaCha8Rng,
    /// 時間圧縮倍率
    pub speed_multiplier: f64,
    pub tick: u64,
    pub stats: SimulationStats,
}

impl SimulationState {
    /// 空のロスターで状態を作成（乱数はシード値で初期化）
    pub fn new(config: ScenarioConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.sim.seed);
        let speed_multiplier = config.sim.speed_multiplier;
        Self {
            config,
            roster: Roster::default(),
            rng,
            speed_multiplier,
            tick: 0,
            stats: SimulationStats::default(),
        }
    }

    /// 組み立て済みのロスターで状態を作成
    pub fn with_roster(config: ScenarioConfig, roster: Roster) -> Self {
        let mut state = Self::new(config);
        state.roster = roster;
        state
    }

    /// 設定のペア数でロスター全体を生成し直す
    pub fn spawn_roster(&mut self, renderer: &mut dyn IRenderer) {
        let pair_count = self.config.sim.pair_count;
        self.roster.reset(pair_count, &self.config, &mut self.rng, renderer);
    }

    /// 世界中心からの距離
    pub fn distance_from_center(&self, position: &Position3D) -> f64 {
        position.distance_3d(&self.config.world.center_position())
    }

    /// 確定ステップ
    ///
    /// ミサイルの場合はステップ後に衝突判定を行います。
    pub fn advance_real(&mut self, index: usize, steps: u32, renderer: &mut dyn IRenderer) -> CollisionOutcome {
        let speed_multiplier = self.speed_multiplier;
        let Some(entity) = self.roster.get_mut(index) else {
            return CollisionOutcome::None;
        };
        if !entity.alive {
            return CollisionOutcome::None;
        }
        kinematics::advance(entity, steps, speed_multiplier);

        if entity.is_missile() {
            collision::check_collision(self, index, renderer)
        } else {
            CollisionOutcome::None
        }
    }

    /// 試行ステップ（状態は変更しない）
    pub fn trial_position(&self, index: usize, steps: u32) -> Option<Position3D> {
        self.roster
            .get(index)
            .map(|entity| kinematics::trial(entity, steps, self.speed_multiplier))
    }

    /// モードを指定してステップを実行し、ステップ後の位置を返す
    pub fn advance(
        &mut self,
        index: usize,
        steps: u32,
        mode: StepMode,
        renderer: &mut dyn IRenderer,
    ) -> Option<Position3D> {
        match mode {
            StepMode::Trial => self.trial_position(index, steps),
            StepMode::Real => {
                self.advance_real(index, steps, renderer);
                self.roster.get(index).map(|e| e.position)
            }
        }
    }
}
