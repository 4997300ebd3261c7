use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Position3D as ModelPosition3D;

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

impl Default for ScenarioMeta {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: "default".to_string(),
            description: "空中戦デモ標準設定".to_string(),
        }
    }
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// タイマー周期（ミリ秒）
    pub tick_period_ms: f64,
    /// 実行する最大ティック数
    pub max_ticks: u64,
    pub seed: u64,
    /// 時間圧縮倍率（全エンティティの1ティックあたり変位に一律に掛かる）
    pub speed_multiplier: f64,
    /// 機体とミサイルのペア数
    pub pair_count: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 30.0,
            max_ticks: 2000,
            seed: 42,
            speed_multiplier: 1.0,
            pair_count: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// 世界設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    /// 世界の中心
    pub center: Position3D,
    /// 中心からの最大許容距離
    pub max_radius: f64,
    /// 機体の初期配置半径（max_radiusに対する割合）
    pub spawn_radius_fraction: f64,
    /// 初期高度のばらつき（中心高度±）
    pub altitude_spread: f64,
    /// 撃墜判定距離（max_radiusに対する割合）
    pub destroy_distance_fraction: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            center: Position3D { x: 0.0, y: 0.0, z: 500.0 },
            max_radius: 1000.0,
            spawn_radius_fraction: 0.6,
            altitude_spread: 50.0,
            destroy_distance_fraction: 0.02,
        }
    }
}

impl WorldConfig {
    pub fn center_position(&self) -> ModelPosition3D {
        ModelPosition3D::new(self.center.x, self.center.y, self.center.z)
    }

    /// 撃墜判定距離
    pub fn destroy_distance(&self) -> f64 {
        self.destroy_distance_fraction * self.max_radius
    }

    pub fn spawn_radius(&self) -> f64 {
        self.spawn_radius_fraction * self.max_radius
    }
}

/// 機体の機動設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaneConfig {
    /// 1ステップあたりの移動量
    pub speed: f64,
    /// 1ティックあたりの任意旋回の発生確率
    pub random_turn_probability: f64,
    pub turn_ticks_min: u32,
    pub turn_ticks_max: u32,
    /// ロール・ピッチの旋回量の最大値（±、度）
    pub roll_pitch_delta_max_deg: f64,
    /// ヨーの旋回量の最大値（±、度）
    pub yaw_delta_max_deg: f64,
    /// 中心復帰旋回の評価に使う先読みステップ数
    pub lookahead_ticks: u32,
    /// 中心復帰旋回後に再発動を抑止するステップ数
    pub correction_ticks: u32,
    /// 棄却サンプリングの試行上限
    pub max_correction_attempts: u32,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            speed: 4.0,
            random_turn_probability: 0.01,
            turn_ticks_min: 20,
            turn_ticks_max: 40,
            roll_pitch_delta_max_deg: 10.0,
            yaw_delta_max_deg: 180.0,
            lookahead_ticks: 120,
            correction_ticks: 120,
            max_correction_attempts: 200,
        }
    }
}

/// ミサイルの追尾設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MissileConfig {
    /// 初速（機体速度に対する倍率）
    pub initial_speed_factor: f64,
    /// 速度上限（機体速度に対する倍率）
    pub speed_cap_factor: f64,
    /// 加速時の乗数
    pub acceleration_factor: f64,
    /// 再照準ティックごとの加速確率
    pub acceleration_probability: f64,
    /// 再照準の周期（ティック）
    pub retarget_period_ticks: u32,
    /// 機体からの初期配置半径
    pub spawn_proximity_radius: f64,
}

impl Default for MissileConfig {
    fn default() -> Self {
        Self {
            initial_speed_factor: 0.8,
            speed_cap_factor: 1.2,
            acceleration_factor: 1.02,
            acceleration_probability: 0.1,
            retarget_period_ticks: 5,
            spawn_proximity_radius: 150.0,
        }
    }
}

impl MissileConfig {
    /// 機体速度から求めたミサイル速度の上限
    pub fn speed_cap(&self, plane_speed: f64) -> f64 {
        self.speed_cap_factor * plane_speed
    }
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub world: WorldConfig,
    pub plane: PlaneConfig,
    pub missile: MissileConfig,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列から読み込み（検証込み）
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::ParseError(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let invalid = |msg: &str| Err(ScenarioError::ValidationError(msg.to_string()));
        // NaN と無限大は比較をすり抜けるため先に除外する
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let non_negative = |v: f64| v.is_finite() && v >= 0.0;

        // 時間設定の検証
        if !positive(self.sim.tick_period_ms) {
            return invalid("tick_period_ms must be positive");
        }
        if !positive(self.sim.speed_multiplier) {
            return invalid("speed_multiplier must be positive");
        }
        if self.sim.pair_count == 0 {
            return invalid("pair_count must be at least 1");
        }

        // 世界設定の検証
        let world = &self.world;
        let center = &world.center;
        if !(center.x.is_finite() && center.y.is_finite() && center.z.is_finite()) {
            return invalid("center must be finite");
        }
        if !positive(world.max_radius) {
            return invalid("max_radius must be positive");
        }
        if !(world.spawn_radius_fraction > 0.0 && world.spawn_radius_fraction <= 1.0) {
            return invalid("spawn_radius_fraction must be in (0, 1]");
        }
        if !(world.destroy_distance_fraction > 0.0 && world.destroy_distance_fraction < 1.0) {
            return invalid("destroy_distance_fraction must be in (0, 1)");
        }
        if !non_negative(world.altitude_spread) {
            return invalid("altitude_spread must not be negative");
        }

        // 機体設定の検証
        let plane = &self.plane;
        if !positive(plane.speed) {
            return invalid("plane.speed must be positive");
        }
        if !(0.0..=1.0).contains(&plane.random_turn_probability) {
            return invalid("random_turn_probability must be in [0, 1]");
        }
        if plane.turn_ticks_min == 0 || plane.turn_ticks_min > plane.turn_ticks_max {
            return invalid("turn_ticks_min must be >= 1 and <= turn_ticks_max");
        }
        if !non_negative(plane.roll_pitch_delta_max_deg) || !non_negative(plane.yaw_delta_max_deg) {
            return invalid("turn delta ranges must be finite and not negative");
        }
        if plane.lookahead_ticks == 0 {
            return invalid("lookahead_ticks must be at least 1");
        }
        if plane.max_correction_attempts == 0 {
            return invalid("max_correction_attempts must be at least 1");
        }

        // ミサイル設定の検証
        let missile = &self.missile;
        if !positive(missile.initial_speed_factor) {
            return invalid("initial_speed_factor must be positive");
        }
        if !missile.speed_cap_factor.is_finite() || missile.speed_cap_factor < missile.initial_speed_factor {
            return invalid("speed_cap_factor must be finite and >= initial_speed_factor");
        }
        if !missile.acceleration_factor.is_finite() || missile.acceleration_factor <= 1.0 {
            return invalid("acceleration_factor must be finite and greater than 1");
        }
        if !(0.0..=1.0).contains(&missile.acceleration_probability) {
            return invalid("acceleration_probability must be in [0, 1]");
        }
        if missile.retarget_period_ticks == 0 {
            return invalid("retarget_period_ticks must be at least 1");
        }
        if !non_negative(missile.spawn_proximity_radius) {
            return invalid("spawn_proximity_radius must not be negative");
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("タイマー周期: {:.1}ms", self.sim.tick_period_ms);
        println!("最大ティック数: {}", self.sim.max_ticks);
        println!("シード値: {}", self.sim.seed);
        println!("時間圧縮倍率: {:.2}", self.sim.speed_multiplier);
        println!();

        println!("=== 世界 ===");
        println!(
            "中心: ({:.0}, {:.0}, {:.0})",
            self.world.center.x, self.world.center.y, self.world.center.z
        );
        println!("最大半径: {:.0}", self.world.max_radius);
        println!("撃墜判定距離: {:.1}", self.world.destroy_distance());
        println!();

        println!("=== 戦力 ===");
        println!("機体: {}機 (速度: {:.2})", self.sim.pair_count, self.plane.speed);
        println!(
            "ミサイル: {}発 (初速: {:.2}, 上限: {:.2})",
            self.sim.pair_count,
            self.missile.initial_speed_factor * self.plane.speed,
            self.missile.speed_cap(self.plane.speed)
        );
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    IoError(PathBuf, #[source] std::io::Error),
    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),
    #[error("設定検証エラー: {0}")]
    ValidationError(String),
}
