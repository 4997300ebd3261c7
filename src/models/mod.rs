// 基本的なデータ型と数学ユーティリティ
pub mod common;

// 描画コラボレーターのインターフェース（trait）定義
pub mod traits;

// エンティティとロスター
pub mod entity;
pub mod roster;
pub mod state;

// 運動更新・判断・衝突判定
pub mod kinematics;
pub mod plane;
pub mod missile;
pub mod collision;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use entity::{Entity, EntityRole};
pub use roster::{Roster, RosterSnapshot};
pub use state::{SimulationState, SimulationStats};
pub use kinematics::StepMode;
pub use plane::PlaneDecision;
pub use missile::MissileDecision;
pub use collision::CollisionOutcome;
