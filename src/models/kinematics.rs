//! # 運動更新（ステッパー）
//!
//! 方位と速度から位置を進める処理です。確定ステップはエンティティを直接
//! 書き換え、試行ステップは値コピーの上で計算して結果の位置だけを返します。
//!
//! 位置更新式は次の通りです（v = speed × 時間圧縮倍率）:
//!
//! ```text
//! x += v · cos(yaw) · cos(pitch)
//! y += v · sin(yaw) · cos(pitch)
//! z += v · sin(pitch) · cos(yaw)
//! ```
//!
//! z成分は `cos(pitch)` ではなく `cos(yaw)` を掛けます。デモ本来の
//! 擬似3D運動を再現するため、この式は変更しません。

use crate::models::common::*;
use crate::models::entity::Entity;

/// ステップの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// 状態を確定させる通常ステップ
    Real,
    /// 先読み評価用の非確定ステップ
    Trial,
}

/// 1ステップ分の変位を計算
pub fn displacement(heading: &Heading3D, speed: f64) -> Position3D {
    let yaw = math_utils::deg_to_rad(heading.yaw());
    let pitch = math_utils::deg_to_rad(heading.pitch());
    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    let (sin_pitch, cos_pitch) = pitch.sin_cos();

    Position3D::new(
        speed * cos_yaw * cos_pitch,
        speed * sin_yaw * cos_pitch,
        speed * sin_pitch * cos_yaw,
    )
}

/// エンティティを `steps` ステップ進める（確定）
///
/// 旋回中の機体は毎ステップ `heading_delta` を加算して正規化し、
/// 残りステップ数を減らします。撃墜済みのエンティティには何もしません。
pub fn advance(entity: &mut Entity, steps: u32, speed_multiplier: f64) {
    if !entity.alive {
        return;
    }

    let speed = entity.speed * speed_multiplier;
    for _ in 0..steps {
        entity.position = entity.position + displacement(&entity.heading, speed);

        if entity.is_turning() && entity.is_plane() {
            entity.heading = (entity.heading + entity.heading_delta).wrapped();
            entity.turn_ticks_remaining -= 1;
        }

        if entity.distance_correction_ticks_remaining != 0 {
            entity.distance_correction_ticks_remaining -= 1;
        }
    }
}

/// 試行ステップ
///
/// エンティティを値コピーして `steps` ステップ進め、到達位置だけを返します。
/// 呼び出し元の状態は借用のみで一切変更されません。
pub fn trial(entity: &Entity, steps: u32, speed_multiplier: f64) -> Position3D {
    let mut scratch = *entity;
    advance(&mut scratch, steps, speed_multiplier);
    scratch.position
}
