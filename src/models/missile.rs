use rand::Rng;
use tracing::trace;

use crate::models::common::*;
use crate::models::state::SimulationState;

/// ミサイルコントローラーの判断結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissileDecision {
    /// 再照準周期に達していない
    Hold,
    /// 目標へ向け直した
    Retargeted { accelerated: bool },
}

/// 目標方向の方位を計算
///
/// ヨーは x/y 差の `atan2`、ピッチは x/z 差の主値 `atan(dz/dx)` です。
/// ステッパーのz成分は `cos(yaw)` を掛けるため、この組み合わせで
/// 高度方向の移動は常に `dz` の符号に従います。ロールは目標機体から引き継ぎます。
pub fn aim_heading(from: &Position3D, to: &Position3D, target_roll: f64) -> Heading3D {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let dz = to.z - from.z;

    let yaw = math_utils::rad_to_deg(dy.atan2(dx));
    let pitch = if dx == 0.0 {
        if dz == 0.0 { 0.0 } else { 90.0f64.copysign(dz) }
    } else {
        math_utils::rad_to_deg((dz / dx).atan())
    };

    Heading3D::new(target_roll, pitch, yaw).wrapped()
}

/// ミサイルの1ティック分の判断
///
/// 再照準カウンターが周期に達したら補間なしで目標機体へ向け直し、
/// 速度が上限未満なら一定確率で加速します。速度は上限を超えません。
pub fn decide(state: &mut SimulationState, index: usize) -> MissileDecision {
    let Some(missile) = state.roster.get(index).copied() else {
        return MissileDecision::Hold;
    };
    let Some(target_index) = missile.target_index() else {
        return MissileDecision::Hold;
    };
    if !missile.alive {
        return MissileDecision::Hold;
    }
    let Some(target) = state.roster.get(target_index).copied() else {
        return MissileDecision::Hold;
    };
    if !target.alive {
        return MissileDecision::Hold;
    }

    let config = &state.config.missile;
    let period = config.retarget_period_ticks;
    let cap = config.speed_cap(target.speed);
    let acceleration_factor = config.acceleration_factor;
    let acceleration_probability = config.acceleration_probability;

    let counter = missile.missile_retarget_counter + 1;
    if counter < period {
        if let Some(m) = state.roster.get_mut(index) {
            m.missile_retarget_counter = counter;
        }
        return MissileDecision::Hold;
    }

    let heading = aim_heading(&missile.position, &target.position, target.heading.roll());
    let mut speed = missile.speed;
    let mut accelerated = false;
    if speed < cap && state.rng.gen_bool(acceleration_probability) {
        speed = (speed * acceleration_factor).min(cap);
        accelerated = true;
    }

    if let Some(m) = state.roster.get_mut(index) {
        m.missile_retarget_counter = 0;
        m.heading = heading;
        m.speed = speed;
    }
    state.stats.retargets += 1;
    if accelerated {
        state.stats.missile_accelerations += 1;
    }

    trace!(
        tick = state.tick,
        missile_index = index,
        target_index,
        yaw = heading.yaw(),
        pitch = heading.pitch(),
        speed,
        "MISSILE_RETARGET: ミサイルが目標へ向け直しました"
    );

    MissileDecision::Retargeted { accelerated }
}
