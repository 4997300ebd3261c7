use rand::Rng;
use tracing::{debug, warn};

use crate::models::common::*;
use crate::models::entity::Entity;
use crate::models::kinematics;
use crate::models::state::SimulationState;
use crate::scenario::PlaneConfig;

/// 機体コントローラーの判断結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneDecision {
    /// 現在の機動を継続
    Continue,
    /// 中心復帰の強制旋回を開始
    ForcedCorrection { attempts: u32, fallback: bool },
    /// 回避のための任意旋回を開始
    RandomTurn,
}

/// ランダムな旋回量と旋回ステップ数を生成
///
/// ロール・ピッチは小さな対称範囲、ヨーは全周の範囲から引きます。
pub fn random_turn<R: Rng + ?Sized>(rng: &mut R, config: &PlaneConfig) -> (Heading3D, u32) {
    let duration = rng.gen_range(config.turn_ticks_min..=config.turn_ticks_max);
    let rp = config.roll_pitch_delta_max_deg;
    let yaw = config.yaw_delta_max_deg;
    let total = Heading3D::new(
        rng.gen_range(-rp..=rp),
        rng.gen_range(-rp..=rp),
        rng.gen_range(-yaw..=yaw),
    );
    (total, duration)
}

/// 機体の1ティック分の機動判断
///
/// 世界中心から `max_radius` を超えていて抑止カウンターが0なら、
/// 先読みで中心に近づくと確認できた旋回を棄却サンプリングで選びます。
/// 範囲内で直進中なら一定確率で任意旋回を始めます。
pub fn decide(state: &mut SimulationState, index: usize) -> PlaneDecision {
    let SimulationState {
        config,
        roster,
        rng,
        stats,
        speed_multiplier,
        tick,
    } = state;

    let Some(plane) = roster.get_mut(index) else {
        return PlaneDecision::Continue;
    };
    if !plane.alive || !plane.is_plane() {
        return PlaneDecision::Continue;
    }

    let center = config.world.center_position();
    let distance = plane.position.distance_3d(&center);

    if distance > config.world.max_radius && !plane.is_correcting() {
        let (attempts, fallback) =
            choose_correction_turn(plane, &center, &config.plane, *speed_multiplier, rng);
        plane.distance_correction_ticks_remaining = config.plane.correction_ticks;
        stats.forced_corrections += 1;

        if fallback {
            stats.correction_fallbacks += 1;
            warn!(
                tick = *tick,
                plane_index = index,
                attempts,
                distance,
                "FORCED_CORRECTION_FALLBACK: 試行上限に達したため最後の候補を採用しました"
            );
        } else {
            debug!(
                tick = *tick,
                plane_index = index,
                attempts,
                distance,
                turn_ticks = plane.turn_ticks_remaining,
                "FORCED_CORRECTION: 中心復帰旋回を開始しました"
            );
        }
        return PlaneDecision::ForcedCorrection { attempts, fallback };
    }

    if !plane.is_turning() && rng.gen_bool(config.plane.random_turn_probability) {
        let (total, duration) = random_turn(rng, &config.plane);
        plane.begin_turn(total, duration);
        stats.random_turns += 1;
        return PlaneDecision::RandomTurn;
    }

    PlaneDecision::Continue
}

/// 中心復帰旋回の棄却サンプリング
///
/// 候補旋回を積んだ複製を `lookahead_ticks` だけ試行ステップし、終点の距離が
/// 現在距離と「旋回しない場合」の終点距離の両方より小さければ採用します。
/// 試行上限に達したら最後の候補を採用します。戻り値は（試行回数, 上限到達か）。
fn choose_correction_turn<R: Rng + ?Sized>(
    plane: &mut Entity,
    center: &Position3D,
    config: &PlaneConfig,
    speed_multiplier: f64,
    rng: &mut R,
) -> (u32, bool) {
    let lookahead = config.lookahead_ticks;
    let current = plane.position.distance_3d(center);
    let baseline = kinematics::trial(plane, lookahead, speed_multiplier).distance_3d(center);

    let mut attempts = 0;
    loop {
        attempts += 1;
        let (total, duration) = random_turn(rng, config);
        let mut candidate = *plane;
        candidate.begin_turn(total, duration);

        let end = kinematics::trial(&candidate, lookahead, speed_multiplier).distance_3d(center);
        let accepted = end < current && end < baseline;
        if accepted || attempts >= config.max_correction_attempts {
            plane.heading_delta = candidate.heading_delta;
            plane.turn_ticks_remaining = candidate.turn_ticks_remaining;
            return (attempts, !accepted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roster::Roster;
    use crate::scenario::ScenarioConfig;

    /// 中心から `distance` 離れた位置で外向きに飛ぶ機体
    fn state_with_outbound_plane(distance: f64) -> SimulationState {
        let config = ScenarioConfig::default();
        let center = config.world.center_position();
        let plane = Entity::new_plane(
            1,
            Position3D::new(center.x + distance, center.y, center.z),
            Heading3D::new(0.0, 0.0, 0.0),
            config.plane.speed,
        );
        let missile = Entity::new_missile(
            0,
            Position3D::new(center.x, center.y, center.z),
            Heading3D::default(),
            config.plane.speed * config.missile.initial_speed_factor,
        );
        let roster = Roster::from_entities(vec![plane, missile]).unwrap();
        SimulationState::with_roster(config, roster)
    }

    #[test]
    fn test_forced_correction_turns_back_toward_center() {
        let mut state = state_with_outbound_plane(1100.0);
        let center = state.config.world.center_position();
        let lookahead = state.config.plane.lookahead_ticks;

        let straight = state.roster.get(0).copied().unwrap();
        let decision = decide(&mut state, 0);

        assert!(matches!(decision, PlaneDecision::ForcedCorrection { fallback: false, .. }));
        let plane = state.roster.get(0).copied().unwrap();
        assert!(plane.turn_ticks_remaining > 0);
        assert_eq!(plane.distance_correction_ticks_remaining, state.config.plane.correction_ticks);

        let turned_end = kinematics::trial(&plane, lookahead, 1.0).distance_3d(&center);
        let straight_end = kinematics::trial(&straight, lookahead, 1.0).distance_3d(&center);
        assert!(turned_end < straight_end);
        assert!(turned_end < 1100.0);
        // 判断だけでは位置は動かない
        assert_eq!(plane.position, straight.position);
        assert_eq!(state.stats.forced_corrections, 1);
    }

    #[test]
    fn test_correction_suppressed_while_counter_running() {
        let mut state = state_with_outbound_plane(1100.0);
        state.config.plane.random_turn_probability = 0.0;
        state.roster.get_mut(0).unwrap().distance_correction_ticks_remaining = 5;

        assert_eq!(decide(&mut state, 0), PlaneDecision::Continue);
        assert_eq!(state.roster.get(0).unwrap().turn_ticks_remaining, 0);
    }

    #[test]
    fn test_fallback_after_attempt_limit() {
        let mut state = state_with_outbound_plane(1100.0);
        // ヨー旋回を禁止すると中心へ戻る候補は生成できない
        state.config.plane.yaw_delta_max_deg = 0.0;
        state.config.plane.roll_pitch_delta_max_deg = 0.0;
        state.config.plane.max_correction_attempts = 3;

        let decision = decide(&mut state, 0);

        assert_eq!(decision, PlaneDecision::ForcedCorrection { attempts: 3, fallback: true });
        assert!(state.roster.get(0).unwrap().turn_ticks_remaining > 0);
        assert_eq!(state.stats.correction_fallbacks, 1);
    }

    #[test]
    fn test_random_turn_inside_radius() {
        let mut state = state_with_outbound_plane(10.0);
        state.config.plane.random_turn_probability = 1.0;

        assert_eq!(decide(&mut state, 0), PlaneDecision::RandomTurn);
        let plane = state.roster.get(0).unwrap();
        let cfg = &state.config.plane;
        assert!((cfg.turn_ticks_min..=cfg.turn_ticks_max).contains(&plane.turn_ticks_remaining));
        let n = plane.turn_ticks_remaining as f64;
        assert!(plane.heading_delta.x.abs() * n <= cfg.roll_pitch_delta_max_deg + 1e-9);
        assert!(plane.heading_delta.z.abs() * n <= cfg.yaw_delta_max_deg + 1e-9);
    }

    #[test]
    fn test_no_random_turn_while_turning() {
        let mut state = state_with_outbound_plane(10.0);
        state.config.plane.random_turn_probability = 1.0;
        state.roster.get_mut(0).unwrap().begin_turn(Heading3D::new(0.0, 0.0, 30.0), 3);

        assert_eq!(decide(&mut state, 0), PlaneDecision::Continue);
        assert_eq!(state.roster.get(0).unwrap().turn_ticks_remaining, 3);
    }

    #[test]
    fn test_missile_index_is_ignored() {
        let mut state = state_with_outbound_plane(1100.0);
        assert_eq!(decide(&mut state, 1), PlaneDecision::Continue);
    }
}
