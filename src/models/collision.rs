use tracing::info;

use crate::models::state::SimulationState;
use crate::models::traits::IRenderer;

/// 衝突判定の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// 何も起きなかった
    None,
    /// 機体とミサイルのペアが撃墜された
    Destroyed { plane: usize, missile: usize },
    /// 最後のペアが撃墜され、ロスター全体が再生成された
    DestroyedAndRespawned { plane: usize, missile: usize },
}

impl CollisionOutcome {
    pub fn is_respawn(&self) -> bool {
        matches!(self, CollisionOutcome::DestroyedAndRespawned { .. })
    }
}

/// ミサイルと目標機体の接近判定
///
/// 距離が `destroy_distance_fraction × max_radius` 未満ならペアを同時に撃墜し、
/// 両方の表示オブジェクトを解放します。全滅した場合はロスター全体を
/// 再生成して再描画を要求します。
///
/// 撃墜済みのミサイルや機体インデックスを渡した場合は何もしません。
pub fn check_collision(
    state: &mut SimulationState,
    missile_index: usize,
    renderer: &mut dyn IRenderer,
) -> CollisionOutcome {
    let Some(missile) = state.roster.get(missile_index) else {
        return CollisionOutcome::None;
    };
    if !missile.alive {
        return CollisionOutcome::None;
    }
    let Some(plane_index) = missile.target_index() else {
        return CollisionOutcome::None;
    };
    let Some(plane) = state.roster.get(plane_index) else {
        return CollisionOutcome::None;
    };

    let distance = missile.position.distance_3d(&plane.position);
    if distance >= state.config.world.destroy_distance() {
        return CollisionOutcome::None;
    }

    let hit_position = missile.position;
    for index in [plane_index, missile_index] {
        if let Some(entity) = state.roster.get_mut(index) {
            entity.alive = false;
            if let Some(handle) = entity.render_handle.take() {
                renderer.destroy_entity_visual(handle);
            }
        }
    }
    state.stats.pairs_destroyed += 1;

    info!(
        tick = state.tick,
        plane_index,
        missile_index,
        hit_position_x = hit_position.x,
        hit_position_y = hit_position.y,
        hit_position_z = hit_position.z,
        intercept_distance = distance,
        "PAIR_DESTROYED: ミサイルが機体に命中しました"
    );

    if !state.roster.all_dead() {
        return CollisionOutcome::Destroyed { plane: plane_index, missile: missile_index };
    }

    state.spawn_roster(renderer);
    state.stats.respawns += 1;
    renderer.request_redraw();

    info!(
        tick = state.tick,
        respawns = state.stats.respawns,
        pair_count = state.roster.pair_count(),
        "ROSTER_RESPAWNED: 全機撃墜のためロスターを再生成しました"
    );

    CollisionOutcome::DestroyedAndRespawned { plane: plane_index, missile: missile_index }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::*;
    use crate::models::entity::Entity;
    use crate::models::roster::Roster;
    use crate::render::RecordingRenderer;
    use crate::scenario::ScenarioConfig;

    /// 同じ方位・速度の機体とミサイルを `gap` だけ離して配置
    fn pair_with_gap(gap: f64) -> Vec<Entity> {
        let heading = Heading3D::new(0.0, 0.0, 90.0);
        let mut plane = Entity::new_plane(1, Position3D::new(100.0, 0.0, 500.0), heading, 4.0);
        let mut missile = Entity::new_missile(0, Position3D::new(100.0 - gap, 0.0, 500.0), heading, 4.0);
        plane.render_handle = Some(crate::models::RenderHandle(10));
        missile.render_handle = Some(crate::models::RenderHandle(11));
        vec![plane, missile]
    }

    fn state_with(entities: Vec<Entity>) -> SimulationState {
        let roster = Roster::from_entities(entities).unwrap();
        SimulationState::with_roster(ScenarioConfig::default(), roster)
    }

    #[test]
    fn test_missile_within_half_destroy_distance_destroys_pair() {
        let config = ScenarioConfig::default();
        let gap = 0.5 * config.world.destroy_distance();
        let mut entities = pair_with_gap(gap);
        entities.extend(pair_with_gap(900.0).into_iter().map(|mut e| {
            // 2組目はインデックスを付け替える
            e.role = match e.role {
                crate::models::EntityRole::Plane { .. } => crate::models::EntityRole::Plane { missile: 3 },
                crate::models::EntityRole::Missile { .. } => crate::models::EntityRole::Missile { target: 2 },
            };
            e.position.y += 300.0;
            e
        }));
        let mut state = state_with(entities);
        let mut renderer = RecordingRenderer::default();

        // 相対速度ゼロのまま両方を1ステップ進める
        assert_eq!(state.advance_real(0, 1, &mut renderer), CollisionOutcome::None);
        let outcome = state.advance_real(1, 1, &mut renderer);

        assert_eq!(outcome, CollisionOutcome::Destroyed { plane: 0, missile: 1 });
        assert!(!state.roster.is_alive(0));
        assert!(!state.roster.is_alive(1));
        assert!(state.roster.is_alive(2));
        assert_eq!(renderer.destroyed.len(), 2);
        assert_eq!(state.stats.pairs_destroyed, 1);
    }

    #[test]
    fn test_distance_at_threshold_is_not_a_hit() {
        let config = ScenarioConfig::default();
        let mut state = state_with(pair_with_gap(config.world.destroy_distance() + 1.0));
        let mut renderer = RecordingRenderer::default();

        assert_eq!(check_collision(&mut state, 1, &mut renderer), CollisionOutcome::None);
        assert!(state.roster.is_alive(0));
        assert!(state.roster.is_alive(1));
    }

    #[test]
    fn test_last_pair_triggers_full_respawn() {
        let mut state = state_with(pair_with_gap(1.0));
        let mut renderer = RecordingRenderer::default();

        let outcome = check_collision(&mut state, 1, &mut renderer);

        assert!(outcome.is_respawn());
        assert_eq!(state.roster.len(), state.config.sim.pair_count * 2);
        assert!(state.roster.iter().all(|e| e.alive));
        assert!(state.roster.iter().all(|e| e.render_handle.is_some()));
        assert_eq!(state.stats.respawns, 1);
        assert_eq!(renderer.redraws, 1);
    }

    #[test]
    fn test_dead_missile_and_plane_index_are_noops() {
        let mut state = state_with(pair_with_gap(1.0));
        let mut renderer = RecordingRenderer::default();

        assert_eq!(check_collision(&mut state, 0, &mut renderer), CollisionOutcome::None);
        state.roster.get_mut(1).unwrap().alive = false;
        assert_eq!(check_collision(&mut state, 1, &mut renderer), CollisionOutcome::None);
        assert!(state.roster.is_alive(0));
        assert!(renderer.destroyed.is_empty());
    }
}
