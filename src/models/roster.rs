use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::models::common::*;
use crate::models::entity::Entity;
use crate::models::traits::IRenderer;
use crate::scenario::ScenarioConfig;

/// 機体とミサイルの固定長ロスター
///
/// 偶数インデックスが機体、直後の奇数インデックスがそのミサイルです。
/// 生成は常にロスター全体で行われ、個別の再生成はありません。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    entities: Vec<Entity>,
}

/// ロスターの直列化用スナップショット
#[derive(Debug, Clone, Serialize)]
pub struct RosterSnapshot {
    pub tick: u64,
    pub alive: usize,
    pub entities: Vec<Entity>,
}

impl Roster {
    /// 空のロスターから `pair_count` 組を生成
    pub fn spawn<R: Rng + ?Sized>(
        pair_count: usize,
        config: &ScenarioConfig,
        rng: &mut R,
        renderer: &mut dyn IRenderer,
    ) -> Self {
        let mut roster = Self::default();
        roster.reset(pair_count, config, rng, renderer);
        roster
    }

    /// ロスター全体を再初期化
    ///
    /// 生存中エンティティの表示オブジェクトを解放した上で、機体を世界中心の
    /// 円内に一様配置し、各ミサイルを機体の近傍（同高度）に配置します。
    pub fn reset<R: Rng + ?Sized>(
        &mut self,
        pair_count: usize,
        config: &ScenarioConfig,
        rng: &mut R,
        renderer: &mut dyn IRenderer,
    ) {
        for entity in self.entities.iter_mut().filter(|e| e.alive) {
            if let Some(handle) = entity.render_handle.take() {
                renderer.destroy_entity_visual(handle);
            }
        }
        self.entities.clear();
        self.entities.reserve(pair_count * 2);

        let center = config.world.center_position();
        let plane_speed = config.plane.speed;
        let missile_speed = config.missile.initial_speed_factor * plane_speed;

        for pair in 0..pair_count {
            let plane_index = pair * 2;
            let missile_index = plane_index + 1;

            // 機体: 中心からspawn_radius以内、高度は中心±altitude_spread
            let offset = random_point_in_disc(rng, config.world.spawn_radius());
            let spread = config.world.altitude_spread;
            let altitude = center.z + rng.gen_range(-spread..=spread);
            let plane_position = Position3D::new(center.x + offset.0, center.y + offset.1, altitude);
            let plane_heading = Heading3D::new(0.0, 0.0, rng.gen_range(0.0..360.0));
            let mut plane = Entity::new_plane(missile_index, plane_position, plane_heading, plane_speed);

            // ミサイル: 機体の近傍、機体と同じ高度
            let offset = random_point_in_disc(rng, config.missile.spawn_proximity_radius);
            let missile_position = Position3D::new(
                plane_position.x + offset.0,
                plane_position.y + offset.1,
                plane_position.z,
            );
            let mut missile = Entity::new_missile(plane_index, missile_position, Heading3D::default(), missile_speed);
            // 初回ティックで即座に照準させる
            missile.missile_retarget_counter = config.missile.retarget_period_ticks.saturating_sub(1);

            plane.render_handle = Some(renderer.create_entity_visual(EntityKind::Plane));
            missile.render_handle = Some(renderer.create_entity_visual(EntityKind::Missile));

            self.entities.push(plane);
            self.entities.push(missile);
        }

        debug!(pair_count, "ROSTER_RESET: ロスターを再初期化しました");
    }

    /// エンティティ列から直接構築（テスト・シナリオ組み立て用）
    ///
    /// 役割が偶奇の並びに一致しない場合は `None` を返します。
    pub fn from_entities(entities: Vec<Entity>) -> Option<Self> {
        if entities.len() % 2 != 0 {
            return None;
        }
        let consistent = entities.iter().enumerate().all(|(i, e)| {
            if i % 2 == 0 {
                e.is_plane() && e.role.paired_index() == i + 1
            } else {
                e.is_missile() && e.role.paired_index() == i - 1
            }
        });
        consistent.then_some(Self { entities })
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    /// 範囲外のインデックスは撃墜済み扱い
    pub fn is_alive(&self, index: usize) -> bool {
        self.entities.get(index).is_some_and(|e| e.alive)
    }

    /// 全エンティティが撃墜済みか
    pub fn all_dead(&self) -> bool {
        self.entities.iter().all(|e| !e.alive)
    }

    pub fn alive_count(&self) -> usize {
        self.entities.iter().filter(|e| e.alive).count()
    }

    /// ミサイル `index` の目標インデックス
    pub fn target_of(&self, index: usize) -> Option<usize> {
        self.entities.get(index).and_then(Entity::target_index)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.entities.len() / 2
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn snapshot(&self, tick: u64) -> RosterSnapshot {
        RosterSnapshot {
            tick,
            alive: self.alive_count(),
            entities: self.entities.clone(),
        }
    }
}

/// 半径 `radius` の円内に一様分布する点（中心からのオフセット）
fn random_point_in_disc<R: Rng + ?Sized>(rng: &mut R, radius: f64) -> (f64, f64) {
    let r = radius * rng.gen_range(0.0..=1.0f64).sqrt();
    let theta = rng.gen_range(0.0..std::f64::consts::TAU);
    (r * theta.cos(), r * theta.sin())
}
