use crate::models::common::*;
use crate::models::traits::RenderHandle;
use serde::Serialize;

/// ロスター内での役割
///
/// 機体とミサイルは同じレコード形状を持ち、役割と相方のインデックスを
/// ここで明示します。ミサイル `i` の目標は常に機体 `i - 1` です。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityRole {
    /// 機体（追跡してくるミサイルのインデックス）
    Plane { missile: usize },
    /// ミサイル（追尾目標の機体インデックス）
    Missile { target: usize },
}

impl EntityRole {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRole::Plane { .. } => EntityKind::Plane,
            EntityRole::Missile { .. } => EntityKind::Missile,
        }
    }

    /// ペアを組む相手のインデックス
    pub fn paired_index(&self) -> usize {
        match *self {
            EntityRole::Plane { missile } => missile,
            EntityRole::Missile { target } => target,
        }
    }
}

/// 機体またはミサイルの運動状態
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Entity {
    pub role: EntityRole,
    pub position: Position3D,
    /// 各軸 `[0, 360)` の角度（度）
    pub heading: Heading3D,
    /// 旋回中に1ステップごとに加算する角度
    pub heading_delta: Heading3D,
    /// 1ステップあたりの移動量
    pub speed: f64,
    /// 旋回補間の残りステップ数（0なら直進）
    pub turn_ticks_remaining: u32,
    /// 中心復帰旋回の再発動を抑止する残りステップ数
    pub distance_correction_ticks_remaining: u32,
    /// 前回の再照準からのティック数（ミサイルのみ使用）
    pub missile_retarget_counter: u32,
    pub alive: bool,
    #[serde(skip)]
    pub render_handle: Option<RenderHandle>,
}

impl Entity {
    pub fn new_plane(missile: usize, position: Position3D, heading: Heading3D, speed: f64) -> Self {
        Self::new(EntityRole::Plane { missile }, position, heading, speed)
    }

    pub fn new_missile(target: usize, position: Position3D, heading: Heading3D, speed: f64) -> Self {
        Self::new(EntityRole::Missile { target }, position, heading, speed)
    }

    fn new(role: EntityRole, position: Position3D, heading: Heading3D, speed: f64) -> Self {
        Self {
            role,
            position,
            heading: heading.wrapped(),
            heading_delta: Heading3D::default(),
            speed,
            turn_ticks_remaining: 0,
            distance_correction_ticks_remaining: 0,
            missile_retarget_counter: 0,
            alive: true,
            render_handle: None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.role.kind()
    }

    pub fn is_plane(&self) -> bool {
        matches!(self.role, EntityRole::Plane { .. })
    }

    pub fn is_missile(&self) -> bool {
        matches!(self.role, EntityRole::Missile { .. })
    }

    /// 追尾目標のインデックス（機体ならNone）
    pub fn target_index(&self) -> Option<usize> {
        match self.role {
            EntityRole::Missile { target } => Some(target),
            EntityRole::Plane { .. } => None,
        }
    }

    pub fn is_turning(&self) -> bool {
        self.turn_ticks_remaining != 0
    }

    /// 中心復帰旋回の抑止中か
    pub fn is_correcting(&self) -> bool {
        self.distance_correction_ticks_remaining != 0
    }

    /// 旋回を開始する
    ///
    /// `total` を `duration` ステップで均等に割り、補間用の増分として保持します。
    pub fn begin_turn(&mut self, total: Heading3D, duration: u32) {
        let steps = duration.max(1);
        let n = steps as f64;
        self.heading_delta = Heading3D::new(total.x / n, total.y / n, total.z / n);
        self.turn_ticks_remaining = steps;
    }
}
