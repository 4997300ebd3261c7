//! # Render モジュール
//!
//! 描画コラボレーター [`IRenderer`] の実装を提供します。
//!
//! - `NullRenderer`: 何もしない実装
//! - `TracingRenderer`: ヘッドレス実行用。表示オブジェクトの生存数を管理し、
//!   描画要求を tracing で出力します
//! - `RecordingRenderer`: 呼び出しを記録する実装（検証用）

use std::collections::HashSet;
use tracing::{debug, trace};

use crate::models::*;

/// 何もしない描画コラボレーター
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl IRenderer for NullRenderer {
    fn create_entity_visual(&mut self, _kind: EntityKind) -> RenderHandle {
        RenderHandle(0)
    }

    fn destroy_entity_visual(&mut self, _handle: RenderHandle) {}

    fn set_entity_pose(&mut self, _handle: RenderHandle, _position: Position3D, _heading: Heading3D) {}

    fn set_simulation_speed_multiplier(&mut self, _value: f64) {}

    fn request_redraw(&mut self) {}
}

/// ヘッドレス実行用の描画コラボレーター
#[derive(Debug, Default)]
pub struct TracingRenderer {
    next_handle: u64,
    live: HashSet<RenderHandle>,
    pub frames: u64,
}

impl TracingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在生存している表示オブジェクト数
    pub fn live_visuals(&self) -> usize {
        self.live.len()
    }
}

impl IRenderer for TracingRenderer {
    fn create_entity_visual(&mut self, kind: EntityKind) -> RenderHandle {
        self.next_handle += 1;
        let handle = RenderHandle(self.next_handle);
        self.live.insert(handle);
        trace!(handle = handle.0, kind = ?kind, "VISUAL_CREATED");
        handle
    }

    fn destroy_entity_visual(&mut self, handle: RenderHandle) {
        self.live.remove(&handle);
        trace!(handle = handle.0, "VISUAL_DESTROYED");
    }

    fn set_entity_pose(&mut self, handle: RenderHandle, position: Position3D, heading: Heading3D) {
        trace!(
            handle = handle.0,
            x = position.x,
            y = position.y,
            z = position.z,
            yaw = heading.yaw(),
            pitch = heading.pitch(),
            "VISUAL_POSE"
        );
    }

    fn set_simulation_speed_multiplier(&mut self, value: f64) {
        debug!(speed_multiplier = value, "時間圧縮倍率の表示を更新しました");
    }

    fn request_redraw(&mut self) {
        self.frames += 1;
        trace!(frame = self.frames, live_visuals = self.live.len(), "REDRAW");
    }
}

/// 呼び出し内容を記録する描画コラボレーター
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next_handle: u64,
    live: HashSet<RenderHandle>,
    pub created: Vec<(RenderHandle, EntityKind)>,
    pub destroyed: Vec<RenderHandle>,
    pub poses: usize,
    pub redraws: usize,
    pub speed_multiplier: Option<f64>,
}

impl RecordingRenderer {
    pub fn live_handles(&self) -> usize {
        self.live.len()
    }
}

impl IRenderer for RecordingRenderer {
    fn create_entity_visual(&mut self, kind: EntityKind) -> RenderHandle {
        self.next_handle += 1;
        let handle = RenderHandle(self.next_handle);
        self.live.insert(handle);
        self.created.push((handle, kind));
        handle
    }

    fn destroy_entity_visual(&mut self, handle: RenderHandle) {
        self.live.remove(&handle);
        self.destroyed.push(handle);
    }

    fn set_entity_pose(&mut self, _handle: RenderHandle, _position: Position3D, _heading: Heading3D) {
        self.poses += 1;
    }

    fn set_simulation_speed_multiplier(&mut self, value: f64) {
        self.speed_multiplier = Some(value);
    }

    fn request_redraw(&mut self) {
        self.redraws += 1;
    }
}
