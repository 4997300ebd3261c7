use crate::models::common::*;
use serde::{Deserialize, Serialize};

/// 描画側が発行する不透明な表示オブジェクト参照
///
/// シミュレーションは値を解釈せず、生成・破棄・姿勢更新の際に
/// 描画側へそのまま返すだけです。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderHandle(pub u64);

/// 描画コラボレーターのインターフェース
///
/// シーングラフ・描画・UI部品は全てこの外側にあり、
/// シミュレーション本体はこのtraitを通してのみ描画側に触れます。
pub trait IRenderer {
    /// エンティティの表示オブジェクトを生成
    fn create_entity_visual(&mut self, kind: EntityKind) -> RenderHandle;

    /// 表示オブジェクトを破棄
    fn destroy_entity_visual(&mut self, handle: RenderHandle);

    /// 位置と姿勢の反映
    fn set_entity_pose(&mut self, handle: RenderHandle, position: Position3D, heading: Heading3D);

    /// 時間圧縮倍率をUI側のコントロールへ通知
    fn set_simulation_speed_multiplier(&mut self, value: f64);

    /// まとめて再描画を要求
    fn request_redraw(&mut self);
}
