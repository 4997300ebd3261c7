//! 空中戦デモのミサイル追尾シミュレーション
//!
//! 機体は回避旋回と中心復帰を行い、各機体にはペアのミサイルが1発ずつ
//! 追尾します。命中したペアは同時に撃墜され、全滅するとロスター全体が
//! 再生成されます。描画は [`models::IRenderer`] を通して外部に委譲します。

pub mod logging;
pub mod models;
pub mod render;
pub mod scenario;
pub mod scheduler;
pub mod simulation;
