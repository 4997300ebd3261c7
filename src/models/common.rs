use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// 3次元位置を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64, // 高度
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// XY平面での2次元距離を計算
    pub fn distance_xy(&self, other: &Position3D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// 3次元距離を計算
    pub fn distance_3d(&self, other: &Position3D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }

    /// ベクトルの長さ（原点からの距離）
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }
}

impl Add for Position3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Position3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// 3軸の角度ベクトル（度）
///
/// `x` がロール相当、`y` がピッチ相当、`z` がヨー相当の角度です。
/// 確定した値は常に `[0, 360)` に収まるよう `wrapped()` で正規化されます。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Heading3D {
    pub x: f64, // ロール
    pub y: f64, // ピッチ
    pub z: f64, // ヨー
}

impl Heading3D {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { x: roll, y: pitch, z: yaw }
    }

    pub fn roll(&self) -> f64 {
        self.x
    }

    pub fn pitch(&self) -> f64 {
        self.y
    }

    pub fn yaw(&self) -> f64 {
        self.z
    }

    /// 各軸を `[0, 360)` に正規化した角度を返す
    pub fn wrapped(&self) -> Self {
        Self {
            x: math_utils::wrap_degrees(self.x),
            y: math_utils::wrap_degrees(self.y),
            z: math_utils::wrap_degrees(self.z),
        }
    }

    /// 全軸が `[0, 360)` に収まっているか
    pub fn is_normalized(&self) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .all(|a| (0.0..360.0).contains(a))
    }
}

impl Add for Heading3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

/// エンティティの種類を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Plane,
    Missile,
}

/// 数学ユーティリティ関数
pub mod math_utils {
    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * std::f64::consts::PI / 180.0
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * 180.0 / std::f64::consts::PI
    }

    /// 角度を `[0, 360)` の範囲に正規化
    ///
    /// 微小な負の値に対する `rem_euclid` は丸めで 360.0 を返すことがあるため、
    /// その場合は 0.0 に寄せます。
    pub fn wrap_degrees(angle_deg: f64) -> f64 {
        let wrapped = angle_deg.rem_euclid(360.0);
        if wrapped >= 360.0 { 0.0 } else { wrapped }
    }
}
