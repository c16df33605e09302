use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// 水平面上の2次元位置を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position2D {
    pub x: f64, // m (North)
    pub y: f64, // m (East)
}

impl Position2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 他の位置までのユークリッド距離を計算
    pub fn distance_to(&self, other: &Position2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// ベクトルの長さ（原点からの距離）
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }
}

impl Add for Position2D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Position2D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// 1ティック分の操縦コマンド
///
/// 試験コントローラが毎ティック生成し、シミュレータセッションに送る
/// (前進速度目標, ヨーレート目標) のペアです。発行後は変更されません。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub surge_mps: f64,      // 前進速度目標[m/s]（負値は後進推力）
    pub yaw_rate_rad_s: f64, // ヨーレート目標[rad/s]（正値は左旋回）
}

impl ControlCommand {
    pub fn new(surge_mps: f64, yaw_rate_rad_s: f64) -> Self {
        Self {
            surge_mps,
            yaw_rate_rad_s,
        }
    }

    /// 直進コマンド（ヨーレート目標ゼロ）
    pub fn straight(surge_mps: f64) -> Self {
        Self::new(surge_mps, 0.0)
    }

    /// コマンド値が有限かどうかを判定
    pub fn is_finite(&self) -> bool {
        self.surge_mps.is_finite() && self.yaw_rate_rad_s.is_finite()
    }
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

    /// スライスの平均値を計算（空の場合は0.0）
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }
}
