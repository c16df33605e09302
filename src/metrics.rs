//! # Metrics モジュール
//!
//! 完了した試験記録から操縦性能指標を算出する後処理を提供します。
//!
//! 各算出関数は凍結済みの`TrialRecord`のみを入力とする純粋関数で、
//! 同じ記録に対しては常に同じ指標を返します。記録が空・短すぎる等の
//! 数値的な縁ケースはエラーにせず、ゼロ値に退化させて返します
//! （ティック予算により試験自体は必ず完了するため）。
//!
//! ## 算出する指標
//!
//! - **旋回圏試験**: Tactical Diameter, Advance, Transfer,
//!   Steady Turning Radius（重心法による円近似）, 平均ヨーレート
//! - **停止距離試験**: 停止距離, 停止時間, 平均減速度
//! - **加速試験**: 95%到達時間, 加速距離, 平均加速度

use crate::models::common::{Position2D, math_utils};
use crate::trial::{ACCEL_TARGET_RATIO, TrialKind, TrialRecord};
use serde::{Deserialize, Serialize};

/// 平均ヨーレート算出で先頭から除外するサンプル数（旋回進入過渡の除去）
pub const YAW_RATE_SKIP_SAMPLES: usize = 50;

/// 旋回圏試験の指標
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurningCircleMetrics {
    /// コマンド速度[m/s]
    pub velocity_mps: f64,
    /// 180度変針時の横距離の2倍[m]
    pub tactical_diameter_m: f64,
    /// 90度変針時の縦距離[m]
    pub advance_m: f64,
    /// 90度変針時の横距離[m]
    pub transfer_m: f64,
    /// 定常旋回半径[m]（後半軌跡の重心法近似）
    pub steady_radius_m: f64,
    /// 推定した旋回中心
    pub turn_center: Position2D,
    /// 平均ヨーレート[rad/s]（進入過渡を除く絶対値平均）
    pub avg_yaw_rate_rad_s: f64,
    /// 元となった試験記録（作図用）
    pub record: TrialRecord,
}

impl TurningCircleMetrics {
    /// 旋回圏試験記録から指標を算出
    ///
    /// 90度・180度の変針時点は、累積方位角と目標方位角の差の絶対値を
    /// 最小にするサンプル（最初に現れる最小値）として選びます。補間は
    /// 行いません。定常旋回半径は後半軌跡（インデックスが全長の50%以上）の
    /// 重心を旋回中心の推定値とし、各点から重心までの距離の平均を取ります。
    /// 最小二乗円あてはめではありません。
    pub fn from_record(record: &TrialRecord) -> Self {
        if record.is_empty() {
            return Self {
                velocity_mps: record.target_speed_mps,
                tactical_diameter_m: 0.0,
                advance_m: 0.0,
                transfer_m: 0.0,
                steady_radius_m: 0.0,
                turn_center: record.start_position,
                avg_yaw_rate_rad_s: 0.0,
                record: record.clone(),
            };
        }

        let start = record.start_position;
        let start_heading = record.start_heading_deg;

        // 90度・180度変針時点（最近傍サンプル）
        let idx_90 = nearest_heading_index(record, start_heading + 90.0);
        let idx_180 = nearest_heading_index(record, start_heading + 180.0);

        let advance_m = record.samples[idx_90].x - start.x;
        let transfer_m = (record.samples[idx_90].y - start.y).abs();
        let tactical_diameter_m = 2.0 * (record.samples[idx_180].y - start.y).abs();

        // 後半軌跡の重心を旋回中心とみなす
        let late = &record.samples[record.len() / 2..];
        let xs: Vec<f64> = late.iter().map(|s| s.x).collect();
        let ys: Vec<f64> = late.iter().map(|s| s.y).collect();
        let turn_center = Position2D::new(math_utils::mean(&xs), math_utils::mean(&ys));
        let radii: Vec<f64> = late
            .iter()
            .map(|s| s.position().distance_to(&turn_center))
            .collect();
        let steady_radius_m = math_utils::mean(&radii);

        // 旋回進入過渡を除いた平均ヨーレート
        let avg_yaw_rate_rad_s = if record.len() > YAW_RATE_SKIP_SAMPLES {
            let yaw: Vec<f64> = record.samples[YAW_RATE_SKIP_SAMPLES..]
                .iter()
                .map(|s| s.yaw_rate_rad_s.abs())
                .collect();
            math_utils::mean(&yaw)
        } else {
            0.0
        };

        Self {
            velocity_mps: record.target_speed_mps,
            tactical_diameter_m,
            advance_m,
            transfer_m,
            steady_radius_m,
            turn_center,
            avg_yaw_rate_rad_s,
            record: record.clone(),
        }
    }
}

/// 目標方位角に最も近いサンプルのインデックスを探す
///
/// 同値の場合は先に現れたサンプルを採用します。
fn nearest_heading_index(record: &TrialRecord, target_heading_deg: f64) -> usize {
    let mut best_index = 0;
    let mut best_diff = f64::INFINITY;
    for (index, sample) in record.samples.iter().enumerate() {
        let diff = (sample.heading_deg - target_heading_deg).abs();
        if diff < best_diff {
            best_diff = diff;
            best_index = index;
        }
    }
    best_index
}

/// 停止距離試験の指標
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoppingMetrics {
    /// 制動開始時の実測初速[m/s]
    pub initial_velocity_mps: f64,
    /// 停止距離[m]（制動開始原点から最終位置まで）
    pub stopping_distance_m: f64,
    /// 停止時間[s]（サンプル数 × dt）
    pub stopping_time_s: f64,
    /// 平均減速度[m/s²]（停止時間ゼロの場合は0.0）
    pub avg_deceleration_mps2: f64,
    pub record: TrialRecord,
}

impl StoppingMetrics {
    /// 停止距離試験記録から指標を算出
    pub fn from_record(record: &TrialRecord) -> Self {
        let stopping_time_s = record.len() as f64 * record.dt_s;
        let stopping_distance_m = match record.last_sample() {
            Some(last) => last.position().distance_to(&record.start_position),
            None => 0.0,
        };
        // 停止時間ゼロの除算は縁ケースとしてゼロに退化させる
        let avg_deceleration_mps2 = if stopping_time_s > 0.0 {
            record.initial_speed_mps / stopping_time_s
        } else {
            0.0
        };

        Self {
            initial_velocity_mps: record.initial_speed_mps,
            stopping_distance_m,
            stopping_time_s,
            avg_deceleration_mps2,
            record: record.clone(),
        }
    }
}

/// 加速試験の指標
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelerationMetrics {
    /// 目標速度[m/s]
    pub target_velocity_mps: f64,
    /// 最終サンプルの速力[m/s]
    pub final_velocity_mps: f64,
    /// 目標速度の95%への到達時間[s]
    pub accel_time_s: f64,
    /// 加速距離[m]（最初と最後の記録位置の距離）
    pub accel_distance_m: f64,
    /// 平均加速度[m/s²]（到達時間ゼロの場合は0.0）
    pub avg_acceleration_mps2: f64,
    pub record: TrialRecord,
}

impl AccelerationMetrics {
    /// 加速試験記録から指標を算出
    ///
    /// 速力が目標の95%以上となる最初のサンプルを探します。先頭サンプルで
    /// 既に達している場合や最後まで達しない場合は、最終サンプルの時刻と
    /// 速力に退化させます。
    pub fn from_record(record: &TrialRecord) -> Self {
        let (Some(first), Some(last)) = (record.samples.first(), record.last_sample()) else {
            return Self {
                target_velocity_mps: record.target_speed_mps,
                final_velocity_mps: 0.0,
                accel_time_s: 0.0,
                accel_distance_m: 0.0,
                avg_acceleration_mps2: 0.0,
                record: record.clone(),
            };
        };

        let threshold = ACCEL_TARGET_RATIO * record.target_speed_mps;
        let reached_index = record.samples.iter().position(|s| s.speed_mps >= threshold);

        let (accel_time_s, velocity_at_index) = match reached_index {
            Some(index) if index > 0 => {
                let sample = &record.samples[index];
                (sample.time_s, sample.speed_mps)
            }
            // 未到達（または先頭で到達）の場合は最終サンプルに退化
            _ => (last.time_s, last.speed_mps),
        };

        let accel_distance_m = last.position().distance_to(&first.position());
        let avg_acceleration_mps2 = if accel_time_s > 0.0 {
            velocity_at_index / accel_time_s
        } else {
            0.0
        };

        Self {
            target_velocity_mps: record.target_speed_mps,
            final_velocity_mps: last.speed_mps,
            accel_time_s,
            accel_distance_m,
            avg_acceleration_mps2,
            record: record.clone(),
        }
    }
}

/// 1試験分の指標（種別ごとの直和型）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrialMetrics {
    TurningCircle(TurningCircleMetrics),
    Stopping(StoppingMetrics),
    Acceleration(AccelerationMetrics),
}

impl TrialMetrics {
    /// 試験種別を取得
    pub fn kind(&self) -> TrialKind {
        match self {
            TrialMetrics::TurningCircle(_) => TrialKind::TurningCircle,
            TrialMetrics::Stopping(_) => TrialKind::Stopping,
            TrialMetrics::Acceleration(_) => TrialKind::Acceleration,
        }
    }

    /// 元となった試験記録への参照を取得（作図用）
    pub fn record(&self) -> &TrialRecord {
        match self {
            TrialMetrics::TurningCircle(m) => &m.record,
            TrialMetrics::Stopping(m) => &m.record,
            TrialMetrics::Acceleration(m) => &m.record,
        }
    }

    /// 試験種別に応じた指標を記録から算出
    pub fn from_record(record: &TrialRecord) -> Self {
        match record.kind {
            TrialKind::TurningCircle => {
                TrialMetrics::TurningCircle(TurningCircleMetrics::from_record(record))
            }
            TrialKind::Stopping => TrialMetrics::Stopping(StoppingMetrics::from_record(record)),
            TrialKind::Acceleration => {
                TrialMetrics::Acceleration(AccelerationMetrics::from_record(record))
            }
        }
    }
}
