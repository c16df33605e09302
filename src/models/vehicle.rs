use crate::models::common::{ControlCommand, Position2D};
use crate::scenario::VehicleConfig;

/// 機体の瞬時運動状態のスナップショット
///
/// シミュレータセッションが1ティックごとに生成します。
/// 方位角は累積値（±πへの正規化なし）で保持するため、
/// 360度を超える多回転の旋回も検出できます。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub x: f64,           // m (North)
    pub y: f64,           // m (East)
    pub heading_rad: f64, // rad（累積、正規化なし）
    pub vx: f64,          // m/s (North成分)
    pub vy: f64,          // m/s (East成分)
    pub yaw_rate: f64,    // rad/s
}

impl VehicleState {
    /// 対地速度の大きさ
    pub fn speed(&self) -> f64 {
        (self.vx.powi(2) + self.vy.powi(2)).sqrt()
    }

    /// 現在位置を取得
    pub fn position(&self) -> Position2D {
        Position2D::new(self.x, self.y)
    }
}

/// Otter型USVの簡易応答モデル
///
/// 前進速度とヨーレートがそれぞれ一次遅れでコマンド値に追従する
/// 運動学モデルです。流体力（波・流れ・付加質量）はモデル化しません。
#[derive(Debug, Clone)]
pub struct VehicleModel {
    pub position: Position2D,
    pub heading_rad: f64, // 累積方位角[rad]
    pub surge_mps: f64,   // 現在の前進速度[m/s]
    pub yaw_rate_rad_s: f64,

    // 応答パラメータ（シナリオで設定）
    pub surge_time_constant_s: f64, // 前進速度の時定数[s]
    pub yaw_time_constant_s: f64,   // ヨーレートの時定数[s]
    pub max_speed_mps: f64,
    pub max_yaw_rate_rad_s: f64,
}

impl VehicleModel {
    pub fn from_config(config: &VehicleConfig) -> Self {
        Self {
            position: Position2D::new(config.initial_x_m, config.initial_y_m),
            heading_rad: config.initial_heading_rad,
            surge_mps: 0.0,
            yaw_rate_rad_s: 0.0,
            surge_time_constant_s: config.surge_time_constant_s,
            yaw_time_constant_s: config.yaw_time_constant_s,
            max_speed_mps: config.max_speed_mps,
            max_yaw_rate_rad_s: config.max_yaw_rate_rad_s,
        }
    }

    /// 1ティック分の運動を積分
    ///
    /// コマンド値を機体限界でクリップした上で、一次遅れ応答と
    /// オイラー積分で位置・方位を更新します。
    ///
    /// # 引数
    ///
    /// * `command` - このティックの操縦コマンド
    /// * `dt` - 時間刻み[s]
    pub fn integrate(&mut self, command: &ControlCommand, dt: f64) {
        let surge_target = command
            .surge_mps
            .clamp(-self.max_speed_mps, self.max_speed_mps);
        let yaw_target = command
            .yaw_rate_rad_s
            .clamp(-self.max_yaw_rate_rad_s, self.max_yaw_rate_rad_s);

        // 一次遅れ追従（dtが時定数より大きい場合はゲインを1に制限）
        let surge_gain = (dt / self.surge_time_constant_s).min(1.0);
        let yaw_gain = (dt / self.yaw_time_constant_s).min(1.0);
        self.surge_mps += (surge_target - self.surge_mps) * surge_gain;
        self.yaw_rate_rad_s += (yaw_target - self.yaw_rate_rad_s) * yaw_gain;

        // 方位角は正規化せず累積する（多回転の旋回判定に必要）
        self.heading_rad += self.yaw_rate_rad_s * dt;

        self.position = self.position
            + Position2D::new(
                self.surge_mps * self.heading_rad.cos() * dt,
                self.surge_mps * self.heading_rad.sin() * dt,
            );
    }

    /// 現在の運動状態スナップショットを取得
    pub fn state(&self) -> VehicleState {
        VehicleState {
            x: self.position.x,
            y: self.position.y,
            heading_rad: self.heading_rad,
            vx: self.surge_mps * self.heading_rad.cos(),
            vy: self.surge_mps * self.heading_rad.sin(),
            yaw_rate: self.yaw_rate_rad_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_model() -> VehicleModel {
        VehicleModel {
            position: Position2D::new(0.0, 0.0),
            heading_rad: 0.0,
            surge_mps: 0.0,
            yaw_rate_rad_s: 0.0,
            surge_time_constant_s: 2.0,
            yaw_time_constant_s: 1.0,
            max_speed_mps: 3.5,
            max_yaw_rate_rad_s: 0.6,
        }
    }

    #[test]
    fn test_surge_converges_to_command() {
        let mut model = test_model();
        let command = ControlCommand::straight(2.0);
        for _ in 0..500 {
            model.integrate(&command, 0.1);
        }
        assert!((model.surge_mps - 2.0).abs() < 1e-3);
        // 直進なので方位は変化しない
        assert_eq!(model.heading_rad, 0.0);
        assert!(model.position.x > 0.0);
        assert!(model.position.y.abs() < 1e-9);
    }

    #[test]
    fn test_command_clipped_to_limits() {
        let mut model = test_model();
        let command = ControlCommand::new(100.0, 100.0);
        for _ in 0..1000 {
            model.integrate(&command, 0.1);
        }
        assert!(model.surge_mps <= model.max_speed_mps + 1e-9);
        assert!(model.yaw_rate_rad_s <= model.max_yaw_rate_rad_s + 1e-9);
    }

    #[test]
    fn test_heading_accumulates_beyond_full_turn() {
        let mut model = test_model();
        let command = ControlCommand::new(2.0, 0.5);
        // 0.5 rad/s × 30秒 ≒ 15 rad で2回転を超える
        for _ in 0..300 {
            model.integrate(&command, 0.1);
        }
        assert!(model.heading_rad > 2.0 * std::f64::consts::TAU);
    }

    #[test]
    fn test_state_speed_matches_surge() {
        let mut model = test_model();
        let command = ControlCommand::straight(3.0);
        for _ in 0..500 {
            model.integrate(&command, 0.1);
        }
        let state = model.state();
        assert!((state.speed() - model.surge_mps.abs()).abs() < 1e-9);
        assert_eq!(state.position(), model.position);
    }
}
